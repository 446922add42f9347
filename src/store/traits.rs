//! The `KeyValueStore` trait: the single persistence seam.
//!
//! Every piece of site state (content categories, the message ledger) lives
//! under one fixed key as a JSON document. Backends only need to move whole
//! documents; typed access is layered on top in [`crate::store::content`].

use async_trait::async_trait;

use crate::error::DatabaseError;

#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Stored value, or `None` when the key was never written (or deleted).
    async fn get(&self, key: &str) -> Result<Option<serde_json::Value>, DatabaseError>;

    /// Insert or overwrite.
    async fn set(&self, key: &str, value: &serde_json::Value) -> Result<(), DatabaseError>;

    /// Remove a key. Returns whether anything was deleted.
    async fn delete(&self, key: &str) -> Result<bool, DatabaseError>;

    /// All stored keys, sorted.
    async fn keys(&self) -> Result<Vec<String>, DatabaseError>;
}
