//! libSQL backend — async `KeyValueStore` implementation.
//!
//! Supports a local database file and an in-memory database for tests.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use libsql::{Connection, Database as LibSqlDatabase, params};
use tracing::{debug, info, warn};

use crate::error::DatabaseError;
use crate::store::migrations;
use crate::store::traits::KeyValueStore;

/// libSQL database backend.
///
/// Holds a single connection reused for all operations;
/// `libsql::Connection` is `Send + Sync` and safe for concurrent async use.
pub struct LibSqlBackend {
    #[allow(dead_code)]
    db: Arc<LibSqlDatabase>,
    conn: Connection,
}

impl LibSqlBackend {
    /// Open (or create) a local database file and run migrations.
    pub async fn new_local(path: &Path) -> Result<Self, DatabaseError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| {
                DatabaseError::Pool(format!("Failed to create database directory: {e}"))
            })?;
        }

        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(|e| DatabaseError::Pool(format!("Failed to open libSQL database: {e}")))?;

        let backend = Self::from_database(db).await?;
        info!(path = %path.display(), "Database opened");
        Ok(backend)
    }

    /// Create an in-memory database (for tests).
    pub async fn new_memory() -> Result<Self, DatabaseError> {
        let db = libsql::Builder::new_local(":memory:")
            .build()
            .await
            .map_err(|e| {
                DatabaseError::Pool(format!("Failed to create in-memory database: {e}"))
            })?;
        Self::from_database(db).await
    }

    async fn from_database(db: LibSqlDatabase) -> Result<Self, DatabaseError> {
        let conn = db
            .connect()
            .map_err(|e| DatabaseError::Pool(format!("Failed to create connection: {e}")))?;
        migrations::run_migrations(&conn).await?;
        Ok(Self {
            db: Arc::new(db),
            conn,
        })
    }

    fn conn(&self) -> &Connection {
        &self.conn
    }
}

#[async_trait]
impl KeyValueStore for LibSqlBackend {
    async fn get(&self, key: &str) -> Result<Option<serde_json::Value>, DatabaseError> {
        let mut rows = self
            .conn()
            .query("SELECT value FROM kv_store WHERE key = ?1", params![key])
            .await
            .map_err(|e| DatabaseError::Query(format!("get {key}: {e}")))?;

        let row = rows
            .next()
            .await
            .map_err(|e| DatabaseError::Query(format!("get {key}: {e}")))?;
        let Some(row) = row else {
            return Ok(None);
        };

        let raw: String = row
            .get(0)
            .map_err(|e| DatabaseError::Query(format!("get {key}: {e}")))?;
        match serde_json::from_str(&raw) {
            Ok(value) => Ok(Some(value)),
            Err(e) => {
                // Unparseable rows read as JSON null; typed callers fall back to defaults.
                warn!(key, error = %e, "Stored value is not valid JSON");
                Ok(Some(serde_json::Value::Null))
            }
        }
    }

    async fn set(&self, key: &str, value: &serde_json::Value) -> Result<(), DatabaseError> {
        let now = Utc::now().to_rfc3339();
        let raw =
            serde_json::to_string(value).map_err(|e| DatabaseError::Serialization(e.to_string()))?;

        self.conn()
            .execute(
                "INSERT INTO kv_store (key, value, updated_at) VALUES (?1, ?2, ?3)
                 ON CONFLICT (key) DO UPDATE SET value = ?2, updated_at = ?3",
                params![key, raw, now],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("set {key}: {e}")))?;

        debug!(key, "Stored value");
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<bool, DatabaseError> {
        let count = self
            .conn()
            .execute("DELETE FROM kv_store WHERE key = ?1", params![key])
            .await
            .map_err(|e| DatabaseError::Query(format!("delete {key}: {e}")))?;
        Ok(count > 0)
    }

    async fn keys(&self) -> Result<Vec<String>, DatabaseError> {
        let mut rows = self
            .conn()
            .query("SELECT key FROM kv_store ORDER BY key", ())
            .await
            .map_err(|e| DatabaseError::Query(format!("keys: {e}")))?;

        let mut keys = Vec::new();
        while let Some(row) = rows
            .next()
            .await
            .map_err(|e| DatabaseError::Query(format!("keys: {e}")))?
        {
            keys.push(
                row.get::<String>(0)
                    .map_err(|e| DatabaseError::Query(format!("keys: {e}")))?,
            );
        }
        Ok(keys)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    async fn test_db() -> LibSqlBackend {
        LibSqlBackend::new_memory().await.unwrap()
    }

    #[tokio::test]
    async fn get_missing_key_is_none() {
        let db = test_db().await;
        assert!(db.get("nope").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn set_get_overwrite() {
        let db = test_db().await;
        db.set("site", &json!({"name": "A"})).await.unwrap();
        assert_eq!(db.get("site").await.unwrap(), Some(json!({"name": "A"})));

        db.set("site", &json!({"name": "B"})).await.unwrap();
        assert_eq!(db.get("site").await.unwrap(), Some(json!({"name": "B"})));
        assert_eq!(db.keys().await.unwrap(), vec!["site".to_string()]);
    }

    #[tokio::test]
    async fn delete_reports_whether_removed() {
        let db = test_db().await;
        db.set("a", &json!(1)).await.unwrap();
        assert!(db.delete("a").await.unwrap());
        assert!(!db.delete("a").await.unwrap());
        assert!(db.get("a").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn corrupt_row_reads_as_null() {
        let db = test_db().await;
        db.conn()
            .execute(
                "INSERT INTO kv_store (key, value, updated_at) VALUES ('bad', '{not json', 'now')",
                (),
            )
            .await
            .unwrap();
        assert_eq!(db.get("bad").await.unwrap(), Some(serde_json::Value::Null));
    }

    #[tokio::test]
    async fn local_file_persists_across_opens() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("folio.db");

        {
            let db = LibSqlBackend::new_local(&path).await.unwrap();
            db.set("keep", &json!(["x"])).await.unwrap();
        }

        let db = LibSqlBackend::new_local(&path).await.unwrap();
        assert_eq!(db.get("keep").await.unwrap(), Some(json!(["x"])));
    }
}
