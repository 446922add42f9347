//! Persistence layer — libSQL-backed key-value storage for site content
//! and the message ledger.

pub mod content;
pub mod ledger;
pub mod libsql_backend;
pub mod migrations;
pub mod traits;

pub use content::{ContentDocument, ContentKey, ContentStore};
pub use ledger::{AdminMessage, MessageLedger, MessageLog};
pub use libsql_backend::LibSqlBackend;
pub use traits::KeyValueStore;
