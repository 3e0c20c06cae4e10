//! Future-based IndexedDB record store (browser WASM)
//!
//! This crate turns IndexedDB's request/event protocol into `async` methods.
//! Configuration, keys and error taxonomy come from `persist-core`, so code can
//! target this store and `persist_core::records::MemoryDatabase` with the same
//! vocabulary.
//!
//! # Schema
//!
//! The schema is exactly the caller's `stores` map. Stores are created during
//! the upgrade step when the requested version is newer than the stored one,
//! and are never altered afterwards.
//!
//! # Example
//!
//! ```rust,ignore
//! use persist_core::records::DatabaseConfig;
//! use persist_indexeddb::create_indexed_db;
//! use serde_json::json;
//!
//! let store = create_indexed_db(DatabaseConfig::new("app").version(1).store("items", "id"));
//!
//! store.add("items", &json!({"id": 1, "name": "a"})).await?;
//! let item: Option<serde_json::Value> = store.get("items", 1).await?;
//! assert!(item.is_some());
//! ```

pub mod error;
pub mod idb;
pub mod store;

pub use error::{IndexedDbError, Result};
pub use store::{IndexedRecordStore, OpenState};

pub use web_sys::IdbTransactionMode;

use persist_core::records::DatabaseConfig;

/// Create a record store and start opening it.
pub fn create_indexed_db(config: DatabaseConfig) -> IndexedRecordStore {
    IndexedRecordStore::new(config)
}
