//! Record database model
//!
//! Configuration, keys and key paths shared by every record database backend:
//!
//! - **Memory**: `MemoryFactory` / `MemoryDatabase` in this module
//! - **IndexedDB**: `IndexedRecordStore` (persist-indexeddb crate, WASM only)
//!
//! # Example
//!
//! ```rust
//! use persist_core::records::{DatabaseConfig, MemoryFactory};
//! use serde_json::json;
//!
//! let config = DatabaseConfig::new("app").version(1).store("items", "id");
//! let db = MemoryFactory::new().open(&config).unwrap();
//!
//! db.add("items", &json!({"id": 1, "name": "a"})).unwrap();
//! let item: serde_json::Value = db.get("items", 1).unwrap().unwrap();
//! assert_eq!(item["name"], "a");
//! ```

mod config;
mod key;
mod memory;

pub use config::{DatabaseConfig, KeyPath, StoreDefinition, StoreOptions};
pub use key::{extract_key, inject_key, RecordKey, MAX_GENERATED_KEY};
pub use memory::{MemoryDatabase, MemoryFactory};
