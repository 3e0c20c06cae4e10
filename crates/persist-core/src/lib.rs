//! Persist core
//!
//! Platform-independent half of the persist toolkit, designed to run
//! identically in browser (WASM) and native environments:
//!
//! - [`KeyValueStore`]: prefixed keys, JSON envelope with expiry, cookie helpers
//! - [`records`]: record database configuration, keys, and an in-memory database
//!
//! Browser backends live in `persist-wasm`, the IndexedDB store in
//! `persist-indexeddb`.
//!
//! # Features
//!
//! - `wasm` - read the clock through `Date.now()` on `wasm32-unknown-unknown`
//!
//! # Example
//!
//! ```rust
//! use persist_core::{Expiry, KeyValueStore, StorageConfig};
//!
//! let store = KeyValueStore::in_memory(StorageConfig::new().prefix_key("app."));
//! store.set_with_expiry("token", "abc", Expiry::seconds(60)).unwrap();
//!
//! let token: Option<String> = store.get("token").unwrap();
//! assert_eq!(token.as_deref(), Some("abc"));
//!
//! store.set_cookie("theme", "dark").unwrap();
//! assert_eq!(store.get_cookie("theme").unwrap(), "dark");
//! ```

pub mod backend;
pub mod clock;
pub mod config;
pub mod cookie;
pub mod envelope;
pub mod error;
pub mod key;
pub mod kv;
pub mod logging;
pub mod memory;
pub mod records;

// Re-export main types at crate root
pub use backend::{CookieBackend, KeyValueBackend};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{ClearScope, StorageConfig, StorageKind, DEFAULT_CACHE_SECONDS};
pub use envelope::{Envelope, Expiry};
pub use error::{StoreError, StoreResult};
pub use key::derive_key;
pub use kv::KeyValueStore;
pub use memory::{MemoryCookieJar, MemoryStorage};
pub use records::{DatabaseConfig, RecordKey, StoreDefinition, StoreOptions};
