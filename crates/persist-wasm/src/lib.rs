//! Browser bindings for persist-storage
//!
//! Provides:
//! - [`WebStorage`] and [`DocumentCookies`]: `KeyValueBackend`/`CookieBackend`
//!   over `localStorage`/`sessionStorage` and `document.cookie`
//! - [`create_storage`]: a [`KeyValueStore`] on those backends
//! - `tracing` output routed to the browser console ([`console`])
//! - JavaScript exports `createStorage`, `createIndexedDB` and `initLogging`
//!
//! ## Usage from JavaScript
//!
//! ```js
//! import init, { createStorage, createIndexedDB, initLogging } from './persist_wasm.js';
//!
//! await init();
//! initLogging('debug');
//!
//! const storage = createStorage({ prefixKey: 'app_', storage: 'session' });
//! storage.set('token', { id: 1 }, 60);
//! storage.get('token', null);
//!
//! const db = createIndexedDB({ name: 'app', version: 1, stores: { items: 'id' } });
//! await db.add('items', { id: 1, name: 'a' });
//! ```

pub mod backend;
mod bindings;
pub mod console;

pub use backend::{DocumentCookies, WebStorage};
pub use bindings::{
    create_indexed_db_toolkit, create_storage_tool, init_logging, IndexedDbToolkit, StorageTool,
};
pub use persist_indexeddb::create_indexed_db;

use persist_core::{KeyValueStore, StorageConfig, StoreResult};

/// Key/value store on the page's Web Storage and cookies.
pub type BrowserStore = KeyValueStore<WebStorage, DocumentCookies>;

/// Build a store on `localStorage` or `sessionStorage` per `config.storage`.
pub fn create_storage(config: StorageConfig) -> StoreResult<BrowserStore> {
    let storage = WebStorage::for_kind(config.storage)?;
    let cookies = DocumentCookies::new()?;
    Ok(KeyValueStore::new(config, storage, cookies))
}
