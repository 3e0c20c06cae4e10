//! IndexedDB record store
//!
//! Async counterpart of `persist_core::records::MemoryDatabase`: same method
//! names, same inputs, same key semantics. Errors carry the DOMException the
//! host raised.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use js_sys::Promise;
use persist_core::logging::prefix;
use persist_core::records::{DatabaseConfig, RecordKey};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, warn};
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::JsFuture;
use web_sys::{IdbDatabase, IdbObjectStore, IdbRequest, IdbTransactionMode};

use crate::error::{IndexedDbError, Result};
use crate::idb;

/// Progress of the one-time open sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenState {
    Opening,
    Ready,
    Failed,
}

/// IndexedDB-backed record store for browser WASM.
///
/// Construction starts the open sequence right away. Every operation awaits
/// that same sequence, so callers never sequence around readiness themselves
/// and concurrent early calls share one open. If the open fails, every
/// operation fails with the same error; there is no retry.
///
/// Each operation runs in its own single-store transaction. Nothing spans
/// multiple operations atomically.
pub struct IndexedRecordStore {
    name: String,
    open: Promise,
    state: Rc<Cell<OpenState>>,
    failure: Rc<RefCell<Option<IndexedDbError>>>,
}

impl IndexedRecordStore {
    /// Start opening the database described by `config`.
    pub fn new(config: DatabaseConfig) -> Self {
        let name = config.name.clone();
        let state = Rc::new(Cell::new(OpenState::Opening));
        let failure: Rc<RefCell<Option<IndexedDbError>>> = Rc::new(RefCell::new(None));

        let state_for_open = state.clone();
        let failure_for_open = failure.clone();
        let open = wasm_bindgen_futures::future_to_promise(async move {
            match idb::open_database(&config).await {
                Ok(db) => {
                    debug!("{} opened {} at v{}", prefix::DB_OPEN, config.name, db.version());
                    state_for_open.set(OpenState::Ready);
                    Ok(db.into())
                }
                Err(e) => {
                    warn!("{} failed to open {}: {}", prefix::DB_OPEN, config.name, e);
                    let message = JsValue::from_str(&e.to_string());
                    *failure_for_open.borrow_mut() = Some(e);
                    state_for_open.set(OpenState::Failed);
                    Err(message)
                }
            }
        });

        Self {
            name,
            open,
            state,
            failure,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn state(&self) -> OpenState {
        self.state.get()
    }

    /// Delete the database (for testing/cleanup).
    pub async fn delete_database(db_name: &str) -> Result<()> {
        idb::delete_database(db_name).await
    }

    /// Resolves once the open sequence has completed.
    pub async fn ready(&self) -> Result<()> {
        self.database().await.map(|_| ())
    }

    async fn database(&self) -> Result<IdbDatabase> {
        match JsFuture::from(self.open.clone()).await {
            Ok(db) => db
                .dyn_into::<IdbDatabase>()
                .map_err(|_| IndexedDbError::Open("result is not IdbDatabase".into())),
            Err(e) => Err(self
                .failure
                .borrow()
                .clone()
                .unwrap_or_else(|| IndexedDbError::from_js(&e))),
        }
    }

    /// Close the connection once the open sequence has completed.
    ///
    /// Operations issued afterwards fail with the host's `InvalidStateError`.
    pub fn close(&self) {
        let open = self.open.clone();
        let name = self.name.clone();
        wasm_bindgen_futures::spawn_local(async move {
            if let Ok(db) = JsFuture::from(open).await {
                db.unchecked_into::<IdbDatabase>().close();
                debug!("{} closed {}", prefix::DB_CLOSE, name);
            }
        });
    }

    /// Read-only handle to a store, for requests this type does not wrap.
    pub async fn object_store(&self, store: &str) -> Result<IdbObjectStore> {
        self.object_store_with_mode(store, IdbTransactionMode::Readonly)
            .await
    }

    /// Handle to a store in a fresh transaction of the given mode.
    ///
    /// The transaction commits as soon as no requests are pending, so use the
    /// handle before yielding to the event loop.
    pub async fn object_store_with_mode(
        &self,
        store: &str,
        mode: IdbTransactionMode,
    ) -> Result<IdbObjectStore> {
        let db = self.database().await?;
        let (_tx, object_store) = idb::begin_transaction(&db, store, mode)?;
        Ok(object_store)
    }

    /// Issue one request in its own transaction and wait for both the request
    /// and the transaction to finish.
    async fn run<F>(&self, store: &str, mode: IdbTransactionMode, request: F) -> Result<JsValue>
    where
        F: FnOnce(&IdbObjectStore) -> std::result::Result<IdbRequest, JsValue>,
    {
        let db = self.database().await?;
        let (tx, object_store) = idb::begin_transaction(&db, store, mode)?;

        let req = request(&object_store).map_err(|e| IndexedDbError::from_js(&e))?;
        let result = idb::await_request(&req).await?;
        idb::await_transaction(&tx).await?;

        Ok(result)
    }

    // ========================================================================
    // Record operations
    // ========================================================================

    /// Insert a new record and return its key.
    /// Fails with `ConstraintError` if the key already exists.
    pub async fn add<T: Serialize + ?Sized>(&self, store: &str, data: &T) -> Result<RecordKey> {
        let key = self.add_js(store, &to_js(data)?, None).await?;
        from_js(key)
    }

    /// Insert a new record under an explicit (out-of-line) key.
    pub async fn add_with_key<T: Serialize + ?Sized>(
        &self,
        store: &str,
        data: &T,
        key: impl Into<RecordKey>,
    ) -> Result<RecordKey> {
        let key = to_js(&key.into())?;
        let key = self.add_js(store, &to_js(data)?, Some(&key)).await?;
        from_js(key)
    }

    /// Retrieve a record by key.
    /// Returns `None` if not found.
    pub async fn get<T: DeserializeOwned>(
        &self,
        store: &str,
        key: impl Into<RecordKey>,
    ) -> Result<Option<T>> {
        let result = self.get_js(store, &to_js(&key.into())?).await?;
        if result.is_undefined() {
            return Ok(None);
        }
        from_js(result).map(Some)
    }

    /// Insert or replace a record.
    pub async fn update<T: Serialize + ?Sized>(&self, store: &str, data: &T) -> Result<()> {
        self.update_js(store, &to_js(data)?, None).await?;
        Ok(())
    }

    /// Insert or replace a record under an explicit (out-of-line) key.
    pub async fn update_with_key<T: Serialize + ?Sized>(
        &self,
        store: &str,
        data: &T,
        key: impl Into<RecordKey>,
    ) -> Result<()> {
        let key = to_js(&key.into())?;
        self.update_js(store, &to_js(data)?, Some(&key)).await?;
        Ok(())
    }

    /// Delete a record by key. Missing keys are not an error.
    pub async fn delete(&self, store: &str, key: impl Into<RecordKey>) -> Result<()> {
        self.delete_js(store, &to_js(&key.into())?).await
    }

    /// Remove every record in a store.
    pub async fn clear(&self, store: &str) -> Result<()> {
        self.run(store, IdbTransactionMode::Readwrite, |s| s.clear())
            .await?;
        Ok(())
    }

    /// Number of records in a store.
    pub async fn count(&self, store: &str) -> Result<usize> {
        let result = self
            .run(store, IdbTransactionMode::Readonly, |s| s.count())
            .await?;
        Ok(result.as_f64().unwrap_or(0.0) as usize)
    }

    // ========================================================================
    // Raw JS values (structured clone, no serde round trip)
    // ========================================================================

    /// `add`, resolving to the key as a JS value.
    pub async fn add_js(
        &self,
        store: &str,
        value: &JsValue,
        key: Option<&JsValue>,
    ) -> Result<JsValue> {
        self.run(store, IdbTransactionMode::Readwrite, |s| match key {
            Some(key) => s.add_with_key(value, key),
            None => s.add(value),
        })
        .await
    }

    /// `get`, resolving to `undefined` on a miss.
    pub async fn get_js(&self, store: &str, key: &JsValue) -> Result<JsValue> {
        self.run(store, IdbTransactionMode::Readonly, |s| s.get(key))
            .await
    }

    /// `put` (insert or replace), resolving to the record's key.
    pub async fn update_js(
        &self,
        store: &str,
        value: &JsValue,
        key: Option<&JsValue>,
    ) -> Result<JsValue> {
        self.run(store, IdbTransactionMode::Readwrite, |s| match key {
            Some(key) => s.put_with_key(value, key),
            None => s.put(value),
        })
        .await
    }

    pub async fn delete_js(&self, store: &str, key: &JsValue) -> Result<()> {
        self.run(store, IdbTransactionMode::Readwrite, |s| s.delete(key))
            .await?;
        Ok(())
    }
}

// ============================================================================
// Rust <-> JS conversion
// ============================================================================

/// Serialize to a plain JS value (maps become objects, integers become numbers).
fn to_js<T: Serialize + ?Sized>(value: &T) -> Result<JsValue> {
    let serializer = serde_wasm_bindgen::Serializer::json_compatible();
    Ok(value.serialize(&serializer)?)
}

fn from_js<T: DeserializeOwned>(value: JsValue) -> Result<T> {
    Ok(serde_wasm_bindgen::from_value(value)?)
}
