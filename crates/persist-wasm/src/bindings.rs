//! JavaScript exports
//!
//! `createStorage` and `createIndexedDB` hand out class instances whose
//! methods mirror the Rust APIs. Key/value calls are synchronous; record calls
//! return Promises that reject with the host's DOMException where there is one.

use std::rc::Rc;

use chrono::DateTime;
use js_sys::Promise;
use persist_core::{Expiry, StorageConfig, StoreError};
use persist_indexeddb::{IdbTransactionMode, IndexedDbError, IndexedRecordStore};
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::future_to_promise;

use crate::backend::{DocumentCookies, WebStorage};
use crate::BrowserStore;

// ============================================================================
// Logging
// ============================================================================

/// Route `tracing` output to the console. `level` defaults to `"info"`.
#[wasm_bindgen(js_name = initLogging)]
pub fn init_logging(level: Option<String>) {
    crate::console::init_logging(level.as_deref().unwrap_or("info"));
}

// ============================================================================
// Key/value storage
// ============================================================================

#[wasm_bindgen]
pub struct StorageTool {
    inner: BrowserStore,
}

/// Build a key/value store.
///
/// `options.storage` may be `"local"`, `"session"`, or a `Storage` object
/// such as `window.sessionStorage`.
#[wasm_bindgen(js_name = createStorage)]
pub fn create_storage_tool(options: JsValue) -> Result<StorageTool, JsValue> {
    if options.is_undefined() || options.is_null() {
        let inner = crate::create_storage(StorageConfig::default()).map_err(store_error)?;
        return Ok(StorageTool { inner });
    }

    let storage = js_sys::Reflect::get(&options, &"storage".into())?;
    let inner = match storage.dyn_into::<web_sys::Storage>() {
        Ok(storage) => {
            // The Storage object cannot go through serde
            let rest = js_sys::Object::assign(&js_sys::Object::new(), options.unchecked_ref());
            js_sys::Reflect::delete_property(&rest, &"storage".into())?;
            let config = parse_config(rest.into())?;
            let cookies = DocumentCookies::new().map_err(store_error)?;
            BrowserStore::new(config, WebStorage::from_storage(storage), cookies)
        }
        Err(_) => crate::create_storage(parse_config(options)?).map_err(store_error)?,
    };
    Ok(StorageTool { inner })
}

fn parse_config(options: JsValue) -> Result<StorageConfig, JsValue> {
    serde_wasm_bindgen::from_value(options)
        .map_err(|e| js_sys::TypeError::new(&format!("invalid storage options: {}", e)).into())
}

#[wasm_bindgen]
impl StorageTool {
    /// `expire`: omitted for the default lifetime, `null` for never, a number
    /// of seconds, or a `Date`.
    pub fn set(&self, key: &str, value: JsValue, expire: JsValue) -> Result<(), JsValue> {
        let value = json_from_js(&value)?;
        let expiry = expiry_from_js(&expire, self.inner.config().default_cache_seconds)?;
        self.inner
            .set_with_expiry(key, &value, expiry)
            .map_err(store_error)
    }

    /// Stored value, or `def` (default `null`) when absent, expired or unreadable.
    pub fn get(&self, key: &str, def: JsValue) -> Result<JsValue, JsValue> {
        match self
            .inner
            .get::<serde_json::Value>(key)
            .map_err(store_error)?
        {
            Some(value) => json_to_js(&value),
            None if def.is_undefined() => Ok(JsValue::NULL),
            None => Ok(def),
        }
    }

    pub fn remove(&self, key: &str) -> Result<(), JsValue> {
        self.inner.remove(key).map_err(store_error)
    }

    pub fn clear(&self) -> Result<(), JsValue> {
        self.inner.clear().map_err(store_error)
    }

    /// `expire`: omitted for the default lifetime, `null` for a session
    /// cookie, or `Max-Age` in seconds.
    #[wasm_bindgen(js_name = setCookie)]
    pub fn set_cookie(&self, name: &str, value: JsValue, expire: JsValue) -> Result<(), JsValue> {
        let max_age = if expire.is_undefined() {
            Some(self.inner.config().default_cache_seconds)
        } else if expire.is_null() {
            None
        } else {
            let seconds = expire
                .as_f64()
                .ok_or_else(|| js_sys::TypeError::new("cookie expire must be a number"))?;
            Some(seconds as i64)
        };
        self.inner
            .set_cookie_with_max_age(name, js_text(&value), max_age)
            .map_err(store_error)
    }

    #[wasm_bindgen(js_name = getCookie)]
    pub fn get_cookie(&self, name: &str) -> Result<String, JsValue> {
        self.inner.get_cookie(name).map_err(store_error)
    }

    #[wasm_bindgen(js_name = removeCookie)]
    pub fn remove_cookie(&self, name: &str) -> Result<(), JsValue> {
        self.inner.remove_cookie(name).map_err(store_error)
    }

    #[wasm_bindgen(js_name = clearCookie)]
    pub fn clear_cookie(&self) -> Result<(), JsValue> {
        self.inner.clear_cookie().map_err(store_error)
    }
}

fn expiry_from_js(expire: &JsValue, default_seconds: i64) -> Result<Expiry, JsValue> {
    if expire.is_undefined() {
        return Ok(Expiry::seconds(default_seconds));
    }
    if expire.is_null() {
        return Ok(Expiry::Never);
    }
    if let Some(date) = expire.dyn_ref::<js_sys::Date>() {
        let millis = date.get_time();
        return DateTime::from_timestamp_millis(millis as i64)
            .filter(|_| millis.is_finite())
            .map(Expiry::at)
            .ok_or_else(|| js_sys::RangeError::new("invalid Date").into());
    }
    match expire.as_f64() {
        Some(seconds) => Ok(Expiry::millis((seconds * 1000.0) as i64)),
        None => {
            Err(js_sys::TypeError::new("expire must be a number of seconds, a Date, or null").into())
        }
    }
}

/// `JSON.stringify` semantics on the way in, so `toJSON` and dates behave as in JS.
fn json_from_js(value: &JsValue) -> Result<serde_json::Value, JsValue> {
    // undefined, functions and symbols have no JSON form
    let Some(text) = js_sys::JSON::stringify(value)?.as_string() else {
        return Ok(serde_json::Value::Null);
    };
    serde_json::from_str(&text).map_err(|e| store_error(e.into()))
}

fn json_to_js(value: &serde_json::Value) -> Result<JsValue, JsValue> {
    let text = serde_json::to_string(value).map_err(|e| store_error(e.into()))?;
    js_sys::JSON::parse(&text)
}

/// Text written into a cookie for an arbitrary JS value.
fn js_text(value: &JsValue) -> String {
    if let Some(s) = value.as_string() {
        return s;
    }
    if let Some(b) = value.as_bool() {
        return b.to_string();
    }
    if let Some(n) = value.as_f64() {
        return if n.fract() == 0.0 && n.abs() < 1e15 {
            format!("{}", n as i64)
        } else {
            n.to_string()
        };
    }
    if value.is_null() {
        return "null".into();
    }
    if value.is_undefined() {
        return "undefined".into();
    }
    js_sys::JSON::stringify(value)
        .ok()
        .and_then(|s| s.as_string())
        .unwrap_or_default()
}

fn store_error(err: StoreError) -> JsValue {
    js_sys::Error::new(&err.to_string()).into()
}

// ============================================================================
// Record database
// ============================================================================

#[wasm_bindgen]
pub struct IndexedDbToolkit {
    store: Rc<IndexedRecordStore>,
}

/// Start opening a record database.
///
/// `options`: `{ name, version?, stores?: { [store]: keyPath | { keyPath?, autoIncrement? } } }`.
#[wasm_bindgen(js_name = createIndexedDB)]
pub fn create_indexed_db_toolkit(options: JsValue) -> Result<IndexedDbToolkit, JsValue> {
    let config = serde_wasm_bindgen::from_value(options)
        .map_err(|e| js_sys::TypeError::new(&format!("invalid database options: {}", e)))?;
    Ok(IndexedDbToolkit {
        store: Rc::new(persist_indexeddb::create_indexed_db(config)),
    })
}

#[wasm_bindgen]
impl IndexedDbToolkit {
    #[wasm_bindgen(getter)]
    pub fn name(&self) -> String {
        self.store.name().to_string()
    }

    pub fn ready(&self) -> Promise {
        let store = self.store.clone();
        future_to_promise(async move {
            store.ready().await.map_err(idb_error)?;
            Ok(JsValue::UNDEFINED)
        })
    }

    /// Object store handle in a fresh transaction. `mode` is `"readonly"`
    /// (default) or `"readwrite"`.
    #[wasm_bindgen(js_name = getObjectStore)]
    pub fn get_object_store(&self, name: String, mode: Option<String>) -> Result<Promise, JsValue> {
        let mode = match mode.as_deref() {
            None | Some("readonly") => IdbTransactionMode::Readonly,
            Some("readwrite") => IdbTransactionMode::Readwrite,
            Some(other) => {
                let message = format!("unknown transaction mode {}", other);
                return Err(js_sys::TypeError::new(&message).into());
            }
        };
        let store = self.store.clone();
        Ok(future_to_promise(async move {
            let object_store = store
                .object_store_with_mode(&name, mode)
                .await
                .map_err(idb_error)?;
            Ok(object_store.into())
        }))
    }

    /// Resolves to the new record's key.
    pub fn add(&self, store: String, data: JsValue) -> Promise {
        let records = self.store.clone();
        future_to_promise(async move {
            records
                .add_js(&store, &data, None)
                .await
                .map_err(idb_error)
        })
    }

    /// Resolves to the record, or `undefined`.
    pub fn get(&self, store: String, key: JsValue) -> Promise {
        let records = self.store.clone();
        future_to_promise(async move { records.get_js(&store, &key).await.map_err(idb_error) })
    }

    /// Insert or replace; resolves with no value.
    pub fn update(&self, store: String, data: JsValue) -> Promise {
        let records = self.store.clone();
        future_to_promise(async move {
            records
                .update_js(&store, &data, None)
                .await
                .map_err(idb_error)?;
            Ok(JsValue::UNDEFINED)
        })
    }

    pub fn delete(&self, store: String, key: JsValue) -> Promise {
        let records = self.store.clone();
        future_to_promise(async move {
            records.delete_js(&store, &key).await.map_err(idb_error)?;
            Ok(JsValue::UNDEFINED)
        })
    }

    pub fn clear(&self, store: String) -> Promise {
        let records = self.store.clone();
        future_to_promise(async move {
            records.clear(&store).await.map_err(idb_error)?;
            Ok(JsValue::UNDEFINED)
        })
    }

    pub fn count(&self, store: String) -> Promise {
        let records = self.store.clone();
        future_to_promise(async move {
            let count = records.count(&store).await.map_err(idb_error)?;
            Ok(JsValue::from_f64(count as f64))
        })
    }

    pub fn close(&self) {
        self.store.close();
    }
}

/// Request failures become the DOMException the host raised.
fn idb_error(err: IndexedDbError) -> JsValue {
    if let IndexedDbError::Request { name, message } = &err {
        if let Ok(dom) = web_sys::DomException::new_with_message_and_name(message, name) {
            return dom.into();
        }
    }
    js_sys::Error::new(&err.to_string()).into()
}
