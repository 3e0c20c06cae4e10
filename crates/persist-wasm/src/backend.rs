//! Browser backends: Web Storage and `document.cookie`

use persist_core::{CookieBackend, KeyValueBackend, StorageKind, StoreError, StoreResult};
use wasm_bindgen::{JsCast, JsValue};
use web_sys::{HtmlDocument, Storage, Window};

fn window() -> StoreResult<Window> {
    web_sys::window().ok_or_else(|| StoreError::Backend("no window in this context".into()))
}

/// Render a thrown JS value for `StoreError::Backend`.
pub(crate) fn js_error(val: JsValue) -> StoreError {
    if let Some(dom) = val.dyn_ref::<web_sys::DomException>() {
        return StoreError::Backend(format!("{}: {}", dom.name(), dom.message()));
    }
    if let Some(err) = val.dyn_ref::<js_sys::Error>() {
        return StoreError::Backend(format!("{}: {}", err.name(), err.message()));
    }
    StoreError::Backend(val.as_string().unwrap_or_else(|| format!("{:?}", val)))
}

/// `localStorage` or `sessionStorage`.
#[derive(Debug, Clone)]
pub struct WebStorage {
    storage: Storage,
}

impl WebStorage {
    pub fn local() -> StoreResult<Self> {
        let storage = window()?
            .local_storage()
            .map_err(js_error)?
            .ok_or_else(|| StoreError::Backend("localStorage is not available".into()))?;
        Ok(Self { storage })
    }

    pub fn session() -> StoreResult<Self> {
        let storage = window()?
            .session_storage()
            .map_err(js_error)?
            .ok_or_else(|| StoreError::Backend("sessionStorage is not available".into()))?;
        Ok(Self { storage })
    }

    pub fn for_kind(kind: StorageKind) -> StoreResult<Self> {
        match kind {
            StorageKind::Local => Self::local(),
            StorageKind::Session => Self::session(),
        }
    }

    /// Wrap a `Storage` object handed over from JS.
    pub fn from_storage(storage: Storage) -> Self {
        Self { storage }
    }
}

impl KeyValueBackend for WebStorage {
    fn get_item(&self, key: &str) -> StoreResult<Option<String>> {
        self.storage.get_item(key).map_err(js_error)
    }

    fn set_item(&self, key: &str, value: &str) -> StoreResult<()> {
        self.storage.set_item(key, value).map_err(js_error)
    }

    fn remove_item(&self, key: &str) -> StoreResult<()> {
        self.storage.remove_item(key).map_err(js_error)
    }

    fn clear(&self) -> StoreResult<()> {
        self.storage.clear().map_err(js_error)
    }

    fn keys(&self) -> StoreResult<Vec<String>> {
        let len = self.storage.length().map_err(js_error)?;
        let mut keys = Vec::with_capacity(len as usize);
        for i in 0..len {
            if let Some(key) = self.storage.key(i).map_err(js_error)? {
                keys.push(key);
            }
        }
        Ok(keys)
    }
}

/// The current document's cookie property.
#[derive(Debug, Clone)]
pub struct DocumentCookies {
    document: HtmlDocument,
}

impl DocumentCookies {
    pub fn new() -> StoreResult<Self> {
        let document = window()?
            .document()
            .ok_or_else(|| StoreError::Backend("no document in this context".into()))?
            .dyn_into::<HtmlDocument>()
            .map_err(|_| StoreError::Backend("document is not an HTML document".into()))?;
        Ok(Self { document })
    }
}

impl CookieBackend for DocumentCookies {
    fn cookie_string(&self) -> StoreResult<String> {
        self.document.cookie().map_err(js_error)
    }

    fn write_cookie(&self, assignment: &str) -> StoreResult<()> {
        self.document.set_cookie(assignment).map_err(js_error)
    }
}
