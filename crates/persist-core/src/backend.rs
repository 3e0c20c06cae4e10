//! Backend contracts consumed by [`KeyValueStore`](crate::KeyValueStore).
//!
//! Implementations exist for:
//!
//! - **Memory**: `MemoryStorage` and `MemoryCookieJar` for native use and tests
//! - **Browser**: `WebStorage` and `DocumentCookies` (persist-wasm crate)

use std::sync::Arc;

use crate::error::StoreResult;

/// Synchronous string-to-string storage (the Web Storage interface).
pub trait KeyValueBackend {
    /// Returns `None` if the key is absent.
    fn get_item(&self, key: &str) -> StoreResult<Option<String>>;

    fn set_item(&self, key: &str, value: &str) -> StoreResult<()>;

    /// Removing an absent key is not an error.
    fn remove_item(&self, key: &str) -> StoreResult<()>;

    /// Remove every key in the backend.
    fn clear(&self) -> StoreResult<()>;

    /// All keys currently stored.
    fn keys(&self) -> StoreResult<Vec<String>>;
}

/// The document-level cookie property.
///
/// Reading yields `name=value` pairs joined by `"; "`. Writing takes a single
/// assignment such as `NAME=value; Max-Age=60` and updates one cookie.
pub trait CookieBackend {
    fn cookie_string(&self) -> StoreResult<String>;

    fn write_cookie(&self, assignment: &str) -> StoreResult<()>;
}

impl<B: KeyValueBackend + ?Sized> KeyValueBackend for Arc<B> {
    fn get_item(&self, key: &str) -> StoreResult<Option<String>> {
        (**self).get_item(key)
    }

    fn set_item(&self, key: &str, value: &str) -> StoreResult<()> {
        (**self).set_item(key, value)
    }

    fn remove_item(&self, key: &str) -> StoreResult<()> {
        (**self).remove_item(key)
    }

    fn clear(&self) -> StoreResult<()> {
        (**self).clear()
    }

    fn keys(&self) -> StoreResult<Vec<String>> {
        (**self).keys()
    }
}

impl<C: CookieBackend + ?Sized> CookieBackend for Arc<C> {
    fn cookie_string(&self) -> StoreResult<String> {
        (**self).cookie_string()
    }

    fn write_cookie(&self, assignment: &str) -> StoreResult<()> {
        (**self).write_cookie(assignment)
    }
}
