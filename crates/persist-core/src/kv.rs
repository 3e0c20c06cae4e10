//! Prefixed, expiry-aware key/value store with cookie helpers.

use std::fmt::Display;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, warn};

use crate::backend::{CookieBackend, KeyValueBackend};
use crate::clock::{Clock, SystemClock};
use crate::config::{ClearScope, StorageConfig};
use crate::cookie::{self, CookieAssignment};
use crate::envelope::{Envelope, Expiry};
use crate::error::StoreResult;
use crate::key::{derive_key, derived_prefix};
use crate::logging::prefix;
use crate::memory::{MemoryCookieJar, MemoryStorage};

/// Key/value store over a synchronous backend plus the cookie string.
///
/// Every key is rewritten to `uppercase(prefix + key)`. Values are wrapped in
/// an [`Envelope`] carrying an absolute expiry; expired entries are removed
/// lazily when read.
pub struct KeyValueStore<S, C> {
    config: StorageConfig,
    storage: S,
    cookies: C,
    clock: Arc<dyn Clock>,
}

impl KeyValueStore<MemoryStorage, MemoryCookieJar> {
    /// Store backed by fresh in-memory backends.
    pub fn in_memory(config: StorageConfig) -> Self {
        Self::new(config, MemoryStorage::new(), MemoryCookieJar::new())
    }
}

impl<S: KeyValueBackend, C: CookieBackend> KeyValueStore<S, C> {
    pub fn new(config: StorageConfig, storage: S, cookies: C) -> Self {
        Self {
            config,
            storage,
            cookies,
            clock: Arc::new(SystemClock),
        }
    }

    /// Replace the time source used for expiry.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn config(&self) -> &StorageConfig {
        &self.config
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    pub fn cookies(&self) -> &C {
        &self.cookies
    }

    /// Backend key for `key`.
    pub fn derived_key(&self, key: &str) -> String {
        derive_key(&self.config.prefix_key, key)
    }

    fn default_expiry(&self) -> Expiry {
        Expiry::seconds(self.config.default_cache_seconds)
    }

    // ========================================================================
    // Items
    // ========================================================================

    /// Store `value` with the configured default lifetime.
    pub fn set<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> StoreResult<()> {
        self.set_with_expiry(key, value, self.default_expiry())
    }

    /// Store `value` under the derived key with an explicit expiry.
    pub fn set_with_expiry<T: Serialize + ?Sized>(
        &self,
        key: &str,
        value: &T,
        expiry: Expiry,
    ) -> StoreResult<()> {
        let envelope = Envelope::new(value, expiry.resolve(self.clock.now_millis()));
        let text = serde_json::to_string(&envelope)?;
        self.storage.set_item(&self.derived_key(key), &text)
    }

    /// Read a value.
    ///
    /// Returns `None` when the key is absent, the entry is not JSON, or the
    /// entry has expired. An entry without a numeric (or `null`) `expire`
    /// counts as expired. Expired entries are removed; text that is not JSON,
    /// JSON `null`, and values of an unexpected shape are logged and left in
    /// place.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> StoreResult<Option<T>> {
        let derived = self.derived_key(key);
        let text = match self.storage.get_item(&derived)? {
            Some(text) if !text.is_empty() => text,
            _ => return Ok(None),
        };

        let raw = match serde_json::from_str::<serde_json::Value>(&text) {
            Ok(serde_json::Value::Null) => {
                warn!("{} entry {} is null", prefix::KV, derived);
                return Ok(None);
            }
            Ok(raw) => raw,
            Err(e) => {
                warn!("{} unreadable entry {}: {}", prefix::KV, derived, e);
                return Ok(None);
            }
        };
        let envelope = Envelope::from_stored(raw);

        if !envelope.is_valid_at(self.clock.now_millis()) {
            debug!("{} entry {} expired, removing", prefix::KV, derived);
            self.storage.remove_item(&derived)?;
            return Ok(None);
        }

        match serde_json::from_value(envelope.value) {
            Ok(value) => Ok(Some(value)),
            Err(e) => {
                warn!("{} entry {} has unexpected shape: {}", prefix::KV, derived, e);
                Ok(None)
            }
        }
    }

    /// Read a value, falling back to `default`.
    pub fn get_or<T: DeserializeOwned>(&self, key: &str, default: T) -> StoreResult<T> {
        Ok(self.get(key)?.unwrap_or(default))
    }

    /// Delete an entry. Absent keys are fine.
    pub fn remove(&self, key: &str) -> StoreResult<()> {
        self.storage.remove_item(&self.derived_key(key))
    }

    /// Clear the backend.
    ///
    /// With [`ClearScope::Global`] this wipes the whole backend, including keys
    /// written by other stores or other code.
    pub fn clear(&self) -> StoreResult<()> {
        match self.config.clear_scope {
            ClearScope::Global => self.storage.clear(),
            ClearScope::Prefix => {
                let owned = derived_prefix(&self.config.prefix_key);
                for key in self.storage.keys()? {
                    if key.starts_with(&owned) {
                        self.storage.remove_item(&key)?;
                    }
                }
                Ok(())
            }
        }
    }

    // ========================================================================
    // Cookies
    // ========================================================================

    /// Write a cookie living for the configured default number of seconds.
    pub fn set_cookie(&self, name: &str, value: impl Display) -> StoreResult<()> {
        self.set_cookie_with_max_age(name, value, Some(self.config.default_cache_seconds))
    }

    /// Write a cookie with an explicit `Max-Age`.
    ///
    /// Zero or negative expires it immediately; `None` makes a session cookie.
    pub fn set_cookie_with_max_age(
        &self,
        name: &str,
        value: impl Display,
        max_age: Option<i64>,
    ) -> StoreResult<()> {
        let assignment =
            CookieAssignment::new(self.derived_key(name), value.to_string()).max_age(max_age);
        self.cookies.write_cookie(&assignment.to_string())
    }

    /// Value of the cookie, or an empty string if there is none.
    pub fn get_cookie(&self, name: &str) -> StoreResult<String> {
        let jar = self.cookies.cookie_string()?;
        Ok(cookie::find_cookie(&jar, &self.derived_key(name))
            .unwrap_or_default()
            .to_string())
    }

    pub fn remove_cookie(&self, name: &str) -> StoreResult<()> {
        self.set_cookie_with_max_age(name, 1, Some(-1))
    }

    /// Expire every cookie visible in the cookie string (or only this store's,
    /// under [`ClearScope::Prefix`]).
    pub fn clear_cookie(&self) -> StoreResult<()> {
        let jar = self.cookies.cookie_string()?;
        let owned = derived_prefix(&self.config.prefix_key);
        for name in cookie::cookie_names(&jar) {
            if self.config.clear_scope == ClearScope::Prefix && !name.starts_with(&owned) {
                continue;
            }
            self.cookies
                .write_cookie(&CookieAssignment::expired(name).to_string())?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use pretty_assertions::assert_eq;
    use serde_json::{json, Value};

    const NOW: i64 = 1_704_067_200_000;

    fn test_store(prefix: &str) -> (KeyValueStore<MemoryStorage, MemoryCookieJar>, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(NOW));
        let store = KeyValueStore::new(
            StorageConfig::new().prefix_key(prefix),
            MemoryStorage::new(),
            MemoryCookieJar::with_clock(clock.clone()),
        )
        .with_clock(clock.clone());
        (store, clock)
    }

    #[test]
    fn test_set_writes_envelope_under_derived_key() {
        let (store, _) = test_store("t-");
        store
            .set_with_expiry("x", &json!({"n": 1}), Expiry::seconds(10))
            .unwrap();

        let raw = store.storage().get_item("T-X").unwrap().unwrap();
        let envelope: Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(envelope, json!({"value": {"n": 1}, "expire": NOW + 10_000}));

        let value: Value = store.get("x").unwrap().unwrap();
        assert_eq!(value, json!({"n": 1}));
    }

    #[test]
    fn test_default_expiry_is_seven_days() {
        let (store, _) = test_store("");
        store.set("k", "v").unwrap();
        let raw = store.storage().get_item("K").unwrap().unwrap();
        let envelope: Envelope<String> = serde_json::from_str(&raw).unwrap();
        assert_eq!(envelope.expire, Some(NOW + 604_800_000));
    }

    #[test]
    fn test_expiry_boundary_is_inclusive() {
        let (store, clock) = test_store("");
        store.set_with_expiry("k", &1, Expiry::seconds(1)).unwrap();

        clock.advance(1_000);
        assert_eq!(store.get::<i32>("k").unwrap(), Some(1));

        clock.advance(1);
        assert_eq!(store.get::<i32>("k").unwrap(), None);
        assert_eq!(store.storage().get_item("K").unwrap(), None);
    }

    #[test]
    fn test_wrong_type_returns_default_and_keeps_entry() {
        let (store, _) = test_store("");
        store.set("k", "text").unwrap();
        assert_eq!(store.get_or::<i32>("k", 7).unwrap(), 7);
        assert!(store.storage().get_item("K").unwrap().is_some());
    }

    #[test]
    fn test_cookie_round_trip() {
        let (store, _) = test_store("t-");
        store.set_cookie("a", "v").unwrap();
        assert_eq!(store.cookies().cookie_string().unwrap(), "T-A=v");
        assert_eq!(store.get_cookie("a").unwrap(), "v");

        store.remove_cookie("a").unwrap();
        assert_eq!(store.get_cookie("a").unwrap(), "");
    }
}
