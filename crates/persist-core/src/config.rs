//! Key/value store configuration
//!
//! Field names deserialize from camelCase so that the JavaScript options object
//! `{ prefixKey, storage, defaultCacheSeconds }` maps onto [`StorageConfig`]
//! without a translation layer.

use serde::{Deserialize, Serialize};

/// Seven days.
pub const DEFAULT_CACHE_SECONDS: i64 = 60 * 60 * 24 * 7;

/// Which browser backend a store should sit on.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageKind {
    /// `localStorage`
    #[default]
    Local,
    /// `sessionStorage`
    Session,
}

/// What `clear()` and `clear_cookie()` remove.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClearScope {
    /// Everything in the backend, regardless of prefix.
    #[default]
    Global,
    /// Only keys and cookies starting with this store's uppercased prefix.
    ///
    /// Matching is by string prefix, so a store with prefix `a` also removes
    /// the entries of a store with prefix `ab`. Use a delimiter (`"app:"`) to
    /// keep prefixes distinct.
    Prefix,
}

/// Configuration for a [`KeyValueStore`](crate::KeyValueStore).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct StorageConfig {
    pub storage: StorageKind,
    pub prefix_key: String,
    pub default_cache_seconds: i64,
    pub clear_scope: ClearScope,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            storage: StorageKind::Local,
            prefix_key: String::new(),
            default_cache_seconds: DEFAULT_CACHE_SECONDS,
            clear_scope: ClearScope::Global,
        }
    }
}

impl StorageConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn storage(mut self, storage: StorageKind) -> Self {
        self.storage = storage;
        self
    }

    pub fn prefix_key(mut self, prefix: impl Into<String>) -> Self {
        self.prefix_key = prefix.into();
        self
    }

    pub fn default_cache_seconds(mut self, seconds: i64) -> Self {
        self.default_cache_seconds = seconds;
        self
    }

    pub fn clear_scope(mut self, scope: ClearScope) -> Self {
        self.clear_scope = scope;
        self
    }
}
