//! Record database configuration
//!
//! Deserializes from the JavaScript options shape:
//!
//! ```json
//! { "name": "app", "version": 2, "stores": { "items": "id", "log": { "autoIncrement": true } } }
//! ```

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{StoreError, StoreResult};

/// Where a record's key lives inside the record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum KeyPath {
    /// Dotted property path; the empty string means the record itself.
    Single(String),
    /// One key component per path, combined into an array key.
    Compound(Vec<String>),
}

impl KeyPath {
    pub fn is_valid(&self) -> bool {
        match self {
            KeyPath::Single(path) => is_valid_path(path),
            KeyPath::Compound(paths) => {
                !paths.is_empty() && paths.iter().all(|p| !p.is_empty() && is_valid_path(p))
            }
        }
    }
}

impl From<&str> for KeyPath {
    fn from(path: &str) -> Self {
        KeyPath::Single(path.to_string())
    }
}

fn is_valid_path(path: &str) -> bool {
    path.is_empty()
        || path.split('.').all(|segment| {
            let mut chars = segment.chars();
            match chars.next() {
                Some(first) if first.is_alphabetic() || first == '_' || first == '$' => chars
                    .all(|c| c.is_alphanumeric() || c == '_' || c == '$'),
                _ => false,
            }
        })
}

/// Object store parameters (`IDBObjectStoreParameters`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct StoreOptions {
    pub key_path: Option<KeyPath>,
    pub auto_increment: bool,
}

impl StoreOptions {
    pub fn key_path(path: impl Into<KeyPath>) -> Self {
        Self {
            key_path: Some(path.into()),
            auto_increment: false,
        }
    }

    pub fn auto_increment() -> Self {
        Self {
            key_path: None,
            auto_increment: true,
        }
    }

    /// Checks the combinations IndexedDB rejects at store creation.
    pub fn validate(&self, store: &str) -> StoreResult<()> {
        if let Some(path) = &self.key_path {
            if !path.is_valid() {
                return Err(StoreError::InvalidConfig(format!(
                    "store '{}' has an invalid key path",
                    store
                )));
            }
            if self.auto_increment {
                let generated_path_ok = matches!(path, KeyPath::Single(p) if !p.is_empty());
                if !generated_path_ok {
                    return Err(StoreError::InvalidConfig(format!(
                        "store '{}': autoIncrement needs a non-empty, non-compound key path",
                        store
                    )));
                }
            }
        }
        Ok(())
    }
}

/// A store entry in [`DatabaseConfig::stores`]: a bare key path or full options.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StoreDefinition {
    KeyPath(String),
    Options(StoreOptions),
}

impl StoreDefinition {
    pub fn options(&self) -> StoreOptions {
        match self {
            StoreDefinition::KeyPath(path) => StoreOptions::key_path(path.as_str()),
            StoreDefinition::Options(options) => options.clone(),
        }
    }
}

impl From<&str> for StoreDefinition {
    fn from(path: &str) -> Self {
        StoreDefinition::KeyPath(path.to_string())
    }
}

impl From<StoreOptions> for StoreDefinition {
    fn from(options: StoreOptions) -> Self {
        StoreDefinition::Options(options)
    }
}

/// Name, version and schema of a record database.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DatabaseConfig {
    pub name: String,
    /// `None` opens whatever version exists (creating version 1 if none).
    #[serde(default)]
    pub version: Option<u32>,
    #[serde(default)]
    pub stores: BTreeMap<String, StoreDefinition>,
}

impl DatabaseConfig {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: None,
            stores: BTreeMap::new(),
        }
    }

    pub fn version(mut self, version: u32) -> Self {
        self.version = Some(version);
        self
    }

    pub fn store(mut self, name: impl Into<String>, definition: impl Into<StoreDefinition>) -> Self {
        self.stores.insert(name.into(), definition.into());
        self
    }

    pub fn validate(&self) -> StoreResult<()> {
        if self.version == Some(0) {
            return Err(StoreError::InvalidConfig(
                "database version must be at least 1".into(),
            ));
        }
        for (name, definition) in &self.stores {
            definition.options().validate(name)?;
        }
        Ok(())
    }

    /// Configured stores for which `exists` returns false, in name order.
    ///
    /// This is what the upgrade step creates; existing stores are never altered.
    pub fn missing_stores<F>(&self, exists: F) -> Vec<(&str, StoreOptions)>
    where
        F: Fn(&str) -> bool,
    {
        self.stores
            .iter()
            .filter(|(name, _)| !exists(name.as_str()))
            .map(|(name, definition)| (name.as_str(), definition.options()))
            .collect()
    }
}
