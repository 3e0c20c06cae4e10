//! In-memory record database
//!
//! Same versioning, upgrade and key semantics as the IndexedDB store, with
//! synchronous methods. Useful for native builds and for testing code that
//! targets the browser store.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use crate::error::{StoreError, StoreResult};
use crate::logging::prefix;
use crate::records::config::{DatabaseConfig, KeyPath, StoreOptions};
use crate::records::key::{extract_key, inject_key, RecordKey, MAX_GENERATED_KEY};

#[derive(Debug)]
struct ObjectStore {
    options: StoreOptions,
    records: BTreeMap<RecordKey, Value>,
    next_key: u64,
}

impl ObjectStore {
    fn new(options: StoreOptions) -> Self {
        Self {
            options,
            records: BTreeMap::new(),
            next_key: 1,
        }
    }

    fn generate_key(&self) -> StoreResult<RecordKey> {
        if self.next_key > MAX_GENERATED_KEY {
            return Err(StoreError::Constraint("key generator exhausted".into()));
        }
        Ok(RecordKey::Number(self.next_key as f64))
    }

    /// Resolve the key for a write and store the record.
    fn write(
        &mut self,
        mut value: Value,
        explicit: Option<RecordKey>,
        overwrite: bool,
    ) -> StoreResult<RecordKey> {
        let key = match (&self.options.key_path, explicit) {
            (Some(_), Some(_)) => {
                return Err(StoreError::Data(
                    "store uses in-line keys and a key was provided".into(),
                ))
            }
            (Some(path), None) => match extract_key(&value, path)? {
                Some(key) => key,
                None if self.options.auto_increment => {
                    let key = self.generate_key()?;
                    if let KeyPath::Single(path) = path {
                        inject_key(&mut value, path, &key)?;
                    }
                    key
                }
                None => {
                    return Err(StoreError::Data(
                        "key path did not yield a value and the store has no key generator"
                            .into(),
                    ))
                }
            },
            (None, Some(key)) => key,
            (None, None) if self.options.auto_increment => self.generate_key()?,
            (None, None) => {
                return Err(StoreError::Data(
                    "store uses out-of-line keys and has no key generator; a key is required"
                        .into(),
                ))
            }
        };

        if !key.is_valid() {
            return Err(StoreError::Data(format!("{} is not a valid key", key)));
        }
        if !overwrite && self.records.contains_key(&key) {
            return Err(StoreError::Constraint(format!(
                "a record with key {} already exists",
                key
            )));
        }

        if self.options.auto_increment {
            if let RecordKey::Number(n) = key {
                if n >= self.next_key as f64 {
                    self.next_key = (n.floor().min(MAX_GENERATED_KEY as f64) as u64) + 1;
                }
            }
        }

        self.records.insert(key.clone(), value);
        Ok(key)
    }
}

#[derive(Debug, Default)]
struct DatabaseState {
    version: u32,
    stores: BTreeMap<String, ObjectStore>,
}

/// Registry of in-memory databases by name (the `indexedDB` global analogue).
///
/// Clones share the same databases.
#[derive(Debug, Clone, Default)]
pub struct MemoryFactory {
    databases: Arc<Mutex<HashMap<String, Arc<RwLock<DatabaseState>>>>>,
}

impl MemoryFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a database, running the upgrade step when the requested version is
    /// newer than the stored one.
    ///
    /// The upgrade creates every configured store that does not exist yet and
    /// leaves existing stores untouched.
    pub fn open(&self, config: &DatabaseConfig) -> StoreResult<MemoryDatabase> {
        config.validate()?;

        let state = self
            .databases
            .lock()
            .entry(config.name.clone())
            .or_default()
            .clone();

        {
            let mut db = state.write();
            let requested = config.version.unwrap_or(db.version.max(1));
            if requested < db.version {
                return Err(StoreError::Version {
                    requested,
                    current: db.version,
                });
            }

            if requested > db.version {
                debug!(
                    "{} upgrading {} from v{} to v{}",
                    prefix::DB_OPEN,
                    config.name,
                    db.version,
                    requested
                );
                let missing: Vec<(String, StoreOptions)> = config
                    .missing_stores(|name| db.stores.contains_key(name))
                    .into_iter()
                    .map(|(name, options)| (name.to_string(), options))
                    .collect();
                for (name, options) in missing {
                    debug!("{} creating store {}", prefix::DB_OPEN, name);
                    db.stores.insert(name, ObjectStore::new(options));
                }
                db.version = requested;
            }
        }

        Ok(MemoryDatabase {
            name: config.name.clone(),
            state,
            closed: AtomicBool::new(false),
        })
    }

    /// Drop a database and all of its stores. Returns whether it existed.
    pub fn delete_database(&self, name: &str) -> bool {
        self.databases.lock().remove(name).is_some()
    }

    /// Stored version of a database, if it exists.
    pub fn version(&self, name: &str) -> Option<u32> {
        self.databases
            .lock()
            .get(name)
            .map(|state| state.read().version)
    }
}

/// Connection to an in-memory database.
#[derive(Debug)]
pub struct MemoryDatabase {
    name: String,
    state: Arc<RwLock<DatabaseState>>,
    closed: AtomicBool,
}

impl MemoryDatabase {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn version(&self) -> u32 {
        self.state.read().version
    }

    pub fn store_names(&self) -> Vec<String> {
        self.state.read().stores.keys().cloned().collect()
    }

    pub fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }

    fn check_open(&self) -> StoreResult<()> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(StoreError::InvalidState(format!(
                "database {} is closed",
                self.name
            )));
        }
        Ok(())
    }

    fn read_store<R>(&self, store: &str, f: impl FnOnce(&ObjectStore) -> R) -> StoreResult<R> {
        self.check_open()?;
        let state = self.state.read();
        let object_store = state
            .stores
            .get(store)
            .ok_or_else(|| StoreError::NotFound(store.to_string()))?;
        Ok(f(object_store))
    }

    fn write_store<R>(
        &self,
        store: &str,
        f: impl FnOnce(&mut ObjectStore) -> StoreResult<R>,
    ) -> StoreResult<R> {
        self.check_open()?;
        let mut state = self.state.write();
        let object_store = state
            .stores
            .get_mut(store)
            .ok_or_else(|| StoreError::NotFound(store.to_string()))?;
        f(object_store)
    }

    /// Insert a new record. Fails with `Constraint` if the key is taken.
    pub fn add<T: Serialize + ?Sized>(&self, store: &str, data: &T) -> StoreResult<RecordKey> {
        let value = serde_json::to_value(data)?;
        self.write_store(store, |s| s.write(value, None, false))
    }

    /// Insert a new record under an explicit (out-of-line) key.
    pub fn add_with_key<T: Serialize + ?Sized>(
        &self,
        store: &str,
        data: &T,
        key: impl Into<RecordKey>,
    ) -> StoreResult<RecordKey> {
        let value = serde_json::to_value(data)?;
        let key = key.into();
        self.write_store(store, |s| s.write(value, Some(key), false))
    }

    /// Record for `key`, or `None` on a miss.
    pub fn get<T: DeserializeOwned>(
        &self,
        store: &str,
        key: impl Into<RecordKey>,
    ) -> StoreResult<Option<T>> {
        let key = key.into();
        let found = self.read_store(store, |s| s.records.get(&key).cloned())?;
        match found {
            Some(value) => Ok(Some(serde_json::from_value(value)?)),
            None => Ok(None),
        }
    }

    /// Insert or replace a record.
    pub fn update<T: Serialize + ?Sized>(&self, store: &str, data: &T) -> StoreResult<()> {
        let value = serde_json::to_value(data)?;
        self.write_store(store, |s| s.write(value, None, true))?;
        Ok(())
    }

    /// Insert or replace a record under an explicit (out-of-line) key.
    pub fn update_with_key<T: Serialize + ?Sized>(
        &self,
        store: &str,
        data: &T,
        key: impl Into<RecordKey>,
    ) -> StoreResult<()> {
        let value = serde_json::to_value(data)?;
        let key = key.into();
        self.write_store(store, |s| s.write(value, Some(key), true))?;
        Ok(())
    }

    /// Remove a record. Missing keys are not an error.
    pub fn delete(&self, store: &str, key: impl Into<RecordKey>) -> StoreResult<()> {
        let key = key.into();
        self.write_store(store, |s| {
            s.records.remove(&key);
            Ok(())
        })
    }

    pub fn clear(&self, store: &str) -> StoreResult<()> {
        self.write_store(store, |s| {
            s.records.clear();
            Ok(())
        })
    }

    pub fn count(&self, store: &str) -> StoreResult<usize> {
        self.read_store(store, |s| s.records.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn items_db() -> MemoryDatabase {
        let config = DatabaseConfig::new("test").version(1).store("items", "id");
        MemoryFactory::new().open(&config).unwrap()
    }

    #[test]
    fn test_generator_follows_explicit_keys() {
        let config = DatabaseConfig::new("gen")
            .version(1)
            .store("log", StoreOptions::auto_increment());
        let db = MemoryFactory::new().open(&config).unwrap();

        assert_eq!(db.add("log", &"a").unwrap(), RecordKey::from(1));
        assert_eq!(db.add_with_key("log", &"b", 10).unwrap(), RecordKey::from(10));
        assert_eq!(db.add("log", &"c").unwrap(), RecordKey::from(11));
        assert_eq!(db.add_with_key("log", &"d", "text").unwrap(), RecordKey::from("text"));
        assert_eq!(db.add("log", &"e").unwrap(), RecordKey::from(12));
    }

    #[test]
    fn test_generated_key_injected_at_key_path() {
        let config = DatabaseConfig::new("gen").store(
            "users",
            StoreOptions {
                key_path: Some(KeyPath::from("id")),
                auto_increment: true,
            },
        );
        let db = MemoryFactory::new().open(&config).unwrap();

        let key = db.add("users", &json!({"name": "ann"})).unwrap();
        assert_eq!(key, RecordKey::from(1));

        let stored: Value = db.get("users", 1).unwrap().unwrap();
        assert_eq!(stored, json!({"name": "ann", "id": 1}));
    }

    #[test]
    fn test_inline_store_rejects_explicit_key() {
        let db = items_db();
        let result = db.add_with_key("items", &json!({"id": 1}), 1);
        assert!(matches!(result, Err(StoreError::Data(_))));
    }

    #[test]
    fn test_missing_inline_key() {
        let db = items_db();
        let result = db.add("items", &json!({"name": "no id"}));
        assert!(matches!(result, Err(StoreError::Data(_))));
        assert_eq!(db.count("items").unwrap(), 0);
    }

    #[test]
    fn test_nan_key_rejected() {
        let config = DatabaseConfig::new("nan").store("plain", StoreOptions::default());
        let db = MemoryFactory::new().open(&config).unwrap();
        let result = db.add_with_key("plain", &1, f64::NAN);
        assert!(matches!(result, Err(StoreError::Data(_))));
    }

    #[test]
    fn test_closed_connection() {
        let db = items_db();
        db.close();
        assert!(matches!(
            db.count("items"),
            Err(StoreError::InvalidState(_))
        ));
    }
}
