//! Key/value store behaviour against the in-memory backends

use std::sync::Arc;

use persist_core::{
    ClearScope, Expiry, KeyValueBackend, KeyValueStore, ManualClock, MemoryCookieJar,
    MemoryStorage, StorageConfig,
};
use pretty_assertions::assert_eq;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

const NOW: i64 = 1_704_067_200_000; // 2024-01-01 00:00:00 UTC

type TestStore = KeyValueStore<Arc<MemoryStorage>, Arc<MemoryCookieJar>>;

/// Helper to build a store over shared backends with a frozen clock
fn create_test_store(
    config: StorageConfig,
    storage: &Arc<MemoryStorage>,
    clock: &Arc<ManualClock>,
) -> TestStore {
    let cookies = Arc::new(MemoryCookieJar::with_clock(clock.clone()));
    KeyValueStore::new(config, storage.clone(), cookies).with_clock(clock.clone())
}

fn setup(prefix: &str) -> (TestStore, Arc<MemoryStorage>, Arc<ManualClock>) {
    let storage = Arc::new(MemoryStorage::new());
    let clock = Arc::new(ManualClock::new(NOW));
    let store = create_test_store(StorageConfig::new().prefix_key(prefix), &storage, &clock);
    (store, storage, clock)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Profile {
    name: String,
    tags: Vec<String>,
    age: Option<u32>,
}

#[test]
fn test_scenario_prefixed_set_and_get() {
    let (store, storage, _) = setup("t-");

    store
        .set_with_expiry("x", &json!({"n": 1}), Expiry::seconds(10))
        .unwrap();

    let raw = storage.get_item("T-X").unwrap().expect("derived key written");
    let envelope: Value = serde_json::from_str(&raw).unwrap();
    assert_eq!(envelope, json!({"value": {"n": 1}, "expire": NOW + 10_000}));

    let value: Value = store.get("x").unwrap().unwrap();
    assert_eq!(value, json!({"n": 1}));
}

#[test]
fn test_typed_round_trip() {
    let (store, _, _) = setup("");
    let profile = Profile {
        name: "ann".into(),
        tags: vec!["a".into(), "b".into()],
        age: None,
    };

    store.set("profile", &profile).unwrap();
    let back: Profile = store.get("profile").unwrap().unwrap();
    assert_eq!(back, profile);

    store.set("numbers", &vec![1.5, -2.0]).unwrap();
    assert_eq!(store.get::<Vec<f64>>("numbers").unwrap(), Some(vec![1.5, -2.0]));
}

#[test]
fn test_never_set_returns_default() {
    let (store, _, _) = setup("");
    assert_eq!(store.get::<String>("missing").unwrap(), None);
    assert_eq!(store.get_or("missing", 42).unwrap(), 42);
}

#[test]
fn test_expired_entry_removed_on_read() {
    let (store, storage, clock) = setup("");
    store.set_with_expiry("k", &"v", Expiry::seconds(5)).unwrap();

    clock.advance(5_001);
    assert_eq!(store.get_or("k", "default".to_string()).unwrap(), "default");
    assert_eq!(storage.get_item("K").unwrap(), None);
}

#[test]
fn test_past_absolute_expiry() {
    let (store, storage, _) = setup("");
    let yesterday = chrono::DateTime::from_timestamp_millis(NOW - 86_400_000).unwrap();
    store.set_with_expiry("k", &1, Expiry::at(yesterday)).unwrap();

    assert_eq!(store.get::<i32>("k").unwrap(), None);
    assert!(storage.is_empty());
}

#[test]
fn test_never_expiry() {
    let (store, storage, clock) = setup("");
    store.set_with_expiry("k", &true, Expiry::Never).unwrap();

    let raw = storage.get_item("K").unwrap().unwrap();
    assert_eq!(raw, r#"{"value":true,"expire":null}"#);

    clock.advance(i64::MAX / 2);
    assert_eq!(store.get::<bool>("k").unwrap(), Some(true));
}

#[test]
fn test_corrupt_entry_kept() {
    let (store, storage, _) = setup("");
    storage.set_item("BROKEN", "{not json").unwrap();

    assert_eq!(store.get_or("broken", 0).unwrap(), 0);
    assert_eq!(storage.get_item("BROKEN").unwrap().as_deref(), Some("{not json"));
}

#[test]
fn test_entry_without_expire_treated_as_expired() {
    let (store, storage, _) = setup("");
    storage.set_item("K", r#"{"value":1}"#).unwrap();
    storage.set_item("N", "123").unwrap();
    storage.set_item("S", r#"{"value":1,"expire":"later"}"#).unwrap();

    assert_eq!(store.get_or("k", 0).unwrap(), 0);
    assert_eq!(store.get_or("n", 0).unwrap(), 0);
    assert_eq!(store.get_or("s", 0).unwrap(), 0);
    assert_eq!(storage.get_item("K").unwrap(), None);
    assert_eq!(storage.get_item("N").unwrap(), None);
    assert_eq!(storage.get_item("S").unwrap(), None);
}

#[test]
fn test_null_entry_kept() {
    let (store, storage, _) = setup("");
    storage.set_item("NOTHING", "null").unwrap();

    assert_eq!(store.get_or("nothing", 5).unwrap(), 5);
    assert_eq!(storage.get_item("NOTHING").unwrap().as_deref(), Some("null"));
}

#[test]
fn test_remove_then_get() {
    let (store, _, _) = setup("p.");
    store.set("k", &1).unwrap();
    store.remove("k").unwrap();
    store.remove("never-existed").unwrap();
    assert_eq!(store.get_or("k", -1).unwrap(), -1);
}

#[test]
fn test_prefix_isolation() {
    let storage = Arc::new(MemoryStorage::new());
    let clock = Arc::new(ManualClock::new(NOW));
    let a = create_test_store(StorageConfig::new().prefix_key("a-"), &storage, &clock);
    let b = create_test_store(StorageConfig::new().prefix_key("b-"), &storage, &clock);

    a.set("shared", "from a").unwrap();
    assert_eq!(b.get::<String>("shared").unwrap(), None);

    b.set("shared", "from b").unwrap();
    assert_eq!(a.get::<String>("shared").unwrap().as_deref(), Some("from a"));
    assert_eq!(b.get::<String>("shared").unwrap().as_deref(), Some("from b"));
}

#[test]
fn test_keys_are_case_insensitive() {
    let (store, _, _) = setup("App.");
    store.set("Token", "t").unwrap();
    assert_eq!(store.get::<String>("TOKEN").unwrap().as_deref(), Some("t"));
}

#[test]
fn test_global_clear_ignores_prefix() {
    let (store, storage, _) = setup("mine-");
    storage.set_item("FOREIGN", "x").unwrap();
    store.set("k", &1).unwrap();

    store.clear().unwrap();
    assert!(storage.is_empty());
}

#[test]
fn test_prefix_scoped_clear() {
    let storage = Arc::new(MemoryStorage::new());
    let clock = Arc::new(ManualClock::new(NOW));
    let config = StorageConfig::new()
        .prefix_key("mine-")
        .clear_scope(ClearScope::Prefix);
    let store = create_test_store(config, &storage, &clock);

    storage.set_item("FOREIGN", "x").unwrap();
    store.set("a", &1).unwrap();
    store.set("b", &2).unwrap();

    store.clear().unwrap();
    assert_eq!(storage.keys().unwrap(), vec!["FOREIGN"]);
}

#[test]
fn test_prefix_clear_matches_longer_prefixes() {
    let storage = Arc::new(MemoryStorage::new());
    let clock = Arc::new(ManualClock::new(NOW));
    let scoped = |prefix: &str| {
        let config = StorageConfig::new()
            .prefix_key(prefix)
            .clear_scope(ClearScope::Prefix);
        create_test_store(config, &storage, &clock)
    };

    let short = scoped("a");
    let long = scoped("ab");
    long.set("k", &1).unwrap();
    short.clear().unwrap();
    assert_eq!(long.get::<i32>("k").unwrap(), None);

    // A delimiter keeps the two apart
    let short = scoped("a:");
    let long = scoped("ab:");
    long.set("k", &1).unwrap();
    short.clear().unwrap();
    assert_eq!(long.get::<i32>("k").unwrap(), Some(1));
}
