//! Cookie helpers against the in-memory cookie jar

use std::sync::Arc;

use persist_core::{
    ClearScope, CookieBackend, KeyValueStore, ManualClock, MemoryCookieJar, MemoryStorage,
    StorageConfig,
};
use pretty_assertions::assert_eq;

const NOW: i64 = 1_704_067_200_000;

fn create_test_store(
    config: StorageConfig,
    jar: &Arc<MemoryCookieJar>,
    clock: &Arc<ManualClock>,
) -> KeyValueStore<MemoryStorage, Arc<MemoryCookieJar>> {
    KeyValueStore::new(config, MemoryStorage::new(), jar.clone()).with_clock(clock.clone())
}

fn setup(config: StorageConfig) -> (
    KeyValueStore<MemoryStorage, Arc<MemoryCookieJar>>,
    Arc<MemoryCookieJar>,
    Arc<ManualClock>,
) {
    let clock = Arc::new(ManualClock::new(NOW));
    let jar = Arc::new(MemoryCookieJar::with_clock(clock.clone()));
    let store = create_test_store(config, &jar, &clock);
    (store, jar, clock)
}

#[test]
fn test_set_and_get_cookie() {
    let (store, jar, _) = setup(StorageConfig::new().prefix_key("t-"));
    store.set_cookie("a", "v").unwrap();

    assert_eq!(jar.cookie_string().unwrap(), "T-A=v");
    assert_eq!(store.get_cookie("a").unwrap(), "v");
    assert_eq!(store.get_cookie("A").unwrap(), "v");
}

#[test]
fn test_negative_max_age_reads_back_empty() {
    let (store, _, _) = setup(StorageConfig::new());
    store.set_cookie_with_max_age("a", "v", Some(-1)).unwrap();
    assert_eq!(store.get_cookie("a").unwrap(), "");
}

#[test]
fn test_default_max_age_applies() {
    let (store, _, clock) = setup(StorageConfig::new().default_cache_seconds(30));
    store.set_cookie("a", 5).unwrap();
    assert_eq!(store.get_cookie("a").unwrap(), "5");

    clock.advance(30_000);
    assert_eq!(store.get_cookie("a").unwrap(), "");
}

#[test]
fn test_session_cookie_without_max_age() {
    let (store, _, clock) = setup(StorageConfig::new());
    store.set_cookie_with_max_age("s", "1", None).unwrap();

    clock.advance(365 * 86_400_000);
    assert_eq!(store.get_cookie("s").unwrap(), "1");
}

#[test]
fn test_remove_cookie() {
    let (store, jar, _) = setup(StorageConfig::new().prefix_key("p_"));
    store.set_cookie("a", "1").unwrap();
    store.set_cookie("b", "2").unwrap();

    store.remove_cookie("a").unwrap();
    assert_eq!(store.get_cookie("a").unwrap(), "");
    assert_eq!(jar.cookie_string().unwrap(), "P_B=2");
}

#[test]
fn test_get_cookie_missing() {
    let (store, _, _) = setup(StorageConfig::new());
    assert_eq!(store.get_cookie("nothing").unwrap(), "");
}

#[test]
fn test_clear_cookie_is_global() {
    let (store, jar, _) = setup(StorageConfig::new().prefix_key("mine-"));
    jar.write_cookie("foreign=1").unwrap();
    store.set_cookie("a", "1").unwrap();

    store.clear_cookie().unwrap();
    assert_eq!(jar.cookie_string().unwrap(), "");
}

#[test]
fn test_clear_cookie_prefix_scoped() {
    let config = StorageConfig::new()
        .prefix_key("mine-")
        .clear_scope(ClearScope::Prefix);
    let (store, jar, _) = setup(config);
    jar.write_cookie("foreign=1").unwrap();
    store.set_cookie("a", "1").unwrap();
    store.set_cookie("b", "2").unwrap();

    store.clear_cookie().unwrap();
    assert_eq!(jar.cookie_string().unwrap(), "foreign=1");
}
