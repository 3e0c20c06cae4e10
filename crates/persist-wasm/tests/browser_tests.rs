#![cfg(target_arch = "wasm32")]

//! Browser tests for the Web Storage and cookie backends
//! (`wasm-pack test --headless --firefox`)

use persist_core::{ClearScope, Expiry, KeyValueBackend, StorageConfig, StorageKind};
use persist_wasm::{create_storage, StorageTool, WebStorage};
use serde_json::{json, Value};
use wasm_bindgen::JsValue;
use wasm_bindgen_test::wasm_bindgen_test;

wasm_bindgen_test::wasm_bindgen_test_configure!(run_in_browser);

fn unique_prefix(tag: &str) -> String {
    let rand = (js_sys::Math::random() * 1_000_000.0) as u64;
    format!("{tag}{rand:x}_")
}

fn session_config(tag: &str) -> StorageConfig {
    StorageConfig::new()
        .storage(StorageKind::Session)
        .prefix_key(unique_prefix(tag))
        .clear_scope(ClearScope::Prefix)
}

#[wasm_bindgen_test]
fn web_storage_round_trips_items() {
    let storage = WebStorage::session().unwrap();
    storage.set_item("PERSIST_RAW", "1").unwrap();
    assert_eq!(storage.get_item("PERSIST_RAW").unwrap().as_deref(), Some("1"));
    assert!(storage.keys().unwrap().contains(&"PERSIST_RAW".to_string()));

    storage.remove_item("PERSIST_RAW").unwrap();
    assert_eq!(storage.get_item("PERSIST_RAW").unwrap(), None);
}

#[wasm_bindgen_test]
fn set_writes_envelope_under_derived_key() {
    let store = create_storage(session_config("t_")).unwrap();
    store.set_with_expiry("x", &json!({"a": 1}), Expiry::Never).unwrap();

    let raw = store
        .storage()
        .get_item(&store.derived_key("x"))
        .unwrap()
        .unwrap();
    let envelope: Value = serde_json::from_str(&raw).unwrap();
    assert_eq!(envelope, json!({"value": {"a": 1}, "expire": null}));

    let value: Option<Value> = store.get("x").unwrap();
    assert_eq!(value, Some(json!({"a": 1})));
    store.clear().unwrap();
}

#[wasm_bindgen_test]
fn expired_entry_is_removed() {
    let store = create_storage(session_config("exp_")).unwrap();
    store.set_with_expiry("gone", &1, Expiry::millis(-1)).unwrap();

    let value: Option<i32> = store.get("gone").unwrap();
    assert_eq!(value, None);
    assert_eq!(store.storage().get_item(&store.derived_key("gone")).unwrap(), None);
}

#[wasm_bindgen_test]
fn prefix_clear_keeps_other_prefixes() {
    let mine = create_storage(session_config("mine_")).unwrap();
    let other = create_storage(session_config("other_")).unwrap();
    mine.set("k", &1).unwrap();
    other.set("k", &2).unwrap();

    mine.clear().unwrap();
    assert_eq!(mine.get::<i32>("k").unwrap(), None);
    assert_eq!(other.get::<i32>("k").unwrap(), Some(2));
    other.clear().unwrap();
}

#[wasm_bindgen_test]
fn cookies_round_trip() {
    let store = create_storage(session_config("c_")).unwrap();
    store.set_cookie("sid", "abc").unwrap();
    assert_eq!(store.get_cookie("sid").unwrap(), "abc");

    store.remove_cookie("sid").unwrap();
    assert_eq!(store.get_cookie("sid").unwrap(), "");
}

#[wasm_bindgen_test]
fn storage_tool_accepts_js_options_and_values() {
    let options = js_sys::Object::new();
    js_sys::Reflect::set(&options, &"prefixKey".into(), &unique_prefix("js_").into()).unwrap();
    js_sys::Reflect::set(&options, &"storage".into(), &"session".into()).unwrap();
    js_sys::Reflect::set(&options, &"clearScope".into(), &"prefix".into()).unwrap();
    let tool: StorageTool = persist_wasm::create_storage_tool(options.into()).unwrap();

    tool.set("n", JsValue::from_f64(42.0), JsValue::NULL).unwrap();
    assert_eq!(tool.get("n", JsValue::UNDEFINED).unwrap().as_f64(), Some(42.0));
    assert!(tool.get("missing", JsValue::UNDEFINED).unwrap().is_null());
    assert_eq!(
        tool.get("missing", JsValue::from_str("d")).unwrap().as_string().as_deref(),
        Some("d")
    );

    let past = js_sys::Date::new(&JsValue::from_f64(1_000.0));
    tool.set("old", JsValue::from_str("v"), past.into()).unwrap();
    assert!(tool.get("old", JsValue::UNDEFINED).unwrap().is_null());

    tool.clear().unwrap();
}

#[wasm_bindgen_test]
fn init_logging_is_idempotent() {
    persist_wasm::console::init_logging("debug");
    persist_wasm::console::init_logging("info");
    tracing::debug!("console logging ready");
}

#[wasm_bindgen_test(async)]
async fn toolkit_resolves_records_and_rejects_duplicates() {
    use wasm_bindgen_futures::JsFuture;

    let name = format!("persist-toolkit-{}", unique_prefix(""));
    let options: JsValue = js_sys::JSON::parse(&format!(
        r#"{{"name":"{name}","version":1,"stores":{{"items":"id"}}}}"#
    ))
    .unwrap();
    let db = persist_wasm::create_indexed_db_toolkit(options).unwrap();

    let record = js_sys::JSON::parse(r#"{"id":7,"name":"a"}"#).unwrap();
    let key = JsFuture::from(db.add("items".into(), record.clone())).await.unwrap();
    assert_eq!(key.as_f64(), Some(7.0));

    let err = JsFuture::from(db.add("items".into(), record)).await.unwrap_err();
    let dom: web_sys::DomException = wasm_bindgen::JsCast::dyn_into(err).unwrap();
    assert_eq!(dom.name(), "ConstraintError");

    let stored = JsFuture::from(db.get("items".into(), JsValue::from_f64(7.0)))
        .await
        .unwrap();
    let stored: Value = serde_wasm_bindgen::from_value(stored).unwrap();
    assert_eq!(stored, json!({"id": 7, "name": "a"}));

    let renamed = js_sys::JSON::parse(r#"{"id":7,"name":"b"}"#).unwrap();
    let updated = JsFuture::from(db.update("items".into(), renamed)).await.unwrap();
    assert!(updated.is_undefined());

    let count = JsFuture::from(db.count("items".into())).await.unwrap();
    assert_eq!(count.as_f64(), Some(1.0));

    db.close();
    persist_indexeddb::IndexedRecordStore::delete_database(&name)
        .await
        .unwrap();
}
