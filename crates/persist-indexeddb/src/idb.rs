//! Low-level IndexedDB helpers using web-sys
//!
//! Wraps the callback-based IndexedDB API into Rust futures using
//! `wasm_bindgen_futures::JsFuture` and `js_sys::Promise`. Each request becomes
//! one promise, settled by whichever terminal event fires first.

use std::cell::RefCell;
use std::rc::Rc;

use js_sys::Promise;
use persist_core::logging::prefix;
use persist_core::records::{DatabaseConfig, KeyPath, StoreOptions};
use tracing::{debug, error, warn};
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use web_sys::{
    IdbDatabase, IdbFactory, IdbObjectStore, IdbObjectStoreParameters, IdbOpenDbRequest,
    IdbRequest, IdbTransaction, IdbTransactionMode,
};

use crate::error::{js_message, IndexedDbError, Result};

type EventClosure = Closure<dyn FnMut(web_sys::Event)>;

/// Closures attached to an open request, kept alive until it settles
type OpenClosures = Rc<
    RefCell<
        Option<(
            Closure<dyn FnMut(web_sys::IdbVersionChangeEvent)>,
            EventClosure,
        )>,
    >,
>;

/// Get the global IndexedDB factory (window or worker scope).
pub fn idb_factory() -> Result<IdbFactory> {
    let global = js_sys::global();

    let idb: JsValue = js_sys::Reflect::get(&global, &"indexedDB".into())
        .map_err(|_| IndexedDbError::NotAvailable("no indexedDB on global".into()))?;

    if idb.is_undefined() || idb.is_null() {
        return Err(IndexedDbError::NotAvailable(
            "indexedDB is null/undefined".into(),
        ));
    }

    idb.dyn_into::<IdbFactory>()
        .map_err(|_| IndexedDbError::NotAvailable("indexedDB is not IdbFactory".into()))
}

/// Convert an IdbRequest into a JS Promise that resolves with the request's result
/// and rejects with the request's DOMException.
fn request_to_promise(req: &IdbRequest) -> Promise {
    let req_success = req.clone();
    let req_error = req.clone();

    Promise::new(&mut move |resolve, reject| {
        // Store closures in Rc<RefCell> to manage their lifetime without leaking
        let closures: Rc<RefCell<Option<(EventClosure, EventClosure)>>> =
            Rc::new(RefCell::new(None));

        let req_s = req_success.clone();
        let closures_for_success = closures.clone();
        let on_success = Closure::wrap(Box::new(move |_event: web_sys::Event| {
            let result = req_s.result().unwrap_or(JsValue::UNDEFINED);
            let _ = resolve.call1(&JsValue::UNDEFINED, &result);
            *closures_for_success.borrow_mut() = None;
        }) as Box<dyn FnMut(web_sys::Event)>);

        let req_e = req_error.clone();
        let closures_for_error = closures.clone();
        let on_error = Closure::wrap(Box::new(move |_event: web_sys::Event| {
            let err = match req_e.error() {
                Ok(Some(dom)) => JsValue::from(dom),
                _ => JsValue::from_str("unknown IDB error"),
            };
            let _ = reject.call1(&JsValue::UNDEFINED, &err);
            *closures_for_error.borrow_mut() = None;
        }) as Box<dyn FnMut(web_sys::Event)>);

        req_success.set_onsuccess(Some(on_success.as_ref().unchecked_ref()));
        req_error.set_onerror(Some(on_error.as_ref().unchecked_ref()));

        // Keep both alive until one fires
        *closures.borrow_mut() = Some((on_success, on_error));
    })
}

/// Convert an IdbTransaction's completion into a JS Promise.
///
/// Rejects on `error` and on `abort`. An `error` is followed by `abort`, so
/// every handler is detached from the transaction before the closures drop.
fn transaction_to_promise(tx: &IdbTransaction) -> Promise {
    let tx = tx.clone();

    Promise::new(&mut move |resolve, reject| {
        let closures: Rc<RefCell<Option<(EventClosure, EventClosure, EventClosure)>>> =
            Rc::new(RefCell::new(None));

        let settle = {
            let tx = tx.clone();
            let closures = closures.clone();
            move || {
                tx.set_oncomplete(None);
                tx.set_onerror(None);
                tx.set_onabort(None);
                *closures.borrow_mut() = None;
            }
        };

        let settle_complete = settle.clone();
        let on_complete = Closure::wrap(Box::new(move |_event: web_sys::Event| {
            let _ = resolve.call0(&JsValue::UNDEFINED);
            settle_complete();
        }) as Box<dyn FnMut(web_sys::Event)>);

        let tx_e = tx.clone();
        let reject_e = reject.clone();
        let settle_error = settle.clone();
        let on_error = Closure::wrap(Box::new(move |_event: web_sys::Event| {
            let err = tx_e
                .error()
                .map(JsValue::from)
                .unwrap_or_else(|| JsValue::from_str("transaction error"));
            let _ = reject_e.call1(&JsValue::UNDEFINED, &err);
            settle_error();
        }) as Box<dyn FnMut(web_sys::Event)>);

        let on_abort = Closure::wrap(Box::new(move |_event: web_sys::Event| {
            let _ = reject.call1(&JsValue::UNDEFINED, &JsValue::from_str("transaction aborted"));
            settle();
        }) as Box<dyn FnMut(web_sys::Event)>);

        tx.set_oncomplete(Some(on_complete.as_ref().unchecked_ref()));
        tx.set_onerror(Some(on_error.as_ref().unchecked_ref()));
        tx.set_onabort(Some(on_abort.as_ref().unchecked_ref()));

        *closures.borrow_mut() = Some((on_complete, on_error, on_abort));
    })
}

/// Build `IDBObjectStoreParameters` from store options.
fn store_parameters(options: &StoreOptions) -> std::result::Result<IdbObjectStoreParameters, JsValue> {
    let params = IdbObjectStoreParameters::new();
    match &options.key_path {
        Some(KeyPath::Single(path)) => {
            js_sys::Reflect::set(&params, &"keyPath".into(), &JsValue::from_str(path))?;
        }
        Some(KeyPath::Compound(paths)) => {
            let array: js_sys::Array = paths.iter().map(|p| JsValue::from_str(p)).collect();
            js_sys::Reflect::set(&params, &"keyPath".into(), &array)?;
        }
        None => {}
    }
    if options.auto_increment {
        js_sys::Reflect::set(&params, &"autoIncrement".into(), &JsValue::TRUE)?;
    }
    Ok(params)
}

/// Upgrade step: create every configured store the database does not have yet.
fn create_missing_stores(
    req: &IdbOpenDbRequest,
    config: &DatabaseConfig,
) -> std::result::Result<(), JsValue> {
    let db: IdbDatabase = req.result()?.dyn_into()?;
    let existing = db.object_store_names();

    for (name, options) in config.missing_stores(|name| existing.contains(name)) {
        let params = store_parameters(&options)?;
        db.create_object_store_with_optional_parameters(name, &params)?;
        debug!("{} created store {} in {}", prefix::DB_OPEN, name, config.name);
    }
    Ok(())
}

/// Open (or create/upgrade) the database described by `config`.
///
/// When the requested version is newer than the stored one, the upgrade step
/// creates missing stores. A failure while creating them aborts the upgrade
/// transaction, which fails the open.
pub async fn open_database(config: &DatabaseConfig) -> Result<IdbDatabase> {
    config.validate()?;
    let factory = idb_factory()?;

    let open_req: IdbOpenDbRequest = match config.version {
        Some(version) => factory.open_with_u32(&config.name, version),
        None => factory.open(&config.name),
    }
    .map_err(|e| IndexedDbError::Open(js_message(&e)))?;

    let closures: OpenClosures = Rc::new(RefCell::new(None));

    let upgrade_req = open_req.clone();
    let upgrade_config = config.clone();
    let on_upgrade = Closure::wrap(Box::new(move |event: web_sys::IdbVersionChangeEvent| {
        debug!(
            "{} upgrading {} from v{} to v{:?}",
            prefix::DB_OPEN,
            upgrade_config.name,
            event.old_version(),
            event.new_version()
        );
        if let Err(e) = create_missing_stores(&upgrade_req, &upgrade_config) {
            error!(
                "{} upgrade of {} failed: {}",
                prefix::DB_OPEN,
                upgrade_config.name,
                js_message(&e)
            );
            if let Some(tx) = upgrade_req.transaction() {
                let _ = tx.abort();
            }
        }
    }) as Box<dyn FnMut(web_sys::IdbVersionChangeEvent)>);

    let blocked_name = config.name.clone();
    let on_blocked = Closure::wrap(Box::new(move |_event: web_sys::Event| {
        warn!(
            "{} open of {} blocked by another connection",
            prefix::DB_OPEN,
            blocked_name
        );
    }) as Box<dyn FnMut(web_sys::Event)>);

    open_req.set_onupgradeneeded(Some(on_upgrade.as_ref().unchecked_ref()));
    open_req.set_onblocked(Some(on_blocked.as_ref().unchecked_ref()));
    *closures.borrow_mut() = Some((on_upgrade, on_blocked));

    let open_promise = request_to_promise(open_req.unchecked_ref());
    let result = wasm_bindgen_futures::JsFuture::from(open_promise).await;

    // Detach and drop the upgrade/blocked closures now that open has settled
    open_req.set_onupgradeneeded(None);
    open_req.set_onblocked(None);
    *closures.borrow_mut() = None;

    let result = result.map_err(|e| IndexedDbError::Open(js_message(&e)))?;
    result
        .dyn_into::<IdbDatabase>()
        .map_err(|_| IndexedDbError::Open("result is not IdbDatabase".into()))
}

/// Start a single-store transaction.
pub fn begin_transaction(
    db: &IdbDatabase,
    store: &str,
    mode: IdbTransactionMode,
) -> Result<(IdbTransaction, IdbObjectStore)> {
    let tx = db
        .transaction_with_str_and_mode(store, mode)
        .map_err(|e| IndexedDbError::from_js(&e))?;
    let object_store = tx
        .object_store(store)
        .map_err(|e| IndexedDbError::from_js(&e))?;
    Ok((tx, object_store))
}

/// Await an IdbRequest, resolving to its result JsValue.
pub async fn await_request(req: &IdbRequest) -> Result<JsValue> {
    let promise = request_to_promise(req);
    wasm_bindgen_futures::JsFuture::from(promise)
        .await
        .map_err(|e| IndexedDbError::from_js(&e))
}

/// Await an IdbTransaction to complete.
pub async fn await_transaction(tx: &IdbTransaction) -> Result<()> {
    let promise = transaction_to_promise(tx);
    wasm_bindgen_futures::JsFuture::from(promise)
        .await
        .map_err(|e| IndexedDbError::Transaction(js_message(&e)))?;
    Ok(())
}

/// Delete an IndexedDB database by name.
pub async fn delete_database(db_name: &str) -> Result<()> {
    let factory = idb_factory()?;
    let req = factory
        .delete_database(db_name)
        .map_err(|e| IndexedDbError::Open(format!("delete db: {}", js_message(&e))))?;
    let promise = request_to_promise(req.unchecked_ref());
    wasm_bindgen_futures::JsFuture::from(promise)
        .await
        .map_err(|e| IndexedDbError::Open(format!("delete db: {}", js_message(&e))))?;
    Ok(())
}
