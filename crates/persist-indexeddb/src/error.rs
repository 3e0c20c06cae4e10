//! Error types for the IndexedDB record store

use persist_core::StoreError;
use thiserror::Error;
use wasm_bindgen::{JsCast, JsValue};

/// Result type for IndexedDB operations
pub type Result<T> = std::result::Result<T, IndexedDbError>;

/// Errors that can occur during IndexedDB operations
#[derive(Debug, Clone, Error)]
pub enum IndexedDbError {
    /// IndexedDB is not available in this environment
    #[error("IndexedDB not available: {0}")]
    NotAvailable(String),

    /// Database open/upgrade error
    #[error("IndexedDB open error: {0}")]
    Open(String),

    /// Transaction error
    #[error("IndexedDB transaction error: {0}")]
    Transaction(String),

    /// Request rejected by the host, with the DOMException name
    #[error("IndexedDB request error: {name}: {message}")]
    Request { name: String, message: String },

    /// Rust <-> JS value conversion error
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Configuration rejected before the open request was made
    #[error("invalid configuration: {0}")]
    Config(String),
}

impl IndexedDbError {
    /// Wrap a value thrown or rejected by the host.
    pub fn from_js(val: &JsValue) -> Self {
        let (name, message) = describe_js(val);
        IndexedDbError::Request { name, message }
    }

    /// DOMException name for request errors (`ConstraintError`, `DataError`, ...).
    pub fn name(&self) -> Option<&str> {
        match self {
            IndexedDbError::Request { name, .. } => Some(name),
            _ => None,
        }
    }
}

/// Split a thrown JS value into an exception name and message.
pub(crate) fn describe_js(val: &JsValue) -> (String, String) {
    if let Some(dom) = val.dyn_ref::<web_sys::DomException>() {
        return (dom.name(), dom.message());
    }
    if let Some(err) = val.dyn_ref::<js_sys::Error>() {
        return (String::from(err.name()), String::from(err.message()));
    }
    if let Some(s) = val.as_string() {
        return ("Error".to_string(), s);
    }
    let msg = js_sys::JSON::stringify(val)
        .map(String::from)
        .unwrap_or_else(|_| format!("{:?}", val));
    ("Error".to_string(), msg)
}

/// Render a thrown JS value as `Name: message`.
pub(crate) fn js_message(val: &JsValue) -> String {
    let (name, message) = describe_js(val);
    format!("{}: {}", name, message)
}

impl From<JsValue> for IndexedDbError {
    fn from(val: JsValue) -> Self {
        IndexedDbError::from_js(&val)
    }
}

impl From<serde_wasm_bindgen::Error> for IndexedDbError {
    fn from(err: serde_wasm_bindgen::Error) -> Self {
        IndexedDbError::Serialization(err.to_string())
    }
}

impl From<StoreError> for IndexedDbError {
    fn from(err: StoreError) -> Self {
        IndexedDbError::Config(err.to_string())
    }
}

/// Convert IndexedDbError to the shared StoreError taxonomy
impl From<IndexedDbError> for StoreError {
    fn from(err: IndexedDbError) -> Self {
        match err {
            IndexedDbError::Request { name, message } => match name.as_str() {
                "ConstraintError" => StoreError::Constraint(message),
                "DataError" => StoreError::Data(message),
                "NotFoundError" => StoreError::NotFound(message),
                "InvalidStateError" | "TransactionInactiveError" => {
                    StoreError::InvalidState(message)
                }
                _ => StoreError::Backend(format!("IndexedDB {}: {}", name, message)),
            },
            IndexedDbError::Serialization(msg) => StoreError::Serialization(msg),
            IndexedDbError::Config(msg) => StoreError::InvalidConfig(msg),
            IndexedDbError::NotAvailable(msg) => {
                StoreError::Backend(format!("IndexedDB not available: {}", msg))
            }
            IndexedDbError::Open(msg) => StoreError::Backend(format!("IndexedDB open: {}", msg)),
            IndexedDbError::Transaction(msg) => {
                StoreError::Backend(format!("IndexedDB transaction: {}", msg))
            }
        }
    }
}
