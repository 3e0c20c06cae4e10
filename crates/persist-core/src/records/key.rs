//! Record keys and key path evaluation

use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize, Serializer};
use serde_json::{Map, Value};

use crate::error::{StoreError, StoreResult};
use crate::records::config::KeyPath;

/// Largest integer a key generator may hand out (2^53).
pub const MAX_GENERATED_KEY: u64 = 9_007_199_254_740_992;

/// A valid IndexedDB key.
///
/// Ordering follows IndexedDB: every number sorts before every string, every
/// string before every array. Strings compare by UTF-16 code units.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum RecordKey {
    Number(f64),
    String(String),
    Array(Vec<RecordKey>),
}

impl RecordKey {
    /// Convert a JSON value, or `None` if it is not a valid key.
    pub fn from_json(value: &Value) -> Option<Self> {
        match value {
            Value::Number(n) => n.as_f64().map(RecordKey::Number),
            Value::String(s) => Some(RecordKey::String(s.clone())),
            Value::Array(items) => items
                .iter()
                .map(RecordKey::from_json)
                .collect::<Option<Vec<_>>>()
                .map(RecordKey::Array),
            _ => None,
        }
    }

    pub fn to_json(&self) -> Value {
        match self {
            RecordKey::Number(n) => match as_integer(*n) {
                Some(i) => Value::from(i),
                None => serde_json::Number::from_f64(*n)
                    .map(Value::Number)
                    .unwrap_or(Value::Null),
            },
            RecordKey::String(s) => Value::String(s.clone()),
            RecordKey::Array(items) => Value::Array(items.iter().map(RecordKey::to_json).collect()),
        }
    }

    /// NaN is never a valid key, at any depth.
    pub fn is_valid(&self) -> bool {
        match self {
            RecordKey::Number(n) => !n.is_nan(),
            RecordKey::String(_) => true,
            RecordKey::Array(items) => items.iter().all(RecordKey::is_valid),
        }
    }

    fn rank(&self) -> u8 {
        match self {
            RecordKey::Number(_) => 0,
            RecordKey::String(_) => 1,
            RecordKey::Array(_) => 2,
        }
    }
}

fn as_integer(n: f64) -> Option<i64> {
    if n.fract() == 0.0 && n.abs() <= MAX_GENERATED_KEY as f64 {
        Some(n as i64)
    } else {
        None
    }
}

impl Serialize for RecordKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            RecordKey::Number(n) => match as_integer(*n) {
                Some(i) => serializer.serialize_i64(i),
                None => serializer.serialize_f64(*n),
            },
            RecordKey::String(s) => serializer.serialize_str(s),
            RecordKey::Array(items) => items.serialize(serializer),
        }
    }
}

impl Ord for RecordKey {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (RecordKey::Number(a), RecordKey::Number(b)) => {
                if a == b {
                    Ordering::Equal
                } else {
                    a.total_cmp(b)
                }
            }
            (RecordKey::String(a), RecordKey::String(b)) => a.encode_utf16().cmp(b.encode_utf16()),
            (RecordKey::Array(a), RecordKey::Array(b)) => a.cmp(b),
            _ => self.rank().cmp(&other.rank()),
        }
    }
}

impl PartialOrd for RecordKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for RecordKey {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for RecordKey {}

impl fmt::Display for RecordKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_json())
    }
}

impl From<i32> for RecordKey {
    fn from(n: i32) -> Self {
        RecordKey::Number(n as f64)
    }
}

impl From<i64> for RecordKey {
    fn from(n: i64) -> Self {
        RecordKey::Number(n as f64)
    }
}

impl From<u32> for RecordKey {
    fn from(n: u32) -> Self {
        RecordKey::Number(n as f64)
    }
}

impl From<f64> for RecordKey {
    fn from(n: f64) -> Self {
        RecordKey::Number(n)
    }
}

impl From<&str> for RecordKey {
    fn from(s: &str) -> Self {
        RecordKey::String(s.to_string())
    }
}

impl From<String> for RecordKey {
    fn from(s: String) -> Self {
        RecordKey::String(s)
    }
}

impl From<Vec<RecordKey>> for RecordKey {
    fn from(items: Vec<RecordKey>) -> Self {
        RecordKey::Array(items)
    }
}

fn lookup<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
    if path.is_empty() {
        return Some(value);
    }
    path.split('.')
        .try_fold(value, |current, segment| current.as_object()?.get(segment))
}

fn evaluate(value: &Value, path: &str) -> StoreResult<Option<RecordKey>> {
    match lookup(value, path) {
        None => Ok(None),
        Some(found) => match RecordKey::from_json(found) {
            Some(key) => Ok(Some(key)),
            None => Err(StoreError::Data(format!(
                "value at key path '{}' is not a valid key",
                path
            ))),
        },
    }
}

/// Evaluate `key_path` against a record.
///
/// `Ok(None)` means the path does not resolve; a resolved value that is not a
/// valid key is a data error.
pub fn extract_key(value: &Value, key_path: &KeyPath) -> StoreResult<Option<RecordKey>> {
    match key_path {
        KeyPath::Single(path) => evaluate(value, path),
        KeyPath::Compound(paths) => {
            let mut parts = Vec::with_capacity(paths.len());
            for path in paths {
                match evaluate(value, path)? {
                    Some(key) => parts.push(key),
                    None => return Ok(None),
                }
            }
            Ok(Some(RecordKey::Array(parts)))
        }
    }
}

/// Write a generated key into a record at `path`, creating intermediate objects.
pub fn inject_key(value: &mut Value, path: &str, key: &RecordKey) -> StoreResult<()> {
    let not_object = || StoreError::Data(format!("cannot assign key at path '{}'", path));

    let mut segments: Vec<&str> = path.split('.').collect();
    let last = segments.pop().ok_or_else(not_object)?;

    let mut current = value.as_object_mut().ok_or_else(not_object)?;
    for segment in segments {
        let next = current
            .entry(segment.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
        current = next.as_object_mut().ok_or_else(not_object)?;
    }
    current.insert(last.to_string(), key.to_json());
    Ok(())
}
