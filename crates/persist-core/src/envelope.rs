//! JSON envelope that carries expiry metadata next to every stored value.
//!
//! Layout on the wire: `{"value": <any>, "expire": <ms since epoch> | null}`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// A stored value plus its absolute expiry time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope<T> {
    pub value: T,
    /// Milliseconds since the Unix epoch; `None` never expires.
    #[serde(deserialize_with = "deserialize_millis")]
    pub expire: Option<i64>,
}

impl<T> Envelope<T> {
    pub fn new(value: T, expire: Option<i64>) -> Self {
        Self { value, expire }
    }

    /// An entry expiring exactly at `now_millis` is still valid.
    pub fn is_valid_at(&self, now_millis: i64) -> bool {
        match self.expire {
            None => true,
            Some(expire) => expire >= now_millis,
        }
    }
}

impl Envelope<serde_json::Value> {
    /// Read whatever JSON was found under a key.
    ///
    /// A missing `value` reads as `null`. A missing or non-numeric `expire`
    /// (including non-object JSON such as a bare number) reads as long expired.
    pub fn from_stored(raw: serde_json::Value) -> Self {
        let expire = match raw.get("expire") {
            Some(serde_json::Value::Null) => None,
            Some(serde_json::Value::Number(n)) => Some(n.as_f64().map_or(i64::MIN, |ms| ms as i64)),
            _ => Some(i64::MIN),
        };
        let value = match raw {
            serde_json::Value::Object(mut map) => {
                map.remove("value").unwrap_or(serde_json::Value::Null)
            }
            _ => serde_json::Value::Null,
        };
        Self { value, expire }
    }
}

/// Accept any JSON number (writers in other runtimes may emit fractional ms).
fn deserialize_millis<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<f64> = Option::deserialize(deserializer)?;
    Ok(raw.map(|ms| ms as i64))
}

/// When a stored entry stops being valid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Expiry {
    /// Never expires (`expire: null`).
    Never,
    /// Relative to the time of the write. Negative values are already expired.
    AfterMillis(i64),
    /// Absolute point in time.
    At(DateTime<Utc>),
}

impl Expiry {
    pub fn seconds(secs: i64) -> Self {
        Expiry::AfterMillis(secs.saturating_mul(1000))
    }

    pub fn millis(millis: i64) -> Self {
        Expiry::AfterMillis(millis)
    }

    pub fn at(instant: DateTime<Utc>) -> Self {
        Expiry::At(instant)
    }

    /// Absolute expiry in epoch milliseconds, or `None` for never.
    pub fn resolve(&self, now_millis: i64) -> Option<i64> {
        match self {
            Expiry::Never => None,
            Expiry::AfterMillis(millis) => Some(now_millis.saturating_add(*millis)),
            Expiry::At(instant) => Some(instant.timestamp_millis()),
        }
    }
}

impl From<DateTime<Utc>> for Expiry {
    fn from(instant: DateTime<Utc>) -> Self {
        Expiry::At(instant)
    }
}
