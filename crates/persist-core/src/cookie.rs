//! Cookie string handling
//!
//! `document.cookie` reads as `a=1; b=2` and is written one assignment at a
//! time (`NAME=value; Max-Age=60`). This module renders assignments and scans
//! the read form; it never touches a backend itself.

use std::fmt;

use chrono::{DateTime, Utc};

/// `expires` value used to invalidate a cookie.
pub const EPOCH_EXPIRES: &str = "Thu, 01 Jan 1970 00:00:00 GMT";

/// A single cookie write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CookieAssignment {
    pub name: String,
    pub value: String,
    /// Seconds until expiry. Zero or negative expires immediately.
    pub max_age: Option<i64>,
    pub expires: Option<DateTime<Utc>>,
}

impl CookieAssignment {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            max_age: None,
            expires: None,
        }
    }

    pub fn max_age(mut self, max_age: Option<i64>) -> Self {
        self.max_age = max_age;
        self
    }

    pub fn expires(mut self, expires: DateTime<Utc>) -> Self {
        self.expires = Some(expires);
        self
    }

    /// Assignment that invalidates `name` by dating it at the epoch.
    pub fn expired(name: impl Into<String>) -> Self {
        Self::new(name, "0").expires(DateTime::<Utc>::UNIX_EPOCH)
    }

    /// Parse an assignment the way a cookie jar would receive it.
    ///
    /// Unknown attributes are ignored. Returns `None` without a `name=value` pair.
    pub fn parse(assignment: &str) -> Option<Self> {
        let mut parts = assignment.split(';');
        let (name, value) = parts.next()?.trim().split_once('=')?;
        let name = name.trim();
        if name.is_empty() {
            return None;
        }

        let mut cookie = Self::new(name, value.trim());
        for attribute in parts {
            let Some((key, val)) = attribute.trim().split_once('=') else {
                continue;
            };
            let val = val.trim();
            if key.eq_ignore_ascii_case("max-age") {
                cookie.max_age = val.parse().ok();
            } else if key.eq_ignore_ascii_case("expires") {
                cookie.expires = DateTime::parse_from_rfc2822(val)
                    .ok()
                    .map(|dt| dt.with_timezone(&Utc));
            }
        }
        Some(cookie)
    }

    /// Absolute expiry in epoch milliseconds. `Max-Age` wins over `expires`.
    pub fn expires_at_millis(&self, now_millis: i64) -> Option<i64> {
        match (self.max_age, self.expires) {
            (Some(max_age), _) => Some(now_millis.saturating_add(max_age.saturating_mul(1000))),
            (None, Some(expires)) => Some(expires.timestamp_millis()),
            (None, None) => None,
        }
    }
}

impl fmt::Display for CookieAssignment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.name, self.value)?;
        if let Some(max_age) = self.max_age {
            write!(f, "; Max-Age={}", max_age)?;
        }
        if let Some(expires) = self.expires {
            write!(f, "; expires={}", format_expires(&expires))?;
        }
        Ok(())
    }
}

fn format_expires(instant: &DateTime<Utc>) -> String {
    instant.format("%a, %d %b %Y %H:%M:%S GMT").to_string()
}

/// Iterate `(name, value)` pairs of a cookie string.
///
/// The value is everything after the first `=`. A segment without `=` yields an
/// empty value.
pub fn cookie_pairs(cookie_string: &str) -> impl Iterator<Item = (&str, &str)> {
    cookie_string
        .split("; ")
        .filter(|segment| !segment.is_empty())
        .map(|segment| segment.split_once('=').unwrap_or((segment, "")))
}

/// Value of the first cookie named exactly `name`.
pub fn find_cookie<'a>(cookie_string: &'a str, name: &str) -> Option<&'a str> {
    cookie_pairs(cookie_string)
        .find(|(n, _)| *n == name)
        .map(|(_, value)| value)
}

/// Every cookie name present, in order, without duplicates.
pub fn cookie_names(cookie_string: &str) -> Vec<&str> {
    let mut names: Vec<&str> = Vec::new();
    for (name, _) in cookie_pairs(cookie_string) {
        let name = name.trim();
        if !name.is_empty() && !names.contains(&name) {
            names.push(name);
        }
    }
    names
}
