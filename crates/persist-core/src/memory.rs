//! In-memory backends
//!
//! Map-backed stand-ins for Web Storage and `document.cookie`, for native
//! consumers, development and tests. Nothing here survives the process.

use std::collections::BTreeMap;
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};

use crate::backend::{CookieBackend, KeyValueBackend};
use crate::clock::{Clock, SystemClock};
use crate::cookie::CookieAssignment;
use crate::error::StoreResult;

/// In-memory key/value backend.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    items: RwLock<BTreeMap<String, String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.items.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.read().is_empty()
    }
}

impl KeyValueBackend for MemoryStorage {
    fn get_item(&self, key: &str) -> StoreResult<Option<String>> {
        Ok(self.items.read().get(key).cloned())
    }

    fn set_item(&self, key: &str, value: &str) -> StoreResult<()> {
        self.items.write().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove_item(&self, key: &str) -> StoreResult<()> {
        self.items.write().remove(key);
        Ok(())
    }

    fn clear(&self) -> StoreResult<()> {
        self.items.write().clear();
        Ok(())
    }

    fn keys(&self) -> StoreResult<Vec<String>> {
        Ok(self.items.read().keys().cloned().collect())
    }
}

#[derive(Debug, Clone)]
struct StoredCookie {
    name: String,
    value: String,
    expires_at: Option<i64>,
}

/// In-memory emulation of the document cookie property.
///
/// Writes replace a cookie of the same name, or delete it when the assignment
/// is already expired. Reads skip cookies whose expiry has passed.
pub struct MemoryCookieJar {
    cookies: Mutex<Vec<StoredCookie>>,
    clock: Arc<dyn Clock>,
}

impl MemoryCookieJar {
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            cookies: Mutex::new(Vec::new()),
            clock,
        }
    }
}

impl Default for MemoryCookieJar {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for MemoryCookieJar {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryCookieJar")
            .field("cookies", &self.cookies.lock().len())
            .finish()
    }
}

impl CookieBackend for MemoryCookieJar {
    fn cookie_string(&self) -> StoreResult<String> {
        let now = self.clock.now_millis();
        let cookies = self.cookies.lock();
        let live: Vec<String> = cookies
            .iter()
            .filter(|c| c.expires_at.map_or(true, |at| at > now))
            .map(|c| format!("{}={}", c.name, c.value))
            .collect();
        Ok(live.join("; "))
    }

    fn write_cookie(&self, assignment: &str) -> StoreResult<()> {
        // Browsers silently ignore malformed assignments.
        let Some(parsed) = CookieAssignment::parse(assignment) else {
            return Ok(());
        };

        let now = self.clock.now_millis();
        let expires_at = parsed.expires_at_millis(now);
        let mut cookies = self.cookies.lock();
        let existing = cookies.iter().position(|c| c.name == parsed.name);

        if expires_at.is_some_and(|at| at <= now) {
            if let Some(index) = existing {
                cookies.remove(index);
            }
            return Ok(());
        }

        let cookie = StoredCookie {
            name: parsed.name,
            value: parsed.value,
            expires_at,
        };
        match existing {
            Some(index) => cookies[index] = cookie,
            None => cookies.push(cookie),
        }
        Ok(())
    }
}
