//! Derived key rule shared by item storage and cookies.

/// Build the backend key for `key` under `prefix`.
///
/// The result is `uppercase(prefix + key)`, so keys that differ only in case
/// map to the same backend slot.
pub fn derive_key(prefix: &str, key: &str) -> String {
    let mut derived = String::with_capacity(prefix.len() + key.len());
    derived.push_str(prefix);
    derived.push_str(key);
    derived.to_uppercase()
}

/// Uppercased prefix, used to recognise keys owned by one store.
pub fn derived_prefix(prefix: &str) -> String {
    prefix.to_uppercase()
}
