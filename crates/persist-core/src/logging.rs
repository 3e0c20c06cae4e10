//! Logging setup for native consumers.
//!
//! Library code only emits `tracing` events. Binaries and tests that want to
//! see them call [`init`] once; browser builds use the console writer in
//! `persist-wasm` instead.

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Initialize tracing with the default `info` filter.
///
/// Sets up tracing-subscriber with:
/// - Environment filter (RUST_LOG)
/// - Compact format suitable for terminal output
pub fn init() {
    init_with_filter("info");
}

/// Initialize tracing with a custom default filter.
///
/// Does nothing if a global subscriber is already installed.
pub fn init_with_filter(default_filter: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact())
        .try_init();
}

/// Segment prefixes used in log messages.
pub mod prefix {
    /// Key/value storage and cookies
    pub const KV: &str = "⊔";
    /// Record database open/upgrade sequence
    pub const DB_OPEN: &str = "✿";
    /// Record database shutdown
    pub const DB_CLOSE: &str = "❀";
}
