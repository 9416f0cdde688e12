//! Log subscriber setup
//!
//! Library code only emits `tracing` events; binaries and tests that want to
//! see them call [`init`] or [`init_json`] once at startup.

use tracing_subscriber::EnvFilter;

/// Filter used when `RUST_LOG` is unset.
pub const DEFAULT_FILTER: &str = "igsession=info";

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}

/// Installs a compact stderr subscriber. Returns `false` if a global
/// subscriber was already set.
pub fn init() -> bool {
    tracing_subscriber::fmt()
        .with_env_filter(env_filter())
        .with_writer(std::io::stderr)
        .with_target(true)
        .compact()
        .try_init()
        .is_ok()
}

/// Installs a JSON subscriber for log shipping. Returns `false` if a global
/// subscriber was already set.
pub fn init_json() -> bool {
    tracing_subscriber::fmt()
        .with_env_filter(env_filter())
        .with_writer(std::io::stderr)
        .json()
        .try_init()
        .is_ok()
}
