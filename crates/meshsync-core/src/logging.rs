//! Tracing subscriber setup for embedding applications and examples.

use tracing_subscriber::{fmt, EnvFilter};

/// Default filter when `RUST_LOG` is unset.
pub const DEFAULT_FILTER: &str = "info,meshsync_core=info";

/// Install a global fmt subscriber filtered by `RUST_LOG`.
///
/// Returns `false` when a global subscriber was already set (tests, or an
/// embedding app that configured its own), which is not an error.
pub fn init_tracing() -> bool {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    let subscriber = fmt().with_env_filter(filter).with_target(true).finish();

    match tracing::subscriber::set_global_default(subscriber) {
        Ok(()) => {
            tracing::debug!("[Logging] tracing initialized");
            true
        }
        Err(_) => false,
    }
}
