//! Structured logging setup.

use tracing_subscriber::EnvFilter;

/// Initialize the global tracing subscriber.
///
/// The log level is controlled via `RUST_LOG` (e.g. `RUST_LOG=debug`) and
/// defaults to `info` so the connection banner and per-round progress are
/// visible without configuration.
pub fn init() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .init();
}
