//! Tracing subscriber setup for embedding binaries and tests

use tracing_subscriber::EnvFilter;

/// Initialize the global tracing subscriber
///
/// Filter defaults to `info` and can be overridden via `RUST_LOG`. Safe to
/// call more than once; later calls are no-ops (tests share one process).
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init()
        .ok();
}
