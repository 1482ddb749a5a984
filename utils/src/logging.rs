//! Structured logging initialization via `tracing`.

use tracing_subscriber::EnvFilter;

/// Initialize a plain `fmt` subscriber at `info`, overridable via `RUST_LOG`.
///
/// A second call is a no-op, so tests and binaries can both call it.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}
