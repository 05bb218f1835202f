//! Helper utilities for blobfs testing

use tracing_subscriber::EnvFilter;

/// Installs a test-friendly tracing subscriber
///
/// Honors `RUST_LOG`, defaults to `debug`. Safe to call from every test; only
/// the first call installs anything.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_test_writer()
        .try_init();
}
