//! Lightweight tracing setup for shoplink binaries.

use anyhow::Result;
use tracing_subscriber::{EnvFilter, fmt};

/// Installs the global fmt subscriber configured from `RUST_LOG`, defaulting
/// to `info` when unset. Call once per process, before any spans are opened.
pub fn install(service_name: &str) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init()
        .map_err(|err| anyhow::anyhow!("install tracing subscriber: {err}"))?;
    tracing::info!(service = service_name, "telemetry installed");
    Ok(())
}

/// Test variant: installing twice is fine, failures are ignored.
pub fn install_for_tests() {
    let _ = fmt()
        .with_env_filter(EnvFilter::new("debug"))
        .with_test_writer()
        .try_init();
}
