//! Tracing initialization helpers.
//!
//! The engine logs through `tracing` throughout; this module wires up a
//! sensible subscriber for binaries and tests that do not install their
//! own. Library code never initializes tracing implicitly.

use tracing_error::ErrorLayer;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

/// Install the default subscriber: env-filtered fmt output plus span-trace
/// capture for error reports.
///
/// Respects `RUST_LOG`; defaults to `info` when unset. Safe to call more
/// than once — later calls are no-ops.
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer())
        .with(ErrorLayer::default())
        .try_init();
}
