//! Logging bootstrap: a layered `tracing_subscriber::Registry` with the
//! single `fmt` + `EnvFilter` layer this single-purpose producer needs.

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Registry};

/// Installs the global `tracing` subscriber. Idempotent only in the sense
/// that calling it twice in one process panics (matching
/// `tracing::subscriber::set_global_default`'s contract) — callers should
/// invoke this exactly once, at process start.
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let fmt_layer = tracing_subscriber::fmt::layer();

    Registry::default()
        .with(filter)
        .with(fmt_layer)
        .try_init()
        .unwrap_or_else(|e| eprintln!("tracing subscriber already initialized: {e}"));
}
