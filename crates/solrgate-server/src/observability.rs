//! Logging setup. The level filter sits behind a reload layer so a config
//! reload can change `logging.level` without restarting.

use std::sync::OnceLock;

use tracing_subscriber::{EnvFilter, Registry, fmt, prelude::*, reload};

type FilterHandle = reload::Handle<EnvFilter, Registry>;

static FILTER_HANDLE: OnceLock<FilterHandle> = OnceLock::new();

/// Install the global subscriber at `info`, or at `RUST_LOG` when set.
pub fn init_tracing() {
    init_tracing_with_level("info");
}

pub fn init_tracing_with_level(level: &str) {
    let filter = if std::env::var_os("RUST_LOG").is_some() {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level))
    } else {
        EnvFilter::new(level)
    };

    let (filter_layer, handle) = reload::Layer::new(filter);
    let _ = FILTER_HANDLE.set(handle);

    let _ = tracing_subscriber::registry()
        .with(filter_layer)
        .with(fmt::layer())
        .try_init();
}

/// Switch the active level. No-op when `RUST_LOG` pins the filter or the
/// subscriber was installed elsewhere.
pub fn apply_logging_level(level: &str) {
    if std::env::var_os("RUST_LOG").is_some() {
        return;
    }
    let Some(handle) = FILTER_HANDLE.get() else {
        return;
    };
    if let Err(e) = handle.reload(EnvFilter::new(level)) {
        tracing::warn!(error = %e, level, "Failed to apply logging level");
    }
}
