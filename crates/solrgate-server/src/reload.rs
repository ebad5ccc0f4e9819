//! Configuration hot reload.
//!
//! A change to the configuration file rebuilds the whole [`Runtime`]. If the
//! new file fails to load or compile, the error is logged and the running
//! runtime stays in place.

use std::path::{Path, PathBuf};

use solrgate_config::{ConfigError, FileWatcher, WatchHandle, loader::load_config_with_default_path};
use tokio::sync::mpsc;
use tracing::{error, info};

use crate::observability::apply_logging_level;
use crate::state::{AppState, Runtime, RuntimeError};

/// Load `path`, compile it and swap it into `state`.
pub fn reload_runtime(state: &AppState, path: &Path) -> Result<(), RuntimeError> {
    let config = load_config_with_default_path(Some(path))?;
    let level = config.logging.level.clone();
    let runtime = Runtime::from_config(config)?;
    apply_logging_level(&level);
    state.replace(runtime);
    Ok(())
}

/// Watch `path` and reload `state` whenever the file changes.
///
/// Entitlement overrides installed with [`Runtime::with_entitlement`] are not
/// carried over; the reloaded runtime uses whatever the file configures.
pub fn spawn_config_reloader(
    state: AppState,
    path: impl Into<PathBuf>,
) -> Result<WatchHandle, ConfigError> {
    let path = path.into();
    let (tx, mut rx) = mpsc::channel(8);
    let handle = FileWatcher::from_path(path.clone()).watch(tx)?;

    tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            match reload_runtime(&state, &path) {
                Ok(()) => info!(path = %event.path.display(), "Configuration reloaded"),
                Err(e) => error!(
                    path = %event.path.display(),
                    error = %e,
                    "Configuration reload failed, keeping previous configuration"
                ),
            }
        }
    });

    Ok(handle)
}
