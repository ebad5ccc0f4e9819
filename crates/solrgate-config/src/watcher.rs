//! File watcher for configuration hot reload.
//!
//! Watches the configuration file's directory and emits a [`ReloadEvent`]
//! whenever the file itself changes. Consumers re-run the loader and swap
//! their runtime state; this module never parses the file.

use notify::RecursiveMode;
use notify_debouncer_mini::new_debouncer;
use std::path::PathBuf;
use std::time::{Duration, SystemTime};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::ConfigError;

/// Configuration for file watcher
#[derive(Debug, Clone)]
pub struct FileWatcherConfig {
    /// Path to the configuration file
    pub path: PathBuf,
    /// Debounce duration for rapid changes
    pub debounce: Duration,
}

impl Default for FileWatcherConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from(crate::loader::DEFAULT_CONFIG_PATH),
            debounce: Duration::from_millis(500),
        }
    }
}

impl FileWatcherConfig {
    /// Create config for a specific path
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            ..Default::default()
        }
    }

    /// Set debounce duration
    pub fn with_debounce(mut self, debounce: Duration) -> Self {
        self.debounce = debounce;
        self
    }
}

/// Emitted when the watched configuration file changed on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReloadEvent {
    pub path: PathBuf,
    pub detected_at: SystemTime,
}

/// Handle for a running watcher
pub struct WatchHandle {
    handle: tokio::task::JoinHandle<()>,
    shutdown: tokio::sync::oneshot::Sender<()>,
}

impl WatchHandle {
    /// Stop the watcher
    pub async fn stop(self) {
        let _ = self.shutdown.send(());
        let _ = self.handle.await;
    }
}

/// Watches a single configuration file.
pub struct FileWatcher {
    config: FileWatcherConfig,
}

impl FileWatcher {
    pub fn new(config: FileWatcherConfig) -> Self {
        Self { config }
    }

    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        Self::new(FileWatcherConfig::new(path))
    }

    pub fn path(&self) -> &PathBuf {
        &self.config.path
    }

    /// Start watching. Events are delivered on `tx` until the handle is stopped
    /// or the receiver is dropped.
    pub fn watch(&self, tx: mpsc::Sender<ReloadEvent>) -> Result<WatchHandle, ConfigError> {
        let path = self.config.path.clone();
        if !path.exists() {
            return Err(ConfigError::watcher(format!(
                "config file {} does not exist",
                path.display()
            )));
        }
        let debounce = self.config.debounce;

        // Editors often replace the file, so watch the parent directory
        let watch_path = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .map(|p| p.to_path_buf())
            .unwrap_or_else(|| PathBuf::from("."));

        let (shutdown_tx, mut shutdown_rx) = tokio::sync::oneshot::channel();

        let handle = tokio::spawn(async move {
            let (notify_tx, notify_rx) = std::sync::mpsc::channel();

            let mut debouncer = match new_debouncer(debounce, notify_tx) {
                Ok(d) => d,
                Err(e) => {
                    error!("Failed to create file watcher: {e}");
                    return;
                }
            };

            if let Err(e) = debouncer
                .watcher()
                .watch(&watch_path, RecursiveMode::NonRecursive)
            {
                error!("Failed to watch path {:?}: {e}", watch_path);
                return;
            }

            info!("Started watching config file: {:?}", path);

            loop {
                tokio::select! {
                    _ = &mut shutdown_rx => {
                        info!("Config watcher shutting down");
                        break;
                    }
                    _ = tokio::time::sleep(Duration::from_millis(100)) => {
                        while let Ok(events) = notify_rx.try_recv() {
                            let events = match events {
                                Ok(events) => events,
                                Err(e) => {
                                    error!("File watcher error: {:?}", e);
                                    continue;
                                }
                            };
                            let touched = events
                                .iter()
                                .any(|event| event.path.file_name() == path.file_name());
                            if !touched {
                                continue;
                            }
                            debug!("Config file changed: {:?}", path);
                            let event = ReloadEvent {
                                path: path.clone(),
                                detected_at: SystemTime::now(),
                            };
                            if tx.send(event).await.is_err() {
                                warn!("Config reload receiver dropped");
                                return;
                            }
                        }
                    }
                }
            }
        });

        Ok(WatchHandle {
            handle,
            shutdown: shutdown_tx,
        })
    }
}
