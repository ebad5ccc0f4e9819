//! Configuration for the solrgate search gateway.
//!
//! This crate owns everything the gateway reads from `solrgate.toml`:
//! - Server, logging and backend connection settings
//! - Per-handler default and forced parameter maps
//! - The admission-control policy definition (fields, components, params)
//!
//! Configuration is loaded from a TOML file with `SOLRGATE__*` environment
//! overrides and can be watched for changes so the server can rebuild its
//! runtime state without a restart.
//!
//! # Example
//!
//! ```ignore
//! use solrgate_config::loader::load_config;
//!
//! let cfg = load_config(Some("solrgate.toml"))?;
//! let select = cfg.handler("select").expect("handler configured");
//! let defaults = select.default_params();
//! ```

pub mod loader;
pub mod params;
pub mod types;
pub mod watcher;

pub use params::{ParamMap, ParamValue, ParamValues};
pub use types::{
    AppConfig, ComponentSettings, EntitlementConfig, FieldSettings, HandlerConfig, LoggingConfig,
    ParamSettings, PolicySettings, ServerConfig, SolrConfig, SuggestConfig, UnlistedSettings,
};
pub use watcher::{FileWatcher, FileWatcherConfig, ReloadEvent, WatchHandle};

/// Error types for configuration operations
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Watcher error: {0}")]
    Watcher(String),
}

impl ConfigError {
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse(msg.into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn watcher(msg: impl Into<String>) -> Self {
        Self::Watcher(msg.into())
    }
}

/// Result type for configuration operations
pub type Result<T> = std::result::Result<T, ConfigError>;
