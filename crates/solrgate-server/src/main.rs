use std::env;

use solrgate_config::loader::{DEFAULT_CONFIG_PATH, load_config};
use solrgate_server::{Runtime, ServerBuilder, spawn_config_reloader};

/// How the configuration path was determined.
#[derive(Debug, Clone, Copy)]
enum ConfigSource {
    /// From --config CLI argument
    CliArgument,
    /// From SOLRGATE_CONFIG environment variable
    EnvironmentVariable,
    /// Default path (solrgate.toml)
    Default,
}

impl std::fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::CliArgument => write!(f, "CLI argument (--config)"),
            Self::EnvironmentVariable => write!(f, "environment variable (SOLRGATE_CONFIG)"),
            Self::Default => write!(f, "default"),
        }
    }
}

#[tokio::main]
async fn main() {
    // .env is optional
    if let Err(e) = dotenvy::dotenv()
        && !matches!(e, dotenvy::Error::Io(ref io_err) if io_err.kind() == std::io::ErrorKind::NotFound)
    {
        eprintln!("Warning: Failed to load .env file: {e}");
    }

    solrgate_server::init_tracing();

    let (config_path, source) = resolve_config_path();

    let cfg = match load_config(Some(&config_path)) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Configuration error: {e}");
            std::process::exit(2);
        }
    };

    tracing::info!(
        path = %config_path,
        source = %source,
        "Configuration loaded"
    );

    solrgate_server::apply_logging_level(&cfg.logging.level);

    let runtime = match Runtime::from_config(cfg) {
        Ok(r) => r,
        Err(e) => {
            eprintln!("Server initialization failed: {e}");
            std::process::exit(2);
        }
    };

    let (server, state) = ServerBuilder::new(runtime).build();

    let watcher = match spawn_config_reloader(state, &config_path) {
        Ok(handle) => {
            tracing::info!("Hot-reload enabled");
            Some(handle)
        }
        Err(e) => {
            tracing::warn!(error = %e, "Config watcher unavailable, hot-reload disabled");
            None
        }
    };

    if let Err(err) = server.run().await {
        eprintln!("Server error: {err}");
    }

    if let Some(handle) = watcher {
        handle.stop().await;
    }
}

/// Resolve the configuration file path.
///
/// Priority order:
/// 1. CLI argument: --config <path>
/// 2. Environment variable: SOLRGATE_CONFIG
/// 3. Default: solrgate.toml
fn resolve_config_path() -> (String, ConfigSource) {
    let mut args = env::args().skip(1);
    while let Some(arg) = args.next() {
        if arg == "--config"
            && let Some(path) = args.next()
        {
            return (path, ConfigSource::CliArgument);
        }
    }

    if let Ok(path) = env::var("SOLRGATE_CONFIG")
        && !path.is_empty()
    {
        return (path, ConfigSource::EnvironmentVariable);
    }

    (DEFAULT_CONFIG_PATH.to_string(), ConfigSource::Default)
}
