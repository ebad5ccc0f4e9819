//! Configuration loading: TOML file plus `SOLRGATE__*` environment overrides.

use config::{Config, Environment, File, FileFormat};
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::ConfigError;
use crate::types::AppConfig;

/// Default configuration file looked up when no path is given.
pub const DEFAULT_CONFIG_PATH: &str = "solrgate.toml";

/// Environment variable prefix, e.g. `SOLRGATE__SOLR__BASE_URL`.
pub const ENV_PREFIX: &str = "SOLRGATE";

pub fn load_config(path: Option<&str>) -> Result<AppConfig, ConfigError> {
    let mut builder = Config::builder();
    let pathbuf = PathBuf::from(path.unwrap_or(DEFAULT_CONFIG_PATH));
    if pathbuf.exists() {
        debug!(path = %pathbuf.display(), "Reading configuration file");
        builder = builder.add_source(File::from(pathbuf).format(FileFormat::Toml));
    } else if path.is_some() {
        return Err(ConfigError::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("config file {} does not exist", pathbuf.display()),
        )));
    }
    builder = builder.add_source(
        Environment::with_prefix(ENV_PREFIX)
            .try_parsing(true)
            .separator("__"),
    );
    let cfg = builder
        .build()
        .map_err(|e| ConfigError::parse(format!("config build error: {e}")))?;
    let merged: AppConfig = cfg
        .try_deserialize()
        .map_err(|e| ConfigError::parse(format!("config deserialize error: {e}")))?;
    merged.validate()?;
    Ok(merged)
}

/// Parse configuration from a TOML string without consulting the environment.
pub fn load_config_from_str(toml: &str) -> Result<AppConfig, ConfigError> {
    let cfg = Config::builder()
        .add_source(File::from_str(toml, FileFormat::Toml))
        .build()
        .map_err(|e| ConfigError::parse(format!("config build error: {e}")))?;
    let parsed: AppConfig = cfg
        .try_deserialize()
        .map_err(|e| ConfigError::parse(format!("config deserialize error: {e}")))?;
    parsed.validate()?;
    Ok(parsed)
}

pub fn load_config_with_default_path<P: AsRef<Path>>(
    path: Option<P>,
) -> Result<AppConfig, ConfigError> {
    let p = path
        .as_ref()
        .map(|p| p.as_ref().to_string_lossy().to_string());
    load_config(p.as_deref())
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
cumulative_params = ["fq", "bq"]

[solr]
base_url = "http://solr:8983/solr/books"

[suggest]
parallelism = 8

[handlers.select.defaults]
rows = 10
fq = ["public:true"]
"hl.fl" = "title"

[handlers.select.forced]
wt = "json"

[policy]
max_weight = 250.0

[policy.unlisted_params]
allowed = true
weight = 2.5

[[policy.fields]]
name = "title"
weight = 1.0

[policy.components.select]
weight_constant = 5.0

[[policy.components.select.params]]
name = "rows"
type = "integer"
weight_factor = 0.5
max_value = 500
"#;

    #[test]
    fn test_load_from_str() {
        let cfg = load_config_from_str(SAMPLE).unwrap();
        assert_eq!(cfg.solr.base_url, "http://solr:8983/solr/books");
        assert_eq!(cfg.suggest.parallelism, 8);
        assert_eq!(cfg.cumulative_params, vec!["fq", "bq"]);

        let select = cfg.handler("select").unwrap();
        let defaults = select.default_params();
        assert_eq!(defaults["rows"], vec!["10"]);
        assert_eq!(defaults["fq"], vec!["public:true"]);
        assert_eq!(defaults["hl.fl"], vec!["title"]);
        assert_eq!(select.forced_params()["wt"], vec!["json"]);

        assert_eq!(cfg.policy.max_weight, 250.0);
        assert!(cfg.policy.unlisted_params.allowed);
        assert_eq!(cfg.policy.fields[0].name.as_deref(), Some("title"));
        let component = &cfg.policy.components["select"];
        assert_eq!(component.params[0].kind.as_deref(), Some("integer"));
        assert_eq!(component.params[0].max_value, Some(500));
    }

    #[test]
    fn test_handler_params_keep_file_order() {
        let cfg = load_config_from_str(
            r#"
[handlers.select.defaults]
rows = 10
"hl.fl" = "title"
echoParams = "explicit"
sort = "score desc"

[policy.components.select]
"#,
        )
        .unwrap();
        let defaults = cfg.handler("select").unwrap().default_params();
        let keys: Vec<&str> = defaults.keys().map(String::as_str).collect();
        assert_eq!(keys, ["rows", "hl.fl", "echoParams", "sort"]);
    }

    #[test]
    fn test_missing_explicit_file_is_error() {
        let err = load_config(Some("/nonexistent/solrgate.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }

    #[test]
    fn test_invalid_config_rejected() {
        let err = load_config_from_str("[server]\nport = 0\n").unwrap_err();
        assert!(matches!(err, ConfigError::Validation(_)));
    }
}
