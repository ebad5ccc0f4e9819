use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::time::Duration;

use crate::ConfigError;
use crate::params::{ParamMap, ParamValues, to_param_map};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    /// Backend search engine connection
    #[serde(default)]
    pub solr: SolrConfig,
    /// Entitlement service used to derive the caller's access filter
    #[serde(default)]
    pub entitlement: EntitlementConfig,
    /// Suggestion filtering settings
    #[serde(default)]
    pub suggest: SuggestConfig,
    /// Parameters treated as conjunctive (union across default/user/forced)
    #[serde(default = "default_cumulative_params")]
    pub cumulative_params: Vec<String>,
    /// Per-handler default and forced parameters
    #[serde(default)]
    pub handlers: IndexMap<String, HandlerConfig>,
    /// Admission-control policy definition
    #[serde(default)]
    pub policy: PolicySettings,
}

fn default_cumulative_params() -> Vec<String> {
    vec!["fq".into()]
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            logging: LoggingConfig::default(),
            solr: SolrConfig::default(),
            entitlement: EntitlementConfig::default(),
            suggest: SuggestConfig::default(),
            cumulative_params: default_cumulative_params(),
            handlers: IndexMap::new(),
            policy: PolicySettings::default(),
        }
    }
}

impl AppConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.port == 0 {
            return Err(ConfigError::validation("server.port must be > 0"));
        }
        if self.server.read_timeout_ms == 0 {
            return Err(ConfigError::validation("server.read_timeout_ms must be > 0"));
        }
        let lvl = self.logging.level.to_ascii_lowercase();
        let valid_levels = ["trace", "debug", "info", "warn", "error", "off"];
        if !valid_levels.contains(&lvl.as_str()) {
            return Err(ConfigError::validation(format!(
                "logging.level must be one of {valid_levels:?}"
            )));
        }
        if let Err(e) = url::Url::parse(&self.solr.base_url) {
            return Err(ConfigError::validation(format!(
                "solr.base_url '{}' is not a valid URL: {e}",
                self.solr.base_url
            )));
        }
        if self.solr.timeout_ms == 0 {
            return Err(ConfigError::validation("solr.timeout_ms must be > 0"));
        }
        if self.entitlement.enabled && self.entitlement.url.as_deref().unwrap_or("").is_empty() {
            return Err(ConfigError::validation(
                "entitlement.enabled=true requires entitlement.url",
            ));
        }
        if self.suggest.parallelism == 0 {
            return Err(ConfigError::validation("suggest.parallelism must be > 0"));
        }
        if self.suggest.overfetch == 0 {
            return Err(ConfigError::validation("suggest.overfetch must be > 0"));
        }
        if self.policy.max_weight < 0.0 {
            return Err(ConfigError::validation("policy.max_weight must be >= 0"));
        }
        for name in self.handlers.keys() {
            if !self.policy.components.contains_key(name) {
                return Err(ConfigError::validation(format!(
                    "handler '{name}' has no policy component"
                )));
            }
        }
        Ok(())
    }

    pub fn addr(&self) -> SocketAddr {
        use std::net::{IpAddr, Ipv4Addr};
        let host: IpAddr = self
            .server
            .host
            .parse()
            .unwrap_or(IpAddr::V4(Ipv4Addr::new(0, 0, 0, 0)));
        SocketAddr::from((host, self.server.port))
    }

    pub fn handler(&self, name: &str) -> Option<&HandlerConfig> {
        self.handlers.get(name)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_read_timeout_ms")]
    pub read_timeout_ms: u32,
    #[serde(default = "default_body_limit")]
    pub body_limit_bytes: usize,
    /// Header carrying the caller identity forwarded by the fronting proxy
    #[serde(default = "default_user_header")]
    pub user_header: String,
    /// Header carrying comma-separated caller groups
    #[serde(default = "default_groups_header")]
    pub groups_header: String,
}

fn default_host() -> String {
    "0.0.0.0".into()
}
fn default_port() -> u16 {
    8080
}
fn default_read_timeout_ms() -> u32 {
    15_000
}
fn default_body_limit() -> usize {
    1024 * 1024
}
fn default_user_header() -> String {
    "x-solrgate-user".into()
}
fn default_groups_header() -> String {
    "x-solrgate-groups".into()
}

impl ServerConfig {
    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms as u64)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            read_timeout_ms: default_read_timeout_ms(),
            body_limit_bytes: default_body_limit(),
            user_header: default_user_header(),
            groups_header: default_groups_header(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}
fn default_log_level() -> String {
    "info".into()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SolrConfig {
    /// Collection/core URL, e.g. `http://localhost:8983/solr/books`
    #[serde(default = "default_solr_url")]
    pub base_url: String,
    #[serde(default = "default_solr_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_solr_url() -> String {
    "http://localhost:8983/solr/collection1".into()
}
fn default_solr_timeout_ms() -> u64 {
    10_000
}

impl SolrConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl Default for SolrConfig {
    fn default() -> Self {
        Self {
            base_url: default_solr_url(),
            timeout_ms: default_solr_timeout_ms(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntitlementConfig {
    /// When disabled every caller gets an empty access filter
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default = "default_entitlement_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_entitlement_timeout_ms() -> u64 {
    3_000
}

impl EntitlementConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl Default for EntitlementConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            url: None,
            timeout_ms: default_entitlement_timeout_ms(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuggestConfig {
    /// Number of concurrent probe branches
    #[serde(default = "default_parallelism")]
    pub parallelism: usize,
    /// Candidates requested from the suggester per wanted suggestion
    #[serde(default = "default_overfetch")]
    pub overfetch: usize,
    /// Default number of suggestions when the request does not say
    #[serde(default = "default_suggest_count")]
    pub default_count: usize,
    /// Search handler used for existence probes
    #[serde(default = "default_probe_handler")]
    pub probe_handler: String,
    /// Field the suggestion term is matched against when probing
    #[serde(default = "default_title_field")]
    pub title_field: String,
}

fn default_parallelism() -> usize {
    4
}
fn default_overfetch() -> usize {
    3
}
fn default_suggest_count() -> usize {
    10
}
fn default_probe_handler() -> String {
    "select".into()
}
fn default_title_field() -> String {
    "title".into()
}

impl Default for SuggestConfig {
    fn default() -> Self {
        Self {
            parallelism: default_parallelism(),
            overfetch: default_overfetch(),
            default_count: default_suggest_count(),
            probe_handler: default_probe_handler(),
            title_field: default_title_field(),
        }
    }
}

/// Default and forced parameters for one backend handler.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HandlerConfig {
    /// Seed values, replaced by user values
    #[serde(default)]
    pub defaults: IndexMap<String, ParamValues>,
    /// Values applied after user input; appended for cumulative params,
    /// overwriting otherwise
    #[serde(default)]
    pub forced: IndexMap<String, ParamValues>,
}

impl HandlerConfig {
    pub fn default_params(&self) -> ParamMap {
        to_param_map(&self.defaults)
    }

    pub fn forced_params(&self) -> ParamMap {
        to_param_map(&self.forced)
    }
}

/// Raw policy definition. Compiled into an immutable profile by the policy crate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicySettings {
    #[serde(default = "default_max_weight")]
    pub max_weight: f64,
    #[serde(default)]
    pub unlisted_fields: UnlistedSettings,
    #[serde(default)]
    pub unlisted_params: UnlistedSettings,
    #[serde(default)]
    pub fields: Vec<FieldSettings>,
    #[serde(default)]
    pub components: IndexMap<String, ComponentSettings>,
}

fn default_max_weight() -> f64 {
    1000.0
}

impl Default for PolicySettings {
    fn default() -> Self {
        Self {
            max_weight: default_max_weight(),
            unlisted_fields: UnlistedSettings::default(),
            unlisted_params: UnlistedSettings::default(),
            fields: Vec::new(),
            components: IndexMap::new(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UnlistedSettings {
    #[serde(default)]
    pub allowed: bool,
    #[serde(default)]
    pub weight: f64,
}

/// A retrievable field. `name` and `weight` are mandatory; they are optional
/// here so that the policy compiler can report which one is missing.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FieldSettings {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub weight: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentSettings {
    #[serde(default = "default_true")]
    pub default_enabled: bool,
    #[serde(default = "default_true")]
    pub allowed: bool,
    #[serde(default)]
    pub weight_constant: f64,
    #[serde(default)]
    pub params: Vec<ParamSettings>,
}

fn default_true() -> bool {
    true
}

impl Default for ComponentSettings {
    fn default() -> Self {
        Self {
            default_enabled: true,
            allowed: true,
            weight_constant: 0.0,
            params: Vec::new(),
        }
    }
}

/// A declared request parameter. `kind` is one of `string`, `integer`,
/// `boolean` or `fields`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ParamSettings {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    #[serde(default = "default_true")]
    pub allowed: bool,
    #[serde(default)]
    pub weight_constant: f64,
    #[serde(default)]
    pub weight_factor: f64,
    #[serde(default)]
    pub multi_value: bool,
    /// String params: maximum length (or value count when multi-valued)
    #[serde(default)]
    pub max_length: Option<usize>,
    /// Integer params: maximum accepted value
    #[serde(default)]
    pub max_value: Option<i64>,
    /// Fields params: allow-list of field names
    #[serde(default)]
    pub allowed_fields: Option<Vec<String>>,
    /// Fields params: deny-list of field names
    #[serde(default)]
    pub denied_fields: Vec<String>,
    /// Fields params: whether `*` may be requested
    #[serde(default)]
    pub supports_star: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::ParamValue;

    fn valid() -> AppConfig {
        let mut cfg = AppConfig::default();
        cfg.handlers.insert("select".into(), HandlerConfig::default());
        cfg.policy
            .components
            .insert("select".into(), ComponentSettings::default());
        cfg
    }

    #[test]
    fn test_defaults_validate() {
        assert!(valid().validate().is_ok());
        let cfg = AppConfig::default();
        assert_eq!(cfg.cumulative_params, vec!["fq".to_string()]);
    }

    #[test]
    fn test_handler_without_component_rejected() {
        let mut cfg = valid();
        cfg.handlers.insert("suggest".into(), HandlerConfig::default());
        let err = cfg.validate().unwrap_err();
        assert!(err.to_string().contains("suggest"));
    }

    #[test]
    fn test_entitlement_requires_url() {
        let mut cfg = valid();
        cfg.entitlement.enabled = true;
        assert!(cfg.validate().is_err());
        cfg.entitlement.url = Some("http://localhost:9000/filter".into());
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn test_invalid_log_level() {
        let mut cfg = valid();
        cfg.logging.level = "loud".into();
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_handler_params_render() {
        let mut handler = HandlerConfig::default();
        handler
            .defaults
            .insert("rows".into(), ParamValues::One(ParamValue::Integer(10)));
        handler.forced.insert(
            "fq".into(),
            ParamValues::Many(vec![ParamValue::Text("public:true".into())]),
        );
        assert_eq!(handler.default_params()["rows"], vec!["10"]);
        assert_eq!(handler.forced_params()["fq"], vec!["public:true"]);
    }
}
