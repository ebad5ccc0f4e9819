use std::io::Write;

use solrgate_config::ConfigError;
use solrgate_config::loader::load_config_with_default_path;

fn write_config(contents: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::Builder::new()
        .suffix(".toml")
        .tempfile()
        .expect("create temp config");
    file.write_all(contents.as_bytes()).expect("write config");
    file
}

#[test]
fn loads_handlers_and_policy_from_file() {
    let file = write_config(
        r#"
[server]
port = 9191

[entitlement]
enabled = true
url = "http://entitlements.local/filter"

[handlers.suggest.defaults]
"suggest.dictionary" = "titles"

[policy.components.suggest]
default_enabled = false

[[policy.components.suggest.params]]
name = "q"
type = "string"
weight_factor = 0.1
max_length = 100
"#,
    );

    let cfg = load_config_with_default_path(Some(file.path())).expect("valid config");
    assert_eq!(cfg.server.port, 9191);
    assert!(cfg.entitlement.enabled);
    assert_eq!(
        cfg.handler("suggest").unwrap().default_params()["suggest.dictionary"],
        vec!["titles"]
    );
    let component = &cfg.policy.components["suggest"];
    assert!(!component.default_enabled);
    assert!(component.allowed);
    assert_eq!(component.params[0].max_length, Some(100));
}

#[test]
fn rejects_handler_without_component() {
    let file = write_config(
        r#"
[handlers.select.defaults]
rows = 10
"#,
    );

    let err = load_config_with_default_path(Some(file.path())).unwrap_err();
    assert!(matches!(err, ConfigError::Validation(msg) if msg.contains("select")));
}

#[test]
fn rejects_malformed_toml() {
    let file = write_config("[server\nport = 1");
    let err = load_config_with_default_path(Some(file.path())).unwrap_err();
    assert!(matches!(err, ConfigError::Parse(_)));
}
