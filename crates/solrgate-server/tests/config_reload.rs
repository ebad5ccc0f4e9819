//! Runtime reload from a configuration file on disk.

use std::io::Write;

use solrgate_config::loader::load_config;
use solrgate_server::{AppState, Runtime, RuntimeError, reload_runtime};
use tempfile::NamedTempFile;

fn config_file(max_weight: f64) -> NamedTempFile {
    let mut file = tempfile::Builder::new()
        .suffix(".toml")
        .tempfile()
        .unwrap();
    write!(
        file,
        r#"
[policy]
max_weight = {max_weight}

[policy.components.select]
weight_constant = 1.0
"#
    )
    .unwrap();
    file
}

fn state_from(file: &NamedTempFile) -> AppState {
    let config = load_config(file.path().to_str()).unwrap();
    AppState::new(Runtime::from_config(config).unwrap())
}

#[test]
fn reload_swaps_in_new_policy() {
    let file = config_file(50.0);
    let state = state_from(&file);
    let before = state.runtime();

    let updated = config_file(75.0);
    reload_runtime(&state, updated.path()).unwrap();

    assert_eq!(before.evaluator().profile().max_weight, 50.0);
    assert_eq!(state.runtime().evaluator().profile().max_weight, 75.0);
}

#[test]
fn invalid_reload_keeps_previous_runtime() {
    let file = config_file(50.0);
    let state = state_from(&file);

    let mut broken = tempfile::Builder::new()
        .suffix(".toml")
        .tempfile()
        .unwrap();
    write!(
        broken,
        r#"
[[policy.fields]]
weight = 3.0

[policy.components.select]
"#
    )
    .unwrap();

    let err = reload_runtime(&state, broken.path()).unwrap_err();
    assert!(matches!(err, RuntimeError::Policy(_)), "unexpected {err:?}");
    assert_eq!(state.runtime().evaluator().profile().max_weight, 50.0);
}

#[test]
fn missing_file_is_reported() {
    let file = config_file(50.0);
    let state = state_from(&file);
    let missing = file.path().with_extension("missing.toml");

    let err = reload_runtime(&state, &missing).unwrap_err();
    assert!(matches!(err, RuntimeError::Config(_)));
    assert_eq!(state.runtime().evaluator().profile().max_weight, 50.0);
}

#[test]
fn shipped_config_configures_every_component() {
    let path = concat!(env!("CARGO_MANIFEST_DIR"), "/../../solrgate.toml");
    let config = load_config(Some(path)).unwrap();
    for name in config.policy.components.keys() {
        assert!(config.handler(name).is_some(), "no handler section for '{name}'");
    }
    assert_eq!(
        config.handler("suggest").unwrap().default_params()["suggest"],
        vec!["true"]
    );
    assert!(Runtime::from_config(config).is_ok());
}
