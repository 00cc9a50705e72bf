// Copyright 2024-2026 website-operator Contributors
// SPDX-License-Identifier: Apache-2.0

//! Tests for configuration loading.

use std::collections::HashMap;
use std::io::Write;

use tempfile::NamedTempFile;

use super::*;

fn env_of(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let map: HashMap<String, String> = pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    move |name| map.get(name).cloned()
}

fn no_env(_: &str) -> Option<String> {
    None
}

fn config_file(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file
}

#[test]
fn test_defaults_are_valid() {
    let config = OperatorConfig::load_from(None, no_env).unwrap();
    assert_eq!(config, OperatorConfig::default());
    assert_eq!(config.watch.resource_kind().unwrap(), ResourceKind::Pod);
    assert_eq!(config.log.format, LogFormat::Text);
    assert!(config.seed_path.is_none());
}

#[test]
fn test_partial_file_keeps_defaults() {
    let file = config_file(
        r#"
seed_path = "objects.json"

[controller]
workers = 8

[watch]
kind = "deployments"
namespace = "web"
output = "json"
"#,
    );

    let config = OperatorConfig::load_from(Some(file.path()), no_env).unwrap();
    assert_eq!(config.controller.workers, 8);
    assert_eq!(config.controller.queue_capacity, 1024);
    assert_eq!(config.watch.resource_kind().unwrap(), ResourceKind::Deployment);
    assert_eq!(config.watch.namespace.as_deref(), Some("web"));
    assert_eq!(config.watch.output, WatchOutput::Json);
    assert_eq!(config.seed_path, Some(PathBuf::from("objects.json")));
}

#[test]
fn test_env_overrides_file() {
    let file = config_file("[controller]\nworkers = 8\n");
    let env = env_of(&[
        (WORKERS_ENV, "3"),
        (WATCH_KIND_ENV, "Service"),
        (WATCH_NAMESPACE_ENV, "shop"),
        (LOG_FORMAT_ENV, "JSON"),
        (SEED_ENV, "/etc/operator/seed.json"),
    ]);

    let config = OperatorConfig::load_from(Some(file.path()), env).unwrap();
    assert_eq!(config.controller.workers, 3);
    assert_eq!(config.watch.kind, "Service");
    assert_eq!(config.watch.namespace.as_deref(), Some("shop"));
    assert_eq!(config.log.format, LogFormat::Json);
    assert_eq!(
        config.seed_path,
        Some(PathBuf::from("/etc/operator/seed.json"))
    );
}

#[test]
fn test_empty_namespace_env_clears_namespace() {
    let file = config_file("[watch]\nnamespace = \"web\"\n");
    let env = env_of(&[(WATCH_NAMESPACE_ENV, "")]);
    let config = OperatorConfig::load_from(Some(file.path()), env).unwrap();
    assert!(config.watch.namespace.is_none());
}

#[test]
fn test_bad_env_value_rejected() {
    let err = OperatorConfig::load_from(None, env_of(&[(WORKERS_ENV, "many")])).unwrap_err();
    assert!(matches!(err, ConfigError::InvalidEnv { name: WORKERS_ENV, .. }));

    let err = OperatorConfig::load_from(None, env_of(&[(LOG_FORMAT_ENV, "xml")])).unwrap_err();
    assert!(matches!(err, ConfigError::InvalidEnv { .. }));
}

#[test]
fn test_validation_failures() {
    let mut config = OperatorConfig::default();
    config.controller.queue_capacity = 0;
    assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));

    let mut config = OperatorConfig::default();
    config.controller.backoff_base_ms = 10_000;
    config.controller.backoff_max_ms = 100;
    assert!(config.validate().is_err());

    let mut config = OperatorConfig::default();
    config.watch.kind = "Gateway".to_string();
    assert!(config.validate().is_err());
}

#[test]
fn test_missing_and_malformed_files() {
    let err = OperatorConfig::load_from(Some(Path::new("/nonexistent/operator.toml")), no_env)
        .unwrap_err();
    assert!(matches!(err, ConfigError::Read { .. }));

    let file = config_file("[controller\nworkers = ");
    let err = OperatorConfig::load_from(Some(file.path()), no_env).unwrap_err();
    assert!(matches!(err, ConfigError::Parse { .. }));
}

#[test]
fn test_rendered_config_loads_back() {
    let mut config = OperatorConfig::default();
    config.watch.namespace = Some("web".to_string());
    config.seed_path = Some(PathBuf::from("seed.json"));

    let rendered = config.to_toml_string().unwrap();
    let file = config_file(&rendered);
    assert_eq!(OperatorConfig::from_file(file.path()).unwrap(), config);
}

#[test]
fn test_worker_count_zero_uses_cpus() {
    let config = ControllerConfig {
        workers: 0,
        ..Default::default()
    };
    assert!(config.worker_count() >= 1);
    assert_eq!(
        ControllerConfig {
            workers: 3,
            ..Default::default()
        }
        .worker_count(),
        3
    );
}
