// Copyright 2024-2026 website-operator Contributors
// SPDX-License-Identifier: Apache-2.0

//! Operator configuration.
//!
//! Loaded in this order, later sources overriding earlier ones:
//! 1. Built-in defaults
//! 2. TOML file named by `WEBSITE_OPERATOR_CONFIG`
//! 3. `WEBSITE_OPERATOR_*` environment variables
//!
//! ```toml
//! seed_path = "seed.json"
//!
//! [controller]
//! workers = 4
//! requeue_delay_ms = 0
//!
//! [watch]
//! kind = "Pod"
//! namespace = "default"
//! output = "text"
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::k8s::ResourceKind;

pub const CONFIG_PATH_ENV: &str = "WEBSITE_OPERATOR_CONFIG";
pub const WORKERS_ENV: &str = "WEBSITE_OPERATOR_WORKERS";
pub const WATCH_KIND_ENV: &str = "WEBSITE_OPERATOR_WATCH_KIND";
pub const WATCH_NAMESPACE_ENV: &str = "WEBSITE_OPERATOR_WATCH_NAMESPACE";
pub const LOG_FORMAT_ENV: &str = "WEBSITE_OPERATOR_LOG_FORMAT";
pub const SEED_ENV: &str = "WEBSITE_OPERATOR_SEED";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid value {value:?} for {name}")]
    InvalidEnv { name: &'static str, value: String },

    #[error("invalid configuration: {0}")]
    Invalid(String),

    #[error("failed to render configuration: {0}")]
    Render(#[from] toml::ser::Error),
}

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl std::str::FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "text" | "pretty" => Ok(LogFormat::Text),
            "json" => Ok(LogFormat::Json),
            other => Err(format!("unknown log format: {other}")),
        }
    }
}

/// How watch events are printed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WatchOutput {
    #[default]
    Text,
    Json,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControllerConfig {
    /// Concurrent reconcile workers; 0 means one per CPU.
    pub workers: usize,
    pub queue_capacity: usize,
    /// Delay before a key whose pass mutated a child is processed again.
    pub requeue_delay_ms: u64,
    pub backoff_base_ms: u64,
    pub backoff_max_ms: u64,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            workers: 2,
            queue_capacity: 1024,
            requeue_delay_ms: 0,
            backoff_base_ms: 5,
            backoff_max_ms: 60_000,
        }
    }
}

impl ControllerConfig {
    pub fn worker_count(&self) -> usize {
        if self.workers == 0 {
            num_cpus::get().max(1)
        } else {
            self.workers
        }
    }

    pub fn requeue_delay(&self) -> Duration {
        Duration::from_millis(self.requeue_delay_ms)
    }

    pub fn backoff_base(&self) -> Duration {
        Duration::from_millis(self.backoff_base_ms)
    }

    pub fn backoff_max(&self) -> Duration {
        Duration::from_millis(self.backoff_max_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WatchConfig {
    /// Kind of the watched collection.
    pub kind: String,
    /// Namespace to watch; unset watches every namespace.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
    pub output: WatchOutput,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            kind: ResourceKind::Pod.to_string(),
            namespace: None,
            output: WatchOutput::Text,
        }
    }
}

impl WatchConfig {
    pub fn resource_kind(&self) -> Result<ResourceKind, ConfigError> {
        self.kind
            .parse()
            .map_err(|e| ConfigError::Invalid(format!("watch.kind: {e}")))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    pub format: LogFormat,
    /// Directive used when `RUST_LOG` is unset.
    pub filter: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            format: LogFormat::Text,
            filter: "info".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OperatorConfig {
    /// JSON file of objects created at startup.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed_path: Option<PathBuf>,
    pub controller: ControllerConfig,
    pub watch: WatchConfig,
    pub log: LogConfig,
}

impl OperatorConfig {
    /// Load from the process environment.
    pub fn load() -> Result<Self, ConfigError> {
        let path = std::env::var_os(CONFIG_PATH_ENV).map(PathBuf::from);
        Self::load_from(path.as_deref(), |name| std::env::var(name).ok())
    }

    /// Load from an optional file, then apply overrides from `env`.
    pub fn load_from<F>(path: Option<&Path>, env: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_env(env)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn apply_env<F>(&mut self, env: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(value) = env(WORKERS_ENV) {
            self.controller.workers = value.trim().parse().map_err(|_| ConfigError::InvalidEnv {
                name: WORKERS_ENV,
                value: value.clone(),
            })?;
        }
        if let Some(value) = env(WATCH_KIND_ENV) {
            self.watch.kind = value;
        }
        if let Some(value) = env(WATCH_NAMESPACE_ENV) {
            self.watch.namespace = (!value.is_empty()).then_some(value);
        }
        if let Some(value) = env(LOG_FORMAT_ENV) {
            self.log.format = value.parse().map_err(|_| ConfigError::InvalidEnv {
                name: LOG_FORMAT_ENV,
                value: value.clone(),
            })?;
        }
        if let Some(value) = env(SEED_ENV) {
            self.seed_path = (!value.is_empty()).then(|| PathBuf::from(value));
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.controller.queue_capacity == 0 {
            return Err(ConfigError::Invalid(
                "controller.queue_capacity must be positive".to_string(),
            ));
        }
        if self.controller.backoff_base_ms > self.controller.backoff_max_ms {
            return Err(ConfigError::Invalid(format!(
                "controller.backoff_base_ms ({}) exceeds backoff_max_ms ({})",
                self.controller.backoff_base_ms, self.controller.backoff_max_ms
            )));
        }
        self.watch.resource_kind()?;
        Ok(())
    }

    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
