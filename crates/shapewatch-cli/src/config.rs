//! `shapewatch.toml` loading.
//!
//! Every key is optional. Precedence, highest first: command-line flags,
//! the config file, built-in defaults.

use serde::Deserialize;
use shapewatch_filters::DEFAULT_BASE_IRI;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_CONFIG_PATH: &str = "shapewatch.toml";
pub const DEFAULT_GRAPH_PATH: &str = ".shapewatch/graph.jsonl";
pub const DEFAULT_OUTBOX_PATH: &str = ".shapewatch/outbox.jsonl";
pub const DEFAULT_GRAPH_IRI: &str = "http://shapewatch.dev/graphs/subscriptions";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse config file {path}: {detail}")]
    Parse { path: PathBuf, detail: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    #[default]
    File,
    Memory,
    Sparql,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub store: StoreConfig,
    pub resources: ResourcesConfig,
    pub notify: NotifyConfig,
    pub log: LogConfig,
}

/// `[store]`
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StoreConfig {
    pub backend: Backend,
    pub path: PathBuf,
    pub graph: String,
    pub query_endpoint: String,
    pub update_endpoint: String,
    pub timeout_secs: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: Backend::File,
            path: PathBuf::from(DEFAULT_GRAPH_PATH),
            graph: DEFAULT_GRAPH_IRI.to_string(),
            query_endpoint: "http://localhost:8890/sparql".to_string(),
            update_endpoint: "http://localhost:8890/sparql".to_string(),
            timeout_secs: 30,
        }
    }
}

impl StoreConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// `[resources]`
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ResourcesConfig {
    pub base_iri: String,
}

impl Default for ResourcesConfig {
    fn default() -> Self {
        Self {
            base_iri: DEFAULT_BASE_IRI.to_string(),
        }
    }
}

/// `[notify]`
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct NotifyConfig {
    pub outbox: PathBuf,
}

impl Default for NotifyConfig {
    fn default() -> Self {
        Self {
            outbox: PathBuf::from(DEFAULT_OUTBOX_PATH),
        }
    }
}

/// `[log]`
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LogConfig {
    pub level: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl Config {
    /// Load from `explicit`, or from [`DEFAULT_CONFIG_PATH`] if present.
    ///
    /// An explicitly named file must exist; a missing default file means
    /// defaults.
    pub fn load(explicit: Option<&Path>) -> Result<Config, ConfigError> {
        let path = match explicit {
            Some(path) => path.to_path_buf(),
            None => {
                let default = PathBuf::from(DEFAULT_CONFIG_PATH);
                if !default.exists() {
                    return Ok(Config::default());
                }
                default
            }
        };

        let content = fs::read_to_string(&path).map_err(|source| ConfigError::Io {
            path: path.clone(),
            source,
        })?;
        Self::parse(&content).map_err(|detail| ConfigError::Parse { path, detail })
    }

    pub fn parse(content: &str) -> Result<Config, String> {
        if content.trim().is_empty() {
            return Ok(Config::default());
        }
        toml::from_str(content).map_err(|e| e.to_string())
    }

    /// Apply command-line overrides.
    pub fn with_store_path(mut self, path: Option<PathBuf>) -> Self {
        if let Some(path) = path {
            self.store.path = path;
        }
        self
    }
}
