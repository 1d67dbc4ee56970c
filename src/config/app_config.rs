use std::collections::HashMap;

use serde::Deserialize;

use crate::domain::{ChainDefinition, DomainError};
use crate::infrastructure::observability::ObservabilityConfig;

/// Application configuration
#[derive(Debug, Clone, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub observability: ObservabilityConfig,
    #[serde(default)]
    pub chain: ChainConfig,
    #[serde(default)]
    pub fetcher: FetcherConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    #[serde(default)]
    pub format: LogFormat,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Ordered levels of the selection chain
#[derive(Debug, Clone, Deserialize)]
pub struct ChainConfig {
    pub levels: Vec<LevelConfig>,
    #[serde(default = "default_true")]
    pub cache_options: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LevelConfig {
    pub key: String,
    #[serde(default)]
    pub required: bool,
}

/// Which fetcher backs the chain
#[derive(Debug, Clone, Copy, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum FetcherKind {
    #[default]
    Memory,
    Http,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct FetcherConfig {
    #[serde(default)]
    pub kind: FetcherKind,
    /// JSON catalog for the in-memory fetcher
    #[serde(default)]
    pub catalog_path: Option<String>,
    #[serde(default)]
    pub http: HttpFetcherConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HttpFetcherConfig {
    pub base_url: String,
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    /// Endpoint per level key
    #[serde(default)]
    pub endpoints: HashMap<String, EndpointConfig>,
}

/// REST endpoint for one level. `path` may contain a `{parent}` placeholder;
/// without it the parent value is sent as the `parent` query parameter.
#[derive(Debug, Clone, Deserialize)]
pub struct EndpointConfig {
    pub path: String,
    #[serde(default = "default_value_field")]
    pub value_field: String,
    #[serde(default = "default_label_field")]
    pub label_field: String,
}

fn default_true() -> bool {
    true
}

fn default_timeout_ms() -> u64 {
    10_000
}

fn default_value_field() -> String {
    "value".to_string()
}

fn default_label_field() -> String {
    "label".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::default(),
        }
    }
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self {
            levels: vec![
                LevelConfig::new("company", false),
                LevelConfig::new("branch", true),
                LevelConfig::new("area", true),
                LevelConfig::new("manager", true),
            ],
            cache_options: true,
        }
    }
}

impl LevelConfig {
    pub fn new(key: impl Into<String>, required: bool) -> Self {
        Self {
            key: key.into(),
            required,
        }
    }
}

impl Default for HttpFetcherConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080/api".to_string(),
            timeout_ms: default_timeout_ms(),
            endpoints: HashMap::new(),
        }
    }
}

impl ChainConfig {
    /// Build the validated chain definition
    pub fn to_definition(&self) -> Result<ChainDefinition, DomainError> {
        ChainDefinition::linear(self.levels.iter().map(|l| (l.key.clone(), l.required)))
            .map_err(|e| DomainError::configuration(format!("Invalid chain: {}", e)))
    }
}

impl AppConfig {
    pub fn load() -> Result<Self, config::ConfigError> {
        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name("config/local").required(false))
            .add_source(
                config::Environment::with_prefix("APP")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }
}
