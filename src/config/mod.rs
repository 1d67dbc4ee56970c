//! Application configuration

mod app_config;

pub use app_config::{
    AppConfig, ChainConfig, EndpointConfig, FetcherConfig, FetcherKind, HttpFetcherConfig,
    LevelConfig, LogFormat, LoggingConfig,
};
