//! Configuration management for the TTS service
//!
//! Supports loading configuration from:
//! - YAML/TOML files (`config/default`, `config/{env}`)
//! - Environment variables (`ZONOS_TTS__` prefix, `__` between sections)

pub mod settings;

pub use settings::{
    load_settings, load_settings_from, CacheConfig, Device, EndpointConfig, LanguageConfig,
    ModelBackend, ModelsConfig, ObservabilityConfig, PhonemizerConfig, ReferenceAudioConfig,
    ReferenceAudioPolicy, ServerConfig, Settings, SynthesisConfig, EXPORTED_TOKEN_BUDGET,
};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Configuration file not found: {0}")]
    FileNotFound(String),

    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    #[error("Invalid value for {field}: {message}")]
    InvalidValue { field: String, message: String },
}

impl From<config::ConfigError> for ConfigError {
    fn from(err: config::ConfigError) -> Self {
        ConfigError::ParseError(err.to_string())
    }
}

impl From<ConfigError> for zonos_tts_core::Error {
    fn from(err: ConfigError) -> Self {
        zonos_tts_core::Error::Config(err.to_string())
    }
}
