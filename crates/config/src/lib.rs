//! Configuration management for the call orchestration engine
//!
//! Supports loading configuration from:
//! - TOML files (settings) and TOML/YAML files (agent roster)
//! - Environment variables (CALLFLOW__ prefix)
//! - Built-in defaults, including the seed roster

pub mod roster;
pub mod settings;

pub use roster::{AgentSeed, RosterConfig};
pub use settings::{
    load_settings, AuthConfig, CrmConfig, EngineSettings, ProviderConfig, RelayConfig,
    ScoringConfig, ServerConfig, Settings,
};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Configuration file not found: {0}")]
    FileNotFound(String),

    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Invalid value for {field}: {message}")]
    InvalidValue { field: String, message: String },
}

impl From<config::ConfigError> for ConfigError {
    fn from(err: config::ConfigError) -> Self {
        ConfigError::ParseError(err.to_string())
    }
}
