//! Configuration loading from disk.

use std::fs;
use std::path::Path;

use crate::config::schema::TunnelServerConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading and option handling.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation failed: {}", format_errors(.0))]
    Validation(Vec<ValidationError>),

    #[error("Invalid or unknown endpoint: {descriptor:?}")]
    InvalidEndpoint { descriptor: String },

    #[error("option name must not be empty")]
    InvalidOptionName,

    #[error("server path must not be empty")]
    InvalidServerPath,

    #[error("option {name:?} expects a {expected} value")]
    OptionType {
        name: String,
        expected: &'static str,
    },

    #[error("TLS context error: {0}")]
    Tls(String),
}

fn format_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Load and validate configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<TunnelServerConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    let config: TunnelServerConfig = toml::from_str(&content)?;

    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}
