//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Check the endpoint descriptor parses before any session runs
//! - Validate value ranges (connect_attempts >= 1, addresses parseable)
//!
//! # Design Decisions
//! - Returns all validation errors, not just the first
//! - Validation is a pure function: TunnelServerConfig -> Result<(), Vec<ValidationError>>
//! - Runs once at startup; a malformed config is a setup-time fault, never
//!   a per-request fault

use std::net::SocketAddr;

use crate::config::schema::TunnelServerConfig;
use crate::endpoint;

/// A single semantic validation failure.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("tunnel.endpoint must be specified")]
    MissingEndpoint,

    #[error("tunnel.endpoint is invalid: {0}")]
    InvalidEndpoint(String),

    #[error("tunnel.connect_attempts must be >= 1, got {0}")]
    InvalidConnectAttempts(u32),

    #[error("tunnel.path must start with '/', got {0:?}")]
    InvalidPath(String),

    #[error("listener.max_connections must be >= 1")]
    InvalidMaxConnections,

    #[error("listener.bind_address is not a valid socket address: {0:?}")]
    InvalidBindAddress(String),

    #[error("observability.metrics_address is not a valid socket address: {0:?}")]
    InvalidMetricsAddress(String),
}

/// Validate a loaded configuration, collecting every error found.
pub fn validate_config(config: &TunnelServerConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.tunnel.endpoint.trim().is_empty() {
        errors.push(ValidationError::MissingEndpoint);
    } else if let Err(e) = endpoint::parse_endpoint(&config.tunnel.endpoint) {
        errors.push(ValidationError::InvalidEndpoint(e.to_string()));
    }

    if config.tunnel.connect_attempts < 1 {
        errors.push(ValidationError::InvalidConnectAttempts(
            config.tunnel.connect_attempts,
        ));
    }

    if !config.tunnel.path.starts_with('/') {
        errors.push(ValidationError::InvalidPath(config.tunnel.path.clone()));
    }

    if config.listener.max_connections == 0 {
        errors.push(ValidationError::InvalidMaxConnections);
    }

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidBindAddress(
            config.listener.bind_address.clone(),
        ));
    }

    if config.observability.metrics_enabled
        && config
            .observability
            .metrics_address
            .parse::<SocketAddr>()
            .is_err()
    {
        errors.push(ValidationError::InvalidMetricsAddress(
            config.observability.metrics_address.clone(),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
