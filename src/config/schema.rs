//! Configuration schema definitions.
//!
//! This module defines the complete startup configuration for the tunnel
//! server. All types derive Serde traits for deserialization from config
//! files. The configuration is read once at startup and is immutable for
//! the lifetime of the process.

use serde::{Deserialize, Serialize};

/// Root configuration for the tunnel server.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct TunnelServerConfig {
    /// Listener configuration (bind address, connection limits).
    pub listener: ListenerConfig,

    /// Tunnel relay settings (backend endpoint, retry policy).
    pub tunnel: TunnelConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,

    /// Maximum concurrently running tunnel sessions. Exchanges beyond the
    /// limit are refused with 503 rather than queued.
    pub max_connections: usize,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
            max_connections: 10_000,
        }
    }
}

/// Tunnel relay configuration.
///
/// `endpoint` is required and has no usable default; validation rejects an
/// empty descriptor. The retry knobs drive the relay's connect phase:
/// at most `connect_attempts` dials, with `retry_delay_ms` between failures.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TunnelConfig {
    /// Backend endpoint descriptor (e.g., "local:backend").
    pub endpoint: String,

    /// HTTP path the tunnel is served on.
    pub path: String,

    /// Maximum number of backend connect attempts per session.
    pub connect_attempts: u32,

    /// Delay between failed connect attempts, in milliseconds.
    pub retry_delay_ms: u64,
}

impl Default for TunnelConfig {
    fn default() -> Self {
        Self {
            endpoint: String::new(),
            path: "/tunnel".to_string(),
            connect_attempts: 1,
            retry_delay_ms: 0,
        }
    }
}

/// Observability settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Whether to expose Prometheus metrics.
    pub metrics_enabled: bool,

    /// Address the metrics exporter binds to.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            metrics_enabled: false,
            metrics_address: "127.0.0.1:9090".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_contract() {
        let config = TunnelServerConfig::default();
        assert_eq!(config.tunnel.path, "/tunnel");
        assert_eq!(config.tunnel.connect_attempts, 1);
        assert_eq!(config.tunnel.retry_delay_ms, 0);
    }

    #[test]
    fn partial_toml_fills_defaults() {
        let config: TunnelServerConfig = toml::from_str(
            r#"
            [tunnel]
            endpoint = "local:backend"
            connect_attempts = 3
            "#,
        )
        .unwrap();
        assert_eq!(config.tunnel.endpoint, "local:backend");
        assert_eq!(config.tunnel.connect_attempts, 3);
        assert_eq!(config.tunnel.path, "/tunnel");
        assert_eq!(config.listener.bind_address, "0.0.0.0:8080");
    }
}
