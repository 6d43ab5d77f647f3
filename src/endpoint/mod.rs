//! Backend endpoint resolution and connection.
//!
//! # Responsibilities
//! - Parse a backend descriptor string into a [`BackendAddr`]
//! - Dial a resolved address, yielding a byte-duplex [`BackendStream`]
//! - Host the in-process `local:` transport ([`local`])
//!
//! # Design Decisions
//! - New address forms (e.g. `tcp:host:port`) are added here, as a new
//!   `BackendAddr` variant plus a `connect` arm; the relay never changes
//! - `parse_endpoint` runs at startup (via config validation), so a bad
//!   descriptor can never surface during request handling

pub mod local;

use std::io;

use tokio::io::{AsyncRead, AsyncWrite};

use crate::config::ConfigError;

/// A resolved backend address, shared read-only across all sessions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendAddr {
    /// An in-process named endpoint (no real socket).
    Local(String),
}

impl std::fmt::Display for BackendAddr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BackendAddr::Local(name) => write!(f, "local:{}", name),
        }
    }
}

/// A connected backend byte stream, owned exclusively by one session.
pub type BackendStream = Box<dyn BackendIo>;

/// Marker for anything usable as a backend connection.
pub trait BackendIo: AsyncRead + AsyncWrite + Send + Unpin {}

impl<T: AsyncRead + AsyncWrite + Send + Unpin> BackendIo for T {}

/// Parse a backend endpoint descriptor.
///
/// The supported scheme is `local:<name>`; any other form fails with a
/// configuration error carrying the offending descriptor.
pub fn parse_endpoint(descriptor: &str) -> Result<BackendAddr, ConfigError> {
    let descriptor = descriptor.trim();
    match descriptor.strip_prefix("local:") {
        Some(name) => Ok(BackendAddr::Local(name.trim().to_string())),
        None => Err(ConfigError::InvalidEndpoint {
            descriptor: descriptor.to_string(),
        }),
    }
}

/// Dial a resolved backend address.
pub async fn connect(addr: &BackendAddr) -> io::Result<BackendStream> {
    match addr {
        BackendAddr::Local(name) => {
            let stream = local::connect(name).await?;
            Ok(Box::new(stream))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_local_descriptor() {
        let addr = parse_endpoint("local:backend").unwrap();
        assert_eq!(addr, BackendAddr::Local("backend".to_string()));
    }

    #[test]
    fn trims_whitespace() {
        let addr = parse_endpoint("  local: backend ").unwrap();
        assert_eq!(addr, BackendAddr::Local("backend".to_string()));
    }

    #[test]
    fn local_descriptor_matches_directly_built_address() {
        for name in ["a", "backend", "with-dash", ""] {
            let addr = parse_endpoint(&format!("local:{}", name)).unwrap();
            assert_eq!(addr, BackendAddr::Local(name.to_string()));
        }
    }

    #[test]
    fn rejects_unknown_forms() {
        for descriptor in ["tcp:127.0.0.1:9000", "127.0.0.1:9000", "localhost", ""] {
            let err = parse_endpoint(descriptor).unwrap_err();
            match err {
                ConfigError::InvalidEndpoint { descriptor: d } => {
                    assert_eq!(d, descriptor.trim());
                }
                other => panic!("unexpected error: {other}"),
            }
        }
    }
}
