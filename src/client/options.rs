//! Named, typed tunneling options.
//!
//! # Responsibilities
//! - Intern option keys process-wide: one canonical instance per name
//! - Carry generically-typed option values for chained dispatch
//!
//! # Design Decisions
//! - Interning uses the dashmap entry API, so under a first-reference race
//!   exactly one instance wins and every racer observes it
//! - Options are created lazily on first reference and never removed

use std::sync::{Arc, LazyLock};

use dashmap::DashMap;

use crate::client::config::TlsContext;
use crate::config::ConfigError;

/// Well-known option names.
pub mod names {
    pub const SERVER_NAME: &str = "serverName";
    pub const SERVER_PATH: &str = "serverPath";
    pub const TLS_CONTEXT: &str = "tlsContext";
    pub const ENABLED_CIPHER_SUITES: &str = "enabledCipherSuites";
    pub const ENABLED_PROTOCOLS: &str = "enabledProtocols";
    pub const SESSION_RESUMPTION_ENABLED: &str = "sessionResumptionEnabled";

    // Handled by the wrapped transport options, not the tunnel layer.
    pub const CONNECT_TIMEOUT_MILLIS: &str = "connectTimeoutMillis";
    pub const TCP_NODELAY: &str = "tcpNoDelay";
}

static REGISTRY: LazyLock<DashMap<String, Arc<TunnelOption>>> = LazyLock::new(DashMap::new);

/// A named configuration key. Identity and equality are by name; the
/// registry guarantees one canonical instance per name process-wide.
#[derive(Debug)]
pub struct TunnelOption {
    name: String,
}

impl TunnelOption {
    /// Canonical option for `name`, created on first reference.
    ///
    /// Fails only for an empty name.
    pub fn value_of(name: &str) -> Result<Arc<TunnelOption>, ConfigError> {
        if name.is_empty() {
            return Err(ConfigError::InvalidOptionName);
        }
        if let Some(existing) = REGISTRY.get(name) {
            return Ok(Arc::clone(existing.value()));
        }
        let entry = REGISTRY
            .entry(name.to_string())
            .or_insert_with(|| Arc::new(TunnelOption {
                name: name.to_string(),
            }));
        Ok(Arc::clone(entry.value()))
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl PartialEq for TunnelOption {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl Eq for TunnelOption {}

impl std::hash::Hash for TunnelOption {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.name.hash(state);
    }
}

impl std::fmt::Display for TunnelOption {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.name)
    }
}

/// Generic value carrier for option dispatch.
#[derive(Debug, Clone)]
pub enum OptionValue {
    Str(String),
    StrList(Vec<String>),
    Bool(bool),
    U64(u64),
    Tls(TlsContext),
}

impl OptionValue {
    /// Coerce to a string. Scalars stringify, mirroring the permissive
    /// conversion the option map has always allowed.
    pub fn coerce_str(&self, name: &str) -> Result<String, ConfigError> {
        match self {
            OptionValue::Str(s) => Ok(s.clone()),
            OptionValue::Bool(b) => Ok(b.to_string()),
            OptionValue::U64(n) => Ok(n.to_string()),
            _ => Err(type_error(name, "string")),
        }
    }

    pub fn coerce_str_list(&self, name: &str) -> Result<Vec<String>, ConfigError> {
        match self {
            OptionValue::StrList(list) => Ok(list.clone()),
            _ => Err(type_error(name, "string list")),
        }
    }

    pub fn coerce_bool(&self, name: &str) -> Result<bool, ConfigError> {
        match self {
            OptionValue::Bool(b) => Ok(*b),
            OptionValue::Str(s) => s.parse().map_err(|_| type_error(name, "bool")),
            _ => Err(type_error(name, "bool")),
        }
    }

    pub fn coerce_u64(&self, name: &str) -> Result<u64, ConfigError> {
        match self {
            OptionValue::U64(n) => Ok(*n),
            OptionValue::Str(s) => s.parse().map_err(|_| type_error(name, "u64")),
            _ => Err(type_error(name, "u64")),
        }
    }

    pub fn coerce_tls(&self, name: &str) -> Result<TlsContext, ConfigError> {
        match self {
            OptionValue::Tls(ctx) => Ok(ctx.clone()),
            _ => Err(type_error(name, "TLS context")),
        }
    }
}

fn type_error(name: &str, expected: &'static str) -> ConfigError {
    ConfigError::OptionType {
        name: name.to_string(),
        expected,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_name_is_rejected() {
        assert!(matches!(
            TunnelOption::value_of(""),
            Err(ConfigError::InvalidOptionName)
        ));
    }

    #[test]
    fn same_name_returns_canonical_instance() {
        let a = TunnelOption::value_of("test.canonical").unwrap();
        let b = TunnelOption::value_of("test.canonical").unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(a, b);
    }

    #[test]
    fn concurrent_first_reference_yields_one_instance() {
        let name = "test.raced";
        let handles: Vec<_> = (0..16)
            .map(|_| std::thread::spawn(move || TunnelOption::value_of(name).unwrap()))
            .collect();
        let options: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        for option in &options[1..] {
            assert!(Arc::ptr_eq(&options[0], option));
        }
    }

    #[test]
    fn scalar_values_stringify() {
        assert_eq!(OptionValue::Bool(true).coerce_str("x").unwrap(), "true");
        assert_eq!(OptionValue::U64(7).coerce_str("x").unwrap(), "7");
    }

    #[test]
    fn list_coercion_is_strict() {
        let err = OptionValue::Str("a,b".into()).coerce_str_list("x").unwrap_err();
        assert!(matches!(err, ConfigError::OptionType { .. }));
    }
}
