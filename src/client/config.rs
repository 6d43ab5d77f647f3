//! Client-side tunneling configuration.
//!
//! # Responsibilities
//! - Hold the typed tunneling parameters of one outbound tunnel channel
//! - Dispatch generic named options onto typed fields, trying the wrapped
//!   transport's own option handling first
//! - Keep list-typed fields defensively copied on both read and write
//!
//! One instance per logical client channel; dropped with it.

use std::sync::Arc;

use crate::client::options::{names, OptionValue, TunnelOption};
use crate::config::ConfigError;

/// Opaque TLS context for the tunnel client. Absent means plain text.
///
/// Carried as-is and applied when the client dials; the engine configuration
/// behind it is not interpreted here.
#[derive(Clone)]
pub struct TlsContext(Arc<rustls::ClientConfig>);

impl TlsContext {
    pub fn new(config: Arc<rustls::ClientConfig>) -> Self {
        Self(config)
    }

    /// Build a context trusting the CA certificates in a PEM file.
    pub fn from_ca_pem(path: &std::path::Path) -> Result<Self, ConfigError> {
        let file = std::fs::File::open(path)?;
        let mut reader = std::io::BufReader::new(file);

        let mut roots = rustls::RootCertStore::empty();
        for cert in rustls_pemfile::certs(&mut reader) {
            roots
                .add(cert?)
                .map_err(|e| ConfigError::Tls(e.to_string()))?;
        }
        if roots.is_empty() {
            return Err(ConfigError::Tls(format!(
                "no CA certificates found in {}",
                path.display()
            )));
        }

        let config = rustls::ClientConfig::builder()
            .with_root_certificates(roots)
            .with_no_client_auth();
        Ok(Self(Arc::new(config)))
    }

    pub fn config(&self) -> &Arc<rustls::ClientConfig> {
        &self.0
    }
}

impl std::fmt::Debug for TlsContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("TlsContext(..)")
    }
}

/// Options owned by the wrapped transport channel, tried before any
/// tunnel-level name during dispatch.
#[derive(Debug, Clone)]
pub struct TransportOptions {
    /// Dial timeout in milliseconds.
    pub connect_timeout_ms: u64,
    /// Disable Nagle's algorithm on the transport socket.
    pub tcp_nodelay: bool,
}

impl Default for TransportOptions {
    fn default() -> Self {
        Self {
            connect_timeout_ms: 30_000,
            tcp_nodelay: true,
        }
    }
}

impl TransportOptions {
    /// Apply a generic option if this layer owns it.
    pub fn set_option(
        &mut self,
        option: &TunnelOption,
        value: &OptionValue,
    ) -> Result<bool, ConfigError> {
        match option.name() {
            names::CONNECT_TIMEOUT_MILLIS => {
                self.connect_timeout_ms = value.coerce_u64(option.name())?;
            }
            names::TCP_NODELAY => {
                self.tcp_nodelay = value.coerce_bool(option.name())?;
            }
            _ => return Ok(false),
        }
        Ok(true)
    }
}

/// Typed configuration of a client-side tunnel channel.
#[derive(Debug, Clone)]
pub struct ClientTunnelConfig {
    transport: TransportOptions,
    server_name: Option<String>,
    server_path: String,
    tls_context: Option<TlsContext>,
    enabled_ssl_cipher_suites: Option<Vec<String>>,
    enabled_ssl_protocols: Option<Vec<String>>,
    session_resumption_enabled: bool,
}

impl Default for ClientTunnelConfig {
    fn default() -> Self {
        Self {
            transport: TransportOptions::default(),
            server_name: None,
            server_path: "/tunnel".to_string(),
            tls_context: None,
            enabled_ssl_cipher_suites: None,
            enabled_ssl_protocols: None,
            session_resumption_enabled: true,
        }
    }
}

impl ClientTunnelConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Host name of the HTTP server. `None` means no `Host` header is sent.
    pub fn server_name(&self) -> Option<&str> {
        self.server_name.as_deref()
    }

    pub fn set_server_name(&mut self, server_name: Option<String>) {
        self.server_name = server_name;
    }

    /// Path the tunnel is served on. Defaults to `"/tunnel"`.
    pub fn server_path(&self) -> &str {
        &self.server_path
    }

    /// Set the tunnel path. An empty path is rejected.
    pub fn set_server_path(&mut self, server_path: &str) -> Result<(), ConfigError> {
        if server_path.is_empty() {
            return Err(ConfigError::InvalidServerPath);
        }
        self.server_path = server_path.to_string();
        Ok(())
    }

    /// TLS context used when dialing. `None` means plain text.
    pub fn tls_context(&self) -> Option<&TlsContext> {
        self.tls_context.as_ref()
    }

    pub fn set_tls_context(&mut self, tls_context: Option<TlsContext>) {
        self.tls_context = tls_context;
    }

    /// Cipher suites enabled for the TLS engine, as an independent copy.
    pub fn enabled_ssl_cipher_suites(&self) -> Option<Vec<String>> {
        self.enabled_ssl_cipher_suites.clone()
    }

    /// Store an independent copy of the given suites.
    pub fn set_enabled_ssl_cipher_suites(&mut self, suites: Option<&[String]>) {
        self.enabled_ssl_cipher_suites = suites.map(<[String]>::to_vec);
    }

    /// Protocol versions enabled for the TLS engine, as an independent copy.
    pub fn enabled_ssl_protocols(&self) -> Option<Vec<String>> {
        self.enabled_ssl_protocols.clone()
    }

    /// Store an independent copy of the given protocols.
    pub fn set_enabled_ssl_protocols(&mut self, protocols: Option<&[String]>) {
        self.enabled_ssl_protocols = protocols.map(<[String]>::to_vec);
    }

    /// Whether the TLS engine may resume sessions. Defaults to `true`.
    pub fn session_resumption_enabled(&self) -> bool {
        self.session_resumption_enabled
    }

    pub fn set_session_resumption_enabled(&mut self, enabled: bool) {
        self.session_resumption_enabled = enabled;
    }

    /// Transport-level options of the wrapped channel.
    pub fn transport(&self) -> &TransportOptions {
        &self.transport
    }

    /// Apply a generic named option.
    ///
    /// The wrapped transport's own handling runs first; tunnel-level names
    /// are matched next. An unknown name is `Ok(false)` and mutates nothing,
    /// so handlers can be chained safely. Values are coerced before any
    /// field is touched, so a failed coercion also mutates nothing.
    pub fn set_option(
        &mut self,
        option: &TunnelOption,
        value: &OptionValue,
    ) -> Result<bool, ConfigError> {
        if self.transport.set_option(option, value)? {
            return Ok(true);
        }

        match option.name() {
            names::SERVER_NAME => {
                self.server_name = Some(value.coerce_str(option.name())?);
            }
            names::SERVER_PATH => {
                let path = value.coerce_str(option.name())?;
                self.set_server_path(&path)?;
            }
            names::TLS_CONTEXT => {
                self.tls_context = Some(value.coerce_tls(option.name())?);
            }
            names::ENABLED_CIPHER_SUITES => {
                let suites = value.coerce_str_list(option.name())?;
                self.enabled_ssl_cipher_suites = Some(suites);
            }
            names::ENABLED_PROTOCOLS => {
                let protocols = value.coerce_str_list(option.name())?;
                self.enabled_ssl_protocols = Some(protocols);
            }
            names::SESSION_RESUMPTION_ENABLED => {
                self.session_resumption_enabled = value.coerce_bool(option.name())?;
            }
            _ => return Ok(false),
        }
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn option(name: &str) -> Arc<TunnelOption> {
        TunnelOption::value_of(name).unwrap()
    }

    #[test]
    fn defaults_match_contract() {
        let config = ClientTunnelConfig::new();
        assert_eq!(config.server_name(), None);
        assert_eq!(config.server_path(), "/tunnel");
        assert!(config.tls_context().is_none());
        assert!(config.session_resumption_enabled());
    }

    #[test]
    fn empty_server_path_is_rejected() {
        let mut config = ClientTunnelConfig::new();
        assert!(matches!(
            config.set_server_path(""),
            Err(ConfigError::InvalidServerPath)
        ));
        assert_eq!(config.server_path(), "/tunnel");
    }

    #[test]
    fn returned_suite_list_is_an_independent_copy() {
        let mut config = ClientTunnelConfig::new();
        config.set_enabled_ssl_cipher_suites(Some(&["A".to_string(), "B".to_string()]));

        let mut first = config.enabled_ssl_cipher_suites().unwrap();
        first.push("EVIL".to_string());

        assert_eq!(
            config.enabled_ssl_cipher_suites().unwrap(),
            vec!["A".to_string(), "B".to_string()]
        );
    }

    #[test]
    fn stored_suite_list_is_detached_from_the_input() {
        let mut config = ClientTunnelConfig::new();
        let mut input = vec!["A".to_string()];
        config.set_enabled_ssl_cipher_suites(Some(&input));

        input.push("EVIL".to_string());
        input[0] = "MUTATED".to_string();

        assert_eq!(
            config.enabled_ssl_cipher_suites().unwrap(),
            vec!["A".to_string()]
        );
    }

    #[test]
    fn dispatch_applies_known_tunnel_names() {
        let mut config = ClientTunnelConfig::new();

        let handled = config
            .set_option(
                &option(names::SERVER_NAME),
                &OptionValue::Str("gateway.example".into()),
            )
            .unwrap();
        assert!(handled);
        assert_eq!(config.server_name(), Some("gateway.example"));

        let handled = config
            .set_option(
                &option(names::ENABLED_PROTOCOLS),
                &OptionValue::StrList(vec!["TLSv1.3".into()]),
            )
            .unwrap();
        assert!(handled);
        assert_eq!(
            config.enabled_ssl_protocols().unwrap(),
            vec!["TLSv1.3".to_string()]
        );

        let handled = config
            .set_option(
                &option(names::SESSION_RESUMPTION_ENABLED),
                &OptionValue::Bool(false),
            )
            .unwrap();
        assert!(handled);
        assert!(!config.session_resumption_enabled());
    }

    #[test]
    fn transport_options_are_tried_first() {
        let mut config = ClientTunnelConfig::new();
        let handled = config
            .set_option(
                &option(names::CONNECT_TIMEOUT_MILLIS),
                &OptionValue::U64(5_000),
            )
            .unwrap();
        assert!(handled);
        assert_eq!(config.transport().connect_timeout_ms, 5_000);
    }

    #[test]
    fn unknown_name_is_unhandled_and_mutates_nothing() {
        let mut config = ClientTunnelConfig::new();
        config.set_server_name(Some("kept.example".to_string()));
        let before = format!("{config:?}");

        let handled = config
            .set_option(&option("no.such.option"), &OptionValue::Bool(true))
            .unwrap();

        assert!(!handled);
        assert_eq!(format!("{config:?}"), before);
    }

    #[test]
    fn failed_coercion_mutates_nothing() {
        let mut config = ClientTunnelConfig::new();
        let before = format!("{config:?}");

        let result = config.set_option(
            &option(names::ENABLED_CIPHER_SUITES),
            &OptionValue::Bool(true),
        );

        assert!(matches!(result, Err(ConfigError::OptionType { .. })));
        assert_eq!(format!("{config:?}"), before);
    }
}
