//! Client side of the tunnel.
//!
//! # Data Flow
//! ```text
//! options.rs (interned named options)
//!     → config.rs (typed ClientTunnelConfig, chained dispatch)
//!     → handshake.rs (dial, optional TLS, streaming POST exchange)
//! ```

pub mod config;
pub mod handshake;
pub mod options;

pub use config::{ClientTunnelConfig, TlsContext, TransportOptions};
pub use handshake::{ClientError, TunnelClient, TunnelStream};
pub use options::{OptionValue, TunnelOption};
