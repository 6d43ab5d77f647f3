//! Startup configuration subsystem.
//!
//! # Data Flow
//! ```text
//! TOML file → loader.rs (read + parse) → validation.rs (semantic checks)
//!           → immutable TunnelServerConfig shared for the process lifetime
//! ```

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, ConfigError};
pub use schema::{ListenerConfig, ObservabilityConfig, TunnelConfig, TunnelServerConfig};
pub use validation::{validate_config, ValidationError};
