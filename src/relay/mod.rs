//! Tunnel relay subsystem.
//!
//! # Data Flow
//! ```text
//! inbound HTTP request body → reader.rs (non-empty chunks)
//!                           → session.rs (inbound pump) → backend connection
//! backend connection        → session.rs (sink pump)    → HTTP response body
//! ```

pub mod reader;
pub mod session;

pub use reader::InboundByteReader;
pub use session::{RelaySettings, RelayState, TunnelSession};
