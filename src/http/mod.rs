//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, tunnel route)
//!     → request.rs (session ID injection)
//!     → relay::TunnelSession (admission, connect, relay)
//!     → streaming octet response back to the client
//! ```

pub mod request;
pub mod server;

pub use request::{SessionId, SessionIdLayer, X_SESSION_ID};
pub use server::HttpServer;
