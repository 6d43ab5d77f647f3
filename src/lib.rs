//! HTTP byte-stream tunnel.
//!
//! Tunnels a raw, ordered byte stream through one standard HTTP
//! request/response exchange, for clients that can only reach the backend
//! through outbound HTTP.
//!
//! # Architecture Overview
//!
//! ```text
//!                  ┌──────────────────────────────────────────────┐
//!                  │                TUNNEL SERVER                 │
//!   POST /tunnel   │  ┌──────┐   ┌───────────────┐   ┌─────────┐  │
//!  ────────────────┼─▶│ http │──▶│ relay session │──▶│endpoint │──┼──▶ backend
//!                  │  │server│   │ (dual pumps)  │   │connect  │  │  connection
//!  ◀───────────────┼──│      │◀──│               │◀──│         │◀─┼───
//!   200 octet      │  └──────┘   └───────────────┘   └─────────┘  │
//!   stream         │  ┌────────────────────────────────────────┐  │
//!                  │  │ config · lifecycle · observability     │  │
//!                  │  └────────────────────────────────────────┘  │
//!                  └──────────────────────────────────────────────┘
//! ```
//!
//! The client side ([`client`]) carries the typed tunneling configuration
//! with its interned named-option registry, and a small dialer that speaks
//! the exchange the relay expects.

// Core subsystems
pub mod config;
pub mod endpoint;
pub mod http;
pub mod relay;

// Client side
pub mod client;

// Cross-cutting concerns
pub mod lifecycle;
pub mod observability;

pub use config::TunnelServerConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
pub use relay::{RelaySettings, RelayState, TunnelSession};
