//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup:  load config → validate → init metrics → bind → serve
//! Shutdown: signal received → stop accepting → drain sessions → exit
//! ```

pub mod shutdown;

pub use shutdown::{wait_for_shutdown, Shutdown};
