//! Observability subsystem: metrics exposition. Tracing is initialized by
//! the binary; every subsystem emits structured `tracing` events directly.

pub mod metrics;
