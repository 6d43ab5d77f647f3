//! Tunnel relay session.
//!
//! # Responsibilities
//! - Admit exactly one POST exchange per session (anything else is 405)
//! - Establish the backend connection with bounded retries
//! - Relay bytes concurrently in both directions, preserving order
//! - Tear down with write-then-close ordering on every exit path
//!
//! # Lifecycle
//! ```text
//! Init → Connecting → Relaying → Closing → Closed
//!             └────────→ Failed   (connect retries exhausted)
//! ```
//!
//! # Design Decisions
//! - The response sink is a bounded channel; the backend-read task is its
//!   only producer, so sink writes are totally ordered by construction
//!   instead of by a lock
//! - Backend liveness is polled once per inbound-read iteration, so
//!   teardown latency is bounded by one iteration
//! - If no byte was ever forwarded, the session waits for the backend's
//!   close before finishing, so the connection is never leaked even for an
//!   empty client body

use std::future::Future;
use std::io;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::response::Response;
use bytes::{Bytes, BytesMut};
use futures_channel::mpsc;
use futures_util::SinkExt;
use tokio::io::{AsyncReadExt, AsyncWriteExt, ReadHalf, WriteHalf};
use tokio::sync::OwnedSemaphorePermit;
use tokio::task::JoinHandle;

use crate::config::{ConfigError, TunnelConfig};
use crate::endpoint::{self, BackendAddr, BackendStream};
use crate::observability::metrics;
use crate::relay::reader::InboundByteReader;

/// Read buffer size for the backend-to-client direction.
const READ_BUF: usize = 8 * 1024;

/// Depth of the bounded response-sink channel.
const SINK_DEPTH: usize = 16;

/// Immutable relay settings, shared read-only across all sessions.
#[derive(Debug, Clone)]
pub struct RelaySettings {
    /// Resolved backend address.
    pub backend: BackendAddr,
    /// Maximum backend connect attempts per session (>= 1).
    pub connect_attempts: u32,
    /// Delay between failed connect attempts.
    pub retry_delay: Duration,
}

impl RelaySettings {
    /// Build the settings from the validated startup configuration.
    pub fn from_config(config: &TunnelConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            backend: endpoint::parse_endpoint(&config.endpoint)?,
            connect_attempts: config.connect_attempts.max(1),
            retry_delay: Duration::from_millis(config.retry_delay_ms),
        })
    }
}

/// Session lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum RelayState {
    Init = 0,
    Connecting = 1,
    Relaying = 2,
    Closing = 3,
    Closed = 4,
    /// Terminal branch out of `Connecting`; `Relaying` is never entered.
    Failed = 5,
}

/// Atomic cell holding a [`RelayState`], shared with the driver task.
#[derive(Debug)]
pub struct StateCell(AtomicU8);

impl StateCell {
    fn new() -> Self {
        Self(AtomicU8::new(RelayState::Init as u8))
    }

    fn set(&self, state: RelayState) {
        self.0.store(state as u8, Ordering::Release);
    }

    pub fn get(&self) -> RelayState {
        match self.0.load(Ordering::Acquire) {
            0 => RelayState::Init,
            1 => RelayState::Connecting,
            2 => RelayState::Relaying,
            3 => RelayState::Closing,
            4 => RelayState::Closed,
            _ => RelayState::Failed,
        }
    }
}

/// One tunnel relay session, bound to one inbound exchange. Never reused.
pub struct TunnelSession {
    id: String,
    settings: Arc<RelaySettings>,
    state: Arc<StateCell>,
}

impl TunnelSession {
    pub fn new(id: String, settings: Arc<RelaySettings>) -> Self {
        Self {
            id,
            settings,
            state: Arc::new(StateCell::new()),
        }
    }

    /// Current lifecycle state. The handle stays valid after [`run`] returns,
    /// so callers can observe the terminal state of the driver task.
    ///
    /// [`run`]: Self::run
    pub fn state_handle(&self) -> Arc<StateCell> {
        Arc::clone(&self.state)
    }

    /// Drive the session for one inbound exchange, producing its response.
    ///
    /// The returned response carries the streaming body; the relay itself
    /// continues on background tasks after this returns, which is what lets
    /// the response headers reach the client before any body byte.
    ///
    /// A capacity permit, when given, is held until the session finishes,
    /// not merely until this returns.
    pub async fn run(
        &self,
        request: Request<Body>,
        permit: Option<OwnedSemaphorePermit>,
    ) -> Response {
        if request.method() != Method::POST {
            tracing::warn!(
                session_id = %self.id,
                method = %request.method(),
                "Unallowed method"
            );
            metrics::record_session("method_not_allowed");
            return empty_response(StatusCode::METHOD_NOT_ALLOWED);
        }

        self.state.set(RelayState::Connecting);
        let backend_addr = self.settings.backend.clone();
        let connected = connect_with_retry(
            || endpoint::connect(&backend_addr),
            self.settings.connect_attempts,
            self.settings.retry_delay,
        )
        .await;

        let backend = match connected {
            Ok(stream) => stream,
            Err(cause) => {
                tracing::warn!(
                    session_id = %self.id,
                    endpoint = %self.settings.backend,
                    error = %cause,
                    "Endpoint unavailable"
                );
                metrics::record_session("unavailable");
                self.state.set(RelayState::Failed);
                return empty_response(StatusCode::SERVICE_UNAVAILABLE);
            }
        };

        metrics::record_session("established");
        self.state.set(RelayState::Relaying);
        let body = self.start_relay(backend, request.into_body(), permit);

        // Committing the response here flushes the headers ahead of any body
        // byte, however long the connect phase took.
        Response::builder()
            .status(StatusCode::OK)
            .header(header::CONTENT_TYPE, "application/octet-stream")
            .header("content-transfer-encoding", "binary")
            .body(body)
            .unwrap()
    }

    /// Wire up both relay directions and return the response body stream.
    fn start_relay(
        &self,
        backend: BackendStream,
        inbound: Body,
        permit: Option<OwnedSemaphorePermit>,
    ) -> Body {
        let (backend_rd, backend_wr) = tokio::io::split(backend);
        let (sink, sink_rx) = mpsc::channel::<io::Result<Bytes>>(SINK_DEPTH);
        let backend_active = Arc::new(AtomicBool::new(true));

        let read_task = tokio::spawn(pump_backend_to_sink(
            backend_rd,
            sink,
            Arc::clone(&backend_active),
            self.id.clone(),
        ));

        tokio::spawn(drive_inbound(
            inbound,
            backend_wr,
            backend_active,
            read_task,
            Arc::clone(&self.state),
            self.id.clone(),
            permit,
        ));

        Body::from_stream(sink_rx)
    }
}

fn empty_response(status: StatusCode) -> Response {
    Response::builder().status(status).body(Body::empty()).unwrap()
}

/// Dial the backend up to `attempts` times, sleeping `retry_delay` between
/// failures. The sleep suspends only this session; interruption semantics do
/// not arise because nothing cancels the sleep short of dropping the session.
pub(crate) async fn connect_with_retry<F, Fut>(
    mut dial: F,
    attempts: u32,
    retry_delay: Duration,
) -> io::Result<BackendStream>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = io::Result<BackendStream>>,
{
    let attempts = attempts.max(1);
    let mut last_error = None;

    for attempt in 1..=attempts {
        metrics::record_connect_attempt();
        match dial().await {
            Ok(stream) => {
                tracing::debug!(attempt, "Backend connected");
                return Ok(stream);
            }
            Err(e) => {
                tracing::debug!(attempt, attempts, error = %e, "Connect attempt failed");
                last_error = Some(e);
                if attempt < attempts {
                    tokio::time::sleep(retry_delay).await;
                }
            }
        }
    }

    Err(last_error
        .unwrap_or_else(|| io::Error::new(io::ErrorKind::Other, "no connect attempt was made")))
}

/// Backend → response sink. Sole producer into the sink channel; every chunk
/// is handed to the response stream in arrival order and flushed by hyper as
/// it goes out.
async fn pump_backend_to_sink(
    mut backend: ReadHalf<BackendStream>,
    mut sink: mpsc::Sender<io::Result<Bytes>>,
    backend_active: Arc<AtomicBool>,
    session_id: String,
) {
    let mut buf = BytesMut::with_capacity(READ_BUF);
    loop {
        match backend.read_buf(&mut buf).await {
            Ok(0) => {
                tracing::debug!(session_id = %session_id, "Backend closed");
                break;
            }
            Ok(n) => {
                metrics::record_relayed_bytes("backend_to_client", n);
                if sink.send(Ok(buf.split().freeze())).await.is_err() {
                    // Response consumer went away; nothing left to relay to.
                    tracing::debug!(session_id = %session_id, "Response sink dropped");
                    break;
                }
            }
            Err(e) => {
                tracing::warn!(session_id = %session_id, error = %e, "Backend read failed");
                let _ = sink.send(Err(e)).await;
                break;
            }
        }
    }
    backend_active.store(false, Ordering::Release);
}

/// Inbound → backend driver, plus session teardown. Holds the capacity
/// permit for the session's whole lifetime; it is released on return.
async fn drive_inbound(
    inbound: Body,
    mut backend: WriteHalf<BackendStream>,
    backend_active: Arc<AtomicBool>,
    read_task: JoinHandle<()>,
    state: Arc<StateCell>,
    session_id: String,
    _permit: Option<OwnedSemaphorePermit>,
) {
    let mut reader = InboundByteReader::new(inbound.into_data_stream());
    let mut forwarded: u64 = 0;
    let mut fault = false;

    // Liveness is checked once per iteration; a backend that went inactive
    // ends this direction at the next loop head.
    while backend_active.load(Ordering::Acquire) {
        match reader.next_chunk().await {
            None => break,
            Some(Ok(chunk)) => {
                if let Err(e) = backend.write_all(&chunk).await {
                    tracing::warn!(session_id = %session_id, error = %e, "Backend write failed");
                    fault = true;
                    break;
                }
                forwarded += chunk.len() as u64;
                metrics::record_relayed_bytes("client_to_backend", chunk.len());
            }
            Some(Err(e)) => {
                tracing::warn!(session_id = %session_id, error = %e, "Inbound body failed");
                fault = true;
                break;
            }
        }
    }

    state.set(RelayState::Closing);

    if forwarded == 0 && !fault {
        // Nothing was ever written: hold the connection until the backend's
        // close completes so the resource is not leaked for an empty body.
        let _ = read_task.await;
    } else {
        // Close strictly after the last completed write; shutdown flushes
        // whatever the write half still buffers before signalling EOF.
        if let Err(e) = backend.shutdown().await {
            tracing::debug!(session_id = %session_id, error = %e, "Backend shutdown failed");
        }
    }

    state.set(RelayState::Closed);
    tracing::debug!(
        session_id = %session_id,
        bytes_forwarded = forwarded,
        "Session finished"
    );
}
