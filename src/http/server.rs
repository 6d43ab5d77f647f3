//! HTTP server setup.
//!
//! # Responsibilities
//! - Create the Axum router with the tunnel route
//! - Wire up middleware (tracing, session ID)
//! - Serve with graceful shutdown
//! - Enforce the `max_connections` session limit via semaphore
//! - Hand each inbound exchange to a fresh relay session
//!
//! The server hosts exactly one route: the configured tunnel path. Anything
//! else falls through to Axum's 404; generic hosting is not this crate's job.

use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::{Method, Request, StatusCode},
    response::Response,
    routing::any,
    Router,
};
use tokio::net::TcpListener;
use tokio::sync::{broadcast, Semaphore};
use tower_http::trace::TraceLayer;

use crate::config::{ConfigError, TunnelServerConfig};
use crate::http::request::{SessionId, SessionIdLayer};
use crate::lifecycle::wait_for_shutdown;
use crate::observability::metrics;
use crate::relay::{RelaySettings, TunnelSession};

/// Application state injected into the tunnel handler.
#[derive(Clone)]
pub struct AppState {
    /// Immutable relay settings shared by every session.
    pub settings: Arc<RelaySettings>,
    /// Permits for concurrently running sessions (`max_connections`).
    pub capacity: Arc<Semaphore>,
}

/// HTTP server hosting the tunnel route.
pub struct HttpServer {
    router: Router,
    config: TunnelServerConfig,
}

impl HttpServer {
    /// Build the server from a validated configuration.
    ///
    /// The endpoint descriptor is resolved here, once; sessions share the
    /// resolved address read-only.
    pub fn new(config: TunnelServerConfig) -> Result<Self, ConfigError> {
        let settings = Arc::new(RelaySettings::from_config(&config.tunnel)?);

        tracing::info!(
            endpoint = %settings.backend,
            connect_attempts = settings.connect_attempts,
            retry_delay_ms = settings.retry_delay.as_millis() as u64,
            path = %config.tunnel.path,
            "Tunnel relay configured"
        );

        let state = AppState {
            settings,
            capacity: Arc::new(Semaphore::new(config.listener.max_connections)),
        };
        let router = Self::build_router(&config, state);
        Ok(Self { router, config })
    }

    /// Build the Axum router with all middleware layers.
    fn build_router(config: &TunnelServerConfig, state: AppState) -> Router {
        Router::new()
            .route(&config.tunnel.path, any(tunnel_handler))
            .with_state(state)
            .layer(SessionIdLayer)
            .layer(TraceLayer::new_for_http())
    }

    /// Run the server, accepting connections on the given listener.
    pub async fn run(
        self,
        listener: TcpListener,
        shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            path = %self.config.tunnel.path,
            "HTTP server starting"
        );

        axum::serve(listener, self.router.into_make_service())
            .with_graceful_shutdown(wait_for_shutdown(shutdown))
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// Tunnel route handler: one fresh session per inbound exchange.
///
/// Each session takes one capacity permit before anything else runs; an
/// exchange beyond `max_connections` is refused without dialing the backend.
async fn tunnel_handler(State(state): State<AppState>, request: Request<Body>) -> Response {
    let session_id = request
        .extensions()
        .get::<SessionId>()
        .cloned()
        .unwrap_or_else(SessionId::generate);

    tracing::debug!(
        session_id = %session_id,
        method = %request.method(),
        "Tunnel exchange received"
    );

    // Non-POST exchanges never reach the backend, so admission (405) takes
    // precedence over capacity and no permit is consumed for them.
    let permit = if request.method() == Method::POST {
        match Arc::clone(&state.capacity).try_acquire_owned() {
            Ok(permit) => Some(permit),
            Err(_) => {
                tracing::warn!(session_id = %session_id, "Session capacity exhausted");
                metrics::record_session("over_capacity");
                return Response::builder()
                    .status(StatusCode::SERVICE_UNAVAILABLE)
                    .body(Body::empty())
                    .unwrap();
            }
        }
    } else {
        None
    };

    let session = TunnelSession::new(session_id.0, Arc::clone(&state.settings));
    session.run(request, permit).await
}
