//! Outbound tunnel client.
//!
//! Dials a tunnel server, performs the HTTP exchange the relay expects
//! (streaming POST to the configured path), and exposes the established
//! tunnel as a chunk-level byte stream. TLS is applied iff the configuration
//! carries a context; the `Host` header is sent iff a server name is set.

use std::convert::Infallible;
use std::io;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use futures_channel::mpsc;
use futures_util::SinkExt;
use http_body_util::{BodyExt, StreamBody};
use hyper::body::{Frame, Incoming};
use hyper::client::conn::http1;
use hyper::header;
use hyper::{Request, StatusCode};
use hyper_util::rt::TokioIo;
use rustls::pki_types::ServerName;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;
use tokio_rustls::TlsConnector;

use crate::client::config::ClientTunnelConfig;

/// Depth of the outbound request-body channel.
const OUTBOUND_DEPTH: usize = 16;

type OutboundFrame = Result<Frame<Bytes>, Infallible>;

trait ClientIo: AsyncRead + AsyncWrite + Send + Unpin {}
impl<T: AsyncRead + AsyncWrite + Send + Unpin> ClientIo for T {}

/// Error establishing or driving a client tunnel.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("connect timed out after {0:?}")]
    ConnectTimeout(Duration),

    #[error("HTTP error: {0}")]
    Http(#[from] hyper::Error),

    #[error("invalid tunnel request: {0}")]
    Request(#[from] http::Error),

    #[error("TLS requires a valid serverName, got {0:?}")]
    InvalidServerName(Option<String>),

    #[error("tunnel rejected with status {0}")]
    Rejected(StatusCode),

    #[error("tunnel closed")]
    Closed,
}

/// Client endpoint of one tunnel exchange.
pub struct TunnelClient {
    config: ClientTunnelConfig,
}

impl TunnelClient {
    pub fn new(config: ClientTunnelConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ClientTunnelConfig {
        &self.config
    }

    /// Dial `addr` and establish the tunnel exchange.
    pub async fn connect(&self, addr: &str) -> Result<TunnelStream, ClientError> {
        let timeout = Duration::from_millis(self.config.transport().connect_timeout_ms);
        let tcp = tokio::time::timeout(timeout, TcpStream::connect(addr))
            .await
            .map_err(|_| ClientError::ConnectTimeout(timeout))??;
        tcp.set_nodelay(self.config.transport().tcp_nodelay)?;

        let stream: Box<dyn ClientIo> = match self.config.tls_context() {
            Some(ctx) => {
                let host = self
                    .config
                    .server_name()
                    .ok_or_else(|| ClientError::InvalidServerName(None))?;
                let server_name = ServerName::try_from(host.to_string()).map_err(|_| {
                    ClientError::InvalidServerName(Some(host.to_string()))
                })?;
                let connector = TlsConnector::from(Arc::clone(ctx.config()));
                Box::new(connector.connect(server_name, tcp).await?)
            }
            None => Box::new(tcp),
        };

        let (mut sender, conn) = http1::handshake(TokioIo::new(stream)).await?;
        tokio::spawn(async move {
            if let Err(e) = conn.await {
                tracing::debug!(error = %e, "Tunnel connection ended");
            }
        });

        let (outbound, outbound_rx) = mpsc::channel::<OutboundFrame>(OUTBOUND_DEPTH);

        let mut builder = Request::post(self.config.server_path())
            .header(header::CONTENT_TYPE, "application/octet-stream");
        if let Some(host) = self.config.server_name() {
            builder = builder.header(header::HOST, host);
        }
        let request = builder.body(StreamBody::new(outbound_rx))?;

        let response = sender.send_request(request).await?;
        if response.status() != StatusCode::OK {
            return Err(ClientError::Rejected(response.status()));
        }

        tracing::debug!(addr, path = %self.config.server_path(), "Tunnel established");
        Ok(TunnelStream {
            outbound,
            inbound: response.into_body(),
        })
    }
}

/// An established tunnel, seen as ordered byte chunks in both directions.
#[derive(Debug)]
pub struct TunnelStream {
    outbound: mpsc::Sender<OutboundFrame>,
    inbound: Incoming,
}

impl TunnelStream {
    /// Send one chunk towards the backend.
    pub async fn send(&mut self, chunk: Bytes) -> Result<(), ClientError> {
        self.outbound
            .send(Ok(Frame::data(chunk)))
            .await
            .map_err(|_| ClientError::Closed)
    }

    /// Receive the next non-empty chunk from the backend, `None` at EOF.
    pub async fn recv(&mut self) -> Option<Result<Bytes, ClientError>> {
        loop {
            match self.inbound.frame().await? {
                Ok(frame) => match frame.into_data() {
                    Ok(data) if !data.is_empty() => return Some(Ok(data)),
                    // Empty data frames and trailers carry nothing to relay.
                    _ => continue,
                },
                Err(e) => return Some(Err(ClientError::Http(e))),
            }
        }
    }

    /// Signal end of the outbound direction. The inbound direction stays
    /// readable until the backend closes.
    pub fn finish(&mut self) {
        self.outbound.close_channel();
    }
}
