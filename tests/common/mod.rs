//! Shared utilities for tunnel integration testing.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

use http_tunnel::config::TunnelServerConfig;
use http_tunnel::endpoint::local::LocalListener;
use http_tunnel::http::HttpServer;
use http_tunnel::lifecycle::Shutdown;

/// Build a server config pointing at the given local endpoint name.
pub fn tunnel_config(endpoint_name: &str, connect_attempts: u32, retry_delay_ms: u64) -> TunnelServerConfig {
    let mut config = TunnelServerConfig::default();
    config.tunnel.endpoint = format!("local:{endpoint_name}");
    config.tunnel.connect_attempts = connect_attempts;
    config.tunnel.retry_delay_ms = retry_delay_ms;
    config
}

/// Spawn the tunnel server on an ephemeral port.
pub async fn spawn_server(config: TunnelServerConfig) -> (SocketAddr, Shutdown) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let shutdown = Shutdown::new();
    let rx = shutdown.subscribe();
    let server = HttpServer::new(config).unwrap();
    tokio::spawn(async move {
        let _ = server.run(listener, rx).await;
    });
    (addr, shutdown)
}

/// Bind a local backend that echoes every byte back, closing when the
/// tunnel side closes. Returns a counter of accepted connections.
#[allow(dead_code)]
pub fn spawn_echo_backend(name: &str) -> Arc<AtomicU32> {
    let mut listener = LocalListener::bind(name).unwrap();
    let accepted = Arc::new(AtomicU32::new(0));
    let counter = accepted.clone();
    tokio::spawn(async move {
        while let Some(mut stream) = listener.accept().await {
            counter.fetch_add(1, Ordering::SeqCst);
            tokio::spawn(async move {
                let mut buf = vec![0u8; 8 * 1024];
                loop {
                    match stream.read(&mut buf).await {
                        Ok(0) | Err(_) => break,
                        Ok(n) => {
                            if stream.write_all(&buf[..n]).await.is_err() {
                                break;
                            }
                        }
                    }
                }
                let _ = stream.shutdown().await;
            });
        }
    });
    accepted
}

/// Bind a local backend that pushes the given chunks and closes.
#[allow(dead_code)]
pub fn spawn_push_backend(name: &str, chunks: Vec<Vec<u8>>) {
    let mut listener = LocalListener::bind(name).unwrap();
    tokio::spawn(async move {
        while let Some(mut stream) = listener.accept().await {
            let chunks = chunks.clone();
            tokio::spawn(async move {
                for chunk in &chunks {
                    if stream.write_all(chunk).await.is_err() {
                        return;
                    }
                }
                let _ = stream.shutdown().await;
            });
        }
    });
}
