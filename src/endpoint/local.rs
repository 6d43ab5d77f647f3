//! In-process named endpoints.
//!
//! # Responsibilities
//! - Maintain the process-wide registry of bound endpoint names
//! - `bind` a name and accept connections to it
//! - `connect` to a bound name, yielding one half of a duplex pipe
//!
//! # Design Decisions
//! - Built on `tokio::io::duplex`; no real socket is involved
//! - A name is exclusive: binding it twice fails with `AddrInUse`
//! - Connecting to an unbound name fails with `ConnectionRefused`, which is
//!   what the relay's connect-retry loop expects from a down backend

use std::io;
use std::sync::LazyLock;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tokio::io::DuplexStream;
use tokio::sync::mpsc;

/// Buffer capacity of each direction of a local pipe.
const PIPE_CAPACITY: usize = 64 * 1024;

/// Pending-accept queue depth per listener.
const BACKLOG: usize = 32;

static ENDPOINTS: LazyLock<DashMap<String, mpsc::Sender<DuplexStream>>> =
    LazyLock::new(DashMap::new);

/// A bound in-process endpoint accepting tunnel backend connections.
#[derive(Debug)]
pub struct LocalListener {
    name: String,
    incoming: mpsc::Receiver<DuplexStream>,
}

impl LocalListener {
    /// Bind the given name, registering it process-wide.
    pub fn bind(name: impl Into<String>) -> io::Result<Self> {
        let name = name.into();
        let (tx, rx) = mpsc::channel(BACKLOG);
        match ENDPOINTS.entry(name.clone()) {
            Entry::Occupied(_) => Err(io::Error::new(
                io::ErrorKind::AddrInUse,
                format!("local endpoint {name:?} is already bound"),
            )),
            Entry::Vacant(slot) => {
                slot.insert(tx);
                tracing::debug!(endpoint = %name, "Local endpoint bound");
                Ok(Self { name, incoming: rx })
            }
        }
    }

    /// Accept the next inbound connection.
    ///
    /// Returns `None` once the listener has been unbound and all pending
    /// connections were drained.
    pub async fn accept(&mut self) -> Option<DuplexStream> {
        self.incoming.recv().await
    }

    /// The name this listener is bound to.
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl Drop for LocalListener {
    fn drop(&mut self) {
        ENDPOINTS.remove(&self.name);
        tracing::debug!(endpoint = %self.name, "Local endpoint unbound");
    }
}

/// Connect to a bound local endpoint.
pub async fn connect(name: &str) -> io::Result<DuplexStream> {
    let acceptor = ENDPOINTS
        .get(name)
        .map(|entry| entry.value().clone())
        .ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::ConnectionRefused,
                format!("no local endpoint bound as {name:?}"),
            )
        })?;

    let (client, server) = tokio::io::duplex(PIPE_CAPACITY);
    acceptor.send(server).await.map_err(|_| {
        io::Error::new(
            io::ErrorKind::ConnectionRefused,
            format!("local endpoint {name:?} stopped accepting"),
        )
    })?;
    Ok(client)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    #[tokio::test]
    async fn connect_reaches_listener() {
        let mut listener = LocalListener::bind("test-connect").unwrap();
        let mut client = connect("test-connect").await.unwrap();
        let mut server = listener.accept().await.unwrap();

        client.write_all(b"ping").await.unwrap();
        let mut buf = [0u8; 4];
        server.read_exact(&mut buf).await.unwrap();
        assert_eq!(&buf, b"ping");
    }

    #[tokio::test]
    async fn duplicate_bind_fails() {
        let _listener = LocalListener::bind("test-dup").unwrap();
        let err = LocalListener::bind("test-dup").unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::AddrInUse);
    }

    #[tokio::test]
    async fn connect_to_unbound_name_is_refused() {
        let err = connect("test-unbound").await.unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::ConnectionRefused);
    }

    #[tokio::test]
    async fn drop_unbinds_the_name() {
        {
            let _listener = LocalListener::bind("test-rebind").unwrap();
        }
        let listener = LocalListener::bind("test-rebind").unwrap();
        assert_eq!(listener.name(), "test-rebind");
    }
}
