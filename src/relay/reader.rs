//! Inbound byte reader.
//!
//! Adapts the inbound request-body stream into discrete, non-empty chunks.
//! A chunk already buffered is returned immediately, otherwise the single
//! await on the underlying stream is the only suspension point, and a
//! confirmed end-of-input is a clean `None`, never an error. Zero-length
//! chunks are never produced.

use bytes::Bytes;
use futures_util::{Stream, StreamExt};

/// Reader yielding the inbound body as ordered, non-empty chunks.
pub struct InboundByteReader<S> {
    stream: S,
    buffered: Option<Bytes>,
}

impl<S, E> InboundByteReader<S>
where
    S: Stream<Item = Result<Bytes, E>> + Unpin,
{
    pub fn new(stream: S) -> Self {
        Self {
            stream,
            buffered: None,
        }
    }

    /// Push a chunk back; the next call to [`next_chunk`] returns it first.
    ///
    /// Empty chunks are discarded to preserve the non-empty guarantee.
    ///
    /// [`next_chunk`]: Self::next_chunk
    pub fn unread(&mut self, chunk: Bytes) {
        if !chunk.is_empty() {
            self.buffered = Some(chunk);
        }
    }

    /// Next non-empty chunk, or `None` at end-of-input.
    pub async fn next_chunk(&mut self) -> Option<Result<Bytes, E>> {
        if let Some(chunk) = self.buffered.take() {
            return Some(Ok(chunk));
        }
        loop {
            match self.stream.next().await? {
                // Transports may emit empty frames; they carry no data and
                // must not be surfaced as chunks.
                Ok(chunk) if chunk.is_empty() => continue,
                item => return Some(item),
            }
        }
    }
}
