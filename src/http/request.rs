//! Inbound exchange identification.
//!
//! # Responsibilities
//! - Attach a unique session ID to every inbound exchange
//! - Honor a client-supplied `x-session-id` header when present
//! - Expose the ID via request extensions for handlers and logs

use http::{HeaderValue, Request};
use std::task::{Context, Poll};
use tower::{Layer, Service};
use uuid::Uuid;

/// Header carrying the session ID.
pub const X_SESSION_ID: &str = "x-session-id";

/// Identifier of one tunnel exchange, used in logs and metrics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionId(pub String);

impl SessionId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Layer injecting a [`SessionId`] into every request.
#[derive(Debug, Clone, Copy, Default)]
pub struct SessionIdLayer;

impl<S> Layer<S> for SessionIdLayer {
    type Service = SessionIdService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        SessionIdService { inner }
    }
}

/// Service produced by [`SessionIdLayer`].
#[derive(Debug, Clone)]
pub struct SessionIdService<S> {
    inner: S,
}

impl<S, B> Service<Request<B>> for SessionIdService<S>
where
    S: Service<Request<B>>,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = S::Future;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut request: Request<B>) -> Self::Future {
        let id = request
            .headers()
            .get(X_SESSION_ID)
            .and_then(|v| v.to_str().ok())
            .map(|s| SessionId(s.to_string()))
            .unwrap_or_else(SessionId::generate);

        if !request.headers().contains_key(X_SESSION_ID) {
            if let Ok(value) = HeaderValue::from_str(&id.0) {
                request.headers_mut().insert(X_SESSION_ID, value);
            }
        }
        request.extensions_mut().insert(id);

        self.inner.call(request)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::convert::Infallible;
    use tower::ServiceExt;

    #[derive(Clone)]
    struct Capture;

    impl Service<Request<()>> for Capture {
        type Response = Option<SessionId>;
        type Error = Infallible;
        type Future = std::future::Ready<Result<Self::Response, Infallible>>;

        fn poll_ready(&mut self, _: &mut Context<'_>) -> Poll<Result<(), Infallible>> {
            Poll::Ready(Ok(()))
        }

        fn call(&mut self, request: Request<()>) -> Self::Future {
            std::future::ready(Ok(request.extensions().get::<SessionId>().cloned()))
        }
    }

    #[tokio::test]
    async fn generates_an_id_when_absent() {
        let service = SessionIdLayer.layer(Capture);
        let id = service
            .oneshot(Request::builder().body(()).unwrap())
            .await
            .unwrap();
        assert!(id.is_some());
    }

    #[tokio::test]
    async fn honors_supplied_id() {
        let service = SessionIdLayer.layer(Capture);
        let id = service
            .oneshot(
                Request::builder()
                    .header(X_SESSION_ID, "given-id")
                    .body(())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(id, Some(SessionId("given-id".to_string())));
    }
}
