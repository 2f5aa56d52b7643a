//! Drain gate and the request interception stage.
//!
//! `DrainLayer` must be the outermost layer of the router. While the gate is
//! open requests pass straight through; once shutdown has begun every new
//! request is answered with a 503 and the inner service is never called.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll};

use axum::{
    http::{header, Request, StatusCode},
    response::{IntoResponse, Response},
};
use futures_util::future::{ready, Either, Ready};
use tower::{Layer, Service};

/// Body of the response sent while draining.
pub const SHUTDOWN_MESSAGE: &str = "Server is in the process of shutting down";

/// Shared shutdown flag. Written once, read on every request.
#[derive(Debug, Clone, Default)]
pub struct DrainGate {
    draining: Arc<AtomicBool>,
}

impl DrainGate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_draining(&self) -> bool {
        self.draining.load(Ordering::Acquire)
    }

    /// Flip the gate. Returns `true` only for the call that flipped it.
    pub(crate) fn begin_drain(&self) -> bool {
        !self.draining.swap(true, Ordering::AcqRel)
    }
}

/// The response for requests that arrive during shutdown.
pub fn shutdown_response() -> Response {
    (
        StatusCode::SERVICE_UNAVAILABLE,
        [(header::CONNECTION, "close")],
        SHUTDOWN_MESSAGE,
    )
        .into_response()
}

/// Tower layer that rejects requests once the gate is closed.
#[derive(Debug, Clone)]
pub struct DrainLayer {
    gate: DrainGate,
}

impl DrainLayer {
    pub fn new(gate: DrainGate) -> Self {
        Self { gate }
    }
}

impl<S> Layer<S> for DrainLayer {
    type Service = DrainService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        DrainService {
            inner,
            gate: self.gate.clone(),
        }
    }
}

/// Service produced by [`DrainLayer`].
#[derive(Debug, Clone)]
pub struct DrainService<S> {
    inner: S,
    gate: DrainGate,
}

impl<S, B> Service<Request<B>> for DrainService<S>
where
    S: Service<Request<B>, Response = Response>,
{
    type Response = Response;
    type Error = S::Error;
    type Future = Either<Ready<Result<Response, S::Error>>, S::Future>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, request: Request<B>) -> Self::Future {
        if self.gate.is_draining() {
            tracing::debug!(
                method = %request.method(),
                path = %request.uri().path(),
                "Rejecting request during shutdown"
            );
            return Either::Left(ready(Ok(shutdown_response())));
        }

        Either::Right(self.inner.call(request))
    }
}
