//! HTTP server setup.
//!
//! # Responsibilities
//! - Wire up middleware (drain gate, tracing, request timeout)
//! - Bind the router to a listener
//! - Expose a close handle the shutdown coordinator can await
//!
//! # Design Decisions
//! - Draining of in-flight requests is axum's graceful shutdown
//! - `close()` resolves only after `axum::serve` has returned

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use futures_util::future::{BoxFuture, FutureExt};
use tokio::net::TcpListener;
use tokio::sync::watch;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

use crate::config::ServiceConfig;
use crate::http::drain::DrainLayer;
use crate::lifecycle::ServerHandle;

/// Close capability for a running [`HttpServer`].
#[derive(Debug, Clone)]
pub struct ServeHandle {
    close_tx: Arc<watch::Sender<bool>>,
    closed_rx: watch::Receiver<bool>,
}

impl ServerHandle for ServeHandle {
    fn close(&self) -> BoxFuture<'static, ()> {
        self.close_tx.send_replace(true);
        let mut closed = self.closed_rx.clone();
        async move {
            // An error means the server is gone, which is closed enough.
            let _ = closed.wait_for(|done| *done).await;
        }
        .boxed()
    }
}

/// HTTP server with a graceful close handle.
pub struct HttpServer {
    config: ServiceConfig,
    handle: ServeHandle,
    closed_tx: watch::Sender<bool>,
}

impl HttpServer {
    /// Create a new HTTP server with the given configuration.
    pub fn new(config: ServiceConfig) -> Self {
        let (close_tx, _) = watch::channel(false);
        let (closed_tx, closed_rx) = watch::channel(false);
        Self {
            config,
            handle: ServeHandle {
                close_tx: Arc::new(close_tx),
                closed_rx,
            },
            closed_tx,
        }
    }

    /// Handle to pass to the shutdown coordinator.
    pub fn handle(&self) -> ServeHandle {
        self.handle.clone()
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    /// Apply middleware; the drain layer goes on last so it runs first.
    #[allow(deprecated)]
    fn build_router(config: &ServiceConfig, app: Router, drain: DrainLayer) -> Router {
        app.layer(TimeoutLayer::new(Duration::from_secs(config.timeouts.request_secs)))
            .layer(TraceLayer::new_for_http())
            .layer(drain)
    }

    /// Serve `app` until the close handle is used, then drain and return.
    pub async fn run(
        self,
        listener: TcpListener,
        app: Router,
        drain: DrainLayer,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        let router = Self::build_router(&self.config, app, drain);
        let mut close_rx = self.handle.close_tx.subscribe();

        let result = axum::serve(listener, router)
            .with_graceful_shutdown(async move {
                let _ = close_rx.wait_for(|closing| *closing).await;
                tracing::info!("Close requested, waiting for in-flight requests");
            })
            .await;

        self.closed_tx.send_replace(true);
        result?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}
