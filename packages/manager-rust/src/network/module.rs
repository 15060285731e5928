//! Status server with deferred startup.
//!
//! `new()` assembles state, `start()` binds the TCP listener, and `serve()`
//! accepts connections until the shutdown future resolves. Binding before
//! serving lets callers learn the OS-assigned port first.

use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

use axum::routing::{get, post};
use axum::Router;
use tokio::net::TcpListener;
use tracing::info;

use super::config::StatusConfig;
use super::handlers::{
    health_handler, liveness_handler, readiness_handler, reconnect_handler, StatusState,
};
use super::lifecycle::LifecycleController;
use super::middleware::build_http_layers;
use crate::service::HealthPublisher;

/// Owns the status HTTP server lifecycle.
pub struct StatusModule {
    config: StatusConfig,
    listener: Option<TcpListener>,
    state: StatusState,
}

impl StatusModule {
    #[must_use]
    pub fn new(
        config: StatusConfig,
        lifecycle: Arc<LifecycleController>,
        health: HealthPublisher,
    ) -> Self {
        Self {
            config,
            listener: None,
            state: StatusState {
                lifecycle,
                health,
                start_time: Instant::now(),
            },
        }
    }

    /// Assembles the router.
    ///
    /// Routes:
    /// - `GET /health` -- lifecycle state and per-service health JSON
    /// - `GET /health/live` -- liveness probe
    /// - `GET /health/ready` -- readiness probe
    /// - `POST /services/{id}/reconnect` -- reconnect one service
    pub fn build_router(&self) -> Router {
        Router::new()
            .route("/health", get(health_handler))
            .route("/health/live", get(liveness_handler))
            .route("/health/ready", get(readiness_handler))
            .route("/services/{id}/reconnect", post(reconnect_handler))
            .layer(build_http_layers(&self.config))
            .with_state(self.state.clone())
    }

    /// Binds the TCP listener and returns the bound port.
    ///
    /// # Errors
    ///
    /// Returns an error if the address cannot be bound.
    pub async fn start(&mut self) -> anyhow::Result<u16> {
        let addr = format!("{}:{}", self.config.host, self.config.port);
        let listener = TcpListener::bind(&addr).await?;
        let port = listener.local_addr()?.port();

        info!("status server bound to {}:{}", self.config.host, port);

        self.listener = Some(listener);
        Ok(port)
    }

    /// Serves requests until `shutdown` resolves.
    ///
    /// # Errors
    ///
    /// Returns an error if `start()` was not called first or the server hits
    /// a fatal I/O error.
    pub async fn serve(
        mut self,
        shutdown: impl Future<Output = ()> + Send + 'static,
    ) -> anyhow::Result<()> {
        let router = self.build_router();
        let listener = self
            .listener
            .take()
            .ok_or_else(|| anyhow::anyhow!("start() must be called before serve()"))?;

        axum::serve(listener, router)
            .with_graceful_shutdown(shutdown)
            .await?;

        info!("status server stopped");
        Ok(())
    }
}
