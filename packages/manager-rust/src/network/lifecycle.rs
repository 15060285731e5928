//! Manager lifecycle state and coordinated service shutdown.
//!
//! Uses `ArcSwap` for lock-free state transitions and a `watch` channel to
//! tell long-running loops that shutdown has begun.

use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwap;
use berth_core::DisconnectionError;
use tokio::sync::watch;
use tracing::{info, warn};

use crate::service::{BatchReport, ServiceRegistry};

/// Manager lifecycle state.
///
/// State machine: Starting -> Running -> Stopping -> Stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    /// Services are being registered and started.
    Starting,
    /// `start_all` has run; health polling is active.
    Running,
    /// Shutdown was triggered and services are being stopped.
    Stopping,
    /// `stop_all` completed.
    Stopped,
}

impl LifecycleState {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Starting => "starting",
            Self::Running => "running",
            Self::Stopping => "stopping",
            Self::Stopped => "stopped",
        }
    }
}

/// Tracks the manager lifecycle and broadcasts the shutdown signal.
#[derive(Debug)]
pub struct LifecycleController {
    shutdown_signal: watch::Sender<bool>,
    state: Arc<ArcSwap<LifecycleState>>,
}

impl LifecycleController {
    /// Creates a controller in the `Starting` state.
    #[must_use]
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self {
            shutdown_signal: tx,
            state: Arc::new(ArcSwap::from_pointee(LifecycleState::Starting)),
        }
    }

    pub fn set_running(&self) {
        self.state.store(Arc::new(LifecycleState::Running));
    }

    /// Receiver notified when shutdown is triggered.
    #[must_use]
    pub fn shutdown_receiver(&self) -> watch::Receiver<bool> {
        self.shutdown_signal.subscribe()
    }

    /// Moves to `Stopping` and signals every shutdown receiver.
    pub fn trigger_shutdown(&self) {
        self.state.store(Arc::new(LifecycleState::Stopping));
        // Receivers may already be gone.
        let _ = self.shutdown_signal.send(true);
    }

    #[must_use]
    pub fn state(&self) -> LifecycleState {
        **self.state.load()
    }

    /// Triggers shutdown (if not already triggered) and stops every service,
    /// waiting at most `timeout` for the whole batch.
    ///
    /// Returns the batch report and moves to `Stopped` when the batch
    /// finishes in time. Returns `None` and stays `Stopping` otherwise.
    pub async fn stop_services(
        &self,
        registry: &ServiceRegistry,
        timeout: Duration,
    ) -> Option<BatchReport<DisconnectionError>> {
        if self.state() != LifecycleState::Stopping {
            self.trigger_shutdown();
        }

        if let Ok(report) = tokio::time::timeout(timeout, registry.stop_all()).await {
            self.state.store(Arc::new(LifecycleState::Stopped));
            info!(
                stopped = report.succeeded().len(),
                failed = report.failed().len(),
                "all container services stopped"
            );
            Some(report)
        } else {
            warn!(
                timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
                "timed out stopping container services"
            );
            None
        }
    }
}

impl Default for LifecycleController {
    fn default() -> Self {
        Self::new()
    }
}
