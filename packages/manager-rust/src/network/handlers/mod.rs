//! HTTP handler definitions for the status server.
//!
//! `StatusState` is the shared state carried through axum extractors.

pub mod health;
pub mod services;

pub use health::{health_handler, liveness_handler, readiness_handler};
pub use services::reconnect_handler;

use std::sync::Arc;
use std::time::Instant;

use super::LifecycleController;
use crate::service::HealthPublisher;

/// Shared state passed to all axum handlers via `State` extraction.
///
/// Holds `Arc`s only, so cloning is cheap.
#[derive(Clone)]
pub struct StatusState {
    /// Manager lifecycle state.
    pub lifecycle: Arc<LifecycleController>,
    /// Registry health, shared with the background poller.
    pub health: HealthPublisher,
    /// Process start time, used for uptime calculation.
    pub start_time: Instant,
}
