//! Background worker for periodic and on-demand tasks.
//!
//! `BackgroundWorker<R>` drives a `BackgroundRunnable` from an mpsc channel
//! plus a periodic tick. `HealthPoller` is the runnable that keeps a
//! `HealthPublisher` current for status readers.

use std::sync::Arc;

use async_trait::async_trait;
use berth_core::ConnectionError;
use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};

use super::registry::ServiceRegistry;
use super::report::HealthSnapshot;

// ---------------------------------------------------------------------------
// BackgroundRunnable trait
// ---------------------------------------------------------------------------

/// Task handler executed by `BackgroundWorker`.
#[async_trait]
pub trait BackgroundRunnable: Send + 'static {
    /// The type of task this runnable processes.
    type Task: Send + 'static;

    /// Process a single task.
    async fn run(&mut self, task: Self::Task);

    /// Called on each tick interval. Default is a no-op.
    async fn on_tick(&mut self) {}

    /// Called once when the worker is shutting down. Default is a no-op.
    async fn shutdown(&mut self) {}
}

// ---------------------------------------------------------------------------
// BackgroundWorker
// ---------------------------------------------------------------------------

/// Spawned task that feeds submitted tasks and periodic ticks to a runnable
/// until stopped.
pub struct BackgroundWorker<R: BackgroundRunnable> {
    tx: Option<mpsc::Sender<R::Task>>,
    shutdown_tx: Option<tokio::sync::oneshot::Sender<()>>,
    handle: Option<tokio::task::JoinHandle<()>>,
}

impl<R: BackgroundRunnable> BackgroundWorker<R> {
    /// Start the worker with the given runnable and tick interval.
    ///
    /// The first tick fires one full interval after start. The task channel
    /// holds up to 64 pending tasks.
    pub fn start(mut runnable: R, tick_interval_ms: u64) -> Self {
        let (tx, mut rx) = mpsc::channel::<R::Task>(64);
        let (shutdown_tx, mut shutdown_rx) = tokio::sync::oneshot::channel::<()>();

        let handle = tokio::spawn(async move {
            let period = std::time::Duration::from_millis(tick_interval_ms.max(1));
            let mut ticks = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
            ticks.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    task = rx.recv() => {
                        match task {
                            Some(t) => runnable.run(t).await,
                            None => break,
                        }
                    }
                    _ = ticks.tick() => {
                        runnable.on_tick().await;
                    }
                    _ = &mut shutdown_rx => {
                        break;
                    }
                }
            }

            runnable.shutdown().await;
        });

        Self {
            tx: Some(tx),
            shutdown_tx: Some(shutdown_tx),
            handle: Some(handle),
        }
    }

    /// Submit a task to the worker.
    ///
    /// # Errors
    ///
    /// Returns an error if the worker has been stopped.
    pub async fn submit(&self, task: R::Task) -> anyhow::Result<()> {
        match &self.tx {
            Some(tx) => tx
                .send(task)
                .await
                .map_err(|_| anyhow::anyhow!("worker channel closed")),
            None => Err(anyhow::anyhow!("worker not running")),
        }
    }

    /// Stop the worker and wait for its task to finish.
    pub async fn stop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        self.tx.take();
        if let Some(handle) = self.handle.take() {
            let _ = handle.await;
        }
    }
}

// ---------------------------------------------------------------------------
// HealthPoller
// ---------------------------------------------------------------------------

/// On-demand work accepted by the health poller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollTask {
    /// Probe every service now instead of waiting for the next tick.
    RefreshNow,
    /// Reconnect one service, then refresh.
    Reconnect { id: String },
}

/// Latest `HealthSnapshot` of a registry, shared between the poller and the
/// status handlers.
///
/// Every refresh probes the registry, logs services whose availability
/// changed, and replaces the published snapshot. Clones share one snapshot.
#[derive(Clone)]
pub struct HealthPublisher {
    registry: Arc<ServiceRegistry>,
    snapshot_tx: Arc<watch::Sender<HealthSnapshot>>,
}

impl HealthPublisher {
    /// Creates a publisher holding an empty snapshot.
    #[must_use]
    pub fn new(registry: Arc<ServiceRegistry>) -> Self {
        let (snapshot_tx, _rx) = watch::channel(HealthSnapshot::default());
        Self {
            registry,
            snapshot_tx: Arc::new(snapshot_tx),
        }
    }

    /// The most recently published snapshot.
    #[must_use]
    pub fn latest(&self) -> HealthSnapshot {
        self.snapshot_tx.borrow().clone()
    }

    /// Receiver notified on every publish.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<HealthSnapshot> {
        self.snapshot_tx.subscribe()
    }

    /// Probes every service and publishes the result.
    pub async fn refresh(&self) -> HealthSnapshot {
        let snapshot = self.registry.health_check_all().await;

        {
            let previous = self.snapshot_tx.borrow();
            for health in snapshot.iter() {
                match (previous.get(&health.id), health.available) {
                    (Some(before), now) if before == now => {}
                    (_, true) => info!(service = %health.id, "service is healthy"),
                    (_, false) => warn!(
                        service = %health.id,
                        reason = health.reason.as_deref().unwrap_or("unknown"),
                        "service is unhealthy"
                    ),
                }
            }
        }

        self.snapshot_tx.send_replace(snapshot.clone());
        snapshot
    }

    /// Reconnects one service and publishes fresh health before returning.
    ///
    /// Returns `None` without refreshing if `id` is not registered.
    pub async fn reconnect(&self, id: &str) -> Option<Result<(), ConnectionError>> {
        let outcome = self.registry.reconnect(id).await?;
        self.refresh().await;
        Some(outcome)
    }
}

/// Runnable that keeps a `HealthPublisher` current: refreshes on every tick
/// and on demand.
pub struct HealthPoller {
    publisher: HealthPublisher,
}

impl HealthPoller {
    /// Creates a poller and the receiver that observes its snapshots. The
    /// receiver starts with an empty snapshot.
    #[must_use]
    pub fn new(registry: Arc<ServiceRegistry>) -> (Self, watch::Receiver<HealthSnapshot>) {
        let publisher = HealthPublisher::new(registry);
        let snapshot_rx = publisher.subscribe();
        (Self { publisher }, snapshot_rx)
    }

    /// Handle onto the snapshot this poller keeps current.
    #[must_use]
    pub fn publisher(&self) -> HealthPublisher {
        self.publisher.clone()
    }
}

#[async_trait]
impl BackgroundRunnable for HealthPoller {
    type Task = PollTask;

    async fn run(&mut self, task: PollTask) {
        match task {
            PollTask::RefreshNow => {
                self.publisher.refresh().await;
            }
            PollTask::Reconnect { id } => {
                if self.publisher.reconnect(&id).await.is_none() {
                    warn!(service = %id, "reconnect requested for unknown service");
                    self.publisher.refresh().await;
                }
            }
        }
    }

    async fn on_tick(&mut self) {
        self.publisher.refresh().await;
    }

    async fn shutdown(&mut self) {
        debug!("health poller stopped");
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
