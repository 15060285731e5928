use std::sync::Arc;
use std::time::{Duration, Instant};

use berth_core::{Availability, ConnectionError, DisconnectionError, ServiceClient};
use dashmap::DashMap;
use parking_lot::RwLock;
use tracing::{debug, error, info, info_span, warn, Instrument};

use super::report::{BatchReport, HealthSnapshot, ServiceHealth};

// ---------------------------------------------------------------------------
// ServiceRegistry
// ---------------------------------------------------------------------------

/// Registry of container service clients keyed by identifier.
///
/// Identifiers are unique: registering an existing identifier replaces the
/// client but keeps the identifier's original position. Services are started
/// and probed in registration order and stopped in reverse order.
///
/// Batch operations isolate faults per service. Every registered client is
/// attempted exactly once and each outcome lands in the returned report; no
/// failure aborts the batch.
pub struct ServiceRegistry {
    /// Identifier -> client.
    services: DashMap<String, Arc<dyn ServiceClient>>,
    /// Registration order. Taken for writing before `services` is touched so
    /// the two stay consistent.
    order: RwLock<Vec<String>>,
}

impl ServiceRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            services: DashMap::new(),
            order: RwLock::new(Vec::new()),
        }
    }

    /// Bind `client` to `id`, replacing any existing binding.
    pub fn register(&self, id: impl Into<String>, client: Arc<dyn ServiceClient>) {
        let id = id.into();
        let replaced = {
            let mut order = self.order.write();
            let replaced = self.services.insert(id.clone(), client).is_some();
            if !replaced {
                order.push(id.clone());
            }
            replaced
        };

        if replaced {
            info!(service = %id, "replaced container service");
        } else {
            info!(service = %id, "registered container service");
        }
    }

    /// Convenience wrapper around [`register`](Self::register) for an owned client.
    pub fn register_client<C: ServiceClient>(&self, id: impl Into<String>, client: C) {
        self.register(id, Arc::new(client));
    }

    /// Retrieve the client bound to `id`.
    pub fn get(&self, id: &str) -> Option<Arc<dyn ServiceClient>> {
        self.services.get(id).map(|entry| Arc::clone(entry.value()))
    }

    /// Registered identifiers in registration order.
    pub fn ids(&self) -> Vec<String> {
        self.order.read().clone()
    }

    pub fn len(&self) -> usize {
        self.order.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.read().is_empty()
    }

    /// Connect every registered service in registration order.
    ///
    /// Each `connect()` is bounded by that client's connection timeout.
    pub async fn start_all(&self) -> BatchReport<ConnectionError> {
        let bindings = self.bindings();
        let span = batch_span("start_all", bindings.len());

        async move {
            info!("starting all container services");
            let started_at = Instant::now();
            let mut report = BatchReport::with_capacity(bindings.len());

            for (id, client) in bindings {
                let outcome = connect_within_timeout(client.as_ref()).await;
                match &outcome {
                    Ok(()) => info!(service = %id, "started service"),
                    Err(e) => error!(service = %id, error = %e, "failed to start service"),
                }
                report.push(id, outcome);
            }

            record_batch(started_at, report.failed().len());
            report
        }
        .instrument(span)
        .await
    }

    /// Disconnect every registered service in reverse registration order.
    pub async fn stop_all(&self) -> BatchReport<DisconnectionError> {
        let mut bindings = self.bindings();
        bindings.reverse();
        let span = batch_span("stop_all", bindings.len());

        async move {
            info!("stopping all container services");
            let started_at = Instant::now();
            let mut report = BatchReport::with_capacity(bindings.len());

            for (id, client) in bindings {
                let outcome = disconnect_within_timeout(client.as_ref()).await;
                match &outcome {
                    Ok(()) => info!(service = %id, "stopped service"),
                    Err(e) => error!(service = %id, error = %e, "failed to stop service"),
                }
                report.push(id, outcome);
            }

            record_batch(started_at, report.failed().len());
            report
        }
        .instrument(span)
        .await
    }

    /// Probe every registered service. Never fails and never caches.
    pub async fn health_check_all(&self) -> HealthSnapshot {
        let bindings = self.bindings();
        debug!(services = bindings.len(), "running health check on all services");

        let mut snapshot = HealthSnapshot::with_capacity(bindings.len());
        for (id, client) in bindings {
            let availability = probe_within_timeout(client.as_ref()).await;
            let available = availability.is_available();
            debug!(
                service = %id,
                status = if available { "HEALTHY" } else { "UNHEALTHY" },
                "health check"
            );
            snapshot.push(ServiceHealth {
                id,
                available,
                reason: availability.reason().map(str::to_string),
            });
        }
        snapshot
    }

    /// Disconnect then connect a single service.
    ///
    /// A failed disconnect is logged and does not prevent the connect attempt.
    /// Returns `None` if `id` is not registered.
    pub async fn reconnect(&self, id: &str) -> Option<Result<(), ConnectionError>> {
        let client = self.get(id)?;
        info!(service = %id, "reconnecting service");

        if let Err(e) = disconnect_within_timeout(client.as_ref()).await {
            warn!(service = %id, error = %e, "disconnect before reconnect failed");
        }

        let outcome = connect_within_timeout(client.as_ref()).await;
        match &outcome {
            Ok(()) => info!(service = %id, "reconnected service"),
            Err(e) => error!(service = %id, error = %e, "failed to reconnect service"),
        }
        Some(outcome)
    }

    /// Snapshot of the bindings in registration order. No lock is held once
    /// this returns, so callers may await on the clients freely.
    fn bindings(&self) -> Vec<(String, Arc<dyn ServiceClient>)> {
        let order = self.order.read();
        order
            .iter()
            .filter_map(|id| {
                self.services
                    .get(id)
                    .map(|entry| (id.clone(), Arc::clone(entry.value())))
            })
            .collect()
    }
}

impl Default for ServiceRegistry {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Timeout enforcement
// ---------------------------------------------------------------------------

async fn connect_within_timeout(client: &dyn ServiceClient) -> Result<(), ConnectionError> {
    let timeout_ms = client.endpoint().connection_timeout_ms();
    match tokio::time::timeout(Duration::from_millis(timeout_ms), client.connect()).await {
        Ok(result) => result,
        Err(_elapsed) => Err(ConnectionError::Timeout {
            service: client.service_name().to_string(),
            timeout_ms,
        }),
    }
}

async fn disconnect_within_timeout(client: &dyn ServiceClient) -> Result<(), DisconnectionError> {
    let timeout_ms = client.endpoint().connection_timeout_ms();
    match tokio::time::timeout(Duration::from_millis(timeout_ms), client.disconnect()).await {
        Ok(result) => result,
        Err(_elapsed) => Err(DisconnectionError::Timeout {
            service: client.service_name().to_string(),
            timeout_ms,
        }),
    }
}

async fn probe_within_timeout(client: &dyn ServiceClient) -> Availability {
    let timeout_ms = client.endpoint().connection_timeout_ms();
    tokio::time::timeout(Duration::from_millis(timeout_ms), client.probe())
        .await
        .unwrap_or_else(|_elapsed| {
            Availability::unavailable(format!("health probe timed out after {timeout_ms}ms"))
        })
}

// ---------------------------------------------------------------------------
// Span helpers
// ---------------------------------------------------------------------------

fn batch_span(op: &'static str, services: usize) -> tracing::Span {
    info_span!(
        "batch",
        op = op,
        services = services,
        duration_ms = tracing::field::Empty,
        failed = tracing::field::Empty,
    )
}

fn record_batch(started_at: Instant, failed: usize) {
    let duration_ms = u64::try_from(started_at.elapsed().as_millis()).unwrap_or(u64::MAX);
    let span = tracing::Span::current();
    span.record("duration_ms", duration_ms);
    span.record("failed", failed);
    info!(duration_ms, failed, "batch complete");
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
