//! Per-service outcome collections returned by registry batch operations.

use std::collections::HashMap;

use serde::Serialize;

// ---------------------------------------------------------------------------
// BatchReport
// ---------------------------------------------------------------------------

/// Ordered per-service outcomes of a batch lifecycle operation.
///
/// Every registered service appears exactly once, in the order the registry
/// attempted it, whether or not it succeeded.
#[derive(Debug)]
pub struct BatchReport<E> {
    outcomes: Vec<(String, Result<(), E>)>,
}

impl<E> BatchReport<E> {
    pub(crate) fn with_capacity(capacity: usize) -> Self {
        Self {
            outcomes: Vec::with_capacity(capacity),
        }
    }

    pub(crate) fn push(&mut self, id: String, outcome: Result<(), E>) {
        self.outcomes.push((id, outcome));
    }

    /// Number of services attempted.
    #[must_use]
    pub fn attempted(&self) -> usize {
        self.outcomes.len()
    }

    /// Identifiers whose operation succeeded, in attempt order.
    #[must_use]
    pub fn succeeded(&self) -> Vec<&str> {
        self.outcomes
            .iter()
            .filter(|(_, outcome)| outcome.is_ok())
            .map(|(id, _)| id.as_str())
            .collect()
    }

    /// Identifiers whose operation failed, paired with the error.
    #[must_use]
    pub fn failed(&self) -> Vec<(&str, &E)> {
        self.outcomes
            .iter()
            .filter_map(|(id, outcome)| outcome.as_ref().err().map(|e| (id.as_str(), e)))
            .collect()
    }

    /// True when no service failed (vacuously true for an empty registry).
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.outcomes.iter().all(|(_, outcome)| outcome.is_ok())
    }

    /// Outcome for a single identifier, if it was part of the batch.
    #[must_use]
    pub fn outcome(&self, id: &str) -> Option<&Result<(), E>> {
        self.outcomes
            .iter()
            .find(|(candidate, _)| candidate == id)
            .map(|(_, outcome)| outcome)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Result<(), E>)> {
        self.outcomes.iter().map(|(id, outcome)| (id.as_str(), outcome))
    }
}

// ---------------------------------------------------------------------------
// HealthSnapshot
// ---------------------------------------------------------------------------

/// Probe result for one registered service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ServiceHealth {
    pub id: String,
    pub available: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// Aggregate health of every registered service, in registration order.
///
/// Computed fresh by each `ServiceRegistry::health_check_all` call.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct HealthSnapshot {
    services: Vec<ServiceHealth>,
}

impl HealthSnapshot {
    pub(crate) fn with_capacity(capacity: usize) -> Self {
        Self {
            services: Vec::with_capacity(capacity),
        }
    }

    pub(crate) fn push(&mut self, health: ServiceHealth) {
        self.services.push(health);
    }

    /// Availability of one service, or `None` if it was not registered.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<bool> {
        self.services
            .iter()
            .find(|health| health.id == id)
            .map(|health| health.available)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.services.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.services.is_empty()
    }

    /// True when every service is available (vacuously true when empty).
    #[must_use]
    pub fn is_healthy(&self) -> bool {
        self.services.iter().all(|health| health.available)
    }

    /// Identifiers of services that are currently unavailable.
    #[must_use]
    pub fn unhealthy(&self) -> Vec<&str> {
        self.services
            .iter()
            .filter(|health| !health.available)
            .map(|health| health.id.as_str())
            .collect()
    }

    /// Identifier -> availability, for callers that only need the flags.
    #[must_use]
    pub fn to_map(&self) -> HashMap<String, bool> {
        self.services
            .iter()
            .map(|health| (health.id.clone(), health.available))
            .collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ServiceHealth> {
        self.services.iter()
    }
}
