//! Error taxonomy shared by every service client.
//!
//! Both lifecycle errors carry the service name so that a registry can log
//! and report them without keeping extra context around.

/// Failure while establishing a connection.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConnectionError {
    #[error("service {service} unreachable at {address}: {reason}")]
    Unreachable {
        service: String,
        address: String,
        reason: String,
    },
    #[error("service {service} did not connect within {timeout_ms}ms")]
    Timeout { service: String, timeout_ms: u64 },
    #[error("service {service} rejected credentials: {reason}")]
    Rejected { service: String, reason: String },
    #[error("service {service} client error: {reason}")]
    Client { service: String, reason: String },
}

impl ConnectionError {
    /// Name of the service that failed to connect.
    #[must_use]
    pub fn service(&self) -> &str {
        match self {
            Self::Unreachable { service, .. }
            | Self::Timeout { service, .. }
            | Self::Rejected { service, .. }
            | Self::Client { service, .. } => service,
        }
    }
}

/// Failure while releasing a connection.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DisconnectionError {
    #[error("service {service} failed to release its connection: {reason}")]
    Release { service: String, reason: String },
    #[error("service {service} did not disconnect within {timeout_ms}ms")]
    Timeout { service: String, timeout_ms: u64 },
}

impl DisconnectionError {
    /// Name of the service that failed to disconnect.
    #[must_use]
    pub fn service(&self) -> &str {
        match self {
            Self::Release { service, .. } | Self::Timeout { service, .. } => service,
        }
    }
}

/// Invalid endpoint identity supplied at construction.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EndpointError {
    #[error("service name must not be empty")]
    EmptyName,
    #[error("service {service} has an empty url")]
    EmptyUrl { service: String },
    #[error("service {service} port must be in 1..=65535")]
    InvalidPort { service: String },
}
