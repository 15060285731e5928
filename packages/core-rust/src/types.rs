use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::EndpointError;

/// Connection timeout applied to every client unless overridden.
pub const DEFAULT_CONNECTION_TIMEOUT_MS: u64 = 5_000;

/// Identity and connection settings of one backend service.
///
/// The name, URL and port are fixed at construction. The connection timeout
/// is the only mutable field and is stored atomically so it can be adjusted
/// through a shared `Arc` after the client has been registered.
#[derive(Debug)]
pub struct ServiceEndpoint {
    name: String,
    url: String,
    port: u16,
    connection_timeout_ms: AtomicU64,
}

impl ServiceEndpoint {
    /// Creates an endpoint with the default connection timeout.
    ///
    /// # Errors
    ///
    /// Returns an error if `name` or `url` is blank, or if `port` is 0.
    pub fn new(
        name: impl Into<String>,
        url: impl Into<String>,
        port: u16,
    ) -> Result<Self, EndpointError> {
        let name = name.into();
        let url = url.into();

        if name.trim().is_empty() {
            return Err(EndpointError::EmptyName);
        }
        if url.trim().is_empty() {
            return Err(EndpointError::EmptyUrl { service: name });
        }
        if port == 0 {
            return Err(EndpointError::InvalidPort { service: name });
        }

        tracing::debug!(service = %name, url = %url, port, "initialized service endpoint");

        Ok(Self {
            name,
            url,
            port,
            connection_timeout_ms: AtomicU64::new(DEFAULT_CONNECTION_TIMEOUT_MS),
        })
    }

    /// Builder-style override of the connection timeout.
    #[must_use]
    pub fn with_connection_timeout_ms(self, timeout_ms: u64) -> Self {
        self.set_connection_timeout_ms(timeout_ms);
        self
    }

    /// Stable identifier used in logs.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    #[must_use]
    pub fn port(&self) -> u16 {
        self.port
    }

    /// `url:port`, with any trailing slash on the URL removed.
    #[must_use]
    pub fn address(&self) -> String {
        format!("{}:{}", self.url.trim_end_matches('/'), self.port)
    }

    #[must_use]
    pub fn connection_timeout_ms(&self) -> u64 {
        self.connection_timeout_ms.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn connection_timeout(&self) -> Duration {
        Duration::from_millis(self.connection_timeout_ms())
    }

    /// Replaces the connection timeout. A timeout of 0 fails every call that
    /// does not complete on its first poll.
    pub fn set_connection_timeout_ms(&self, timeout_ms: u64) {
        self.connection_timeout_ms.store(timeout_ms, Ordering::Relaxed);
    }
}

impl Clone for ServiceEndpoint {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            url: self.url.clone(),
            port: self.port,
            connection_timeout_ms: AtomicU64::new(self.connection_timeout_ms()),
        }
    }
}

/// Result of a health probe.
///
/// Has no error variant: a probe that faults is `Unavailable`, with the
/// fault recorded as the reason.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Availability {
    Available,
    Unavailable { reason: String },
}

impl Availability {
    /// Builds an `Unavailable` result from any displayable fault.
    pub fn unavailable(reason: impl fmt::Display) -> Self {
        Self::Unavailable {
            reason: reason.to_string(),
        }
    }

    #[must_use]
    pub fn is_available(&self) -> bool {
        matches!(self, Self::Available)
    }

    /// The recorded fault, if any.
    #[must_use]
    pub fn reason(&self) -> Option<&str> {
        match self {
            Self::Available => None,
            Self::Unavailable { reason } => Some(reason),
        }
    }
}

impl From<bool> for Availability {
    fn from(available: bool) -> Self {
        if available {
            Self::Available
        } else {
            Self::unavailable("probe reported unavailable")
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use proptest::prelude::*;

    use super::*;

    #[test]
    fn new_endpoint_uses_default_timeout() {
        let endpoint = ServiceEndpoint::new("api", "localhost", 8080).unwrap();
        assert_eq!(endpoint.name(), "api");
        assert_eq!(endpoint.url(), "localhost");
        assert_eq!(endpoint.port(), 8080);
        assert_eq!(endpoint.connection_timeout_ms(), DEFAULT_CONNECTION_TIMEOUT_MS);
        assert_eq!(endpoint.connection_timeout(), Duration::from_secs(5));
    }

    #[test]
    fn zero_port_is_rejected() {
        let err = ServiceEndpoint::new("db", "localhost", 0).unwrap_err();
        assert!(matches!(err, EndpointError::InvalidPort { ref service } if service == "db"));
    }

    #[test]
    fn blank_name_and_url_are_rejected() {
        assert!(matches!(
            ServiceEndpoint::new("  ", "localhost", 1),
            Err(EndpointError::EmptyName)
        ));
        assert!(matches!(
            ServiceEndpoint::new("api", "", 1),
            Err(EndpointError::EmptyUrl { .. })
        ));
    }

    #[test]
    fn timeout_is_mutable_through_shared_reference() {
        let endpoint = Arc::new(ServiceEndpoint::new("api", "localhost", 8080).unwrap());
        let shared = Arc::clone(&endpoint);

        shared.set_connection_timeout_ms(250);

        assert_eq!(endpoint.connection_timeout(), Duration::from_millis(250));
    }

    #[test]
    fn clone_snapshots_current_timeout() {
        let endpoint = ServiceEndpoint::new("api", "localhost", 8080)
            .unwrap()
            .with_connection_timeout_ms(100);
        let copy = endpoint.clone();
        endpoint.set_connection_timeout_ms(900);

        assert_eq!(copy.connection_timeout_ms(), 100);
        assert_eq!(endpoint.connection_timeout_ms(), 900);
    }

    #[test]
    fn address_strips_trailing_slash() {
        let endpoint = ServiceEndpoint::new("api", "http://localhost/", 8080).unwrap();
        assert_eq!(endpoint.address(), "http://localhost:8080");
    }

    #[test]
    fn availability_reason() {
        assert!(Availability::Available.is_available());
        assert_eq!(Availability::Available.reason(), None);

        let down = Availability::unavailable("connection refused");
        assert!(!down.is_available());
        assert_eq!(down.reason(), Some("connection refused"));
        assert!(!Availability::from(false).is_available());
    }

    #[test]
    fn availability_serializes_with_status_tag() {
        let json = serde_json::to_value(Availability::unavailable("closed")).unwrap();
        assert_eq!(json["status"], "unavailable");
        assert_eq!(json["reason"], "closed");

        let json = serde_json::to_value(Availability::Available).unwrap();
        assert_eq!(json["status"], "available");
    }

    proptest! {
        #[test]
        fn any_nonzero_port_is_accepted(port in 1u16..=u16::MAX) {
            let endpoint = ServiceEndpoint::new("svc", "localhost", port).unwrap();
            prop_assert_eq!(endpoint.port(), port);
        }
    }
}
