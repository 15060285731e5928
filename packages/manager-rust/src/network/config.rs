//! Configuration for the status HTTP surface.

use std::time::Duration;

/// Bind settings for the status endpoints.
#[derive(Debug, Clone)]
pub struct StatusConfig {
    /// Bind address for the status server.
    pub host: String,
    /// Port to listen on. 0 means OS-assigned.
    pub port: u16,
    /// Maximum time a status request may take before the connection is dropped.
    pub request_timeout: Duration,
}

impl Default for StatusConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 0,
            request_timeout: Duration::from_secs(10),
        }
    }
}
