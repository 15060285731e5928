use std::time::Duration;

use async_trait::async_trait;

use crate::error::{ConnectionError, DisconnectionError};
use crate::types::{Availability, ServiceEndpoint};

/// One addressable backend dependency and its connection state.
///
/// Clients start Disconnected, move to Connected after a successful
/// `connect()`, and return to Disconnected after `disconnect()`. A failed
/// `connect()` leaves the client Disconnected.
///
/// Implementations are shared as `Arc<dyn ServiceClient>` by a registry, so
/// every method takes `&self`; variants that hold a connection handle keep it
/// behind their own lock.
#[async_trait]
pub trait ServiceClient: Send + Sync + 'static {
    /// Identity and timeout settings of this client.
    fn endpoint(&self) -> &ServiceEndpoint;

    /// Establish the connection, bounded by the endpoint's connection timeout.
    async fn connect(&self) -> Result<(), ConnectionError>;

    /// Release the connection. Must succeed when already disconnected.
    async fn disconnect(&self) -> Result<(), DisconnectionError>;

    /// Check whether the service is currently usable.
    async fn probe(&self) -> Availability;

    fn service_name(&self) -> &str {
        self.endpoint().name()
    }

    fn connection_timeout(&self) -> Duration {
        self.endpoint().connection_timeout()
    }

    fn set_connection_timeout(&self, timeout_ms: u64) {
        self.endpoint().set_connection_timeout_ms(timeout_ms);
    }

    async fn is_service_available(&self) -> bool {
        self.probe().await.is_available()
    }
}
