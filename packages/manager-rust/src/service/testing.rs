//! Scripted `ServiceClient` used by the unit tests in this crate.

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use berth_core::{Availability, ConnectionError, DisconnectionError, ServiceClient, ServiceEndpoint};
use parking_lot::Mutex;

/// How a scripted client responds to `connect()`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectBehavior {
    Succeed,
    Fail,
    /// Sleeps far past any test timeout.
    Hang,
}

/// Client whose lifecycle outcomes are fixed up front and whose calls are
/// counted and appended to a shared log.
pub struct ScriptedClient {
    endpoint: ServiceEndpoint,
    behavior: ConnectBehavior,
    fail_disconnect: bool,
    connected: AtomicBool,
    pub connect_calls: AtomicU32,
    pub disconnect_calls: AtomicU32,
    pub probe_calls: AtomicU32,
    log: Arc<Mutex<Vec<String>>>,
}

impl ScriptedClient {
    pub fn new(name: &str, behavior: ConnectBehavior, log: Arc<Mutex<Vec<String>>>) -> Self {
        Self {
            endpoint: ServiceEndpoint::new(name, "localhost", 1)
                .unwrap()
                .with_connection_timeout_ms(100),
            behavior,
            fail_disconnect: false,
            connected: AtomicBool::new(false),
            connect_calls: AtomicU32::new(0),
            disconnect_calls: AtomicU32::new(0),
            probe_calls: AtomicU32::new(0),
            log,
        }
    }

    pub fn failing_disconnect(mut self) -> Self {
        self.fail_disconnect = true;
        self
    }

    pub fn up(name: &str) -> Arc<Self> {
        Arc::new(Self::new(name, ConnectBehavior::Succeed, Arc::default()))
    }

    pub fn down(name: &str) -> Arc<Self> {
        Arc::new(Self::new(name, ConnectBehavior::Fail, Arc::default()))
    }

    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    pub fn set_connected(&self, connected: bool) {
        self.connected.store(connected, Ordering::SeqCst);
    }
}

#[async_trait]
impl ServiceClient for ScriptedClient {
    fn endpoint(&self) -> &ServiceEndpoint {
        &self.endpoint
    }

    async fn connect(&self) -> Result<(), ConnectionError> {
        self.connect_calls.fetch_add(1, Ordering::SeqCst);
        self.log.lock().push(format!("connect:{}", self.service_name()));
        match self.behavior {
            ConnectBehavior::Succeed => {
                self.set_connected(true);
                Ok(())
            }
            ConnectBehavior::Fail => Err(ConnectionError::Unreachable {
                service: self.service_name().to_string(),
                address: self.endpoint.address(),
                reason: "connection refused".to_string(),
            }),
            ConnectBehavior::Hang => {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Ok(())
            }
        }
    }

    async fn disconnect(&self) -> Result<(), DisconnectionError> {
        self.disconnect_calls.fetch_add(1, Ordering::SeqCst);
        self.log
            .lock()
            .push(format!("disconnect:{}", self.service_name()));
        self.set_connected(false);
        if self.fail_disconnect {
            return Err(DisconnectionError::Release {
                service: self.service_name().to_string(),
                reason: "close failed".to_string(),
            });
        }
        Ok(())
    }

    async fn probe(&self) -> Availability {
        self.probe_calls.fetch_add(1, Ordering::SeqCst);
        if self.is_connected() {
            Availability::Available
        } else {
            Availability::unavailable("not connected")
        }
    }
}
