//! End-to-end lifecycle scenarios driven through the public API.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use axum::http::StatusCode;
use axum::routing::get;
use axum::Router;
use berth_manager::clients::ApiClient;
use berth_manager::service::{BackgroundWorker, HealthPoller, PollTask};
use berth_manager::{
    Availability, ConnectionError, DisconnectionError, ServiceClient, ServiceEndpoint,
    ServiceRegistry,
};
use tokio::net::TcpListener;

async fn serve_health() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    let router = Router::new().route("/health", get(|| async { StatusCode::OK }));
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    port
}

async fn closed_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    listener.local_addr().unwrap().port()
}

fn endpoint(name: &str, port: u16) -> ServiceEndpoint {
    ServiceEndpoint::new(name, "127.0.0.1", port)
        .unwrap()
        .with_connection_timeout_ms(500)
}

/// Client that always refuses to connect.
struct RefusingClient {
    endpoint: ServiceEndpoint,
}

#[async_trait]
impl ServiceClient for RefusingClient {
    fn endpoint(&self) -> &ServiceEndpoint {
        &self.endpoint
    }

    async fn connect(&self) -> Result<(), ConnectionError> {
        Err(ConnectionError::Rejected {
            service: self.endpoint.name().to_string(),
            reason: "bad credentials".to_string(),
        })
    }

    async fn disconnect(&self) -> Result<(), DisconnectionError> {
        Ok(())
    }

    async fn probe(&self) -> Availability {
        Availability::unavailable("never connected")
    }
}

/// Client whose connection is a plain flag.
struct FlagClient {
    endpoint: ServiceEndpoint,
    connected: AtomicBool,
}

#[async_trait]
impl ServiceClient for FlagClient {
    fn endpoint(&self) -> &ServiceEndpoint {
        &self.endpoint
    }

    async fn connect(&self) -> Result<(), ConnectionError> {
        self.connected.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn disconnect(&self) -> Result<(), DisconnectionError> {
        self.connected.store(false, Ordering::SeqCst);
        Ok(())
    }

    async fn probe(&self) -> Availability {
        self.connected.load(Ordering::SeqCst).into()
    }
}

#[tokio::test]
async fn api_up_and_failing_db_yield_mixed_health() {
    let registry = ServiceRegistry::new();
    registry.register_client("api", ApiClient::new(endpoint("api", serve_health().await)));
    registry.register_client(
        "db",
        RefusingClient {
            endpoint: endpoint("db", closed_port().await),
        },
    );

    let started = registry.start_all().await;
    assert_eq!(started.attempted(), 2);
    assert_eq!(started.succeeded(), vec!["api"]);

    let health = registry.health_check_all().await.to_map();
    assert_eq!(health.len(), 2);
    assert!(health["api"]);
    assert!(!health["db"]);

    let stopped = registry.stop_all().await;
    assert!(stopped.is_success());
}

#[cfg(feature = "postgres")]
#[tokio::test]
async fn unreachable_database_does_not_block_api() {
    use berth_manager::clients::DatabaseClient;

    let registry = ServiceRegistry::new();
    registry.register_client(
        "db",
        DatabaseClient::new(endpoint("db", closed_port().await), "app", "app", "secret"),
    );
    registry.register_client("api", ApiClient::new(endpoint("api", serve_health().await)));

    let started = registry.start_all().await;

    assert_eq!(started.attempted(), 2);
    assert_eq!(started.failed().len(), 1);
    assert_eq!(started.failed()[0].0, "db");

    let snapshot = registry.health_check_all().await;
    assert_eq!(snapshot.get("api"), Some(true));
    assert_eq!(snapshot.get("db"), Some(false));
    assert_eq!(snapshot.unhealthy(), vec!["db"]);

    // Disconnecting a database that never connected is a no-op.
    assert!(registry.stop_all().await.is_success());
    assert!(registry.stop_all().await.is_success());
}

#[tokio::test]
async fn replaced_binding_is_the_one_started() {
    let original = Arc::new(FlagClient {
        endpoint: endpoint("first", 1),
        connected: AtomicBool::new(false),
    });
    let replacement = Arc::new(FlagClient {
        endpoint: endpoint("second", 1),
        connected: AtomicBool::new(false),
    });

    let registry = ServiceRegistry::new();
    registry.register("x", original.clone());
    registry.register("x", replacement.clone());
    registry.start_all().await;

    assert_eq!(registry.get("x").unwrap().service_name(), "second");
    assert!(replacement.is_service_available().await);
    assert!(!original.is_service_available().await);
}

#[tokio::test]
async fn poller_publishes_registry_health() {
    let registry = Arc::new(ServiceRegistry::new());
    registry.register_client("api", ApiClient::new(endpoint("api", serve_health().await)));
    registry.register_client(
        "db",
        RefusingClient {
            endpoint: endpoint("db", closed_port().await),
        },
    );
    registry.start_all().await;

    let (poller, mut snapshots) = HealthPoller::new(Arc::clone(&registry));
    let mut worker = BackgroundWorker::start(poller, 60_000);
    worker.submit(PollTask::RefreshNow).await.unwrap();
    snapshots.changed().await.unwrap();

    let snapshot = snapshots.borrow().clone();
    assert_eq!(snapshot.get("api"), Some(true));
    assert_eq!(snapshot.get("db"), Some(false));
    assert!(!snapshot.is_healthy());

    worker.stop().await;
}
