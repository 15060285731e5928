//! `PostgreSQL` container client.
//!
//! Holds a single-connection pool as its connection handle. The handle is
//! `None` until `connect` succeeds and is released by `disconnect`.

use std::fmt;

use async_trait::async_trait;
use berth_core::{Availability, ConnectionError, DisconnectionError, ServiceClient, ServiceEndpoint};
use parking_lot::Mutex;
use sqlx::postgres::{PgConnectOptions, PgPoolOptions};
use sqlx::PgPool;
use tracing::{debug, info, warn};

/// SQLSTATE codes for authentication failures (`invalid_authorization_specification`
/// and `invalid_password`).
const AUTH_FAILURE_CODES: [&str; 2] = ["28000", "28P01"];

/// Client for a database container.
pub struct DatabaseClient {
    endpoint: ServiceEndpoint,
    database: String,
    username: String,
    password: String,
    /// Live handle. Never held across an await.
    pool: Mutex<Option<PgPool>>,
}

impl DatabaseClient {
    #[must_use]
    pub fn new(
        endpoint: ServiceEndpoint,
        database: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            endpoint,
            database: database.into(),
            username: username.into(),
            password: password.into(),
            pool: Mutex::new(None),
        }
    }

    #[must_use]
    pub fn database(&self) -> &str {
        &self.database
    }

    #[must_use]
    pub fn username(&self) -> &str {
        &self.username
    }

    /// The live pool, if connected. Callers get a cheap clone of the handle.
    #[must_use]
    pub fn pool(&self) -> Option<PgPool> {
        self.pool.lock().clone()
    }

    /// Endpoint URL with any scheme prefix and trailing slash removed.
    fn host(&self) -> &str {
        let url = self.endpoint.url();
        let host = url.split_once("://").map_or(url, |(_, rest)| rest);
        host.trim_end_matches('/')
    }

    fn connect_options(&self) -> PgConnectOptions {
        PgConnectOptions::new()
            .host(self.host())
            .port(self.endpoint.port())
            .username(&self.username)
            .password(&self.password)
            .database(&self.database)
    }

    fn classify(&self, err: sqlx::Error) -> ConnectionError {
        let service = self.endpoint.name().to_string();
        match err {
            sqlx::Error::Database(db)
                if db
                    .code()
                    .as_deref()
                    .is_some_and(|code| AUTH_FAILURE_CODES.iter().any(|auth| *auth == code)) =>
            {
                ConnectionError::Rejected {
                    service,
                    reason: db.message().to_string(),
                }
            }
            sqlx::Error::PoolTimedOut => ConnectionError::Timeout {
                service,
                timeout_ms: self.endpoint.connection_timeout_ms(),
            },
            sqlx::Error::Io(e) => ConnectionError::Unreachable {
                service,
                address: self.endpoint.address(),
                reason: e.to_string(),
            },
            sqlx::Error::Tls(e) => ConnectionError::Unreachable {
                service,
                address: self.endpoint.address(),
                reason: e.to_string(),
            },
            other => ConnectionError::Client {
                service,
                reason: other.to_string(),
            },
        }
    }
}

impl fmt::Debug for DatabaseClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DatabaseClient")
            .field("endpoint", &self.endpoint)
            .field("database", &self.database)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("connected", &self.pool.lock().is_some())
            .finish()
    }
}

#[async_trait]
impl ServiceClient for DatabaseClient {
    fn endpoint(&self) -> &ServiceEndpoint {
        &self.endpoint
    }

    async fn connect(&self) -> Result<(), ConnectionError> {
        info!(
            service = %self.endpoint.name(),
            address = %self.endpoint.address(),
            database = %self.database,
            "connecting to database service"
        );

        let timeout = self.endpoint.connection_timeout();
        let attempt = PgPoolOptions::new()
            .max_connections(1)
            .acquire_timeout(timeout)
            .connect_with(self.connect_options());

        let pool = match tokio::time::timeout(timeout, attempt).await {
            Ok(Ok(pool)) => pool,
            Ok(Err(e)) => return Err(self.classify(e)),
            Err(_elapsed) => {
                return Err(ConnectionError::Timeout {
                    service: self.endpoint.name().to_string(),
                    timeout_ms: self.endpoint.connection_timeout_ms(),
                })
            }
        };

        let previous = self.pool.lock().replace(pool);
        if let Some(previous) = previous {
            warn!(service = %self.endpoint.name(), "replacing existing database connection");
            previous.close().await;
        }

        info!(service = %self.endpoint.name(), "connected to database service");
        Ok(())
    }

    async fn disconnect(&self) -> Result<(), DisconnectionError> {
        info!(service = %self.endpoint.name(), "disconnecting from database service");

        let taken = self.pool.lock().take();
        let Some(pool) = taken else {
            return Ok(());
        };

        let timeout_ms = self.endpoint.connection_timeout_ms();
        tokio::time::timeout(self.endpoint.connection_timeout(), pool.close())
            .await
            .map_err(|_elapsed| DisconnectionError::Timeout {
                service: self.endpoint.name().to_string(),
                timeout_ms,
            })
    }

    async fn probe(&self) -> Availability {
        debug!(service = %self.endpoint.name(), "checking database availability");
        let closed = self.pool.lock().as_ref().map(PgPool::is_closed);
        match closed {
            Some(false) => Availability::Available,
            Some(true) => Availability::unavailable("database connection is closed"),
            None => Availability::unavailable("not connected"),
        }
    }
}
