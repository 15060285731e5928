use std::sync::Arc;
use std::time::Duration;

use berth_core::{EndpointError, ServiceEndpoint, DEFAULT_CONNECTION_TIMEOUT_MS};

use super::registry::ServiceRegistry;
use crate::clients::{ApiClient, DEFAULT_HEALTH_PATH};
#[cfg(feature = "postgres")]
use crate::clients::DatabaseClient;

/// Errors raised while turning configuration into live components.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid endpoint: {0}")]
    Endpoint(#[from] EndpointError),
    #[error("connection timeout must be greater than zero")]
    ZeroConnectionTimeout,
    #[error("health interval must be greater than zero")]
    ZeroHealthInterval,
    #[error("service id {id} is configured more than once")]
    DuplicateId { id: String },
}

/// Manager-level configuration for lifecycle and health polling.
#[derive(Debug, Clone)]
pub struct ManagerConfig {
    /// Upper bound for each connect/disconnect/probe call, in milliseconds.
    pub connection_timeout_ms: u64,
    /// Interval between background health checks, in milliseconds.
    pub health_interval_ms: u64,
    /// How long shutdown waits for `stop_all` before giving up.
    pub drain_timeout: Duration,
    pub api: Option<ApiServiceConfig>,
    pub database: Option<DatabaseServiceConfig>,
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            connection_timeout_ms: DEFAULT_CONNECTION_TIMEOUT_MS,
            health_interval_ms: 10_000,
            drain_timeout: Duration::from_secs(5),
            api: Some(ApiServiceConfig::default()),
            database: Some(DatabaseServiceConfig::default()),
        }
    }
}

impl ManagerConfig {
    /// # Errors
    ///
    /// Returns an error if the connection timeout or health interval is zero,
    /// or if two services share an id.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.connection_timeout_ms == 0 {
            return Err(ConfigError::ZeroConnectionTimeout);
        }
        if self.health_interval_ms == 0 {
            return Err(ConfigError::ZeroHealthInterval);
        }
        if let (Some(api), Some(db)) = (&self.api, &self.database) {
            if api.id == db.id {
                return Err(ConfigError::DuplicateId { id: api.id.clone() });
            }
        }
        Ok(())
    }

    /// Builds the configured clients and registers them, API first.
    ///
    /// # Errors
    ///
    /// Returns an error if validation fails or an endpoint is invalid.
    pub fn build_registry(&self) -> Result<ServiceRegistry, ConfigError> {
        self.validate()?;
        let registry = ServiceRegistry::new();

        if let Some(api) = &self.api {
            registry.register(api.id.clone(), Arc::new(api.build(self.connection_timeout_ms)?));
        }

        #[cfg(feature = "postgres")]
        if let Some(db) = &self.database {
            registry.register(db.id.clone(), Arc::new(db.build(self.connection_timeout_ms)?));
        }

        Ok(registry)
    }
}

/// Stock REST API container.
#[derive(Debug, Clone)]
pub struct ApiServiceConfig {
    pub id: String,
    pub url: String,
    pub port: u16,
    pub health_path: String,
}

impl Default for ApiServiceConfig {
    fn default() -> Self {
        Self {
            id: "api".to_string(),
            url: "localhost".to_string(),
            port: 8080,
            health_path: DEFAULT_HEALTH_PATH.to_string(),
        }
    }
}

impl ApiServiceConfig {
    /// # Errors
    ///
    /// Returns an error if the endpoint is invalid.
    pub fn build(&self, connection_timeout_ms: u64) -> Result<ApiClient, ConfigError> {
        let endpoint = ServiceEndpoint::new(self.id.clone(), self.url.clone(), self.port)?
            .with_connection_timeout_ms(connection_timeout_ms);
        Ok(ApiClient::new(endpoint).with_health_path(self.health_path.clone()))
    }
}

/// Stock database container.
#[derive(Clone)]
pub struct DatabaseServiceConfig {
    pub id: String,
    pub url: String,
    pub port: u16,
    pub database: String,
    pub username: String,
    pub password: String,
}

impl Default for DatabaseServiceConfig {
    fn default() -> Self {
        Self {
            id: "db".to_string(),
            url: "localhost".to_string(),
            port: 5432,
            database: "app".to_string(),
            username: "app".to_string(),
            password: String::new(),
        }
    }
}

impl std::fmt::Debug for DatabaseServiceConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DatabaseServiceConfig")
            .field("id", &self.id)
            .field("url", &self.url)
            .field("port", &self.port)
            .field("database", &self.database)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

#[cfg(feature = "postgres")]
impl DatabaseServiceConfig {
    /// # Errors
    ///
    /// Returns an error if the endpoint is invalid.
    pub fn build(&self, connection_timeout_ms: u64) -> Result<DatabaseClient, ConfigError> {
        let endpoint = ServiceEndpoint::new(self.id.clone(), self.url.clone(), self.port)?
            .with_connection_timeout_ms(connection_timeout_ms);
        Ok(DatabaseClient::new(
            endpoint,
            self.database.clone(),
            self.username.clone(),
            self.password.clone(),
        ))
    }
}
