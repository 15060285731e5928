//! Concrete `ServiceClient` variants for the stock container services.

pub mod api;
#[cfg(feature = "postgres")]
pub mod database;

pub use api::{ApiClient, RequestError, DEFAULT_HEALTH_PATH};
#[cfg(feature = "postgres")]
pub use database::DatabaseClient;
