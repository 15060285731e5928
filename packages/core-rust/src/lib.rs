//! `Berth` Core: service client contract, endpoint identity, and error taxonomy.

pub mod error;
pub mod traits;
pub mod types;

pub use error::{ConnectionError, DisconnectionError, EndpointError};
pub use traits::ServiceClient;
pub use types::{Availability, ServiceEndpoint, DEFAULT_CONNECTION_TIMEOUT_MS};
