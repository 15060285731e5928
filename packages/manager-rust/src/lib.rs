//! `Berth` Manager: container service registry, API/database clients,
//! health polling, and status endpoints.

pub mod clients;
pub mod network;
pub mod service;
pub mod telemetry;

pub use berth_core::{
    Availability, ConnectionError, DisconnectionError, ServiceClient, ServiceEndpoint,
};
pub use service::{BatchReport, HealthSnapshot, ManagerConfig, ServiceRegistry};
