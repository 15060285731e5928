//! Service lifecycle management.
//!
//! 1. **Registry** (`registry`): identifier -> client bindings with batch
//!    start/stop and aggregate health
//! 2. **Reports** (`report`): per-service outcomes of batch operations
//! 3. **Configuration** (`config`): manager settings and stock service definitions
//! 4. **Background polling** (`worker`): periodic health snapshots

pub mod config;
pub mod registry;
pub mod report;
pub mod worker;

#[cfg(test)]
pub(crate) mod testing;

pub use config::{ApiServiceConfig, ConfigError, DatabaseServiceConfig, ManagerConfig};
pub use registry::ServiceRegistry;
pub use report::{BatchReport, HealthSnapshot, ServiceHealth};
pub use worker::{BackgroundRunnable, BackgroundWorker, HealthPoller, HealthPublisher, PollTask};
