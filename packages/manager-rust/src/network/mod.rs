//! Status HTTP surface, lifecycle control, and their configuration.

pub mod config;
pub mod handlers;
pub mod lifecycle;
pub mod middleware;
pub mod module;

pub use config::StatusConfig;
pub use handlers::StatusState;
pub use lifecycle::{LifecycleController, LifecycleState};
pub use module::StatusModule;
