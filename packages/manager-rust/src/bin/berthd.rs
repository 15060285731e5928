//! `berthd` starts the stock container services, polls their health, and
//! serves status endpoints until interrupted.

use std::sync::Arc;
use std::time::Duration;

use berth_core::DEFAULT_CONNECTION_TIMEOUT_MS;
use berth_manager::network::{LifecycleController, StatusConfig, StatusModule};
use berth_manager::service::{
    ApiServiceConfig, BackgroundWorker, DatabaseServiceConfig, HealthPoller, ManagerConfig,
    PollTask,
};
use berth_manager::telemetry::{init_tracing, LogFormat};
use clap::Parser;
use tracing::{info, warn};

#[derive(Debug, Parser)]
#[command(name = "berthd", version, about = "Container service lifecycle manager")]
struct Cli {
    /// Upper bound for each connect/disconnect/probe call.
    #[arg(long, env = "BERTH_CONNECTION_TIMEOUT_MS", default_value_t = DEFAULT_CONNECTION_TIMEOUT_MS)]
    connection_timeout_ms: u64,

    /// Interval between background health checks.
    #[arg(long, env = "BERTH_HEALTH_INTERVAL_MS", default_value_t = 10_000)]
    health_interval_ms: u64,

    /// How long shutdown waits for every service to stop.
    #[arg(long, env = "BERTH_DRAIN_TIMEOUT_MS", default_value_t = 5_000)]
    drain_timeout_ms: u64,

    #[arg(long, env = "BERTH_STATUS_HOST", default_value = "127.0.0.1")]
    status_host: String,

    /// 0 picks an ephemeral port.
    #[arg(long, env = "BERTH_STATUS_PORT", default_value_t = 0)]
    status_port: u16,

    #[arg(long, env = "BERTH_LOG_FORMAT", default_value = "pretty")]
    log_format: LogFormat,

    #[arg(long, env = "BERTH_API_URL", default_value = "localhost")]
    api_url: String,

    #[arg(long, env = "BERTH_API_PORT", default_value_t = 8080)]
    api_port: u16,

    #[arg(long, env = "BERTH_API_HEALTH_PATH", default_value = "/health")]
    api_health_path: String,

    /// Do not register the API service.
    #[arg(long)]
    no_api: bool,

    #[arg(long, env = "BERTH_DB_URL", default_value = "localhost")]
    db_url: String,

    #[arg(long, env = "BERTH_DB_PORT", default_value_t = 5432)]
    db_port: u16,

    #[arg(long, env = "BERTH_DB_NAME", default_value = "app")]
    db_name: String,

    #[arg(long, env = "BERTH_DB_USER", default_value = "app")]
    db_user: String,

    #[arg(long, env = "BERTH_DB_PASSWORD", default_value = "", hide_env_values = true)]
    db_password: String,

    /// Do not register the database service.
    #[arg(long)]
    no_database: bool,
}

impl Cli {
    fn manager_config(&self) -> ManagerConfig {
        ManagerConfig {
            connection_timeout_ms: self.connection_timeout_ms,
            health_interval_ms: self.health_interval_ms,
            drain_timeout: Duration::from_millis(self.drain_timeout_ms),
            api: (!self.no_api).then(|| ApiServiceConfig {
                url: self.api_url.clone(),
                port: self.api_port,
                health_path: self.api_health_path.clone(),
                ..ApiServiceConfig::default()
            }),
            database: (!self.no_database).then(|| DatabaseServiceConfig {
                url: self.db_url.clone(),
                port: self.db_port,
                database: self.db_name.clone(),
                username: self.db_user.clone(),
                password: self.db_password.clone(),
                ..DatabaseServiceConfig::default()
            }),
        }
    }

    fn status_config(&self) -> StatusConfig {
        StatusConfig {
            host: self.status_host.clone(),
            port: self.status_port,
            ..StatusConfig::default()
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_format)?;

    let config = cli.manager_config();
    let registry = Arc::new(config.build_registry()?);
    let lifecycle = Arc::new(LifecycleController::new());

    info!(services = registry.len(), "starting berthd");
    let report = registry.start_all().await;
    if !report.is_success() {
        warn!(
            failed = report.failed().len(),
            "some container services did not start; health polling will track them"
        );
    }

    let (poller, _snapshots) = HealthPoller::new(Arc::clone(&registry));
    let health = poller.publisher();
    let mut poller = BackgroundWorker::start(poller, config.health_interval_ms);
    poller.submit(PollTask::RefreshNow).await?;

    let mut status = StatusModule::new(cli.status_config(), Arc::clone(&lifecycle), health);
    let port = status.start().await?;
    lifecycle.set_running();
    info!(port, "berthd running");

    let mut shutdown_rx = lifecycle.shutdown_receiver();
    let server = tokio::spawn(status.serve(async move {
        let _ = shutdown_rx.wait_for(|stop| *stop).await;
    }));

    shutdown_signal().await;
    info!("shutdown requested");

    lifecycle.trigger_shutdown();
    poller.stop().await;
    lifecycle
        .stop_services(&registry, config.drain_timeout)
        .await;
    server.await??;

    info!("berthd stopped");
    Ok(())
}

/// Resolves on Ctrl-C, or SIGTERM on Unix.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {}
        () = terminate => {}
    }
}
