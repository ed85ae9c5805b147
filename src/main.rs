//! procwatch - reports this process's resource usage as metrics.

use anyhow::Result;
use clap::Parser;
use procwatch::{
    cli::Cli,
    config::Config,
    internal_metrics::{Backend, MetricsBuilder},
    monitor::Monitor,
    task_manager::TaskManager,
};
use tokio::sync::watch;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load configuration by layering sources: defaults, file, environment, and CLI args.
    let config = match Config::load(&cli) {
        Ok(config) => config,
        Err(err) => {
            tracing_subscriber::fmt().init();
            error!("Failed to load configuration: {:#}", err);
            std::process::exit(1);
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level)),
        )
        .init();

    info!("procwatch starting up...");
    info!("-------------------- Configuration --------------------");
    info!("Log Level: {}", config.log_level);
    info!("Poll Interval: {}ms", config.monitor.poll_interval_ms);
    info!("Metric Prefix: {:?}", config.monitor.prefix);
    info!("FD Limit: {:?}", config.monitor.fd_limit);
    info!("Dimensions: {:?}", config.monitor.dimensions);
    info!("Log Metrics: {}", config.metrics.log_metrics);
    info!("Prometheus Endpoint: {}", config.metrics.listen_address);
    info!("-------------------------------------------------------");

    let (shutdown_tx, shutdown_rx) = watch::channel(());
    let task_manager = TaskManager::new(shutdown_rx);

    match MetricsBuilder::new(config.metrics.clone())
        .build(task_manager.shutdown_rx())
        .await?
    {
        Backend::Prometheus { server, addr } => {
            info!("Serving metrics on http://{}/metrics", addr);
            task_manager.spawn("MetricsServer", server.run());
        }
        Backend::Logging { handle } => task_manager.track("LoggingRecorder", handle),
        Backend::Disabled => {}
    }

    let monitor = Monitor::new(&config.monitor);
    monitor.describe();
    task_manager.spawn("ProcessMonitor", monitor.run(task_manager.shutdown_rx()));

    info!("procwatch initialized. Press Ctrl-C to stop.");
    tokio::signal::ctrl_c().await?;
    info!("Shutdown signal received. Shutting down gracefully...");

    // Every task also stops if the sender is gone, so a failed send is harmless.
    let _ = shutdown_tx.send(());
    let panicked = task_manager.shutdown().await;
    if !panicked.is_empty() {
        anyhow::bail!("tasks panicked during shutdown: {:?}", panicked);
    }

    info!("All tasks shut down. Exiting.");
    Ok(())
}
