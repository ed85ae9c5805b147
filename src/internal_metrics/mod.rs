//! # Metrics Backend
//!
//! Installs the global `metrics` recorder that the [`Monitor`] reports into.
//!
//! ## Components:
//!
//! - **`MetricsBuilder`**: Chooses and installs a recorder based on the
//!   configuration. It either sets up the Prometheus recorder together with
//!   a `MetricsServer`, or a `LoggingRecorder` that prints gauges.
//!
//! - **`MetricsServer`**: (Defined in `server.rs`) An `axum`-based web server
//!   that exposes the `/metrics` endpoint for Prometheus to scrape.
//!
//! - **`LoggingRecorder`**: (Defined in `logging_recorder.rs`) A recorder
//!   that keeps gauges in memory and logs them on an interval.
//!
//! [`Monitor`]: crate::monitor::Monitor

use crate::config::MetricsConfig;
use crate::internal_metrics::logging_recorder::LoggingRecorder;
use crate::internal_metrics::server::MetricsServer;
use anyhow::{Context, Result};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::info;

pub mod logging_recorder;
pub mod server;

/// What [`MetricsBuilder::build`] installed.
pub enum Backend {
    /// A Prometheus endpoint, ready to be spawned.
    Prometheus {
        server: MetricsServer,
        addr: SocketAddr,
    },
    /// A logging recorder whose task is already running.
    Logging { handle: JoinHandle<()> },
    /// Nothing was installed; gauges go to the no-op recorder.
    Disabled,
}

/// Builder for the metrics backend.
pub struct MetricsBuilder {
    config: MetricsConfig,
}

impl MetricsBuilder {
    /// Creates a new `MetricsBuilder` with the given configuration.
    pub fn new(config: MetricsConfig) -> Self {
        Self { config }
    }

    /// Installs the global recorder selected by the configuration.
    ///
    /// `log_metrics` takes precedence over the Prometheus endpoint. Must be
    /// called from within a tokio runtime.
    pub async fn build(self, shutdown_rx: watch::Receiver<()>) -> Result<Backend> {
        if self.config.log_metrics {
            let interval = Duration::from_secs(self.config.log_aggregation_seconds);
            info!(
                "Logging recorder enabled. Metrics will be printed every {} seconds.",
                interval.as_secs()
            );
            let (recorder, handle) = LoggingRecorder::new(interval, shutdown_rx);
            metrics::set_global_recorder(recorder)
                .map_err(|e| anyhow::anyhow!("failed to install logging recorder: {e}"))?;
            return Ok(Backend::Logging { handle });
        }

        if !self.config.enabled {
            info!("Metrics backend disabled.");
            return Ok(Backend::Disabled);
        }

        let recorder = PrometheusBuilder::new().build_recorder();
        let handle = recorder.handle();

        // Bind before installing so a busy port leaves no recorder behind.
        let listener = TcpListener::bind(self.config.listen_address)
            .await
            .with_context(|| {
                format!(
                    "failed to bind metrics server to {}",
                    self.config.listen_address
                )
            })?;
        let addr = listener
            .local_addr()
            .context("failed to get local address for metrics server")?;

        metrics::set_global_recorder(recorder)
            .map_err(|e| anyhow::anyhow!("failed to install Prometheus recorder: {e}"))?;

        Ok(Backend::Prometheus {
            server: MetricsServer::new(listener, handle, shutdown_rx),
            addr,
        })
    }
}
