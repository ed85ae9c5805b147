//! Configuration management for procwatch
//!
//! This module defines the main `Config` struct and its sub-structs. It uses
//! the `figment` crate to layer defaults, a `procwatch.toml` file,
//! `PROCWATCH_`-prefixed environment variables and command-line flags.

use crate::cli::Cli;
use anyhow::Result;
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

/// The main configuration struct for the application.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct Config {
    /// The logging level filter, e.g. `info` or `procwatch=debug`.
    pub log_level: String,
    /// Configuration for the process monitor.
    pub monitor: MonitorConfig,
    /// Configuration for the metrics backend.
    pub metrics: MetricsConfig,
}

/// Which `RLIMIT_NOFILE` value is reported as the descriptor ceiling.
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum FdLimit {
    /// The current limit, which the process may raise up to the hard limit.
    Soft,
    /// The ceiling set by the administrator.
    #[default]
    Hard,
}

/// Configuration for the process monitor.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct MonitorConfig {
    /// How often to sample, in milliseconds.
    pub poll_interval_ms: u64,
    /// Prepended verbatim to every metric label.
    pub prefix: String,
    /// Which descriptor limit to report as `max_fds`.
    pub fd_limit: FdLimit,
    /// Per-metric labels, without the prefix.
    pub labels: MetricLabels,
    /// Extra `(key, value)` dimensions attached to every gauge, in order.
    pub dimensions: Vec<(String, String)>,
}

impl MonitorConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

/// Label of each exported gauge, before the prefix is applied.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct MetricLabels {
    pub virtual_memory_bytes: String,
    pub resident_memory_bytes: String,
    pub start_time_seconds: String,
    pub cpu_seconds_total: String,
    pub cpu_usage: String,
    pub max_fds: String,
    pub open_fds: String,
}

/// Configuration for the metrics backend.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct MetricsConfig {
    /// Serve a Prometheus `/metrics` endpoint.
    pub enabled: bool,
    /// Address the Prometheus endpoint binds to.
    pub listen_address: SocketAddr,
    /// Log gauges periodically instead of serving them.
    pub log_metrics: bool,
    /// How often the logging recorder prints, in seconds.
    pub log_aggregation_seconds: u64,
}

impl Config {
    /// Loads the configuration by layering defaults, the TOML file named by
    /// the CLI (or `procwatch.toml`), environment variables and CLI flags.
    pub fn load(cli: &Cli) -> Result<Self> {
        let config_path = cli
            .config
            .clone()
            .unwrap_or_else(|| PathBuf::from("procwatch.toml"));
        log::debug!("Loading configuration from {}", config_path.display());

        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file(config_path))
            // e.g. PROCWATCH_MONITOR__POLL_INTERVAL_MS=500
            .merge(Env::prefixed("PROCWATCH_").split("__"))
            .merge(cli.clone())
            .extract()?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.monitor.poll_interval_ms == 0 {
            anyhow::bail!("monitor.poll_interval_ms must be greater than zero");
        }
        if self.metrics.log_metrics && self.metrics.log_aggregation_seconds == 0 {
            anyhow::bail!("metrics.log_aggregation_seconds must be greater than zero");
        }
        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            monitor: MonitorConfig::default(),
            metrics: MetricsConfig::default(),
        }
    }
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 10_000,
            prefix: "process_".to_string(),
            fd_limit: FdLimit::Hard,
            labels: MetricLabels::default(),
            dimensions: Vec::new(),
        }
    }
}

impl Default for MetricLabels {
    fn default() -> Self {
        Self {
            virtual_memory_bytes: "virtual_memory_bytes".to_string(),
            resident_memory_bytes: "resident_memory_bytes".to_string(),
            start_time_seconds: "start_time_seconds".to_string(),
            cpu_seconds_total: "cpu_seconds_total".to_string(),
            cpu_usage: "cpu_usage".to_string(),
            max_fds: "max_fds".to_string(),
            open_fds: "open_fds".to_string(),
        }
    }
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            listen_address: SocketAddr::from(([127, 0, 0, 1], 9184)),
            log_metrics: false,
            log_aggregation_seconds: 60,
        }
    }
}
