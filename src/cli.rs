//! Command-Line Interface (CLI) argument parsing.
//!
//! The flags defined here are merged over the `procwatch.toml` file and the
//! environment, so every flag is optional and only overrides when present.

use clap::Parser;
use figment::{
    value::{Dict, Map, Value},
    Error, Metadata, Profile, Provider,
};
use std::path::PathBuf;

/// Reports this process's memory, CPU and file-descriptor usage as metrics.
#[derive(Parser, Debug, Clone, Default)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to the TOML configuration file.
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Sampling interval in milliseconds.
    #[arg(long, value_name = "MS")]
    pub poll_interval_ms: Option<u64>,

    /// Prefix prepended to every metric name.
    #[arg(long, value_name = "PREFIX")]
    pub prefix: Option<String>,

    /// Address for the Prometheus endpoint.
    #[arg(long, value_name = "ADDR")]
    pub listen_address: Option<String>,

    /// Log the gauges periodically instead of serving them.
    #[arg(long)]
    pub log_metrics: bool,

    /// Logging level filter.
    #[arg(long, value_name = "LEVEL")]
    pub log_level: Option<String>,
}

impl Provider for Cli {
    fn metadata(&self) -> Metadata {
        Metadata::named("Command-Line Arguments")
    }

    fn data(&self) -> Result<Map<Profile, Dict>, Error> {
        let mut monitor = Dict::new();
        if let Some(ms) = self.poll_interval_ms {
            monitor.insert("poll_interval_ms".into(), Value::from(ms));
        }
        if let Some(prefix) = &self.prefix {
            monitor.insert("prefix".into(), Value::from(prefix.clone()));
        }

        let mut metrics = Dict::new();
        if let Some(addr) = &self.listen_address {
            metrics.insert("listen_address".into(), Value::from(addr.clone()));
        }
        // A bare flag can only switch logging on; the file decides otherwise.
        if self.log_metrics {
            metrics.insert("log_metrics".into(), Value::from(true));
        }

        let mut dict = Dict::new();
        if let Some(level) = &self.log_level {
            dict.insert("log_level".into(), Value::from(level.clone()));
        }
        if !monitor.is_empty() {
            dict.insert("monitor".into(), Value::from(monitor));
        }
        if !metrics.is_empty() {
            dict.insert("metrics".into(), Value::from(metrics));
        }

        let mut map = Map::new();
        map.insert(Profile::Default, dict);
        Ok(map)
    }
}
