//! # Process Monitor
//!
//! This module defines the `Monitor`, which periodically samples the current
//! process through a [`Sampler`] and reports the result as gauges through
//! the `metrics` facade. Whatever recorder is installed (Prometheus, the
//! logging recorder, or a test recorder) receives the values.
//!
//! A failed or unsupported sample emits nothing for that tick; the next
//! tick retries.

use crate::config::{MetricLabels, MonitorConfig};
use crate::sampler::{system_sampler, Sampler, Snapshot};
use metrics::Unit;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time;
use tracing::{debug, error, info};

/// Fully qualified gauge names: the configured prefix followed by each label.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricNames {
    pub virtual_memory_bytes: String,
    pub resident_memory_bytes: String,
    pub start_time_seconds: String,
    pub cpu_seconds_total: String,
    pub cpu_usage: String,
    pub max_fds: String,
    pub open_fds: String,
}

impl MetricNames {
    /// Joins `prefix` and each label with no separator.
    pub fn new(prefix: &str, labels: &MetricLabels) -> Self {
        let name = |label: &str| format!("{prefix}{label}");
        Self {
            virtual_memory_bytes: name(&labels.virtual_memory_bytes),
            resident_memory_bytes: name(&labels.resident_memory_bytes),
            start_time_seconds: name(&labels.start_time_seconds),
            cpu_seconds_total: name(&labels.cpu_seconds_total),
            cpu_usage: name(&labels.cpu_usage),
            max_fds: name(&labels.max_fds),
            open_fds: name(&labels.open_fds),
        }
    }
}

/// Samples the current process on an interval and publishes gauges.
///
/// Each monitor owns its sampler, and with it an independent CPU usage
/// baseline.
pub struct Monitor {
    sampler: Arc<dyn Sampler>,
    names: MetricNames,
    dimensions: Vec<(String, String)>,
    poll_interval: Duration,
}

impl std::fmt::Debug for Monitor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Monitor")
            .field("names", &self.names)
            .field("dimensions", &self.dimensions)
            .field("poll_interval", &self.poll_interval)
            .finish_non_exhaustive()
    }
}

impl Monitor {
    /// Creates a monitor using the sampler for the host platform.
    pub fn new(config: &MonitorConfig) -> Self {
        Self::with_sampler(config, system_sampler(config.fd_limit))
    }

    /// Creates a monitor around an explicit sampler.
    pub fn with_sampler(config: &MonitorConfig, sampler: Arc<dyn Sampler>) -> Self {
        Self {
            sampler,
            names: MetricNames::new(&config.prefix, &config.labels),
            dimensions: config.dimensions.clone(),
            // tokio intervals reject a zero period.
            poll_interval: config.poll_interval().max(Duration::from_millis(1)),
        }
    }

    pub fn names(&self) -> &MetricNames {
        &self.names
    }

    /// Registers units and descriptions for every gauge with the installed recorder.
    pub fn describe(&self) {
        let n = &self.names;
        metrics::describe_gauge!(n.virtual_memory_bytes.clone(), Unit::Bytes, "Virtual memory size in bytes.");
        metrics::describe_gauge!(n.resident_memory_bytes.clone(), Unit::Bytes, "Resident memory size in bytes.");
        metrics::describe_gauge!(n.start_time_seconds.clone(), Unit::Seconds, "Start time of the process since unix epoch in seconds.");
        metrics::describe_gauge!(n.cpu_seconds_total.clone(), Unit::Seconds, "Total user and system CPU time spent in seconds.");
        metrics::describe_gauge!(n.cpu_usage.clone(), Unit::Percent, "CPU usage since the previous sample, 100 per busy core.");
        metrics::describe_gauge!(n.max_fds.clone(), Unit::Count, "Maximum number of open file descriptors.");
        metrics::describe_gauge!(n.open_fds.clone(), Unit::Count, "Number of open file descriptors.");
    }

    /// Sets all seven gauges from one snapshot.
    pub fn report(&self, snapshot: &Snapshot) {
        let n = &self.names;
        let dims = &self.dimensions;
        metrics::gauge!(n.virtual_memory_bytes.clone(), dims).set(snapshot.virtual_memory_bytes as f64);
        metrics::gauge!(n.resident_memory_bytes.clone(), dims).set(snapshot.resident_memory_bytes as f64);
        metrics::gauge!(n.start_time_seconds.clone(), dims).set(snapshot.start_time_seconds as f64);
        metrics::gauge!(n.cpu_seconds_total.clone(), dims).set(snapshot.cpu_seconds);
        metrics::gauge!(n.cpu_usage.clone(), dims).set(snapshot.cpu_usage_percent);
        metrics::gauge!(n.max_fds.clone(), dims).set(snapshot.max_file_descriptors as f64);
        metrics::gauge!(n.open_fds.clone(), dims).set(snapshot.open_file_descriptors as f64);
    }

    /// Samples once, blocking the calling thread, and reports on success.
    ///
    /// Returns whether a snapshot was emitted.
    pub fn poll(&self) -> bool {
        match self.sampler.sample() {
            Some(snapshot) => {
                self.report(&snapshot);
                true
            }
            None => false,
        }
    }

    /// Runs the sampling loop until the shutdown channel fires or closes.
    ///
    /// The first sample is taken immediately. Sampling runs on tokio's
    /// blocking pool since it performs file and syscall I/O.
    pub async fn run(self, mut shutdown_rx: watch::Receiver<()>) {
        info!(
            interval_ms = self.poll_interval.as_millis() as u64,
            "Process monitor started."
        );
        let mut interval = time::interval(self.poll_interval);
        interval.set_missed_tick_behavior(time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                _ = shutdown_rx.changed() => {
                    info!("Process monitor received shutdown signal.");
                    break;
                }
                _ = interval.tick() => {
                    let sampler = Arc::clone(&self.sampler);
                    match tokio::task::spawn_blocking(move || sampler.sample()).await {
                        Ok(Some(snapshot)) => self.report(&snapshot),
                        Ok(None) => debug!("No process snapshot this tick."),
                        Err(e) => error!(error = %e, "Process sampling task failed."),
                    }
                }
            }
        }
        info!("Process monitor finished.");
    }
}
