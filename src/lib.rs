//! procwatch - process resource metrics for long-running services
//!
//! Samples the current process's memory, CPU time and usage, start time and
//! file descriptors from the operating system and reports them as gauges
//! through the `metrics` facade.
//!
//! ```no_run
//! use procwatch::{config::MonitorConfig, monitor::Monitor};
//!
//! # async fn example(shutdown_rx: tokio::sync::watch::Receiver<()>) {
//! let monitor = Monitor::new(&MonitorConfig::default());
//! monitor.describe();
//! tokio::spawn(monitor.run(shutdown_rx));
//! # }
//! ```

pub mod cli;
pub mod config;
pub mod error;
pub mod internal_metrics;
pub mod monitor;
pub mod sampler;
pub mod task_manager;

// Re-export the types most embedders need.
pub use error::SampleError;
pub use monitor::{MetricNames, Monitor};
pub use sampler::{system_sampler, Sampler, Snapshot};
