//! # Process Sampler
//!
//! Platform-specific readers that turn the kernel's accounting data for the
//! current process into a [`Snapshot`].
//!
//! - **`LinuxSampler`** reads `/proc/self/stat`, `/proc/uptime`, `/proc/stat`
//!   and `/proc/self/fd`, plus `getrlimit`.
//! - **`DarwinSampler`** uses `proc_pidinfo` and the Mach time base.
//! - **`UnsupportedSampler`** never produces data.
//!
//! [`system_sampler`] picks the right one at compile time.

use crate::config::FdLimit;
use crate::error::SampleError;
use std::sync::Arc;
use tracing::debug;

pub mod constants;
pub mod cpu;
pub mod procfs;
pub mod unsupported;

#[cfg(target_os = "linux")]
pub mod linux;

#[cfg(target_os = "macos")]
pub mod darwin;

#[cfg(unix)]
mod rlimit;

/// One complete, internally consistent set of resource figures for a single poll.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Snapshot {
    pub virtual_memory_bytes: u64,
    pub resident_memory_bytes: u64,
    /// Unix epoch seconds at which the process started.
    pub start_time_seconds: u64,
    /// Cumulative user + system CPU time.
    pub cpu_seconds: f64,
    /// Usage since the previous sample, `100.0` per fully busy core.
    pub cpu_usage_percent: f64,
    pub max_file_descriptors: u64,
    pub open_file_descriptors: u64,
}

/// A source of [`Snapshot`]s for the current process.
///
/// Implementations perform blocking I/O; async callers should run them on a
/// blocking thread.
pub trait Sampler: Send + Sync {
    /// Reads every source and builds a snapshot, or reports the first failure.
    fn try_sample(&self) -> Result<Snapshot, SampleError>;

    /// Like [`Sampler::try_sample`], but folds every failure into `None`.
    fn sample(&self) -> Option<Snapshot> {
        match self.try_sample() {
            Ok(snapshot) => Some(snapshot),
            Err(SampleError::Unsupported) => None,
            Err(e) => {
                debug!(error = %e, "Process sample unavailable this tick");
                None
            }
        }
    }
}

/// Returns the sampler for the host platform.
#[cfg(target_os = "linux")]
pub fn system_sampler(fd_limit: FdLimit) -> Arc<dyn Sampler> {
    Arc::new(linux::LinuxSampler::new(fd_limit))
}

/// Returns the sampler for the host platform.
#[cfg(target_os = "macos")]
pub fn system_sampler(fd_limit: FdLimit) -> Arc<dyn Sampler> {
    Arc::new(darwin::DarwinSampler::new(fd_limit))
}

/// Returns the sampler for the host platform.
#[cfg(not(any(target_os = "linux", target_os = "macos")))]
pub fn system_sampler(_fd_limit: FdLimit) -> Arc<dyn Sampler> {
    Arc::new(unsupported::UnsupportedSampler)
}

/// Clamps a usage figure into `[0, 100 * cores]`.
#[cfg_attr(not(any(target_os = "linux", target_os = "macos")), allow(dead_code))]
pub(crate) fn clamp_usage(percent: f64) -> f64 {
    let ceiling = 100.0 * num_cpus::get() as f64;
    percent.clamp(0.0, ceiling)
}
