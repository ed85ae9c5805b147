//! Snapshot of the current process built from `/proc`.

use crate::config::FdLimit;
use crate::error::SampleError;
use crate::sampler::constants::SystemConstants;
use crate::sampler::cpu::CpuUsageCalculator;
use crate::sampler::procfs::{self, FileSystem, RealFs};
use crate::sampler::{clamp_usage, rlimit, Sampler, Snapshot};
use std::path::Path;
use std::sync::OnceLock;

/// Reads `/proc/self/stat`, `/proc/uptime`, `/proc/stat` and `/proc/self/fd`.
///
/// CPU time comes from the stat ticks; the same tick sum feeds the usage
/// calculator, paired with uptime converted to ticks.
pub struct LinuxSampler<F = RealFs> {
    fs: F,
    constants: Option<SystemConstants>,
    fd_limit: FdLimit,
    boot_time: OnceLock<u64>,
    cpu: CpuUsageCalculator,
}

impl LinuxSampler<RealFs> {
    /// A sampler over the real `/proc`, using the host's constants.
    pub fn new(fd_limit: FdLimit) -> Self {
        Self {
            fs: RealFs,
            constants: None,
            fd_limit,
            boot_time: OnceLock::new(),
            cpu: CpuUsageCalculator::new(),
        }
    }
}

impl<F: FileSystem> LinuxSampler<F> {
    /// A sampler over an arbitrary filesystem with fixed constants.
    pub fn with_source(fs: F, constants: SystemConstants, fd_limit: FdLimit) -> Self {
        Self {
            fs,
            constants: Some(constants),
            fd_limit,
            boot_time: OnceLock::new(),
            cpu: CpuUsageCalculator::new(),
        }
    }

    fn constants(&self) -> Result<SystemConstants, SampleError> {
        match self.constants {
            Some(constants) => Ok(constants),
            None => SystemConstants::host(),
        }
    }

    /// System boot time, read from `/proc/stat` until it succeeds once.
    fn boot_time(&self) -> Result<u64, SampleError> {
        if let Some(btime) = self.boot_time.get() {
            return Ok(*btime);
        }
        let content = procfs::read(&self.fs, procfs::GLOBAL_STAT)?;
        let btime = procfs::parse_boot_time(&content)?;
        Ok(*self.boot_time.get_or_init(|| btime))
    }
}

impl<F: FileSystem> Sampler for LinuxSampler<F> {
    fn try_sample(&self) -> Result<Snapshot, SampleError> {
        let constants = self.constants()?;
        let ticks_per_second = constants.clock_ticks_per_second;
        if ticks_per_second == 0 {
            return Err(SampleError::parse("sysconf", "zero clock ticks per second"));
        }

        // Both files feed the usage rate, so read them before parsing either.
        let stat = procfs::read(&self.fs, procfs::SELF_STAT)?;
        let uptime = procfs::read(&self.fs, procfs::UPTIME)?;

        let stat = procfs::parse_self_stat(&stat)?;
        let uptime = procfs::parse_uptime(&uptime)?;
        let boot_time = self.boot_time()?;
        let max_fds = rlimit::max_file_descriptors(self.fd_limit)?;
        let open_fds = self
            .fs
            .count_entries(Path::new(procfs::SELF_FD))
            .map_err(|source| SampleError::SourceUnavailable {
                path: procfs::SELF_FD.into(),
                source,
            })?;

        let cpu_ticks = stat.cpu_ticks();
        let ticks_since_boot = (uptime * ticks_per_second as f64) as u64;
        let usage = self.cpu.usage_percent(ticks_since_boot, cpu_ticks);

        Ok(Snapshot {
            virtual_memory_bytes: stat.vsize,
            resident_memory_bytes: stat.rss_pages.saturating_mul(constants.page_size),
            start_time_seconds: boot_time + stat.start_ticks / ticks_per_second,
            cpu_seconds: cpu_ticks as f64 / ticks_per_second as f64,
            cpu_usage_percent: clamp_usage(usage),
            max_file_descriptors: max_fds,
            open_file_descriptors: open_fds as u64,
        })
    }
}
