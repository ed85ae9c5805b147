//! Scaling constants reported by the OS, computed once per process.

use crate::error::SampleError;
use std::sync::OnceLock;

/// Ratio converting Mach absolute time units into nanoseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeBase {
    pub numer: u32,
    pub denom: u32,
}

impl TimeBase {
    /// Converts Mach ticks to nanoseconds without intermediate overflow.
    pub fn to_nanos(&self, ticks: u64) -> u64 {
        if self.denom == 0 {
            return 0;
        }
        let nanos = ticks as u128 * self.numer as u128 / self.denom as u128;
        u64::try_from(nanos).unwrap_or(u64::MAX)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SystemConstants {
    pub clock_ticks_per_second: u64,
    pub page_size: u64,
    /// Only reported on macOS.
    pub time_base: Option<TimeBase>,
}

static HOST: OnceLock<Option<SystemConstants>> = OnceLock::new();

impl SystemConstants {
    /// The host's constants. Queried on first call and cached afterwards.
    pub fn host() -> Result<SystemConstants, SampleError> {
        let cached = *HOST.get_or_init(|| query().ok());
        cached.ok_or_else(|| SampleError::parse("sysconf", "system constants unavailable"))
    }
}

#[cfg(unix)]
fn query() -> Result<SystemConstants, SampleError> {
    // SAFETY: sysconf has no preconditions.
    let ticks = unsafe { libc::sysconf(libc::_SC_CLK_TCK) };
    if ticks <= 0 {
        return Err(SampleError::last_os_error("sysconf(_SC_CLK_TCK)"));
    }
    // SAFETY: sysconf has no preconditions.
    let page_size = unsafe { libc::sysconf(libc::_SC_PAGESIZE) };
    if page_size <= 0 {
        return Err(SampleError::last_os_error("sysconf(_SC_PAGESIZE)"));
    }
    Ok(SystemConstants {
        clock_ticks_per_second: ticks as u64,
        page_size: page_size as u64,
        time_base: time_base()?,
    })
}

#[cfg(not(unix))]
fn query() -> Result<SystemConstants, SampleError> {
    Err(SampleError::Unsupported)
}

#[cfg(target_os = "macos")]
#[allow(deprecated)]
fn time_base() -> Result<Option<TimeBase>, SampleError> {
    let mut info = libc::mach_timebase_info { numer: 0, denom: 0 };
    // SAFETY: `info` is a valid, writable mach_timebase_info.
    let status = unsafe { libc::mach_timebase_info(&mut info) };
    if status != 0 || info.denom == 0 {
        return Err(SampleError::parse(
            "mach_timebase_info",
            format!("status {status}, denominator {}", info.denom),
        ));
    }
    Ok(Some(TimeBase {
        numer: info.numer,
        denom: info.denom,
    }))
}

#[cfg(all(unix, not(target_os = "macos")))]
fn time_base() -> Result<Option<TimeBase>, SampleError> {
    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn time_base_scales_ticks() {
        let apple_silicon = TimeBase { numer: 125, denom: 3 };
        assert_eq!(apple_silicon.to_nanos(24_000_000), 1_000_000_000);

        let identity = TimeBase { numer: 1, denom: 1 };
        assert_eq!(identity.to_nanos(42), 42);

        let broken = TimeBase { numer: 1, denom: 0 };
        assert_eq!(broken.to_nanos(42), 0);
    }

    #[cfg(unix)]
    #[test]
    fn host_constants_are_cached() {
        let first = SystemConstants::host().unwrap();
        let second = SystemConstants::host().unwrap();
        assert_eq!(first, second);
        assert!(first.clock_ticks_per_second > 0);
        assert!(first.page_size.is_power_of_two());
        assert_eq!(first.time_base.is_some(), cfg!(target_os = "macos"));
    }
}
