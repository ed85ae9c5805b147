//! Snapshot of the current process built from `proc_pidinfo` on macOS.

use crate::config::FdLimit;
use crate::error::SampleError;
use crate::sampler::constants::{SystemConstants, TimeBase};
use crate::sampler::cpu::CpuUsageCalculator;
use crate::sampler::{clamp_usage, rlimit, Sampler, Snapshot};
use std::mem;
use std::ptr;

const NANOS_PER_SECOND: f64 = 1_000_000_000.0;

/// Reads task accounting and the descriptor table through libproc.
///
/// Mach time units are converted to nanoseconds, which is also the unit of
/// both inputs to the usage calculator.
pub struct DarwinSampler {
    fd_limit: FdLimit,
    cpu: CpuUsageCalculator,
}

impl DarwinSampler {
    pub fn new(fd_limit: FdLimit) -> Self {
        Self {
            fd_limit,
            cpu: CpuUsageCalculator::new(),
        }
    }
}

fn current_pid() -> libc::c_int {
    // SAFETY: getpid cannot fail.
    unsafe { libc::getpid() }
}

fn task_all_info(pid: libc::c_int) -> Result<libc::proc_taskallinfo, SampleError> {
    // SAFETY: proc_taskallinfo is plain old data; all-zero is a valid value.
    let mut info: libc::proc_taskallinfo = unsafe { mem::zeroed() };
    let size = mem::size_of::<libc::proc_taskallinfo>() as libc::c_int;
    // SAFETY: the buffer is `size` writable bytes.
    let written = unsafe {
        libc::proc_pidinfo(
            pid,
            libc::PROC_PIDTASKALLINFO,
            0,
            &mut info as *mut _ as *mut libc::c_void,
            size,
        )
    };
    if written != size {
        return Err(SampleError::last_os_error("proc_pidinfo(PROC_PIDTASKALLINFO)"));
    }
    Ok(info)
}

/// Counts open descriptors with a size query followed by a fetch.
fn open_file_descriptors(pid: libc::c_int) -> Result<u64, SampleError> {
    // SAFETY: a null buffer of size zero asks only for the required size.
    let required = unsafe { libc::proc_pidinfo(pid, libc::PROC_PIDLISTFDS, 0, ptr::null_mut(), 0) };
    if required <= 0 {
        return Err(SampleError::last_os_error("proc_pidinfo(PROC_PIDLISTFDS)"));
    }

    let entry_size = mem::size_of::<libc::proc_fdinfo>();
    let capacity = required as usize / entry_size;
    let mut fds: Vec<libc::proc_fdinfo> = Vec::with_capacity(capacity);
    let buffer_bytes = (capacity * entry_size) as libc::c_int;
    // SAFETY: the buffer has room for `capacity` entries, i.e. `buffer_bytes`.
    let returned = unsafe {
        libc::proc_pidinfo(
            pid,
            libc::PROC_PIDLISTFDS,
            0,
            fds.as_mut_ptr() as *mut libc::c_void,
            buffer_bytes,
        )
    };
    if returned < 0 {
        return Err(SampleError::last_os_error("proc_pidinfo(PROC_PIDLISTFDS)"));
    }
    assert!(
        returned <= buffer_bytes,
        "proc_pidinfo wrote {returned} bytes into a {buffer_bytes} byte buffer"
    );
    Ok(returned as u64 / entry_size as u64)
}

#[allow(deprecated)]
fn mach_now() -> u64 {
    // SAFETY: mach_absolute_time has no preconditions.
    unsafe { libc::mach_absolute_time() }
}

impl Sampler for DarwinSampler {
    fn try_sample(&self) -> Result<Snapshot, SampleError> {
        let constants = SystemConstants::host()?;
        let time_base: TimeBase = constants
            .time_base
            .ok_or_else(|| SampleError::parse("mach_timebase_info", "no time base"))?;

        let pid = current_pid();
        // Task times and the wall clock feed the usage rate, so take them together.
        let info = task_all_info(pid)?;
        let now_nanos = time_base.to_nanos(mach_now());

        let open_fds = open_file_descriptors(pid)?;
        let max_fds = rlimit::max_file_descriptors(self.fd_limit)?;

        let task = &info.ptinfo;
        let cpu_nanos = time_base.to_nanos(task.pti_total_user.saturating_add(task.pti_total_system));
        let usage = self.cpu.usage_percent(now_nanos, cpu_nanos);

        Ok(Snapshot {
            virtual_memory_bytes: task.pti_virtual_size,
            resident_memory_bytes: task.pti_resident_size,
            start_time_seconds: info.pbsd.pbi_start_tvsec,
            cpu_seconds: cpu_nanos as f64 / NANOS_PER_SECOND,
            cpu_usage_percent: clamp_usage(usage),
            max_file_descriptors: max_fds,
            open_file_descriptors: open_fds,
        })
    }
}
