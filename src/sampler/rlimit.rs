use crate::config::FdLimit;
use crate::error::SampleError;

/// The process's `RLIMIT_NOFILE`, soft or hard as configured.
///
/// An unlimited value is reported as `u64::MAX`.
pub(crate) fn max_file_descriptors(kind: FdLimit) -> Result<u64, SampleError> {
    let mut limit = libc::rlimit {
        rlim_cur: 0,
        rlim_max: 0,
    };
    // SAFETY: `limit` is a valid, writable rlimit.
    if unsafe { libc::getrlimit(libc::RLIMIT_NOFILE, &mut limit) } != 0 {
        return Err(SampleError::last_os_error("getrlimit(RLIMIT_NOFILE)"));
    }
    let value = match kind {
        FdLimit::Soft => limit.rlim_cur,
        FdLimit::Hard => limit.rlim_max,
    };
    Ok(if value == libc::RLIM_INFINITY {
        u64::MAX
    } else {
        value as u64
    })
}
