//! Error types for the sampling pipeline.
//!
//! None of these ever reach the scheduler or the metrics backend: the
//! sampler converts every variant into "no snapshot this tick".

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Why a sampling pass produced no snapshot.
#[derive(Debug, Error)]
pub enum SampleError {
    /// The host platform has no sampler.
    #[error("process sampling is not supported on this platform")]
    Unsupported,

    /// An accounting file could not be read.
    #[error("failed to read {}: {source}", path.display())]
    SourceUnavailable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// An accounting source returned data in an unexpected shape.
    #[error("failed to parse {what}: {reason}")]
    Parse { what: &'static str, reason: String },

    /// An OS call reported an error status.
    #[error("{call} failed: {source}")]
    Syscall {
        call: &'static str,
        #[source]
        source: io::Error,
    },
}

impl SampleError {
    pub(crate) fn parse(what: &'static str, reason: impl Into<String>) -> Self {
        Self::Parse {
            what,
            reason: reason.into(),
        }
    }

    /// Captures `errno` for a failed call.
    pub(crate) fn last_os_error(call: &'static str) -> Self {
        Self::Syscall {
            call,
            source: io::Error::last_os_error(),
        }
    }
}
