//! Parsers and file access for the Linux `/proc` accounting files.
//!
//! The parsers are pure functions over file contents so they can be tested
//! with string inputs on any host. File access goes through [`FileSystem`],
//! which is backed by the real filesystem in production and by [`MockFs`]
//! in tests.

use crate::error::SampleError;
#[cfg(any(test, feature = "test-utils"))]
use std::collections::BTreeMap;
use std::io;
use std::path::{Path, PathBuf};

pub const SELF_STAT: &str = "/proc/self/stat";
pub const UPTIME: &str = "/proc/uptime";
pub const GLOBAL_STAT: &str = "/proc/stat";
pub const SELF_FD: &str = "/proc/self/fd";

// Offsets into the fields that follow the closing `)` of the comm field.
const UTIME: usize = 11;
const STIME: usize = 12;
const STARTTIME: usize = 19;
const VSIZE: usize = 20;
const RSS: usize = 21;

/// The fields of `/proc/self/stat` that feed a snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SelfStat {
    /// User-mode ticks.
    pub utime: u64,
    /// Kernel-mode ticks.
    pub stime: u64,
    /// Ticks between system boot and process start.
    pub start_ticks: u64,
    /// Virtual memory size in bytes.
    pub vsize: u64,
    /// Resident set size in pages.
    pub rss_pages: u64,
}

impl SelfStat {
    pub fn cpu_ticks(&self) -> u64 {
        self.utime.saturating_add(self.stime)
    }
}

/// Parses `/proc/[pid]/stat` content.
///
/// The comm field is parenthesized and may itself contain spaces and
/// parentheses, so the split happens on the last `)`.
pub fn parse_self_stat(content: &str) -> Result<SelfStat, SampleError> {
    let close_paren = content
        .rfind(')')
        .ok_or_else(|| SampleError::parse("stat", "missing ')'"))?;
    let fields: Vec<&str> = content[close_paren + 1..].split_whitespace().collect();

    let field = |idx: usize, name: &str| -> Result<u64, SampleError> {
        fields
            .get(idx)
            .ok_or_else(|| SampleError::parse("stat", format!("missing field {name}")))?
            .parse()
            .map_err(|_| SampleError::parse("stat", format!("invalid {name}")))
    };

    Ok(SelfStat {
        utime: field(UTIME, "utime")?,
        stime: field(STIME, "stime")?,
        start_ticks: field(STARTTIME, "starttime")?,
        vsize: field(VSIZE, "vsize")?,
        rss_pages: field(RSS, "rss")?,
    })
}

/// Parses `/proc/uptime`, returning system uptime in seconds.
pub fn parse_uptime(content: &str) -> Result<f64, SampleError> {
    let token = content
        .split_whitespace()
        .next()
        .ok_or_else(|| SampleError::parse("uptime", "empty file"))?;
    let uptime: f64 = token
        .parse()
        .map_err(|_| SampleError::parse("uptime", format!("invalid uptime {token:?}")))?;
    if !uptime.is_finite() || uptime < 0.0 {
        return Err(SampleError::parse("uptime", format!("out of range {uptime}")));
    }
    Ok(uptime)
}

/// Parses the `btime` line of `/proc/stat`, returning boot time in epoch seconds.
pub fn parse_boot_time(content: &str) -> Result<u64, SampleError> {
    for line in content.lines() {
        let mut parts = line.split_whitespace();
        if parts.next() != Some("btime") {
            continue;
        }
        return parts
            .next()
            .ok_or_else(|| SampleError::parse("stat", "btime without value"))?
            .parse()
            .map_err(|_| SampleError::parse("stat", "invalid btime"));
    }
    Err(SampleError::parse("stat", "no btime line"))
}

/// Read-only view of the files a sampler needs.
pub trait FileSystem: Send + Sync {
    fn read_to_string(&self, path: &Path) -> io::Result<String>;

    /// Number of entries in a directory, excluding `.` and `..`.
    fn count_entries(&self, path: &Path) -> io::Result<usize>;
}

/// The host's filesystem.
#[derive(Debug, Clone, Copy, Default)]
pub struct RealFs;

impl FileSystem for RealFs {
    fn read_to_string(&self, path: &Path) -> io::Result<String> {
        std::fs::read_to_string(path)
    }

    fn count_entries(&self, path: &Path) -> io::Result<usize> {
        // `read_dir` never yields `.` or `..`.
        let mut count = 0;
        for entry in std::fs::read_dir(path)? {
            entry?;
            count += 1;
        }
        Ok(count)
    }
}

/// Reads a file, tagging failures with the path.
#[cfg_attr(not(any(test, target_os = "linux")), allow(dead_code))]
pub(crate) fn read(fs: &dyn FileSystem, path: &str) -> Result<String, SampleError> {
    fs.read_to_string(Path::new(path))
        .map_err(|source| SampleError::SourceUnavailable {
            path: PathBuf::from(path),
            source,
        })
}

/// In-memory filesystem for exercising samplers without a real `/proc`.
#[cfg(any(test, feature = "test-utils"))]
#[derive(Debug, Clone, Default)]
pub struct MockFs {
    files: BTreeMap<PathBuf, String>,
    directories: BTreeMap<PathBuf, usize>,
}

#[cfg(any(test, feature = "test-utils"))]
impl MockFs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces a file.
    pub fn add_file(&mut self, path: impl AsRef<Path>, content: impl Into<String>) {
        self.files.insert(path.as_ref().to_path_buf(), content.into());
    }

    /// Adds or replaces a directory holding `entries` children.
    pub fn add_dir(&mut self, path: impl AsRef<Path>, entries: usize) {
        self.directories.insert(path.as_ref().to_path_buf(), entries);
    }

    /// Removes a file or directory.
    pub fn remove(&mut self, path: impl AsRef<Path>) {
        let path = path.as_ref();
        self.files.remove(path);
        self.directories.remove(path);
    }
}

#[cfg(any(test, feature = "test-utils"))]
impl FileSystem for MockFs {
    fn read_to_string(&self, path: &Path) -> io::Result<String> {
        self.files.get(path).cloned().ok_or_else(|| {
            io::Error::new(io::ErrorKind::NotFound, format!("file not found: {path:?}"))
        })
    }

    fn count_entries(&self, path: &Path) -> io::Result<usize> {
        self.directories.get(path).copied().ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::NotFound,
                format!("directory not found: {path:?}"),
            )
        })
    }
}
