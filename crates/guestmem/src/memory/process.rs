use serde::Serialize;
use tracing::warn;

use crate::error::Result;
use crate::memory::MemoryIo;

/// What the attach step needs to know about a running process
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProcessInfo {
    pub pid: u32,
    pub name: String,
    pub is_64_bit: bool,
    /// Load address of the main executable image
    pub main_module_base: u64,
}

/// Platform-specific process discovery and opening
pub trait ProcessProvider {
    type Io: MemoryIo;

    /// Find a running process by executable name
    fn find_target_process(&self, name: &str) -> Result<Option<ProcessInfo>>;

    /// Describe a process by PID
    fn describe(&self, pid: u32) -> Result<ProcessInfo>;

    /// Open the process for reading and writing
    fn open(&self, process: &ProcessInfo) -> Result<Self::Io>;
}

/// Case-insensitive executable name match, tolerating a missing `.exe` suffix
/// and the 15-character truncation of Linux `comm`.
pub fn matches_process_name(candidate: &str, wanted: &str) -> bool {
    const COMM_LEN: usize = 15;

    let strip = |s: &str| {
        let s = s.trim();
        let lower = s.to_ascii_lowercase();
        match lower.strip_suffix(".exe") {
            Some(stem) => stem.to_string(),
            None => lower,
        }
    };
    let candidate = strip(candidate);
    let wanted = strip(wanted);
    if candidate.is_empty() {
        return false;
    }
    candidate == wanted || (candidate.len() == COMM_LEN && wanted.starts_with(&candidate))
}

/// Describe each matching pid in turn and return the first that succeeds.
///
/// A match that cannot be inspected (another user's process, or one that
/// exited mid-scan) is logged and skipped.
pub fn first_inspectable<I, F>(name: &str, pids: I, mut describe: F) -> Option<ProcessInfo>
where
    I: IntoIterator<Item = u32>,
    F: FnMut(u32) -> Result<ProcessInfo>,
{
    for pid in pids {
        match describe(pid) {
            Ok(info) => return Some(info),
            Err(e) => warn!("Found {} (pid {}) but could not inspect it: {}", name, pid, e),
        }
    }
    None
}
