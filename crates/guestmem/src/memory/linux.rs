//! Process access through procfs

use std::fs::{self, File, OpenOptions};
use std::os::unix::fs::FileExt;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::{Error, Result};
use crate::memory::process::{first_inspectable, matches_process_name};
use crate::memory::{MemoryIo, ProcessInfo, ProcessProvider};

const ELF_MAGIC: [u8; 4] = [0x7F, b'E', b'L', b'F'];
const ELF_CLASS_32: u8 = 1;
const ELF_CLASS_64: u8 = 2;

/// Discovers processes by scanning `/proc`
#[derive(Debug, Clone)]
pub struct ProcProvider {
    root: PathBuf,
}

impl Default for ProcProvider {
    fn default() -> Self {
        Self {
            root: PathBuf::from("/proc"),
        }
    }
}

impl ProcProvider {
    pub fn new() -> Self {
        Self::default()
    }

    fn pid_dir(&self, pid: u32) -> PathBuf {
        self.root.join(pid.to_string())
    }
}

impl ProcessProvider for ProcProvider {
    type Io = ProcMemory;

    fn find_target_process(&self, name: &str) -> Result<Option<ProcessInfo>> {
        let candidates = fs::read_dir(&self.root)?.filter_map(|entry| {
            let entry = entry.ok()?;
            let pid = entry.file_name().to_str()?.parse::<u32>().ok()?;
            let comm = fs::read_to_string(entry.path().join("comm")).ok()?;
            matches_process_name(&comm, name).then_some(pid)
        });
        Ok(first_inspectable(name, candidates, |pid| self.describe(pid)))
    }

    fn describe(&self, pid: u32) -> Result<ProcessInfo> {
        let dir = self.pid_dir(pid);
        let name = fs::read_to_string(dir.join("comm"))
            .map_err(|_| Error::ProcessNotFound(format!("pid {}", pid)))?
            .trim()
            .to_string();

        let mut header = [0u8; 5];
        File::open(dir.join("exe"))
            .and_then(|f| f.read_exact_at(&mut header, 0))
            .map_err(|e| Error::ProcessOpenFailed(format!("pid {}: {}", pid, e)))?;
        let is_64_bit = parse_elf_class(&header).ok_or_else(|| {
            Error::ProcessOpenFailed(format!("pid {}: executable is not ELF", pid))
        })?;

        let exe = fs::read_link(dir.join("exe"))?;
        let maps = fs::read_to_string(dir.join("maps"))?;
        let main_module_base = parse_module_base(&maps, &exe).ok_or_else(|| {
            Error::ProcessOpenFailed(format!("pid {}: main module not mapped", pid))
        })?;

        debug!(
            "Described pid {}: name={}, 64-bit={}, module base=0x{:X}",
            pid, name, is_64_bit, main_module_base
        );
        Ok(ProcessInfo {
            pid,
            name,
            is_64_bit,
            main_module_base,
        })
    }

    fn open(&self, process: &ProcessInfo) -> Result<ProcMemory> {
        let dir = self.pid_dir(process.pid);
        let path = dir.join("mem");
        let (file, writable) = match OpenOptions::new().read(true).write(true).open(&path) {
            Ok(f) => (f, true),
            Err(e) => {
                debug!("Opening {} read-write failed ({}), trying read-only", path.display(), e);
                let f = File::open(&path)
                    .map_err(|e| Error::ProcessOpenFailed(format!("{}: {}", path.display(), e)))?;
                (f, false)
            }
        };
        let start_time = read_stat(&dir).map(|stat| stat.start_time).ok_or_else(|| {
            Error::ProcessOpenFailed(format!("pid {}: stat unreadable", process.pid))
        })?;
        Ok(ProcMemory {
            dir,
            file,
            writable,
            start_time,
        })
    }
}

/// Memory of one process, accessed through `/proc/<pid>/mem`
#[derive(Debug)]
pub struct ProcMemory {
    dir: PathBuf,
    file: File,
    writable: bool,
    /// Start time from `stat`, to tell a reused pid apart
    start_time: u64,
}

impl MemoryIo for ProcMemory {
    fn read_bytes(&self, address: u64, length: usize) -> Result<Vec<u8>> {
        let mut buffer = vec![0u8; length];
        self.file
            .read_exact_at(&mut buffer, address)
            .map_err(|e| Error::MemoryReadFailed {
                address,
                message: e.to_string(),
            })?;
        Ok(buffer)
    }

    fn write_bytes(&self, address: u64, bytes: &[u8]) -> Result<()> {
        if !self.writable {
            return Err(Error::MemoryWriteFailed {
                address,
                message: "process memory opened read-only".to_string(),
            });
        }
        self.file
            .write_all_at(bytes, address)
            .map_err(|e| Error::MemoryWriteFailed {
                address,
                message: e.to_string(),
            })
    }

    fn is_alive(&self) -> bool {
        match read_stat(&self.dir) {
            Some(stat) => !matches!(stat.state, 'Z' | 'X') && stat.start_time == self.start_time,
            None => false,
        }
    }
}

/// The fields of `/proc/<pid>/stat` used for liveness
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ProcStat {
    state: char,
    start_time: u64,
}

fn read_stat(dir: &Path) -> Option<ProcStat> {
    parse_stat(&fs::read_to_string(dir.join("stat")).ok()?)
}

/// Parse `stat`; the command name may itself contain spaces and parentheses
fn parse_stat(stat: &str) -> Option<ProcStat> {
    let rest = &stat[stat.rfind(')')? + 1..];
    let mut fields = rest.split_whitespace();
    let state = fields.next()?.chars().next()?;
    // starttime is field 22; state is field 3
    let start_time = fields.nth(18)?.parse().ok()?;
    Some(ProcStat { state, start_time })
}

/// `Some(true)` for ELF64, `Some(false)` for ELF32
fn parse_elf_class(header: &[u8]) -> Option<bool> {
    if header.len() < 5 || header[..4] != ELF_MAGIC {
        return None;
    }
    match header[4] {
        ELF_CLASS_64 => Some(true),
        ELF_CLASS_32 => Some(false),
        _ => None,
    }
}

/// Lowest mapping start of `exe` in a `/proc/<pid>/maps` listing
fn parse_module_base(maps: &str, exe: &Path) -> Option<u64> {
    let exe = exe.to_str()?;
    maps.lines()
        .filter_map(|line| {
            let mut fields = line.split_whitespace();
            let range = fields.next()?;
            let path = fields.nth(4)?;
            if path != exe {
                return None;
            }
            let start = range.split('-').next()?;
            u64::from_str_radix(start, 16).ok()
        })
        .min()
}
