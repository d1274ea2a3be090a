//! Process access through the Win32 debugging APIs

use std::ffi::c_void;
use std::mem::size_of;

use tracing::debug;
use windows::Win32::Foundation::{BOOL, CloseHandle, HANDLE, STILL_ACTIVE};
use windows::Win32::System::Diagnostics::Debug::{ReadProcessMemory, WriteProcessMemory};
use windows::Win32::System::Diagnostics::ToolHelp::{
    CreateToolhelp32Snapshot, MODULEENTRY32W, Module32FirstW, PROCESSENTRY32W, Process32FirstW,
    Process32NextW, TH32CS_SNAPMODULE, TH32CS_SNAPMODULE32, TH32CS_SNAPPROCESS,
};
use windows::Win32::System::Threading::{
    GetExitCodeProcess, IsWow64Process, OpenProcess, PROCESS_QUERY_INFORMATION,
    PROCESS_VM_OPERATION, PROCESS_VM_READ, PROCESS_VM_WRITE,
};

use crate::error::{Error, Result};
use crate::memory::process::{first_inspectable, matches_process_name};
use crate::memory::{MemoryIo, ProcessInfo, ProcessProvider};

/// Closes the wrapped handle on drop
struct OwnedHandle(HANDLE);

impl Drop for OwnedHandle {
    fn drop(&mut self) {
        unsafe {
            let _ = CloseHandle(self.0);
        }
    }
}

fn wide_to_string(wide: &[u16]) -> String {
    let len = wide.iter().position(|&c| c == 0).unwrap_or(wide.len());
    String::from_utf16_lossy(&wide[..len])
}

fn open_handle(pid: u32) -> Result<OwnedHandle> {
    let access =
        PROCESS_VM_READ | PROCESS_VM_WRITE | PROCESS_VM_OPERATION | PROCESS_QUERY_INFORMATION;
    let handle = unsafe { OpenProcess(access, false, pid) }
        .map_err(|e| Error::ProcessOpenFailed(format!("pid {}: {}", pid, e)))?;
    Ok(OwnedHandle(handle))
}

/// Discovers processes with a Toolhelp snapshot
#[derive(Debug, Clone, Default)]
pub struct ToolhelpProvider;

impl ToolhelpProvider {
    pub fn new() -> Self {
        Self
    }

    /// Base address and file name of the executable image
    fn main_module(pid: u32) -> Result<(u64, String)> {
        let snapshot = unsafe {
            CreateToolhelp32Snapshot(TH32CS_SNAPMODULE | TH32CS_SNAPMODULE32, pid)
        }
        .map_err(|e| Error::ProcessOpenFailed(format!("module snapshot of {}: {}", pid, e)))?;
        let snapshot = OwnedHandle(snapshot);

        let mut entry = MODULEENTRY32W {
            dwSize: size_of::<MODULEENTRY32W>() as u32,
            ..Default::default()
        };
        // The first module in the snapshot is the executable itself
        unsafe { Module32FirstW(snapshot.0, &mut entry) }
            .map_err(|e| Error::ProcessOpenFailed(format!("main module of {}: {}", pid, e)))?;
        Ok((entry.modBaseAddr as u64, wide_to_string(&entry.szModule)))
    }

    fn is_64_bit(handle: &OwnedHandle) -> Result<bool> {
        let mut wow64 = BOOL::default();
        unsafe { IsWow64Process(handle.0, &mut wow64) }
            .map_err(|e| Error::ProcessOpenFailed(format!("IsWow64Process: {}", e)))?;
        Ok(cfg!(target_pointer_width = "64") && !wow64.as_bool())
    }
}

impl ProcessProvider for ToolhelpProvider {
    type Io = WinMemory;

    fn find_target_process(&self, name: &str) -> Result<Option<ProcessInfo>> {
        let snapshot = unsafe { CreateToolhelp32Snapshot(TH32CS_SNAPPROCESS, 0) }
            .map_err(|e| Error::ProcessNotFound(format!("process snapshot: {}", e)))?;
        let snapshot = OwnedHandle(snapshot);

        let mut entry = PROCESSENTRY32W {
            dwSize: size_of::<PROCESSENTRY32W>() as u32,
            ..Default::default()
        };
        if unsafe { Process32FirstW(snapshot.0, &mut entry) }.is_err() {
            return Ok(None);
        }
        let mut candidates = Vec::new();
        loop {
            if matches_process_name(&wide_to_string(&entry.szExeFile), name) {
                candidates.push(entry.th32ProcessID);
            }
            if unsafe { Process32NextW(snapshot.0, &mut entry) }.is_err() {
                break;
            }
        }
        Ok(first_inspectable(name, candidates, |pid| self.describe(pid)))
    }

    fn describe(&self, pid: u32) -> Result<ProcessInfo> {
        let handle = open_handle(pid)?;
        let is_64_bit = Self::is_64_bit(&handle)?;
        let (main_module_base, name) = Self::main_module(pid)?;

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

    fn open(&self, process: &ProcessInfo) -> Result<WinMemory> {
        Ok(WinMemory {
            handle: open_handle(process.pid)?,
        })
    }
}

/// Memory of one process, accessed with `ReadProcessMemory`/`WriteProcessMemory`
pub struct WinMemory {
    handle: OwnedHandle,
}

// SAFETY: a process handle may be used from any thread; the Win32 memory
// APIs do not require external synchronization.
unsafe impl Send for WinMemory {}
unsafe impl Sync for WinMemory {}

impl MemoryIo for WinMemory {
    fn read_bytes(&self, address: u64, length: usize) -> Result<Vec<u8>> {
        let mut buffer = vec![0u8; length];
        let mut read = 0usize;
        unsafe {
            ReadProcessMemory(
                self.handle.0,
                address as *const c_void,
                buffer.as_mut_ptr() as *mut c_void,
                length,
                Some(&mut read as *mut usize),
            )
        }
        .map_err(|e| Error::MemoryReadFailed {
            address,
            message: e.to_string(),
        })?;
        if read != length {
            return Err(Error::MemoryReadFailed {
                address,
                message: format!("short read: {} of {} bytes", read, length),
            });
        }
        Ok(buffer)
    }

    fn write_bytes(&self, address: u64, bytes: &[u8]) -> Result<()> {
        let mut written = 0usize;
        unsafe {
            WriteProcessMemory(
                self.handle.0,
                address as *const c_void,
                bytes.as_ptr() as *const c_void,
                bytes.len(),
                Some(&mut written as *mut usize),
            )
        }
        .map_err(|e| Error::MemoryWriteFailed {
            address,
            message: e.to_string(),
        })?;
        if written != bytes.len() {
            return Err(Error::MemoryWriteFailed {
                address,
                message: format!("short write: {} of {} bytes", written, bytes.len()),
            });
        }
        Ok(())
    }

    fn is_alive(&self) -> bool {
        let mut code = 0u32;
        unsafe { GetExitCodeProcess(self.handle.0, &mut code) }.is_ok()
            && code == STILL_ACTIVE.0 as u32
    }
}
