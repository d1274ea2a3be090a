//! In-memory stand-in for a target process, used by tests

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use crate::error::{Error, Result};
use crate::memory::{MemoryIo, ProcessInfo, ProcessProvider, matches_process_name};

const PAGE_SIZE: usize = 0x1000;

/// A single contiguous block of fake process memory starting at `base`.
///
/// The block is mapped in whole 4 KiB pages; reads outside it fail like an
/// unmapped page would.
#[derive(Debug)]
pub struct MockMemory {
    base: u64,
    data: Mutex<Vec<u8>>,
    alive: AtomicBool,
    reads: AtomicUsize,
    writes: AtomicUsize,
}

impl MockMemory {
    pub fn builder(base: u64) -> MockMemoryBuilder {
        MockMemoryBuilder::new(base)
    }

    pub fn base(&self) -> u64 {
        self.base
    }

    /// Number of `read_bytes` calls served so far (failed ones included)
    pub fn read_count(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    pub fn reset_counters(&self) {
        self.reads.store(0, Ordering::SeqCst);
        self.writes.store(0, Ordering::SeqCst);
    }

    /// Simulate the process exiting (or coming back)
    pub fn set_alive(&self, alive: bool) {
        self.alive.store(alive, Ordering::SeqCst);
    }

    /// Copy of the bytes at `address`, bypassing the counters
    pub fn snapshot(&self, address: u64, length: usize) -> Option<Vec<u8>> {
        let data = self.data.lock().ok()?;
        let range = self.range(data.len(), address, length)?;
        Some(data[range].to_vec())
    }

    fn range(&self, len: usize, address: u64, length: usize) -> Option<std::ops::Range<usize>> {
        let start = usize::try_from(address.checked_sub(self.base)?).ok()?;
        let end = start.checked_add(length)?;
        (end <= len).then_some(start..end)
    }
}

impl MemoryIo for MockMemory {
    fn read_bytes(&self, address: u64, length: usize) -> Result<Vec<u8>> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        if !self.is_alive() {
            return Err(Error::MemoryReadFailed {
                address,
                message: "process exited".to_string(),
            });
        }
        let data = self.data.lock().map_err(|_| Error::MemoryReadFailed {
            address,
            message: "mock poisoned".to_string(),
        })?;
        let range = self
            .range(data.len(), address, length)
            .ok_or_else(|| Error::MemoryReadFailed {
                address,
                message: format!("{} bytes not mapped", length),
            })?;
        Ok(data[range].to_vec())
    }

    fn write_bytes(&self, address: u64, bytes: &[u8]) -> Result<()> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        if !self.is_alive() {
            return Err(Error::MemoryWriteFailed {
                address,
                message: "process exited".to_string(),
            });
        }
        let mut data = self.data.lock().map_err(|_| Error::MemoryWriteFailed {
            address,
            message: "mock poisoned".to_string(),
        })?;
        let range = self
            .range(data.len(), address, bytes.len())
            .ok_or_else(|| Error::MemoryWriteFailed {
                address,
                message: format!("{} bytes not mapped", bytes.len()),
            })?;
        data[range].copy_from_slice(bytes);
        Ok(())
    }

    fn is_alive(&self) -> bool {
        self.alive.load(Ordering::SeqCst)
    }
}

/// Builder for [`MockMemory`]; the block grows to cover everything written
#[derive(Debug, Clone)]
pub struct MockMemoryBuilder {
    base: u64,
    data: Vec<u8>,
}

impl MockMemoryBuilder {
    pub fn new(base: u64) -> Self {
        Self {
            base,
            data: Vec::new(),
        }
    }

    /// Make sure at least `size` bytes starting at the base are mapped
    pub fn size(mut self, size: usize) -> Self {
        if self.data.len() < size {
            self.data.resize(size, 0);
        }
        self
    }

    /// Place raw bytes at an absolute address (must not precede the base)
    pub fn bytes(mut self, address: u64, bytes: &[u8]) -> Self {
        let start = (address - self.base) as usize;
        let end = start + bytes.len();
        if self.data.len() < end {
            self.data.resize(end, 0);
        }
        self.data[start..end].copy_from_slice(bytes);
        self
    }

    /// Place a UTF-8 string followed by a terminator
    pub fn string(self, address: u64, text: &str) -> Self {
        let mut bytes = text.as_bytes().to_vec();
        bytes.push(0);
        self.bytes(address, &bytes)
    }

    pub fn i32(self, address: u64, value: i32) -> Self {
        self.bytes(address, &value.to_le_bytes())
    }

    pub fn u64(self, address: u64, value: u64) -> Self {
        self.bytes(address, &value.to_le_bytes())
    }

    pub fn build(mut self) -> MockMemory {
        let pages = self.data.len().div_ceil(PAGE_SIZE).max(1);
        self.data.resize(pages * PAGE_SIZE, 0);
        MockMemory {
            base: self.base,
            data: Mutex::new(self.data),
            alive: AtomicBool::new(true),
            reads: AtomicUsize::new(0),
            writes: AtomicUsize::new(0),
        }
    }
}

/// Process provider that hands out a shared [`MockMemory`]
#[derive(Debug)]
pub struct MockProvider {
    process: Mutex<Option<ProcessInfo>>,
    memory: Arc<MockMemory>,
    opens: AtomicUsize,
}

impl MockProvider {
    pub fn new(process: ProcessInfo, memory: Arc<MockMemory>) -> Self {
        Self {
            process: Mutex::new(Some(process)),
            memory,
            opens: AtomicUsize::new(0),
        }
    }

    /// A provider whose target is not running
    pub fn without_process(memory: Arc<MockMemory>) -> Self {
        Self {
            process: Mutex::new(None),
            memory,
            opens: AtomicUsize::new(0),
        }
    }

    pub fn set_process(&self, process: Option<ProcessInfo>) {
        if let Ok(mut slot) = self.process.lock() {
            *slot = process;
        }
    }

    pub fn memory(&self) -> &Arc<MockMemory> {
        &self.memory
    }

    /// Number of successful `open` calls
    pub fn open_count(&self) -> usize {
        self.opens.load(Ordering::SeqCst)
    }

    fn current(&self) -> Option<ProcessInfo> {
        self.process.lock().ok().and_then(|p| p.clone())
    }
}

impl ProcessProvider for MockProvider {
    type Io = Arc<MockMemory>;

    fn find_target_process(&self, name: &str) -> Result<Option<ProcessInfo>> {
        Ok(self
            .current()
            .filter(|p| matches_process_name(&p.name, name)))
    }

    fn describe(&self, pid: u32) -> Result<ProcessInfo> {
        self.current()
            .filter(|p| p.pid == pid)
            .ok_or_else(|| Error::ProcessNotFound(format!("pid {}", pid)))
    }

    fn open(&self, process: &ProcessInfo) -> Result<Arc<MockMemory>> {
        if !self.memory.is_alive() {
            return Err(Error::ProcessOpenFailed(format!("pid {}", process.pid)));
        }
        self.opens.fetch_add(1, Ordering::SeqCst);
        Ok(Arc::clone(&self.memory))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_inside_block() {
        let mock = MockMemory::builder(0x1000).string(0x1004, "hi").build();
        assert_eq!(mock.read_bytes(0x1004, 3).unwrap(), b"hi\0");
        assert_eq!(mock.read_bytes(0x1000, 4).unwrap(), [0, 0, 0, 0]);
        assert_eq!(mock.read_count(), 2);
    }

    #[test]
    fn test_read_outside_block_fails() {
        let mock = MockMemory::builder(0x1000).size(0x10).build();
        assert!(mock.read_bytes(0x0FFF, 1).is_err());
        assert!(mock.read_bytes(0x1FFF, 2).is_err());
        assert!(mock.read_bytes(0x1000, 0x1000).is_ok());
    }

    #[test]
    fn test_write_then_read() {
        let mock = MockMemory::builder(0x1000).build();
        mock.write_bytes(0x1002, &[1, 2, 3]).unwrap();
        assert_eq!(mock.snapshot(0x1000, 6).unwrap(), [0, 0, 1, 2, 3, 0]);
        assert_eq!(mock.write_count(), 1);
        assert!(mock.write_bytes(0x1FFF, &[1, 2]).is_err());
    }

    #[test]
    fn test_builder_scalars_little_endian() {
        let mock = MockMemory::builder(0x1000)
            .i32(0x1000, -7)
            .u64(0x1008, 0xDEAD_BEEF_CAFE)
            .build();
        assert_eq!(mock.read_bytes(0x1000, 4).unwrap(), (-7i32).to_le_bytes());
        assert_eq!(
            mock.read_bytes(0x1008, 8).unwrap(),
            0xDEAD_BEEF_CAFEu64.to_le_bytes()
        );
    }

    #[test]
    fn test_dead_process() {
        let mock = MockMemory::builder(0x1000).size(4).build();
        mock.set_alive(false);
        assert!(!mock.is_alive());
        assert!(matches!(
            mock.read_bytes(0x1000, 4),
            Err(Error::MemoryReadFailed { .. })
        ));
    }
}
