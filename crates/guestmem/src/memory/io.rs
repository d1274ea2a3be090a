use std::sync::Arc;

use crate::error::Result;

/// Raw access to another process's address space.
///
/// Implementations perform one remote call per method invocation and never
/// retry; a failed call is reported as [`Error::MemoryReadFailed`] or
/// [`Error::MemoryWriteFailed`].
///
/// [`Error::MemoryReadFailed`]: crate::Error::MemoryReadFailed
/// [`Error::MemoryWriteFailed`]: crate::Error::MemoryWriteFailed
pub trait MemoryIo: Send + Sync {
    /// Read exactly `length` bytes
    fn read_bytes(&self, address: u64, length: usize) -> Result<Vec<u8>>;

    fn write_bytes(&self, address: u64, bytes: &[u8]) -> Result<()>;

    /// Whether the target process is still running
    fn is_alive(&self) -> bool {
        true
    }
}

impl<T: MemoryIo + ?Sized> MemoryIo for &T {
    fn read_bytes(&self, address: u64, length: usize) -> Result<Vec<u8>> {
        (**self).read_bytes(address, length)
    }

    fn write_bytes(&self, address: u64, bytes: &[u8]) -> Result<()> {
        (**self).write_bytes(address, bytes)
    }

    fn is_alive(&self) -> bool {
        (**self).is_alive()
    }
}

impl<T: MemoryIo + ?Sized> MemoryIo for Box<T> {
    fn read_bytes(&self, address: u64, length: usize) -> Result<Vec<u8>> {
        (**self).read_bytes(address, length)
    }

    fn write_bytes(&self, address: u64, bytes: &[u8]) -> Result<()> {
        (**self).write_bytes(address, bytes)
    }

    fn is_alive(&self) -> bool {
        (**self).is_alive()
    }
}

impl<T: MemoryIo + ?Sized> MemoryIo for Arc<T> {
    fn read_bytes(&self, address: u64, length: usize) -> Result<Vec<u8>> {
        (**self).read_bytes(address, length)
    }

    fn write_bytes(&self, address: u64, bytes: &[u8]) -> Result<()> {
        (**self).write_bytes(address, bytes)
    }

    fn is_alive(&self) -> bool {
        (**self).is_alive()
    }
}
