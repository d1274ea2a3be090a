//! Reads a single string (or string array) whose length is unknown up front

use tracing::trace;

use crate::config::StringSettings;
use crate::error::{Error, Result};
use crate::memory::MemoryIo;
use crate::resolver::scan::{find_array_end, find_string_end};
use crate::text::TextEncoding;

/// Reads never cross this boundary, so a string ending just before an
/// unmapped page can still be read.
pub const PAGE_SIZE: u64 = 0x1000;

pub struct StringReader<'a, M: MemoryIo + ?Sized> {
    memory: &'a M,
    encoding: TextEncoding,
    read_chunk: usize,
    max_length: usize,
}

impl<'a, M: MemoryIo + ?Sized> StringReader<'a, M> {
    pub fn new(memory: &'a M, encoding: TextEncoding, settings: &StringSettings) -> Self {
        Self {
            memory,
            encoding,
            read_chunk: settings.read_chunk.max(1),
            max_length: settings.max_length.max(1),
        }
    }

    /// Read a null-terminated string
    pub fn read_string(&self, address: u64) -> Result<String> {
        let (bytes, end) =
            self.read_until(address, |buf, from| find_string_end(buf, from, buf.len()))?;
        Ok(self.encoding.decode(&bytes[..end]))
    }

    /// Read zero-separated strings closed by a double zero
    pub fn read_string_array(&self, address: u64) -> Result<Vec<String>> {
        // Step back one byte so a pair split across two reads is still found
        let (bytes, end) = self.read_until(address, |buf, from| {
            find_array_end(buf, from.saturating_sub(1), buf.len())
        })?;
        Ok(self.encoding.decode_array(&bytes[..end]))
    }

    /// Fetch page-bounded chunks until `find` reports a terminator
    fn read_until<F>(&self, address: u64, find: F) -> Result<(Vec<u8>, usize)>
    where
        F: Fn(&[u8], usize) -> Option<usize>,
    {
        let mut bytes: Vec<u8> = Vec::new();
        loop {
            let remaining = self.max_length.saturating_sub(bytes.len());
            if remaining == 0 {
                return Err(Error::StringTooLong {
                    address,
                    limit: self.max_length,
                });
            }
            let cursor = address.wrapping_add(bytes.len() as u64);
            let to_page_end = (PAGE_SIZE - cursor % PAGE_SIZE) as usize;
            let length = self.read_chunk.min(remaining).min(to_page_end);

            let from = bytes.len();
            bytes.extend(self.memory.read_bytes(cursor, length)?);
            if let Some(end) = find(&bytes, from) {
                trace!(
                    "Read {} bytes at 0x{:X} (terminator at {})",
                    bytes.len(),
                    address,
                    end
                );
                return Ok((bytes, end));
            }
        }
    }
}
