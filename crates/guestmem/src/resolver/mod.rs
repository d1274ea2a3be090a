//! Pointer-table string resolution
//!
//! Games keep tables of pointers into string pools. Reading each string on its
//! own costs one or more remote calls per entry; instead the resolver reads the
//! whole `[lowest, highest)` span once and slices every string out of that
//! buffer. Only the highest address needs a read of its own, since nothing
//! bounds where its string ends.
//!
//! Output is aligned with the addresses sorted in ascending order. Tables whose
//! span exceeds `max_bulk_span` are rejected before anything is read.

pub mod reader;
pub mod scan;

use tracing::{debug, trace};

use crate::config::StringSettings;
use crate::error::{Error, Result};
use crate::memory::MemoryIo;
use crate::text::TextEncoding;

pub use reader::StringReader;
use scan::{find_array_end, find_string_end, truncated_array_body};

pub struct PointerResolver<'a, M: MemoryIo + ?Sized> {
    memory: &'a M,
    encoding: TextEncoding,
    reader: StringReader<'a, M>,
    max_bulk_span: usize,
}

/// Sorted addresses plus the shared buffer covering all but the highest one
struct BulkRead {
    sorted: Vec<u64>,
    first: u64,
    last: u64,
    buffer: Vec<u8>,
}

impl BulkRead {
    /// Position of `address` in the buffer, or `None` for the highest address
    fn offset(&self, address: u64) -> Option<usize> {
        (address != self.last).then(|| (address - self.first) as usize)
    }
}

impl<'a, M: MemoryIo + ?Sized> PointerResolver<'a, M> {
    pub fn new(memory: &'a M, encoding: TextEncoding, settings: &StringSettings) -> Self {
        Self {
            memory,
            encoding,
            reader: StringReader::new(memory, encoding, settings),
            max_bulk_span: settings.max_bulk_span,
        }
    }

    /// Resolve pointers to null-terminated strings.
    ///
    /// Issues one bulk read plus one read for the highest address (more only if
    /// that string is longer than a read chunk).
    pub fn resolve_strings(
        &self,
        addresses: &[u64],
        expected_length: usize,
    ) -> Result<Vec<String>> {
        let Some(bulk) = self.bulk_read(addresses)? else {
            return Ok(Vec::new());
        };
        let tail = self.reader.read_string(bulk.last)?;

        Ok(bulk
            .sorted
            .iter()
            .map(|&address| match bulk.offset(address) {
                None => tail.clone(),
                Some(offset) => self.decode_string(&bulk, offset, expected_length),
            })
            .collect())
    }

    /// Resolve pointers to double-zero terminated string arrays
    pub fn resolve_string_arrays(
        &self,
        addresses: &[u64],
        expected_length: usize,
    ) -> Result<Vec<Vec<String>>> {
        let Some(bulk) = self.bulk_read(addresses)? else {
            return Ok(Vec::new());
        };
        let tail = self.reader.read_string_array(bulk.last)?;

        Ok(bulk
            .sorted
            .iter()
            .map(|&address| match bulk.offset(address) {
                None => tail.clone(),
                Some(offset) => self.decode_array(&bulk, offset, expected_length),
            })
            .collect())
    }

    fn decode_string(&self, bulk: &BulkRead, offset: usize, window: usize) -> String {
        let buffer = &bulk.buffer;
        match find_string_end(buffer, offset, window) {
            Some(end) => self.encoding.decode(&buffer[offset..end]),
            None => {
                trace!(
                    "String at 0x{:X} runs past the bulk buffer, keeping {} bytes",
                    bulk.first + offset as u64,
                    buffer.len() - offset
                );
                self.encoding.decode(&buffer[offset..])
            }
        }
    }

    fn decode_array(&self, bulk: &BulkRead, offset: usize, window: usize) -> Vec<String> {
        let buffer = &bulk.buffer;
        match find_array_end(buffer, offset, window) {
            Some(end) => self.encoding.decode_array(&buffer[offset..end]),
            None => {
                trace!(
                    "String array at 0x{:X} runs past the bulk buffer, keeping {} bytes",
                    bulk.first + offset as u64,
                    buffer.len() - offset
                );
                self.encoding
                    .decode_array(truncated_array_body(&buffer[offset..]))
            }
        }
    }

    fn bulk_read(&self, addresses: &[u64]) -> Result<Option<BulkRead>> {
        let mut sorted = addresses.to_vec();
        sorted.sort_unstable();
        let (Some(&first), Some(&last)) = (sorted.first(), sorted.last()) else {
            return Ok(None);
        };

        let span = usize::try_from(last - first)
            .ok()
            .filter(|&span| span <= self.max_bulk_span)
            .ok_or(Error::BulkSpanTooLarge {
                first,
                last,
                limit: self.max_bulk_span,
            })?;
        let buffer = if span == 0 {
            Vec::new()
        } else {
            self.memory.read_bytes(first, span)?
        };
        debug!(
            "Bulk read {} bytes at 0x{:X} for {} pointers",
            span,
            first,
            sorted.len()
        );

        Ok(Some(BulkRead {
            sorted,
            first,
            last,
            buffer,
        }))
    }
}
