//! An attached target process
//!
//! A [`Session`] owns the memory backend for one process together with the
//! base offset computed when it was opened. Every read and write takes a guest
//! address and goes through [`BaseOffset::normalize`]; null addresses are
//! rejected with [`Error::NullAddress`](crate::Error::NullAddress) before the
//! backend is touched.
//!
//! Typed reads and writes use [`bytemuck::Pod`]: the value is copied byte for
//! byte in host byte order, so structs should be `#[repr(C)]` and mirror the
//! guest layout including padding.

use std::collections::HashMap;
use std::mem::size_of;

use bytemuck::Pod;
use tracing::{debug, info};

use crate::address::{AbsoluteAddress, BaseOffset, GuestAddress};
use crate::config::{Config, StringSettings};
use crate::error::{Error, Result};
use crate::memory::{MemoryIo, ProcessInfo, ProcessProvider};
use crate::resolver::{PointerResolver, StringReader};
use crate::text::TextEncoding;

pub struct Session<M: MemoryIo> {
    memory: M,
    process: ProcessInfo,
    base: BaseOffset,
    encoding: TextEncoding,
    settings: StringSettings,
}

impl<M: MemoryIo> Session<M> {
    pub fn new(
        memory: M,
        process: ProcessInfo,
        base: BaseOffset,
        encoding: TextEncoding,
        settings: StringSettings,
    ) -> Self {
        Self {
            memory,
            process,
            base,
            encoding,
            settings,
        }
    }

    /// Open `process` through `provider` and compute its base offset
    pub fn attach<P>(provider: &P, process: ProcessInfo, config: &Config) -> Result<Self>
    where
        P: ProcessProvider<Io = M>,
    {
        let encoding = config.text_encoding()?;
        let base =
            BaseOffset::compute(process.is_64_bit, process.main_module_base, &config.address)?;
        let memory = provider.open(&process)?;
        info!(
            "Attached to {} (pid {}, {}-bit), base offset {}",
            process.name,
            process.pid,
            if process.is_64_bit { 64 } else { 32 },
            base
        );
        debug!("Main module base: 0x{:X}", process.main_module_base);
        Ok(Self::new(memory, process, base, encoding, config.strings))
    }

    pub fn process(&self) -> &ProcessInfo {
        &self.process
    }

    pub fn base_offset(&self) -> BaseOffset {
        self.base
    }

    pub fn encoding(&self) -> TextEncoding {
        self.encoding
    }

    pub fn settings(&self) -> &StringSettings {
        &self.settings
    }

    pub fn memory(&self) -> &M {
        &self.memory
    }

    pub fn is_alive(&self) -> bool {
        self.memory.is_alive()
    }

    /// Translate a guest address; `None` for null
    pub fn normalize(&self, address: GuestAddress) -> Option<AbsoluteAddress> {
        self.base.normalize(address)
    }

    fn resolve(&self, address: GuestAddress) -> Result<AbsoluteAddress> {
        self.base.resolve(address)
    }

    fn string_reader(&self) -> StringReader<'_, M> {
        StringReader::new(&self.memory, self.encoding, &self.settings)
    }

    fn pointer_resolver(&self) -> PointerResolver<'_, M> {
        PointerResolver::new(&self.memory, self.encoding, &self.settings)
    }

    // Reads

    pub fn read_bytes(&self, address: GuestAddress, length: usize) -> Result<Vec<u8>> {
        self.read_bytes_absolute(self.resolve(address)?, length)
    }

    pub fn read_bytes_absolute(&self, address: AbsoluteAddress, length: usize) -> Result<Vec<u8>> {
        if length == 0 {
            return Ok(Vec::new());
        }
        self.memory.read_bytes(address, length)
    }

    pub fn read<T: Pod>(&self, address: GuestAddress) -> Result<T> {
        let bytes = self.read_bytes(address, size_of::<T>())?;
        Ok(bytemuck::pod_read_unaligned(&bytes))
    }

    pub fn read_array<T: Pod>(&self, address: GuestAddress, count: usize) -> Result<Vec<T>> {
        let size = size_of::<T>();
        if size == 0 {
            self.resolve(address)?;
            return Ok(vec![T::zeroed(); count]);
        }
        let length = size.checked_mul(count).ok_or(Error::ReadTooLarge {
            count,
            element_size: size,
        })?;
        let bytes = self.read_bytes(address, length)?;
        Ok(bytes
            .chunks_exact(size)
            .map(bytemuck::pod_read_unaligned)
            .collect())
    }

    pub fn read_string(&self, address: GuestAddress) -> Result<String> {
        self.string_reader().read_string(self.resolve(address)?)
    }

    pub fn read_string_array(&self, address: GuestAddress) -> Result<Vec<String>> {
        self.string_reader().read_string_array(self.resolve(address)?)
    }

    // Writes

    pub fn write_bytes(&self, address: GuestAddress, bytes: &[u8]) -> Result<()> {
        self.write_bytes_absolute(self.resolve(address)?, bytes)
    }

    pub fn write_bytes_absolute(&self, address: AbsoluteAddress, bytes: &[u8]) -> Result<()> {
        if bytes.is_empty() {
            return Ok(());
        }
        self.memory.write_bytes(address, bytes)
    }

    pub fn write<T: Pod>(&self, address: GuestAddress, value: &T) -> Result<()> {
        self.write_bytes(address, bytemuck::bytes_of(value))
    }

    pub fn write_array<T: Pod>(&self, address: GuestAddress, values: &[T]) -> Result<()> {
        self.write_bytes(address, bytemuck::cast_slice(values))
    }

    /// Write `text` followed by a terminator
    pub fn write_string(&self, address: GuestAddress, text: &str) -> Result<()> {
        let address = self.resolve(address)?;
        self.write_bytes_absolute(address, &self.encoding.encode_terminated(text))
    }

    /// Write zero-separated strings followed by a double zero
    pub fn write_string_array<S: AsRef<str>>(
        &self,
        address: GuestAddress,
        items: &[S],
    ) -> Result<()> {
        let address = self.resolve(address)?;
        self.write_bytes_absolute(address, &self.encoding.encode_array(items))
    }

    // Pointer tables

    /// Resolve a table of string pointers.
    ///
    /// The result is aligned with the addresses sorted by absolute address
    /// (for guest addresses below the base offset, the same as guest order).
    pub fn resolve_pointer_strings(
        &self,
        addresses: &[GuestAddress],
        expected_chunk: usize,
    ) -> Result<Vec<String>> {
        let absolute = self.resolve_all(addresses)?;
        self.pointer_resolver().resolve_strings(&absolute, expected_chunk)
    }

    /// Resolve a table of string-array pointers.
    ///
    /// Ordering follows [`resolve_pointer_strings`](Self::resolve_pointer_strings).
    pub fn resolve_pointer_string_arrays(
        &self,
        addresses: &[GuestAddress],
        expected_chunk: usize,
    ) -> Result<Vec<Vec<String>>> {
        let absolute = self.resolve_all(addresses)?;
        self.pointer_resolver()
            .resolve_string_arrays(&absolute, expected_chunk)
    }

    /// Map each pointer to its string, with `0 -> ""` always present.
    ///
    /// Null pointers are skipped, duplicates are read once, and
    /// `substring_offset` leading characters are dropped from every value.
    pub fn build_string_dictionary(
        &self,
        addresses: &[GuestAddress],
        substring_offset: usize,
    ) -> Result<HashMap<GuestAddress, String>> {
        let table = self.pointer_table(addresses);
        let absolute: Vec<u64> = table.iter().map(|&(_, abs)| abs).collect();
        let values = self
            .pointer_resolver()
            .resolve_strings(&absolute, self.settings.string_chunk)?;

        let mut dictionary: HashMap<GuestAddress, String> = table
            .into_iter()
            .zip(values)
            .map(|((guest, _), value)| (guest, skip_chars(value, substring_offset)))
            .collect();
        dictionary.insert(0, String::new());
        Ok(dictionary)
    }

    /// Map each pointer to its string array, with `0 -> [""]` always present
    pub fn build_string_array_dictionary(
        &self,
        addresses: &[GuestAddress],
    ) -> Result<HashMap<GuestAddress, Vec<String>>> {
        let table = self.pointer_table(addresses);
        let absolute: Vec<u64> = table.iter().map(|&(_, abs)| abs).collect();
        let values = self
            .pointer_resolver()
            .resolve_string_arrays(&absolute, self.settings.array_chunk)?;

        let mut dictionary: HashMap<GuestAddress, Vec<String>> = table
            .into_iter()
            .map(|(guest, _)| guest)
            .zip(values)
            .collect();
        dictionary.insert(0, vec![String::new()]);
        Ok(dictionary)
    }

    fn resolve_all(&self, addresses: &[GuestAddress]) -> Result<Vec<AbsoluteAddress>> {
        addresses.iter().map(|&a| self.resolve(a)).collect()
    }

    /// Non-null, deduplicated `(guest, absolute)` pairs sorted by absolute address
    fn pointer_table(&self, addresses: &[GuestAddress]) -> Vec<(GuestAddress, AbsoluteAddress)> {
        let mut table: Vec<(GuestAddress, AbsoluteAddress)> = addresses
            .iter()
            .filter_map(|&guest| self.normalize(guest).map(|abs| (guest, abs)))
            .collect();
        table.sort_unstable_by_key(|&(guest, abs)| (abs, guest));
        table.dedup();
        table
    }
}

fn skip_chars(value: String, count: usize) -> String {
    if count == 0 {
        value
    } else {
        value.chars().skip(count).collect()
    }
}
