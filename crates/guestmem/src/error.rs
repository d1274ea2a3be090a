use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Not attached to a target process")]
    NotAttached,

    #[error("Null guest address: {0}")]
    NullAddress(i64),

    #[error("Process not found: {0}")]
    ProcessNotFound(String),

    #[error("Failed to open process: {0}")]
    ProcessOpenFailed(String),

    #[error("Failed to read process memory at address {address:#x}: {message}")]
    MemoryReadFailed { address: u64, message: String },

    #[error("Failed to write process memory at address {address:#x}: {message}")]
    MemoryWriteFailed { address: u64, message: String },

    #[error("Computed base offset is zero")]
    InvalidBaseOffset,

    #[error("No terminator within {limit} bytes of address {address:#x}")]
    StringTooLong { address: u64, limit: usize },

    #[error("Reading {count} elements of {element_size} bytes overflows the address space")]
    ReadTooLarge { count: usize, element_size: usize },

    #[error("Pointer table spans 0x{first:X}..0x{last:X}, more than {limit} bytes")]
    BulkSpanTooLarge { first: u64, last: u64, limit: usize },

    #[error("Encoding error: {0}")]
    Encoding(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Config error: {0}")]
    Config(#[from] toml::de::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Check if this error is a "file not found" error
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::Io(e) if e.kind() == std::io::ErrorKind::NotFound)
    }

    /// Check if this error means there was nothing to read rather than a failed read
    pub fn is_no_value(&self) -> bool {
        matches!(self, Error::NotAttached | Error::NullAddress(_))
    }
}
