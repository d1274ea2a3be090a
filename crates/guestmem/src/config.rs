//! Attach and decoding configuration
//!
//! Loaded from a TOML file; every field has a default so a partial (or missing)
//! file still yields a usable configuration.
//!
//! ```toml
//! process_name = "emulator"
//! encoding = "shift_jis"
//!
//! [address]
//! offset_64 = 0x0A000000
//! offset_32 = 0x10000000
//!
//! [strings]
//! string_chunk = 16
//! array_chunk = 64
//! max_bulk_span = 0x1000000
//! ```

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Error, Result};
use crate::text::TextEncoding;

/// Default values for every configuration field
pub mod defaults {
    /// Executable name the process provider looks for
    pub const PROCESS_NAME: &str = "emulator";

    /// Text encoding label (any WHATWG label accepted by encoding_rs)
    pub const ENCODING: &str = "utf-8";

    /// Distance from the 256 MiB aligned module base to guest memory in 64-bit builds
    pub const OFFSET_64: u64 = 0x0A00_0000;

    /// Fixed location of guest memory in 32-bit builds
    pub const OFFSET_32: u64 = 0x1000_0000;

    /// Scan window for single-string pointer tables
    pub const STRING_CHUNK: usize = 16;

    /// Scan window for string-array pointer tables
    pub const ARRAY_CHUNK: usize = 64;

    /// Bytes fetched per remote read when reading one string on its own
    pub const READ_CHUNK: usize = 64;

    /// Upper bound on a single dedicated string read
    pub const MAX_LENGTH: usize = 4096;

    /// Upper bound on the lowest-to-highest span of one pointer table (16 MiB)
    pub const MAX_BULK_SPAN: usize = 0x100_0000;
}

/// Constants used to derive the base offset at attach time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AddressProfile {
    pub offset_64: u64,
    pub offset_32: u64,
}

impl Default for AddressProfile {
    fn default() -> Self {
        Self {
            offset_64: defaults::OFFSET_64,
            offset_32: defaults::OFFSET_32,
        }
    }
}

/// Tunables for string and pointer-table reads
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StringSettings {
    /// Expected length of a single string in a pointer table
    pub string_chunk: usize,
    /// Expected length of a string array in a pointer table
    pub array_chunk: usize,
    /// Bytes per remote read for dedicated string reads
    pub read_chunk: usize,
    /// Maximum bytes a dedicated string read will fetch
    pub max_length: usize,
    /// Maximum bytes the shared pointer-table read will fetch
    pub max_bulk_span: usize,
}

impl Default for StringSettings {
    fn default() -> Self {
        Self {
            string_chunk: defaults::STRING_CHUNK,
            array_chunk: defaults::ARRAY_CHUNK,
            read_chunk: defaults::READ_CHUNK,
            max_length: defaults::MAX_LENGTH,
            max_bulk_span: defaults::MAX_BULK_SPAN,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub process_name: String,
    pub encoding: String,
    pub address: AddressProfile,
    pub strings: StringSettings,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            process_name: defaults::PROCESS_NAME.to_string(),
            encoding: defaults::ENCODING.to_string(),
            address: AddressProfile::default(),
            strings: StringSettings::default(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())?;
        let config = Self::from_toml_str(&content)?;
        debug!(
            "Loaded config from {}: process={}, encoding={}",
            path.as_ref().display(),
            config.process_name,
            config.encoding
        );
        Ok(config)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content)?;
        config.text_encoding()?;
        Ok(config)
    }

    /// Resolve the configured encoding label
    pub fn text_encoding(&self) -> Result<TextEncoding> {
        TextEncoding::for_label(&self.encoding)
            .ok_or_else(|| Error::Encoding(format!("unknown encoding label: {}", self.encoding)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.process_name, "emulator");
        assert_eq!(config.strings.string_chunk, 16);
        assert_eq!(config.strings.array_chunk, 64);
        assert!(config.text_encoding().is_ok());
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let config = Config::from_toml_str(
            r#"
            process_name = "pcsx"

            [address]
            offset_64 = 0x20000000
            "#,
        )
        .unwrap();
        assert_eq!(config.process_name, "pcsx");
        assert_eq!(config.address.offset_64, 0x2000_0000);
        assert_eq!(config.address.offset_32, defaults::OFFSET_32);
        assert_eq!(config.strings, StringSettings::default());
    }

    #[test]
    fn test_unknown_encoding_rejected() {
        let err = Config::from_toml_str(r#"encoding = "not-a-charset""#).unwrap_err();
        assert!(matches!(err, Error::Encoding(_)));
    }

    #[test]
    fn test_invalid_toml_rejected() {
        let err = Config::from_toml_str("process_name = ").unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "encoding = \"shift_jis\"").unwrap();
        writeln!(file, "[strings]").unwrap();
        writeln!(file, "string_chunk = 32").unwrap();
        writeln!(file, "max_bulk_span = 0x10000").unwrap();

        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.encoding, "shift_jis");
        assert_eq!(config.strings.string_chunk, 32);
        assert_eq!(config.strings.max_bulk_span, 0x10000);
        assert_eq!(config.strings.max_length, defaults::MAX_LENGTH);
        assert_eq!(config.text_encoding().unwrap().name(), "Shift_JIS");
    }

    #[test]
    fn test_load_missing_file() {
        let err = Config::load("definitely/not/here.toml").unwrap_err();
        assert!(err.is_not_found());
    }
}
