//! Text encoding for strings stored in guest memory

use encoding_rs::{Encoding, UTF_8};

/// Encoding used to decode and encode null-terminated guest strings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextEncoding(&'static Encoding);

impl Default for TextEncoding {
    fn default() -> Self {
        Self(UTF_8)
    }
}

impl TextEncoding {
    pub fn new(encoding: &'static Encoding) -> Self {
        Self(encoding)
    }

    /// Look up an encoding by WHATWG label ("utf-8", "shift_jis", "euc-kr", ...)
    pub fn for_label(label: &str) -> Option<Self> {
        Encoding::for_label(label.trim().as_bytes()).map(Self)
    }

    pub fn name(&self) -> &'static str {
        self.0.name()
    }

    /// Decode raw bytes; malformed sequences become U+FFFD.
    ///
    /// The slice must already exclude the terminator.
    pub fn decode(&self, bytes: &[u8]) -> String {
        let (decoded, _) = self.0.decode_without_bom_handling(bytes);
        decoded.into_owned()
    }

    /// Decode bytes up to the first zero (or the whole slice if there is none)
    pub fn decode_until_nul(&self, bytes: &[u8]) -> String {
        let len = memchr::memchr(0, bytes).unwrap_or(bytes.len());
        self.decode(&bytes[..len])
    }

    /// Decode a string-array body (elements separated by single zeros)
    pub fn decode_array(&self, bytes: &[u8]) -> Vec<String> {
        bytes.split(|&b| b == 0).map(|part| self.decode(part)).collect()
    }

    pub fn encode(&self, text: &str) -> Vec<u8> {
        let (encoded, _, _) = self.0.encode(text);
        encoded.into_owned()
    }

    /// Encode with a single trailing terminator
    pub fn encode_terminated(&self, text: &str) -> Vec<u8> {
        let mut bytes = self.encode(text);
        bytes.push(0);
        bytes
    }

    /// Encode elements separated by zeros and closed by a double zero
    pub fn encode_array<S: AsRef<str>>(&self, items: &[S]) -> Vec<u8> {
        let mut bytes = Vec::new();
        for item in items {
            bytes.extend(self.encode(item.as_ref()));
            bytes.push(0);
        }
        if items.is_empty() {
            bytes.push(0);
        }
        bytes.push(0);
        bytes
    }
}
