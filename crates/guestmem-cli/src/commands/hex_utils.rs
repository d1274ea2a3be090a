//! Hex address parsing and formatting utilities.

use anyhow::{Context, Result};
use guestmem::GuestAddress;

/// Parse a hex address string (with or without 0x prefix).
///
/// # Examples
///
/// ```
/// use guestmem_cli::commands::hex_utils::parse_hex_address;
///
/// assert_eq!(parse_hex_address("0x1000").unwrap(), 0x1000);
/// assert_eq!(parse_hex_address("1000").unwrap(), 0x1000);
/// ```
pub fn parse_hex_address(s: &str) -> Result<u64> {
    let digits = s
        .trim()
        .trim_start_matches("0x")
        .trim_start_matches("0X")
        .replace('_', "");
    u64::from_str_radix(&digits, 16)
        .map_err(|e| anyhow::anyhow!("Invalid hex address {:?}: {}", s, e))
}

/// Parse a guest address; values above `i64::MAX` are rejected
pub fn parse_guest_address(s: &str) -> Result<GuestAddress> {
    let value = parse_hex_address(s)?;
    GuestAddress::try_from(value).with_context(|| format!("Address {} is out of range", s))
}

/// Parse every entry of a pointer table given on the command line
pub fn parse_guest_addresses<S: AsRef<str>>(items: &[S]) -> Result<Vec<GuestAddress>> {
    items.iter().map(|s| parse_guest_address(s.as_ref())).collect()
}

/// Format an address as a hex string with 0x prefix.
pub fn format_hex_address(addr: u64) -> String {
    format!("0x{:X}", addr)
}

/// Format a guest address; null pointers (zero or negative) keep their sign
pub fn format_guest_address(addr: GuestAddress) -> String {
    if addr < 0 {
        format!("-0x{:X}", addr.unsigned_abs())
    } else {
        format_hex_address(addr as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_hex_address_with_prefix() {
        assert_eq!(parse_hex_address("0x1000").unwrap(), 0x1000);
        assert_eq!(parse_hex_address("0X1000").unwrap(), 0x1000);
    }

    #[test]
    fn test_parse_hex_address_without_prefix() {
        assert_eq!(parse_hex_address("1000").unwrap(), 0x1000);
        assert_eq!(parse_hex_address("DEADBEEF").unwrap(), 0xDEADBEEF);
    }

    #[test]
    fn test_parse_hex_address_underscores() {
        assert_eq!(parse_hex_address("0x7FFA_1A00_0000").unwrap(), 0x7FFA_1A00_0000);
    }

    #[test]
    fn test_parse_hex_address_invalid() {
        assert!(parse_hex_address("GHIJK").is_err());
        assert!(parse_hex_address("0xZZZ").is_err());
        assert!(parse_hex_address("").is_err());
    }

    #[test]
    fn test_parse_guest_address_range() {
        assert_eq!(parse_guest_address("0x10").unwrap(), 0x10);
        assert!(parse_guest_address("0xFFFFFFFFFFFFFFFF").is_err());
    }

    #[test]
    fn test_parse_guest_addresses() {
        assert_eq!(parse_guest_addresses(&["10", "0x20"]).unwrap(), vec![0x10, 0x20]);
        assert!(parse_guest_addresses(&["10", "nope"]).is_err());
    }

    #[test]
    fn test_format_addresses() {
        assert_eq!(format_hex_address(0xDEADBEEF), "0xDEADBEEF");
        assert_eq!(format_hex_address(0), "0x0");
        assert_eq!(format_guest_address(0x40), "0x40");
        assert_eq!(format_guest_address(-16), "-0x10");
    }
}
