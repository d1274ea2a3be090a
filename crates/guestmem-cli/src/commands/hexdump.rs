//! Hexdump command implementation.
//!
//! Displays guest memory in traditional hexdump format. The address is a guest
//! address and is normalized the same way the library does it.
//!
//! # Output Format
//!
//! ```text
//! 0x000: 48 65 6C 6C 6F 20 57 6F  72 6C 64 00 00 00 00 00  |Hello World.....|
//! ```

use anyhow::Result;
use guestmem::Config;

use super::hex_utils::{format_hex_address, parse_guest_address};

/// Run the hexdump command
pub fn run(
    config: &Config,
    pid: Option<u32>,
    address: &str,
    size: usize,
    ascii: bool,
) -> Result<()> {
    let address = parse_guest_address(address)?;
    let attachment = super::attach(config, pid)?;
    let session = attachment.session()?;

    let bytes = session.read_bytes(address, size)?;
    let absolute = session.normalize(address).unwrap_or_default();

    println!(
        "Hexdump at {} ({}, {} bytes):",
        format_hex_address(address as u64),
        format_hex_address(absolute),
        size
    );
    println!();

    for line in format_lines(&bytes, ascii) {
        println!("{}", line);
    }

    Ok(())
}

fn format_lines(bytes: &[u8], ascii: bool) -> Vec<String> {
    bytes
        .chunks(16)
        .enumerate()
        .map(|(i, chunk)| {
            let mut line = format!("0x{:03X}: ", i * 16);

            for j in 0..16 {
                if j == 8 {
                    line.push(' ');
                }
                match chunk.get(j) {
                    Some(byte) => line.push_str(&format!("{:02X} ", byte)),
                    None => line.push_str("   "),
                }
            }

            if ascii {
                line.push_str(" |");
                for byte in chunk {
                    line.push(if (0x20..0x7F).contains(byte) {
                        *byte as char
                    } else {
                        '.'
                    });
                }
                for _ in chunk.len()..16 {
                    line.push(' ');
                }
                line.push('|');
            }

            line
        })
        .collect()
}
