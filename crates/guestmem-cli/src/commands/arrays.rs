//! Arrays command implementation.
//!
//! Like `strings`, but each pointer refers to a double-zero terminated list
//! of strings.

use anyhow::Result;
use guestmem::Config;

use super::hex_utils::parse_guest_addresses;
use super::strings::entries;

/// Run the arrays command
pub fn run(config: &Config, pid: Option<u32>, addresses: &[String]) -> Result<()> {
    let addresses = parse_guest_addresses(addresses)?;
    let attachment = super::attach(config, pid)?;
    let dictionary = attachment
        .session()?
        .build_string_array_dictionary(&addresses)?;

    println!("{}", serde_json::to_string_pretty(&entries(dictionary))?);
    Ok(())
}
