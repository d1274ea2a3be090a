//! Read-string command implementation.

use anyhow::Result;
use guestmem::Config;

use super::hex_utils::parse_guest_address;

/// Run the read-string command
pub fn run(config: &Config, pid: Option<u32>, address: &str, array: bool) -> Result<()> {
    let address = parse_guest_address(address)?;
    let attachment = super::attach(config, pid)?;
    let session = attachment.session()?;

    if array {
        let items = session.read_string_array(address)?;
        println!("{}", serde_json::to_string_pretty(&items)?);
    } else {
        println!("{}", session.read_string(address)?);
    }

    Ok(())
}
