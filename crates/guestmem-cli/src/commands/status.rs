//! Status command implementation.
//!
//! Reports whether the emulator is running and where guest memory lives.

use anyhow::Result;
use guestmem::{Attachment, Config, NativeProvider};
use owo_colors::OwoColorize;

use super::hex_utils::format_hex_address;

/// Run the status command
pub fn run(config: &Config, pid: Option<u32>) -> Result<()> {
    let mut attachment = Attachment::new(NativeProvider::default(), config.clone())?;
    let attached = match pid {
        Some(pid) => attachment.attach_pid(pid).is_ok(),
        None => attachment.refresh(),
    };

    println!("Target:   {}", config.process_name);
    println!("Encoding: {}", config.text_encoding()?.name());

    if !attached {
        println!("Status:   {}", "not running".red());
        return Ok(());
    }

    let session = attachment.session()?;
    let process = session.process();
    println!("Status:   {}", "attached".green());
    println!("Process:  {} (pid {})", process.name, process.pid);
    println!("Bitness:  {}-bit", if process.is_64_bit { 64 } else { 32 });
    println!("Module:   {}", format_hex_address(process.main_module_base));
    println!("Base:     {}", session.base_offset().bold());

    Ok(())
}
