//! CLI command implementations.
//!
//! This module contains the implementation of each CLI command.

pub mod arrays;
pub mod hex_utils;
pub mod hexdump;
pub mod read_string;
pub mod status;
pub mod strings;

use anyhow::{Context, Result};
use guestmem::{Attachment, Config, NativeProvider};

/// Attach to `pid`, or to the configured emulator when no pid is given
pub fn attach(config: &Config, pid: Option<u32>) -> Result<Attachment<NativeProvider>> {
    let mut attachment = Attachment::new(NativeProvider::default(), config.clone())?;
    match pid {
        Some(pid) => {
            attachment
                .attach_pid(pid)
                .with_context(|| format!("Failed to attach to pid {}", pid))?;
        }
        None => {
            attachment.require_session().with_context(|| {
                format!("Is {} running? Use --pid to pick a process", config.process_name)
            })?;
        }
    }
    Ok(attachment)
}
