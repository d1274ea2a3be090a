//! # guestmem
//!
//! Reads and writes the memory of a game running inside an emulator process.
//!
//! This crate provides:
//! - Guest-to-host address normalization from the emulator's module base
//! - Typed reads and writes of plain-old-data values, strings and string arrays
//! - Bulk resolution of pointer tables into strings with two remote reads
//! - Platform process backends (`/proc` on Linux, Toolhelp on Windows)
//!
//! ## Usage
//!
//! ```no_run
//! use guestmem::{Attachment, Config, NativeProvider};
//!
//! # fn main() -> guestmem::Result<()> {
//! let mut attachment = Attachment::new(NativeProvider::default(), Config::default())?;
//! if attachment.refresh() {
//!     let session = attachment.session()?;
//!     let names = session.build_string_dictionary(&[0x1000, 0x1010], 0)?;
//!     println!("{:?}", names);
//! }
//! # Ok(())
//! # }
//! ```

pub mod address;
pub mod attach;
pub mod config;
pub mod error;
pub mod memory;
pub mod resolver;
pub mod session;
pub mod text;

pub use address::{AbsoluteAddress, BaseOffset, GuestAddress};
pub use attach::Attachment;
pub use config::{AddressProfile, Config, StringSettings};
pub use error::{Error, Result};
pub use memory::{MemoryIo, ProcessInfo, ProcessProvider};
#[cfg(any(target_os = "linux", target_os = "windows"))]
pub use memory::NativeProvider;
pub use resolver::{PointerResolver, StringReader};
pub use session::Session;
pub use text::TextEncoding;

#[doc(hidden)]
pub use memory::{MockMemory, MockMemoryBuilder, MockProvider};
