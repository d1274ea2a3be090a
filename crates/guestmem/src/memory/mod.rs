mod io;
mod process;

#[cfg(target_os = "linux")]
mod linux;
#[cfg(target_os = "windows")]
mod windows;

// Mock memory for testing (always available for unit and integration tests)
#[doc(hidden)]
pub mod mock;

pub use io::MemoryIo;
pub use process::{ProcessInfo, ProcessProvider, matches_process_name};

#[cfg(target_os = "linux")]
pub use linux::{ProcMemory, ProcProvider};
#[cfg(target_os = "windows")]
pub use windows::{ToolhelpProvider, WinMemory};

/// Process provider for the current platform
#[cfg(target_os = "linux")]
pub type NativeProvider = ProcProvider;
#[cfg(target_os = "windows")]
pub type NativeProvider = ToolhelpProvider;

#[doc(hidden)]
pub use mock::{MockMemory, MockMemoryBuilder, MockProvider};
