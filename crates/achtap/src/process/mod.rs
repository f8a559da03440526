//! Target process control: suspended launch, module injection, resume and
//! exit watching.
//!
//! Only Windows can host the target. Other platforms get the same API, and
//! every operation fails with [`Error::Unsupported`](crate::Error::Unsupported).

use std::time::Duration;

use strum::Display;

#[cfg(target_os = "windows")]
mod launcher;
#[cfg(target_os = "windows")]
mod remote;
#[cfg(not(target_os = "windows"))]
mod unsupported;

#[cfg(target_os = "windows")]
pub use launcher::GameProcess;
#[cfg(target_os = "windows")]
pub use remote::RemoteAllocation;
#[cfg(not(target_os = "windows"))]
pub use unsupported::GameProcess;

/// How long the remote loader thread may run before the path buffer is freed.
pub const INJECT_TIMEOUT: Duration = Duration::from_secs(2);

/// Step of module injection, named after the OS call that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum InjectStage {
    #[strum(serialize = "GetProcAddress(LoadLibraryW)")]
    ResolveLoader,
    #[strum(serialize = "VirtualAllocEx")]
    Allocate,
    #[strum(serialize = "WriteProcessMemory")]
    Write,
    #[strum(serialize = "CreateRemoteThread")]
    CreateRemoteThread,
}

/// UTF-16 bytes of `path` plus the terminating NUL, as the remote loader
/// expects them.
#[cfg_attr(not(target_os = "windows"), allow(dead_code))]
fn wide_path_bytes(path: &std::path::Path) -> Vec<u8> {
    path.to_string_lossy()
        .encode_utf16()
        .chain(std::iter::once(0))
        .flat_map(u16::to_le_bytes)
        .collect()
}
