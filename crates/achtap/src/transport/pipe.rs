//! Single-client named pipe the injected module connects to.

use std::fs::File;

use crate::error::{Error, Result};

/// Default channel name the injected module opens.
pub const DEFAULT_PIPE_NAME: &str = r"\\.\pipe\YaeAchievementPipe";

#[cfg(target_os = "windows")]
const PIPE_BUFFER_SIZE: u32 = 0x4000;

#[cfg(target_os = "windows")]
fn channel_error(name: &str, e: impl std::fmt::Display) -> Error {
    Error::ChannelFailed {
        name: name.to_string(),
        message: e.to_string(),
    }
}

/// A created but not yet connected pipe instance.
///
/// Create it before resuming the target so the module never races the
/// server.
#[derive(Debug)]
pub struct PipeServer {
    name: String,
    #[cfg(target_os = "windows")]
    handle: windows::Win32::Foundation::HANDLE,
}

impl PipeServer {
    pub fn name(&self) -> &str {
        &self.name
    }
}

// SAFETY: the pipe handle is only used by whichever thread owns the server.
#[cfg(target_os = "windows")]
unsafe impl Send for PipeServer {}

#[cfg(target_os = "windows")]
impl PipeServer {
    pub fn create(name: &str) -> Result<Self> {
        use windows::Win32::Storage::FileSystem::PIPE_ACCESS_DUPLEX;
        use windows::Win32::System::Pipes::{
            CreateNamedPipeW, PIPE_READMODE_BYTE, PIPE_TYPE_BYTE, PIPE_WAIT,
        };
        use windows::core::HSTRING;

        // SAFETY: the name outlives the call; default security attributes.
        let handle = unsafe {
            CreateNamedPipeW(
                &HSTRING::from(name),
                PIPE_ACCESS_DUPLEX,
                PIPE_TYPE_BYTE | PIPE_READMODE_BYTE | PIPE_WAIT,
                1,
                PIPE_BUFFER_SIZE,
                PIPE_BUFFER_SIZE,
                0,
                None,
            )
        }
        .map_err(|e| channel_error(name, e))?;
        tracing::debug!("Created pipe {}", name);
        Ok(Self {
            name: name.to_string(),
            handle,
        })
    }

    /// Block until the peer connects and hand the pipe over as a `File`.
    pub fn accept(mut self) -> Result<File> {
        use std::os::windows::io::FromRawHandle;
        use windows::Win32::Foundation::ERROR_PIPE_CONNECTED;
        use windows::Win32::System::Pipes::ConnectNamedPipe;

        // SAFETY: `handle` is a valid pipe handle owned by `self`.
        if let Err(e) = unsafe { ConnectNamedPipe(self.handle, None) } {
            // the peer may connect between create and connect
            if e.code() != ERROR_PIPE_CONNECTED.to_hresult() {
                return Err(channel_error(&self.name, e));
            }
        }
        tracing::debug!("Peer connected to {}", self.name);

        let handle = std::mem::take(&mut self.handle);
        // SAFETY: ownership of the handle moves into the File; `self` now
        // holds a null handle that drop skips.
        Ok(unsafe { File::from_raw_handle(handle.0) })
    }
}

#[cfg(target_os = "windows")]
impl Drop for PipeServer {
    fn drop(&mut self) {
        if self.handle.is_invalid() {
            return;
        }
        // SAFETY: the handle is owned and closed exactly once.
        unsafe {
            let _ = windows::Win32::Foundation::CloseHandle(self.handle);
        }
    }
}

#[cfg(not(target_os = "windows"))]
impl PipeServer {
    pub fn create(_name: &str) -> Result<Self> {
        Err(Error::Unsupported("named pipes are only supported on Windows"))
    }

    pub fn accept(self) -> Result<File> {
        Err(Error::Unsupported("named pipes are only supported on Windows"))
    }
}
