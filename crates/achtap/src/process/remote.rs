use std::ffi::c_void;
use std::time::Duration;

use tracing::{debug, warn};
use windows::Win32::Foundation::{CloseHandle, HANDLE, WAIT_OBJECT_0};
use windows::Win32::System::Diagnostics::Debug::WriteProcessMemory;
use windows::Win32::System::Memory::{
    MEM_COMMIT, MEM_RELEASE, MEM_RESERVE, PAGE_READWRITE, VirtualAllocEx, VirtualFreeEx,
};
use windows::Win32::System::Threading::{CreateRemoteThread, WaitForSingleObject};

use super::InjectStage;
use crate::error::{Error, Result};

/// Entry point shape accepted by `CreateRemoteThread`.
pub type ThreadEntry = unsafe extern "system" fn(*mut c_void) -> u32;

fn inject_error(stage: InjectStage, e: impl std::fmt::Display) -> Error {
    Error::InjectFailed {
        stage,
        message: e.to_string(),
    }
}

/// A committed read/write region inside another process.
///
/// The region is freed on drop, so every early return releases it.
pub struct RemoteAllocation<'a> {
    process: &'a HANDLE,
    address: *mut c_void,
    size: usize,
}

impl<'a> RemoteAllocation<'a> {
    pub fn allocate(process: &'a HANDLE, size: usize) -> Result<Self> {
        // SAFETY: `process` is a live handle with PROCESS_VM_OPERATION access;
        // a null base lets the OS pick the address.
        let address = unsafe {
            VirtualAllocEx(*process, None, size, MEM_COMMIT | MEM_RESERVE, PAGE_READWRITE)
        };
        if address.is_null() {
            return Err(inject_error(
                InjectStage::Allocate,
                std::io::Error::last_os_error(),
            ));
        }
        debug!("Allocated {} bytes at {:p} in target", size, address);
        Ok(Self {
            process,
            address,
            size,
        })
    }

    pub fn address(&self) -> *mut c_void {
        self.address
    }

    /// Copy `bytes` to the start of the region.
    pub fn write(&self, bytes: &[u8]) -> Result<()> {
        if bytes.len() > self.size {
            return Err(inject_error(
                InjectStage::Write,
                format!("{} bytes do not fit a {} byte region", bytes.len(), self.size),
            ));
        }
        // SAFETY: the region is committed and at least `bytes.len()` long.
        unsafe {
            WriteProcessMemory(
                *self.process,
                self.address,
                bytes.as_ptr().cast(),
                bytes.len(),
                None,
            )
        }
        .map_err(|e| inject_error(InjectStage::Write, e))
    }

    /// Run `entry(region)` on a new thread in the target and wait up to
    /// `timeout`. Returns whether the thread finished in time.
    pub fn execute(&self, entry: ThreadEntry, timeout: Duration) -> Result<bool> {
        // SAFETY: `entry` is valid in the target's address space and the
        // region stays committed at least until this wait returns.
        let thread = unsafe {
            CreateRemoteThread(
                *self.process,
                None,
                0,
                Some(entry),
                Some(self.address.cast_const()),
                0,
                None,
            )
        }
        .map_err(|e| inject_error(InjectStage::CreateRemoteThread, e))?;

        let millis = u32::try_from(timeout.as_millis()).unwrap_or(u32::MAX);
        // SAFETY: `thread` was just returned by CreateRemoteThread and is
        // closed exactly once below.
        let completed = unsafe { WaitForSingleObject(thread, millis) } == WAIT_OBJECT_0;
        unsafe {
            let _ = CloseHandle(thread);
        }
        if !completed {
            warn!("Remote loader thread still running after {:?}", timeout);
        }
        Ok(completed)
    }

    fn free(&mut self) -> windows::core::Result<()> {
        if self.address.is_null() {
            return Ok(());
        }
        let address = std::mem::replace(&mut self.address, std::ptr::null_mut());
        // SAFETY: `address` came from VirtualAllocEx on the same process and
        // is released at most once.
        unsafe { VirtualFreeEx(*self.process, address, 0, MEM_RELEASE) }
    }

    /// Free the region now and report failure.
    pub fn release(mut self) -> Result<()> {
        self.free().map_err(|e| Error::Io(e.into()))
    }
}

impl Drop for RemoteAllocation<'_> {
    fn drop(&mut self) {
        if let Err(e) = self.free() {
            warn!("Failed to free remote region: {}", e);
        }
    }
}
