use std::path::Path;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use tracing::{debug, info, warn};
use windows::Win32::Foundation::{CloseHandle, HANDLE};
use windows::Win32::System::LibraryLoader::{GetModuleHandleW, GetProcAddress};
use windows::Win32::System::Threading::{
    CREATE_SUSPENDED, CreateProcessW, INFINITE, PROCESS_INFORMATION, ResumeThread, STARTUPINFOW,
    TerminateProcess, WaitForSingleObject,
};
use windows::core::{HSTRING, PCWSTR, PWSTR, s, w};

use super::remote::{RemoteAllocation, ThreadEntry};
use super::{INJECT_TIMEOUT, InjectStage, wide_path_bytes};
use crate::error::{Error, Result};

/// Kernel handle closed on drop.
#[derive(Debug)]
struct OwnedHandle(HANDLE);

// SAFETY: kernel handles are process-wide and may be used from any thread.
unsafe impl Send for OwnedHandle {}
unsafe impl Sync for OwnedHandle {}

impl Drop for OwnedHandle {
    fn drop(&mut self) {
        // SAFETY: the handle is owned and closed exactly once.
        unsafe {
            let _ = CloseHandle(self.0);
        }
    }
}

/// A target process started by this crate.
#[derive(Debug)]
pub struct GameProcess {
    pid: u32,
    process: Arc<OwnedHandle>,
    main_thread: OwnedHandle,
}

impl GameProcess {
    /// Start `path` with its main thread suspended, in the executable's
    /// directory.
    pub fn launch_suspended(path: &Path) -> Result<Self> {
        let launch_error = |message: String| Error::LaunchFailed {
            path: path.display().to_string(),
            message,
        };

        let application = HSTRING::from(path.as_os_str());
        let directory = path
            .parent()
            .filter(|dir| !dir.as_os_str().is_empty())
            .map(|dir| HSTRING::from(dir.as_os_str()));
        let mut command_line = [0u16; 1];
        let startup = STARTUPINFOW {
            cb: std::mem::size_of::<STARTUPINFOW>() as u32,
            ..Default::default()
        };
        let mut info = PROCESS_INFORMATION::default();

        // SAFETY: every pointer argument outlives the call; `info` receives
        // two new handles that are wrapped immediately below.
        unsafe {
            CreateProcessW(
                &application,
                PWSTR(command_line.as_mut_ptr()),
                None,
                None,
                false,
                CREATE_SUSPENDED,
                None,
                directory
                    .as_ref()
                    .map_or(PCWSTR::null(), |dir| PCWSTR(dir.as_ptr())),
                &startup,
                &mut info,
            )
        }
        .map_err(|e| launch_error(e.to_string()))?;

        info!("Launched {} (pid {})", path.display(), info.dwProcessId);
        Ok(Self {
            pid: info.dwProcessId,
            process: Arc::new(OwnedHandle(info.hProcess)),
            main_thread: OwnedHandle(info.hThread),
        })
    }

    pub fn pid(&self) -> u32 {
        self.pid
    }

    /// Load `module` into the target through a remote `LoadLibraryW` call.
    ///
    /// The path buffer is freed once the loader thread finishes or the wait
    /// times out.
    pub fn inject_module(&self, module: &Path) -> Result<()> {
        let entry = resolve_loader()?;
        let bytes = wide_path_bytes(module);

        let region = RemoteAllocation::allocate(&self.process.0, bytes.len())?;
        region.write(&bytes)?;
        if region.execute(entry, INJECT_TIMEOUT)? {
            debug!("Loader thread finished for {}", module.display());
        }
        if let Err(e) = region.release() {
            warn!("{}", e);
        }
        info!("Injected {}", module.display());
        Ok(())
    }

    /// Resume the suspended main thread. On failure the process is
    /// terminated before the error is returned.
    pub fn resume_main_thread(&self) -> Result<()> {
        // SAFETY: `main_thread` is a live thread handle owned by `self`.
        let previous = unsafe { ResumeThread(self.main_thread.0) };
        if previous == u32::MAX {
            let message = std::io::Error::last_os_error().to_string();
            if let Err(e) = self.terminate(1) {
                warn!("{}", e);
            }
            return Err(Error::ResumeFailed(message));
        }
        debug!("Main thread resumed (suspend count was {})", previous);
        Ok(())
    }

    pub fn terminate(&self, exit_code: u32) -> Result<()> {
        // SAFETY: `process` is a live process handle owned by `self`.
        unsafe { TerminateProcess(self.process.0, exit_code) }.map_err(|e| Error::Io(e.into()))
    }

    /// Run `callback` on a background thread once the process exits.
    pub fn watch_exit<F>(&self, callback: F) -> Result<JoinHandle<()>>
    where
        F: FnOnce() + Send + 'static,
    {
        let process = Arc::clone(&self.process);
        let pid = self.pid;
        let handle = thread::Builder::new()
            .name("exit-watcher".to_string())
            .spawn(move || {
                // SAFETY: the Arc keeps the handle open for the whole wait.
                unsafe {
                    WaitForSingleObject(process.0, INFINITE);
                }
                debug!("Process {} exited", pid);
                callback();
            })?;
        Ok(handle)
    }
}

/// Address of `LoadLibraryW`. kernel32 is mapped at the same base in every
/// process of a session, so the local address is valid in the target.
fn resolve_loader() -> Result<ThreadEntry> {
    let stage_error = |message: String| Error::InjectFailed {
        stage: InjectStage::ResolveLoader,
        message,
    };
    // SAFETY: both names are static NUL-terminated literals.
    let module =
        unsafe { GetModuleHandleW(w!("kernel32.dll")) }.map_err(|e| stage_error(e.to_string()))?;
    let entry = unsafe { GetProcAddress(module, s!("LoadLibraryW")) }
        .ok_or_else(|| stage_error(std::io::Error::last_os_error().to_string()))?;
    // SAFETY: LoadLibraryW takes one pointer argument and returns a
    // pointer-sized value, which is call-compatible with a thread entry.
    Ok(unsafe { std::mem::transmute::<unsafe extern "system" fn() -> isize, ThreadEntry>(entry) })
}
