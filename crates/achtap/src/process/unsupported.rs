use std::path::Path;
use std::thread::JoinHandle;

use crate::error::{Error, Result};

const UNSUPPORTED: Error = Error::Unsupported("process control is only supported on Windows");

/// Placeholder for platforms that cannot host the target. It is never
/// constructed; every operation fails.
#[derive(Debug)]
pub struct GameProcess {
    pid: u32,
}

impl GameProcess {
    pub fn launch_suspended(_path: &Path) -> Result<Self> {
        Err(UNSUPPORTED)
    }

    pub fn pid(&self) -> u32 {
        self.pid
    }

    pub fn inject_module(&self, _module: &Path) -> Result<()> {
        Err(UNSUPPORTED)
    }

    pub fn resume_main_thread(&self) -> Result<()> {
        Err(UNSUPPORTED)
    }

    pub fn terminate(&self, _exit_code: u32) -> Result<()> {
        Err(UNSUPPORTED)
    }

    pub fn watch_exit<F>(&self, _callback: F) -> Result<JoinHandle<()>>
    where
        F: FnOnce() + Send + 'static,
    {
        Err(UNSUPPORTED)
    }
}
