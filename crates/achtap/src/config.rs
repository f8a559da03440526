//! `achtap.toml` settings file. Every key is optional.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Default values shared by the config file and the collector builder.
pub mod defaults {
    use std::path::PathBuf;

    pub const CONFIG_FILE: &str = "achtap.toml";
    pub const MODULE_FILE: &str = "YaeAchievementLib.dll";
    pub const RAW_DUMP_FILE: &str = "achievement_raw_data.bin";
    /// How old a cached payload may be and still be reused.
    pub const REUSE_MINUTES: u64 = 60;

    /// Module next to the running executable, else in the working directory.
    pub fn module_path() -> PathBuf {
        std::env::current_exe()
            .ok()
            .and_then(|exe| exe.parent().map(|dir| dir.join(MODULE_FILE)))
            .unwrap_or_else(|| PathBuf::from(MODULE_FILE))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub game_path: Option<PathBuf>,
    pub module_path: Option<PathBuf>,
    pub pipe_name: Option<String>,
    pub cache_dir: Option<PathBuf>,
    /// Known field mapping (JSON) to try before inference.
    pub schema_path: Option<PathBuf>,
    pub raw_dump_path: Option<PathBuf>,
    pub reuse_minutes: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            game_path: None,
            module_path: None,
            pipe_name: None,
            cache_dir: None,
            schema_path: None,
            raw_dump_path: None,
            reuse_minutes: defaults::REUSE_MINUTES,
        }
    }
}

impl Config {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)?;
        Self::parse(&content).map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))
    }

    pub fn parse(content: &str) -> std::result::Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// Load `path`, falling back to defaults when the file does not exist.
    /// Malformed files are still an error.
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self> {
        match Self::load(path) {
            Err(e) if e.is_not_found() => Ok(Self::default()),
            other => other,
        }
    }
}
