//! Game executable location, remembered across runs.
//!
//! The remembered path is trusted only while the digest of the file's first
//! 64 KiB still matches, so a reinstall or a different client forces an
//! explicit path again.

use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::cache::{CacheStore, digest_hex};
use crate::error::{Error, Result};

pub const GAME_PATH_KEY: &str = "game_path";

const FINGERPRINT_LEN: usize = 0x10000;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct GamePathEntry {
    path: PathBuf,
    fingerprint: String,
}

/// Digest of the first 64 KiB of `path`; `None` for shorter files.
pub fn fingerprint(path: &Path) -> Result<Option<String>> {
    let mut head = Vec::with_capacity(FINGERPRINT_LEN);
    File::open(path)?
        .take(FINGERPRINT_LEN as u64)
        .read_to_end(&mut head)?;
    if head.len() < FINGERPRINT_LEN {
        return Ok(None);
    }
    Ok(Some(digest_hex(&head)))
}

/// Remember `path` for later runs. Files too short to fingerprint are not
/// remembered.
pub fn remember_game_path(cache: &CacheStore, path: &Path) -> Result<()> {
    let Some(fingerprint) = fingerprint(path)? else {
        debug!("{} is too short to fingerprint", path.display());
        return Ok(());
    };
    let entry = GamePathEntry {
        path: path.to_path_buf(),
        fingerprint,
    };
    cache.write(GAME_PATH_KEY, &serde_json::to_vec(&entry)?, None)
}

/// The remembered path, if it still points at the same executable.
pub fn cached_game_path(cache: &CacheStore) -> Option<PathBuf> {
    let content = cache.read_content(GAME_PATH_KEY)?;
    let entry: GamePathEntry = match serde_json::from_slice(&content) {
        Ok(entry) => entry,
        Err(e) => {
            debug!("Ignoring unreadable game path entry: {}", e);
            return None;
        }
    };
    match fingerprint(&entry.path) {
        Ok(Some(current)) if current == entry.fingerprint => Some(entry.path),
        Ok(_) => {
            info!("{} changed since it was last used", entry.path.display());
            None
        }
        Err(e) => {
            debug!("Remembered game path unavailable: {}", e);
            None
        }
    }
}

/// Pick the executable: an explicit existing path wins, then the remembered
/// one.
pub fn resolve_game_path(cache: &CacheStore, explicit: Option<&Path>) -> Result<PathBuf> {
    if let Some(path) = explicit {
        if path.is_file() {
            return Ok(path.to_path_buf());
        }
        warn!("{} does not exist, trying the remembered path", path.display());
    }
    cached_game_path(cache).ok_or_else(|| {
        Error::GamePathNotFound(match explicit {
            Some(path) => path.display().to_string(),
            None => "pass the game executable path with --game".to_string(),
        })
    })
}
