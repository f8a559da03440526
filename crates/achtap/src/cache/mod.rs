//! Content-addressed cache for payloads and learned schemas.
//!
//! Each logical key maps to one gzip-compressed file named after the SHA-256
//! of the key. The cache is an optimization only: anything that fails to
//! read back cleanly is reported as absent.

mod record;

use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use flate2::Compression;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use prost::Message;
use sha2::{Digest, Sha256};
use tempfile::NamedTempFile;
use tracing::{debug, warn};

use crate::error::Result;

pub use record::{CACHE_VERSION, CacheRecord};

/// Raw achievement payload from the last live session.
pub const ACHIEVEMENT_DATA_KEY: &str = "achievement_data";
/// Field mapping learned from the last successful resolution.
pub const ACHIEVEMENT_SCHEMA_KEY: &str = "achievement_schema";

const CACHE_EXTENSION: &str = "cache";
const CACHE_DIR_NAME: &str = "achtap";

/// Lowercase hex SHA-256 of `bytes`.
pub fn digest_hex(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

#[derive(Debug, Clone)]
pub struct CacheStore {
    root: PathBuf,
}

impl CacheStore {
    pub fn new<P: Into<PathBuf>>(root: P) -> Self {
        Self { root: root.into() }
    }

    /// Platform cache directory, or `./cache` when there is none.
    pub fn default_root() -> PathBuf {
        dirs::cache_dir()
            .map(|dir| dir.join(CACHE_DIR_NAME))
            .unwrap_or_else(|| PathBuf::from("cache"))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// File backing `key`.
    pub fn path_for(&self, key: &str) -> PathBuf {
        self.root
            .join(format!("{}.{}", digest_hex(key.as_bytes()), CACHE_EXTENSION))
    }

    /// Read the entry for `key`; `None` on any failure.
    pub fn read(&self, key: &str) -> Option<CacheRecord> {
        let path = self.path_for(key);
        match Self::read_record(&path) {
            Ok(record) if record.version != CACHE_VERSION => {
                debug!(
                    "Cache entry {} has version {}, expected {}",
                    key, record.version, CACHE_VERSION
                );
                None
            }
            Ok(record) if !record.is_intact() => {
                warn!("Cache entry {} failed checksum verification", key);
                None
            }
            Ok(record) => Some(record),
            Err(e) => {
                debug!("Cache entry {} unavailable: {}", key, e);
                None
            }
        }
    }

    fn read_record(path: &Path) -> std::io::Result<CacheRecord> {
        let mut decoder = GzDecoder::new(File::open(path)?);
        let mut bytes = Vec::new();
        decoder.read_to_end(&mut bytes)?;
        CacheRecord::decode(bytes.as_slice())
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))
    }

    /// Content of the entry for `key`, if present.
    pub fn read_content(&self, key: &str) -> Option<Vec<u8>> {
        self.read(key).map(|record| record.content)
    }

    /// Replace the entry for `key` atomically.
    pub fn write(&self, key: &str, content: &[u8], etag: Option<&str>) -> Result<()> {
        fs::create_dir_all(&self.root)?;
        let record = CacheRecord::new(content.to_vec(), etag.unwrap_or_default());

        let mut temp = NamedTempFile::new_in(&self.root)?;
        {
            let mut encoder = GzEncoder::new(temp.as_file_mut(), Compression::best());
            encoder.write_all(&record.encode_to_vec())?;
            encoder.finish()?;
        }
        temp.as_file().sync_all()?;

        let path = self.path_for(key);
        temp.persist(&path).map_err(|e| e.error)?;
        debug!("Cached {} bytes for {} at {}", content.len(), key, path.display());
        Ok(())
    }

    /// Modification time of the entry for `key`.
    pub fn last_write_time(&self, key: &str) -> Option<SystemTime> {
        fs::metadata(self.path_for(key))
            .and_then(|m| m.modified())
            .ok()
    }

    /// Content of `key` if it was written within `max_age`.
    pub fn read_fresh(&self, key: &str, max_age: Duration) -> Option<Vec<u8>> {
        let modified = self.last_write_time(key)?;
        let age = SystemTime::now()
            .duration_since(modified)
            .unwrap_or(Duration::ZERO);
        if age > max_age {
            debug!("Cache entry {} is stale (age {}s)", key, age.as_secs());
            return None;
        }
        self.read_content(key)
    }
}
