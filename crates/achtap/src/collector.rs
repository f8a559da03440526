//! One collection run: launch, inject, receive, decode, resolve.
//!
//! ## Example
//!
//! ```ignore
//! use achtap::cache::CacheStore;
//! use achtap::collector::{Collector, CollectorConfig};
//!
//! let config = CollectorConfig::builder()
//!     .game_path(r"D:\Games\Game.exe")
//!     .build();
//! let collector = Collector::new(config, CacheStore::new(CacheStore::default_root()));
//! let collection = collector.collect()?;
//! println!("{} achievements", collection.items.len());
//! ```

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, mpsc};
use std::thread;
use std::time::Duration;

use tracing::{debug, error, info, warn};

use crate::achievement::AchievementItem;
use crate::cache::{ACHIEVEMENT_DATA_KEY, ACHIEVEMENT_SCHEMA_KEY, CacheStore};
use crate::config::{Config, defaults};
use crate::decode::decode_records;
use crate::error::{Error, Result};
use crate::paths;
use crate::process::GameProcess;
use crate::resolve::{FieldMapping, KnownSchema, MappingSource, resolve_mapping};
use crate::transport::{
    CompletionSignal, Disposition, HandlerRegistry, PipeServer, Session, SessionPhase,
    DEFAULT_PIPE_NAME, message,
};

/// Configuration for a collection run
#[derive(Debug, Clone)]
pub struct CollectorConfig {
    /// Explicit game executable; the remembered one is used when absent
    pub game_path: Option<PathBuf>,
    /// Module injected into the target
    pub module_path: PathBuf,
    pub pipe_name: String,
    /// Where an undecodable payload is written
    pub raw_dump_path: PathBuf,
    /// Known field mapping to try before the cached one
    pub schema_path: Option<PathBuf>,
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            game_path: None,
            module_path: defaults::module_path(),
            pipe_name: DEFAULT_PIPE_NAME.to_string(),
            raw_dump_path: PathBuf::from(defaults::RAW_DUMP_FILE),
            schema_path: None,
        }
    }
}

impl CollectorConfig {
    /// Create a new configuration builder
    pub fn builder() -> CollectorConfigBuilder {
        CollectorConfigBuilder::default()
    }
}

/// Builder for CollectorConfig
#[derive(Debug, Clone, Default)]
pub struct CollectorConfigBuilder {
    game_path: Option<PathBuf>,
    module_path: Option<PathBuf>,
    pipe_name: Option<String>,
    raw_dump_path: Option<PathBuf>,
    schema_path: Option<PathBuf>,
}

impl CollectorConfigBuilder {
    /// Start from the values of a settings file
    pub fn from_config(config: &Config) -> Self {
        Self {
            game_path: config.game_path.clone(),
            module_path: config.module_path.clone(),
            pipe_name: config.pipe_name.clone(),
            raw_dump_path: config.raw_dump_path.clone(),
            schema_path: config.schema_path.clone(),
        }
    }

    pub fn game_path<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.game_path = Some(path.into());
        self
    }

    pub fn module_path<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.module_path = Some(path.into());
        self
    }

    pub fn pipe_name<S: Into<String>>(mut self, name: S) -> Self {
        self.pipe_name = Some(name.into());
        self
    }

    pub fn raw_dump_path<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.raw_dump_path = Some(path.into());
        self
    }

    pub fn schema_path<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.schema_path = Some(path.into());
        self
    }

    /// Build the configuration
    pub fn build(self) -> CollectorConfig {
        let default = CollectorConfig::default();
        CollectorConfig {
            game_path: self.game_path.or(default.game_path),
            module_path: self.module_path.unwrap_or(default.module_path),
            pipe_name: self.pipe_name.unwrap_or(default.pipe_name),
            raw_dump_path: self.raw_dump_path.unwrap_or(default.raw_dump_path),
            schema_path: self.schema_path.or(default.schema_path),
        }
    }
}

/// Result of one run.
#[derive(Debug, Clone)]
pub struct Collection {
    pub items: Vec<AchievementItem>,
    /// `None` when the payload held no records.
    pub source: Option<MappingSource>,
    /// Payload exactly as received.
    pub raw: Vec<u8>,
}

pub struct Collector {
    config: CollectorConfig,
    cache: CacheStore,
}

fn terminate_quietly(process: &GameProcess, exit_code: u32) {
    if let Err(e) = process.terminate(exit_code) {
        warn!("Failed to terminate target process {}: {}", process.pid(), e);
    }
}

impl Collector {
    pub fn new(config: CollectorConfig, cache: CacheStore) -> Self {
        Self { config, cache }
    }

    pub fn config(&self) -> &CollectorConfig {
        &self.config
    }

    pub fn cache(&self) -> &CacheStore {
        &self.cache
    }

    /// Launch the target and collect a fresh payload.
    pub fn collect(&self) -> Result<Collection> {
        let game = paths::resolve_game_path(&self.cache, self.config.game_path.as_deref())?;
        let raw = self.run_session(&game)?;

        if let Err(e) = paths::remember_game_path(&self.cache, &game) {
            warn!("Failed to remember game path: {}", e);
        }
        if let Err(e) = self.cache.write(ACHIEVEMENT_DATA_KEY, &raw, None) {
            warn!("Failed to cache achievement data: {}", e);
        }
        self.process_payload(raw)
    }

    /// Payload cached by a previous run, if written within `max_age`.
    pub fn cached_payload(&self, max_age: Duration) -> Option<Vec<u8>> {
        self.cache.read_fresh(ACHIEVEMENT_DATA_KEY, max_age)
    }

    /// Re-process the cached payload instead of launching the target.
    pub fn collect_cached(&self, max_age: Duration) -> Result<Option<Collection>> {
        match self.cached_payload(max_age) {
            Some(raw) => {
                info!("Reusing cached achievement data ({} bytes)", raw.len());
                self.process_payload(raw).map(Some)
            }
            None => Ok(None),
        }
    }

    /// Drive the target until it sends the achievement payload.
    fn run_session(&self, game: &Path) -> Result<Vec<u8>> {
        let process = GameProcess::launch_suspended(game)?;

        if let Err(e) = process.inject_module(&self.config.module_path) {
            terminate_quietly(&process, 1);
            return Err(e);
        }
        // the module connects as soon as it runs
        let pipe = match PipeServer::create(&self.config.pipe_name) {
            Ok(pipe) => pipe,
            Err(e) => {
                terminate_quietly(&process, 1);
                return Err(e);
            }
        };
        process.resume_main_thread()?;

        let signal = Arc::new(CompletionSignal::new());
        let watcher = {
            let signal = Arc::clone(&signal);
            process.watch_exit(move || {
                if signal.peer_exited() {
                    error!("Target process exited before sending results");
                }
            })
        };
        if let Err(e) = watcher {
            terminate_quietly(&process, 1);
            return Err(e);
        }

        let (sender, payloads) = mpsc::channel();
        let receiver = {
            let signal = Arc::clone(&signal);
            thread::Builder::new()
                .name("pipe-receiver".to_string())
                .spawn(move || receive(pipe, &signal, sender))?
        };

        info!("Waiting for achievement data...");
        match signal.wait() {
            SessionPhase::Finished => {
                terminate_quietly(&process, 0);
                if receiver.join().is_err() {
                    warn!("Receiver thread panicked after finishing");
                }
                payloads.try_iter().next().ok_or(Error::NoData)
            }
            SessionPhase::PeerExited => Err(Error::UnexpectedTermination),
            SessionPhase::Disconnected => {
                terminate_quietly(&process, 1);
                Err(Error::PeerDisconnected)
            }
            SessionPhase::Running | SessionPhase::Failed => {
                terminate_quietly(&process, 1);
                match receiver.join() {
                    Ok(Err(e)) => Err(e),
                    Ok(Ok(phase)) => Err(Error::StreamCorrupted(format!(
                        "receive loop ended as {phase}"
                    ))),
                    Err(_) => Err(Error::StreamCorrupted(
                        "receiver thread panicked".to_string(),
                    )),
                }
            }
        }
    }

    /// Decode and resolve a raw achievement payload.
    ///
    /// An undecodable payload is written to the raw dump path before the
    /// error is returned.
    pub fn process_payload(&self, raw: Vec<u8>) -> Result<Collection> {
        let samples = match decode_records(&raw) {
            Ok(samples) => samples,
            Err(e) => {
                self.dump_raw(&raw);
                return Err(e.into());
            }
        };
        info!("Decoded {} achievement records", samples.len());
        if samples.is_empty() {
            return Ok(Collection {
                items: Vec::new(),
                source: None,
                raw,
            });
        }

        let known = self.known_schema();
        let resolution = resolve_mapping(&samples, known.as_ref())?;
        let items = resolution.mapping.project_all(&samples);
        if resolution.source == MappingSource::Inferred {
            self.remember_schema(resolution.mapping, &items);
        }

        Ok(Collection {
            items,
            source: Some(resolution.source),
            raw,
        })
    }

    /// Configured schema file first, then the mapping learned last time.
    fn known_schema(&self) -> Option<KnownSchema> {
        if let Some(path) = &self.config.schema_path {
            match KnownSchema::load(path) {
                Ok(schema) => return Some(schema),
                Err(e) => warn!("Failed to load schema {}: {}", path.display(), e),
            }
        }
        let content = self.cache.read_content(ACHIEVEMENT_SCHEMA_KEY)?;
        match KnownSchema::from_json(&content) {
            Ok(schema) => Some(schema),
            Err(e) => {
                debug!("Ignoring cached schema: {}", e);
                None
            }
        }
    }

    fn remember_schema(&self, mapping: FieldMapping, items: &[AchievementItem]) {
        let schema = KnownSchema::new(mapping, items.iter().map(|item| item.id));
        let result = schema
            .to_json()
            .and_then(|json| self.cache.write(ACHIEVEMENT_SCHEMA_KEY, &json, None));
        if let Err(e) = result {
            warn!("Failed to cache field mapping: {}", e);
        }
    }

    fn dump_raw(&self, raw: &[u8]) {
        let path = &self.config.raw_dump_path;
        match fs::write(path, raw) {
            Ok(()) => error!("Undecodable payload written to {}", path.display()),
            Err(e) => warn!("Failed to write {}: {}", path.display(), e),
        }
    }
}

/// Receiver thread body: accept the module's connection and run the loop.
fn receive(
    pipe: PipeServer,
    signal: &CompletionSignal,
    sender: mpsc::Sender<Vec<u8>>,
) -> Result<SessionPhase> {
    let stream = match pipe.accept() {
        Ok(stream) => stream,
        Err(e) => {
            signal.fail();
            return Err(e);
        }
    };

    let mut registry = HandlerRegistry::new();
    registry.register(message::ACHIEVEMENT_ALL_DATA, move |payload| {
        let data = payload.read_payload()?;
        debug!("Received achievement data ({} bytes)", data.len());
        // the collector may already have given up on this session
        let _ = sender.send(data);
        Ok(Disposition::Remove)
    });

    Session::new(stream, registry).run(signal, || info!("Achievement data received"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decode::test_support::payload;
    use crate::resolve::test_support::{MAPPING, scenario};
    use tempfile::TempDir;

    fn collector(dir: &TempDir) -> Collector {
        let config = CollectorConfig::builder()
            .raw_dump_path(dir.path().join(defaults::RAW_DUMP_FILE))
            .build();
        Collector::new(config, CacheStore::new(dir.path().join("cache")))
    }

    fn scenario_payload() -> Vec<u8> {
        let records: Vec<Vec<(u32, u32)>> = scenario(&MAPPING)
            .iter()
            .map(|record| record.iter().collect())
            .collect();
        payload(&records)
    }

    #[test]
    fn test_builder_defaults() {
        let config = CollectorConfig::builder().pipe_name(r"\\.\pipe\test").build();
        assert_eq!(config.pipe_name, r"\\.\pipe\test");
        assert_eq!(config.raw_dump_path, PathBuf::from(defaults::RAW_DUMP_FILE));
        assert!(config.game_path.is_none());
    }

    #[test]
    fn test_builder_from_config() {
        let file = Config {
            game_path: Some(PathBuf::from("Game.exe")),
            pipe_name: Some("pipe".to_string()),
            ..Config::default()
        };
        let config = CollectorConfigBuilder::from_config(&file)
            .pipe_name("override")
            .build();
        assert_eq!(config.game_path, Some(PathBuf::from("Game.exe")));
        assert_eq!(config.pipe_name, "override");
    }

    #[test]
    fn test_inferred_mapping_is_remembered() {
        let dir = TempDir::new().unwrap();
        let collector = collector(&dir);

        let first = collector.process_payload(scenario_payload()).unwrap();
        assert_eq!(first.items.len(), 25);
        assert_eq!(first.source, Some(MappingSource::Inferred));

        let cached = collector.cache().read_content(ACHIEVEMENT_SCHEMA_KEY).unwrap();
        let schema = KnownSchema::from_json(&cached).unwrap();
        assert_eq!(schema.mapping, MAPPING);

        let second = collector.process_payload(scenario_payload()).unwrap();
        assert_eq!(second.source, Some(MappingSource::Known));
        assert_eq!(second.items, first.items);
    }

    #[test]
    fn test_schema_file_takes_precedence() {
        let dir = TempDir::new().unwrap();
        let schema_path = dir.path().join("schema.json");
        fs::write(
            &schema_path,
            KnownSchema::new(MAPPING, 80001..=80025).to_json().unwrap(),
        )
        .unwrap();
        let config = CollectorConfig::builder()
            .schema_path(&schema_path)
            .raw_dump_path(dir.path().join(defaults::RAW_DUMP_FILE))
            .build();
        let collector = Collector::new(config, CacheStore::new(dir.path().join("cache")));

        let collection = collector.process_payload(scenario_payload()).unwrap();
        assert_eq!(collection.source, Some(MappingSource::Known));
        assert!(collector.cache().read(ACHIEVEMENT_SCHEMA_KEY).is_none());
    }

    #[test]
    fn test_corrupt_payload_is_dumped() {
        let dir = TempDir::new().unwrap();
        let collector = collector(&dir);
        // group wire kind at the outer level
        let raw = vec![0x0b, 0x01, 0x02];

        let err = collector.process_payload(raw.clone()).unwrap_err();
        assert!(matches!(err, Error::Decode(_)));
        assert_eq!(err.exit_code(), crate::error::exit_code::DECODE_FAILED);
        assert_eq!(
            fs::read(dir.path().join(defaults::RAW_DUMP_FILE)).unwrap(),
            raw
        );
    }

    #[test]
    fn test_empty_payload_is_empty_collection() {
        let dir = TempDir::new().unwrap();
        let collection = collector(&dir).process_payload(Vec::new()).unwrap();
        assert!(collection.items.is_empty());
        assert!(collection.source.is_none());
    }

    #[test]
    fn test_too_few_records() {
        let dir = TempDir::new().unwrap();
        let records: Vec<Vec<(u32, u32)>> = scenario(&MAPPING)
            .iter()
            .take(10)
            .map(|record| record.iter().collect())
            .collect();
        let err = collector(&dir).process_payload(payload(&records)).unwrap_err();
        assert_eq!(err.exit_code(), crate::error::exit_code::INSUFFICIENT_SAMPLES);
    }

    #[test]
    fn test_collect_cached() {
        let dir = TempDir::new().unwrap();
        let collector = collector(&dir);
        let max_age = Duration::from_secs(60 * defaults::REUSE_MINUTES);
        assert!(collector.collect_cached(max_age).unwrap().is_none());

        collector
            .cache()
            .write(ACHIEVEMENT_DATA_KEY, &scenario_payload(), None)
            .unwrap();
        let collection = collector.collect_cached(max_age).unwrap().unwrap();
        assert_eq!(collection.items.len(), 25);
        assert_eq!(collection.raw, scenario_payload());
    }
}
