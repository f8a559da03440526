//! # achtap
//!
//! Core library for the achievement extractor.
//!
//! This crate provides:
//! - Suspended launch of the target and module injection (`process`)
//! - The framed named-pipe protocol the injected module speaks (`transport`)
//! - A schema-less tag/varint decoder for the achievement payload (`decode`)
//! - Field-role resolution that survives field renumbering (`resolve`)
//! - A checksummed, compressed on-disk cache (`cache`)
//! - The collection pipeline tying them together (`collector`)

pub mod achievement;
pub mod cache;
pub mod collector;
pub mod config;
pub mod decode;
pub mod error;
pub mod export;
pub mod paths;
pub mod prelude;
pub mod process;
pub mod resolve;
pub mod transport;

pub use achievement::{AchievementItem, AchievementStatus};
pub use cache::CacheStore;
pub use collector::{Collection, Collector, CollectorConfig, CollectorConfigBuilder};
pub use config::Config;
pub use decode::{Decoder, SampleSet, decode_records};
pub use error::{Error, Result};
pub use export::{ExportFormat, JsonExporter};
pub use resolve::{FieldMapping, KnownSchema, MappingSource, resolve_items, resolve_mapping};
