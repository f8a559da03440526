//! Prelude module for convenient imports
//!
//! ```ignore
//! use achtap::prelude::*;
//! ```
//!
//! This brings the following into scope:
//!
//! - Pipeline: `Collector`, `CollectorConfig`, `Collection`, `CacheStore`
//! - Records: `AchievementItem`, `AchievementStatus`
//! - Resolution: `FieldMapping`, `KnownSchema`, `MappingSource`
//! - Export: `ExportFormat`, `JsonExporter`
//! - Error handling: `Error`, `Result`

// Pipeline
pub use crate::cache::CacheStore;
pub use crate::collector::{Collection, Collector, CollectorConfig, CollectorConfigBuilder};
pub use crate::config::Config;

// Error handling
pub use crate::error::{Error, Result};

// Records
pub use crate::achievement::{AchievementItem, AchievementStatus};

// Resolution
pub use crate::resolve::{FieldMapping, KnownSchema, MappingSource};

// Export
pub use crate::export::{ExportFormat, JsonExporter};
