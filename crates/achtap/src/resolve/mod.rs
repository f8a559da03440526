//! Field-role resolution for decoded achievement records.
//!
//! Field numbers of the achievement payload change between target releases.
//! Resolution first re-validates a known mapping against the whole sample set
//! and falls back to inferring the mapping from the numeric structure of the
//! samples.
//!
//! Ties between candidate fields always go to the lowest field number.

mod heuristic;
mod known;

use serde::{Deserialize, Serialize};
use strum::Display;
use thiserror::Error;
use tracing::{debug, info};

use crate::achievement::{AchievementItem, AchievementStatus};
use crate::decode::{Record, SampleSet};

pub use heuristic::infer_mapping;
pub use known::KnownSchema;

/// Finish timestamps of completed achievements are never older than this
/// (2020-09-15 04:15:14 UTC).
pub const TIMESTAMP_EPOCH: u32 = 1_600_114_514;

/// Inference needs strictly more samples than this.
pub const MIN_HEURISTIC_SAMPLES: usize = 20;

/// Resolution step that failed to identify its field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum ResolveStep {
    #[strum(serialize = "timestamp")]
    Timestamp,
    #[strum(serialize = "status")]
    Status,
    #[strum(serialize = "identifier")]
    Identifier,
    #[strum(serialize = "progress")]
    Progress,
}

#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("Not enough achievement records to detect the field layout ({count}), wait and retry")]
    InsufficientSamples { count: usize },

    #[error("Could not identify the {step} field from the samples")]
    Inconclusive { step: ResolveStep },
}

/// Field numbers carrying each semantic role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldMapping {
    pub id: u32,
    pub status: u32,
    pub timestamp: u32,
    pub current: u32,
    pub total: u32,
}

impl FieldMapping {
    /// Project one record; `None` if it lacks id, status or total, or carries
    /// a status outside the known range.
    pub fn project(&self, record: &Record) -> Option<AchievementItem> {
        let status = AchievementStatus::from_raw(record.get(self.status)?)?;
        Some(AchievementItem {
            id: record.get(self.id)?,
            total_progress: record.get(self.total)?,
            current_progress: record.get(self.current).unwrap_or(0),
            finish_timestamp: record.get(self.timestamp).unwrap_or(0),
            status,
        })
    }

    pub fn project_all(&self, samples: &SampleSet) -> Vec<AchievementItem> {
        let items: Vec<AchievementItem> = samples.iter().filter_map(|r| self.project(r)).collect();
        if items.len() != samples.len() {
            debug!(
                "Dropped {} records that did not fit the mapping",
                samples.len() - items.len()
            );
        }
        items
    }
}

/// Which path produced a mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum MappingSource {
    #[strum(serialize = "known")]
    Known,
    #[strum(serialize = "inferred")]
    Inferred,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resolution {
    pub mapping: FieldMapping,
    pub source: MappingSource,
}

/// Resolve the field mapping for a sample set.
pub fn resolve_mapping(
    samples: &SampleSet,
    known: Option<&KnownSchema>,
) -> Result<Resolution, ResolveError> {
    if let Some(known) = known {
        if known.validates(samples) {
            debug!("Known field mapping accepted: {:?}", known.mapping);
            return Ok(Resolution {
                mapping: known.mapping,
                source: MappingSource::Known,
            });
        }
        info!("Known field mapping no longer matches the data, detecting layout...");
    }

    let mapping = infer_mapping(samples)?;
    info!(
        "Detected field layout: id={}, status={}, timestamp={}, current={}, total={}",
        mapping.id, mapping.status, mapping.timestamp, mapping.current, mapping.total
    );
    Ok(Resolution {
        mapping,
        source: MappingSource::Inferred,
    })
}

/// Resolve and project a sample set into achievement items.
///
/// An empty sample set resolves to an empty list.
pub fn resolve_items(
    samples: &SampleSet,
    known: Option<&KnownSchema>,
) -> Result<Vec<AchievementItem>, ResolveError> {
    if samples.is_empty() {
        return Ok(Vec::new());
    }
    let resolution = resolve_mapping(samples, known)?;
    Ok(resolution.mapping.project_all(samples))
}
