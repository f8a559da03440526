use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::decode::{Record, SampleSet};
use crate::error::Result;

use super::{FieldMapping, TIMESTAMP_EPOCH};

/// A previously known field mapping plus the ids it is valid for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KnownSchema {
    pub mapping: FieldMapping,
    pub ids: BTreeSet<u32>,
}

impl KnownSchema {
    pub fn new(mapping: FieldMapping, ids: impl IntoIterator<Item = u32>) -> Self {
        Self {
            mapping,
            ids: ids.into_iter().collect(),
        }
    }

    /// Load a schema from a JSON metadata file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    pub fn from_json(bytes: &[u8]) -> Result<Self> {
        Ok(serde_json::from_slice(bytes)?)
    }

    pub fn to_json(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }

    /// Whether a single record is consistent with this schema.
    pub fn accepts(&self, record: &Record) -> bool {
        let status = match record.get(self.mapping.status) {
            Some(status @ 1..=3) => status,
            _ => return false,
        };
        if status > 1 && record.get(self.mapping.timestamp).unwrap_or(0) < TIMESTAMP_EPOCH {
            return false;
        }
        self.ids.contains(&record.get(self.mapping.id).unwrap_or(0))
    }

    /// Every record must be accepted for the mapping to hold.
    pub fn validates(&self, samples: &SampleSet) -> bool {
        match samples.iter().position(|r| !self.accepts(r)) {
            Some(index) => {
                trace!("Known mapping rejected by record {}", index);
                false
            }
            None => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MAPPING: FieldMapping = FieldMapping {
        id: 1,
        status: 2,
        timestamp: 3,
        current: 4,
        total: 5,
    };

    fn schema() -> KnownSchema {
        KnownSchema::new(MAPPING, [80001, 80002, 80003])
    }

    fn record(fields: &[(u32, u32)]) -> Record {
        fields.iter().copied().collect()
    }

    #[test]
    fn test_accepts_valid_records() {
        let schema = schema();
        assert!(schema.accepts(&record(&[(1, 80001), (2, 1), (5, 10)])));
        assert!(schema.accepts(&record(&[(1, 80002), (2, 2), (3, TIMESTAMP_EPOCH)])));
        assert!(schema.accepts(&record(&[(1, 80003), (2, 3), (3, 1_700_000_000)])));
    }

    #[test]
    fn test_rejects_out_of_range_status() {
        let schema = schema();
        assert!(!schema.accepts(&record(&[(1, 80001), (2, 0), (5, 10)])));
        assert!(!schema.accepts(&record(&[(1, 80001), (2, 4), (5, 10)])));
        assert!(!schema.accepts(&record(&[(1, 80001), (5, 10), (4, 1)])));
    }

    #[test]
    fn test_rejects_completed_without_timestamp() {
        let schema = schema();
        assert!(!schema.accepts(&record(&[(1, 80002), (2, 2), (5, 10)])));
        assert!(!schema.accepts(&record(&[
            (1, 80002),
            (2, 3),
            (3, TIMESTAMP_EPOCH - 1)
        ])));
    }

    #[test]
    fn test_rejects_unknown_id() {
        let schema = schema();
        assert!(!schema.accepts(&record(&[(1, 90001), (2, 1), (5, 10)])));
        assert!(!schema.accepts(&record(&[(2, 1), (4, 1), (5, 10)])));
    }

    #[test]
    fn test_validates_requires_every_record() {
        let schema = schema();
        let good = record(&[(1, 80001), (2, 1), (5, 10)]);
        let bad = record(&[(1, 80001), (2, 7), (5, 10)]);
        assert!(schema.validates(&SampleSet::from(vec![good.clone(), good.clone()])));
        assert!(!schema.validates(&SampleSet::from(vec![good, bad])));
    }

    #[test]
    fn test_json_round_trip_and_file_load() {
        let schema = schema();
        let json = schema.to_json().unwrap();
        assert_eq!(KnownSchema::from_json(&json).unwrap(), schema);

        let file = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(file.path(), &json).unwrap();
        assert_eq!(KnownSchema::load(file.path()).unwrap(), schema);
    }
}
