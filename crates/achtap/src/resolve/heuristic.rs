//! Statistical inference of the field mapping.
//!
//! Steps:
//! 1. timestamp: field most often above [`TIMESTAMP_EPOCH`]; its hit count is
//!    the number of completed achievements.
//! 2. status: first field holding 2 or 3 in exactly that many records.
//! 3. id: field most often shaped like `8xxxx`.
//! 4. progress: in completed records, the two fields left after removing the
//!    above; the larger value is the total.

use std::collections::BTreeMap;

use tracing::debug;

use crate::decode::SampleSet;

use super::{FieldMapping, MIN_HEURISTIC_SAMPLES, ResolveError, ResolveStep, TIMESTAMP_EPOCH};

/// Achievement ids live in the 8xxxx band.
fn is_id_like(value: u32) -> bool {
    value / 10_000 % 10 == 8
}

fn is_completed_status(value: u32) -> bool {
    matches!(value, 2 | 3)
}

/// Per-field count of values matching `predicate`, ordered by field number.
fn count_fields(samples: &SampleSet, predicate: impl Fn(u32) -> bool) -> BTreeMap<u32, usize> {
    let mut counts = BTreeMap::new();
    for record in samples {
        for (field, value) in record.iter() {
            if predicate(value) {
                *counts.entry(field).or_insert(0) += 1;
            }
        }
    }
    counts
}

/// Highest count wins; on ties the smallest key is kept.
fn most_frequent<K: Copy + Ord>(counts: &BTreeMap<K, usize>) -> Option<(K, usize)> {
    counts
        .iter()
        .fold(None, |best, (&key, &count)| match best {
            Some((_, best_count)) if best_count >= count => best,
            _ => Some((key, count)),
        })
}

/// Infer the field mapping from a sample set.
pub fn infer_mapping(samples: &SampleSet) -> Result<FieldMapping, ResolveError> {
    if samples.len() <= MIN_HEURISTIC_SAMPLES {
        return Err(ResolveError::InsufficientSamples {
            count: samples.len(),
        });
    }
    let inconclusive = |step| ResolveError::Inconclusive { step };

    let (timestamp, completed) =
        most_frequent(&count_fields(samples, |v| v > TIMESTAMP_EPOCH))
            .ok_or(inconclusive(ResolveStep::Timestamp))?;
    debug!("timestamp field {} ({} completed)", timestamp, completed);

    let status = count_fields(samples, is_completed_status)
        .into_iter()
        .find(|(_, count)| *count == completed)
        .map(|(field, _)| field)
        .ok_or(inconclusive(ResolveStep::Status))?;
    debug!("status field {}", status);

    let (id, id_hits) = most_frequent(&count_fields(samples, is_id_like))
        .ok_or(inconclusive(ResolveStep::Identifier))?;
    debug!("id field {} ({} hits)", id, id_hits);

    let (total, current) =
        infer_progress(samples, id, status, timestamp).ok_or(inconclusive(ResolveStep::Progress))?;

    Ok(FieldMapping {
        id,
        status,
        timestamp,
        current,
        total,
    })
}

/// Returns `(total, current)` field numbers.
fn infer_progress(samples: &SampleSet, id: u32, status: u32, timestamp: u32) -> Option<(u32, u32)> {
    let mut pairs: BTreeMap<(u32, u32), usize> = BTreeMap::new();

    for record in samples {
        if !record.get(status).is_some_and(is_completed_status) {
            continue;
        }
        let rest: Vec<(u32, u32)> = record
            .iter()
            .filter(|(field, _)| ![id, status, timestamp].contains(field))
            .collect();
        let [(a_field, a_value), (b_field, b_value)] = rest[..] else {
            continue;
        };
        // equal values cannot tell total from current
        if a_value == b_value {
            continue;
        }
        let key = if a_value > b_value {
            (a_field, b_field)
        } else {
            (b_field, a_field)
        };
        *pairs.entry(key).or_insert(0) += 1;
    }

    let (pair, count) = most_frequent(&pairs)?;
    debug!("progress fields total={} current={} ({} records)", pair.0, pair.1, count);
    Some(pair)
}
