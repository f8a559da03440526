//! Schema-less decoder for the achievement list payload.
//!
//! The payload is a sequence of tag/varint fields. Every length-delimited
//! field is treated as a record candidate whose inner fields must all be
//! varints. No field numbers are assumed; the resolver assigns meaning later.
//!
//! One trailing field of the real payload is a packed list that never parses as
//! a record, so a small corruption budget is allowed before the whole buffer is
//! rejected.

mod record;
mod wire;

use thiserror::Error;
use tracing::{debug, trace};

pub use record::{Record, SampleSet};
pub use wire::{Tag, WireError, WireKind};

/// Records need more fields than this to be kept.
pub const MIN_RECORD_FIELDS: usize = 3;

/// Malformed inner groups tolerated per buffer.
pub const DEFAULT_CORRUPTION_TOLERANCE: u32 = 1;

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("Malformed payload at byte {offset}: {source}")]
    Malformed {
        offset: usize,
        #[source]
        source: WireError,
    },

    #[error("Too many malformed records (last at byte {offset}): {source}")]
    ToleranceExceeded {
        offset: usize,
        #[source]
        source: WireError,
    },
}

/// Outcome of parsing one length-delimited group.
enum Candidate {
    Record(Record),
    /// Contains a non-scalar field; rejected as a whole.
    NonScalar,
}

#[derive(Debug, Clone, Copy)]
pub struct Decoder {
    tolerance: u32,
}

impl Default for Decoder {
    fn default() -> Self {
        Self {
            tolerance: DEFAULT_CORRUPTION_TOLERANCE,
        }
    }
}

impl Decoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set how many malformed inner groups are skipped before failing.
    pub fn with_tolerance(mut self, tolerance: u32) -> Self {
        self.tolerance = tolerance;
        self
    }

    /// Decode a raw buffer into a sample set.
    pub fn decode(&self, bytes: &[u8]) -> Result<SampleSet, DecodeError> {
        let mut buf = bytes;
        let mut remaining_tolerance = self.tolerance;
        let mut records = Vec::new();
        let mut dropped = 0usize;

        while !buf.is_empty() {
            let offset = bytes.len() - buf.len();
            let malformed = |source| DecodeError::Malformed { offset, source };

            let tag = wire::read_tag(&mut buf).map_err(malformed)?;
            let kind = tag
                .kind()
                .ok_or(WireError::UnsupportedKind(tag.kind_bits))
                .map_err(malformed)?;

            if kind != WireKind::LengthDelimited {
                trace!("Skipping outer field {} ({})", tag.field, kind);
                wire::skip_value(&mut buf, kind).map_err(malformed)?;
                continue;
            }

            let group = wire::read_length_delimited(&mut buf).map_err(malformed)?;
            match parse_candidate(group) {
                Ok(Candidate::Record(record)) if record.len() >= MIN_RECORD_FIELDS => {
                    records.push(record);
                }
                Ok(_) => dropped += 1,
                Err(source) => {
                    if remaining_tolerance == 0 {
                        return Err(DecodeError::ToleranceExceeded { offset, source });
                    }
                    remaining_tolerance -= 1;
                    debug!(
                        "Skipping malformed group in field {} at byte {}: {}",
                        tag.field, offset, source
                    );
                }
            }
        }

        debug!(
            "Decoded {} records ({} candidates dropped, {} bytes)",
            records.len(),
            dropped,
            bytes.len()
        );
        Ok(SampleSet::from(records))
    }
}

/// Decode with the default corruption tolerance.
pub fn decode_records(bytes: &[u8]) -> Result<SampleSet, DecodeError> {
    Decoder::default().decode(bytes)
}

fn parse_candidate(group: &[u8]) -> Result<Candidate, WireError> {
    let mut buf = group;
    let mut record = Record::new();
    while !buf.is_empty() {
        let tag = wire::read_tag(&mut buf)?;
        if tag.kind() != Some(WireKind::Varint) {
            return Ok(Candidate::NonScalar);
        }
        // values wider than 32 bits are truncated
        let value = wire::read_varint(&mut buf)? as u32;
        record.insert(tag.field, value);
    }
    Ok(Candidate::Record(record))
}

#[cfg(test)]
pub(crate) mod test_support {
    //! Minimal encoder used to build test payloads.

    pub fn varint(mut value: u64, out: &mut Vec<u8>) {
        while value >= 0x80 {
            out.push((value as u8) | 0x80);
            value >>= 7;
        }
        out.push(value as u8);
    }

    pub fn tag(field: u32, kind: u8, out: &mut Vec<u8>) {
        varint(u64::from((field << 3) | u32::from(kind)), out);
    }

    /// Encode `fields` as one varint-only group.
    pub fn group(fields: &[(u32, u32)]) -> Vec<u8> {
        let mut inner = Vec::new();
        for (field, value) in fields {
            tag(*field, 0, &mut inner);
            varint(u64::from(*value), &mut inner);
        }
        inner
    }

    /// Wrap raw group bytes as length-delimited field `field`.
    pub fn delimited(field: u32, inner: &[u8], out: &mut Vec<u8>) {
        tag(field, 2, out);
        varint(inner.len() as u64, out);
        out.extend_from_slice(inner);
    }

    /// Encode a full payload: each record becomes a field-1 group.
    pub fn payload(records: &[Vec<(u32, u32)>]) -> Vec<u8> {
        let mut out = Vec::new();
        for fields in records {
            delimited(1, &group(fields), &mut out);
        }
        out
    }
}
