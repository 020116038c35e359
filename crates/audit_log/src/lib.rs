//! caseflow_audit_log
//!
//! Append-only, hash-chained audit trail of a single case.
//! - Each record includes: seq, event, prev_hash, hash
//! - Hash is computed over canonical JSON of (seq + prev_hash + event)
//! - A `Trail` is verified end-to-end whenever it is built from stored records,
//!   so holders of a `Trail` can rely on the chain being intact.

use caseflow_audit_spec::AuditEvent;
use caseflow_common::{genesis_digest, sha256_canonical_json};
use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AuditLogError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("canonical json error: {0}")]
    Canon(#[from] caseflow_common::CanonError),
    #[error("hash mismatch at record {seq}: expected {expected}, got {got}")]
    HashMismatch { seq: u64, expected: String, got: String },
    #[error("record out of sequence: expected seq {expected}, got {got}")]
    OutOfSequence { expected: u64, got: u64 },
    #[error("trail is empty")]
    Empty,
    #[error("first record must carry the case origin")]
    MissingOrigin,
    #[error("record {seq} carries a case origin but is not the first record")]
    MisplacedOrigin { seq: u64 },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditRecord {
    pub seq: u64,
    pub prev_hash: String, // sha256:... or genesis for seq 0
    pub hash: String,      // sha256:...
    pub event: AuditEvent,
}

#[derive(Debug, Clone, Serialize)]
struct HashPayload<'a> {
    seq: u64,
    prev_hash: &'a str,
    event: &'a AuditEvent,
}

pub fn genesis_hash() -> String {
    genesis_digest()
}

pub fn compute_record_hash(
    seq: u64,
    prev_hash: &str,
    event: &AuditEvent,
) -> Result<String, AuditLogError> {
    let payload = HashPayload { seq, prev_hash, event };
    Ok(sha256_canonical_json(&payload)?)
}

/// Check one record against the expected position in its chain.
fn check_record(rec: &AuditRecord, expected_seq: u64, expected_prev: &str) -> Result<(), AuditLogError> {
    if rec.seq != expected_seq {
        return Err(AuditLogError::OutOfSequence { expected: expected_seq, got: rec.seq });
    }
    if rec.prev_hash != expected_prev {
        return Err(AuditLogError::HashMismatch {
            seq: rec.seq,
            expected: expected_prev.to_string(),
            got: rec.prev_hash.clone(),
        });
    }
    let computed = compute_record_hash(rec.seq, &rec.prev_hash, &rec.event)?;
    if computed != rec.hash {
        return Err(AuditLogError::HashMismatch { seq: rec.seq, expected: computed, got: rec.hash.clone() });
    }
    match (rec.seq, rec.event.is_origin()) {
        (0, false) => Err(AuditLogError::MissingOrigin),
        (seq, true) if seq > 0 => Err(AuditLogError::MisplacedOrigin { seq }),
        _ => Ok(()),
    }
}

// ----------------------------
// In-memory trail
// ----------------------------

/// Verified, non-empty audit trail. Only grows through [`Trail::append`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<AuditRecord>", into = "Vec<AuditRecord>")]
pub struct Trail {
    records: Vec<AuditRecord>,
}

impl Trail {
    /// Start a trail from its seed event, which must carry the case origin.
    pub fn seed(event: AuditEvent) -> Result<Self, AuditLogError> {
        if !event.is_origin() {
            return Err(AuditLogError::MissingOrigin);
        }
        let prev_hash = genesis_hash();
        let hash = compute_record_hash(0, &prev_hash, &event)?;
        Ok(Self { records: vec![AuditRecord { seq: 0, prev_hash, hash, event }] })
    }

    /// Rebuild from stored records, verifying the whole chain.
    pub fn from_records(records: Vec<AuditRecord>) -> Result<Self, AuditLogError> {
        verify_records(&records)?;
        Ok(Self { records })
    }

    pub fn append(&mut self, event: AuditEvent) -> Result<&AuditRecord, AuditLogError> {
        if event.is_origin() {
            return Err(AuditLogError::MisplacedOrigin { seq: self.len() as u64 });
        }
        let seq = self.len() as u64;
        let prev_hash = self.last_hash().to_string();
        let hash = compute_record_hash(seq, &prev_hash, &event)?;
        self.records.push(AuditRecord { seq, prev_hash, hash, event });
        let idx = self.records.len() - 1;
        Ok(&self.records[idx])
    }

    pub fn records(&self) -> &[AuditRecord] {
        &self.records
    }

    pub fn events(&self) -> impl Iterator<Item = &AuditEvent> {
        self.records.iter().map(|r| &r.event)
    }

    pub fn origin(&self) -> &AuditRecord {
        &self.records[0]
    }

    pub fn last(&self) -> &AuditRecord {
        &self.records[self.records.len() - 1]
    }

    pub fn last_hash(&self) -> &str {
        &self.last().hash
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Always false; kept for API symmetry with `len`.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn verify(&self) -> Result<String, AuditLogError> {
        verify_records(&self.records)
    }
}

impl TryFrom<Vec<AuditRecord>> for Trail {
    type Error = AuditLogError;

    fn try_from(records: Vec<AuditRecord>) -> Result<Self, Self::Error> {
        Trail::from_records(records)
    }
}

impl From<Trail> for Vec<AuditRecord> {
    fn from(t: Trail) -> Self {
        t.records
    }
}

/// Verify a record sequence and return the final hash.
pub fn verify_records(records: &[AuditRecord]) -> Result<String, AuditLogError> {
    if records.is_empty() {
        return Err(AuditLogError::Empty);
    }
    let mut expected_prev = genesis_hash();
    for (idx, rec) in records.iter().enumerate() {
        check_record(rec, idx as u64, &expected_prev)?;
        expected_prev = rec.hash.clone();
    }
    Ok(expected_prev)
}

// ----------------------------
// JSONL persistence
// ----------------------------

/// Appends already-chained records to a JSONL file, refusing anything that
/// does not extend the chain already on disk.
pub struct TrailWriter {
    file: File,
    next_seq: u64,
    last_hash: String,
}

impl TrailWriter {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, AuditLogError> {
        let path = path.as_ref();
        let (next_seq, last_hash) = if path.exists() {
            let records = read_records(path)?;
            match records.last() {
                Some(last) => (last.seq + 1, last.hash.clone()),
                None => (0, genesis_hash()),
            }
        } else {
            (0, genesis_hash())
        };
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self { file, next_seq, last_hash })
    }

    pub fn len(&self) -> u64 {
        self.next_seq
    }

    pub fn is_empty(&self) -> bool {
        self.next_seq == 0
    }

    pub fn append_record(&mut self, rec: &AuditRecord) -> Result<(), AuditLogError> {
        check_record(rec, self.next_seq, &self.last_hash)?;
        let line = serde_json::to_string(rec)?;
        self.file.write_all(line.as_bytes())?;
        self.file.write_all(b"\n")?;
        self.file.flush()?;
        self.next_seq += 1;
        self.last_hash = rec.hash.clone();
        Ok(())
    }
}

fn read_records(path: &Path) -> Result<Vec<AuditRecord>, AuditLogError> {
    let reader = BufReader::new(File::open(path)?);
    let mut out = Vec::new();
    for line in reader.lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        out.push(serde_json::from_str(&line)?);
    }
    Ok(out)
}

/// Load and verify a trail file.
pub fn read_trail(path: impl AsRef<Path>) -> Result<Trail, AuditLogError> {
    Trail::from_records(read_records(path.as_ref())?)
}

/// Verify a trail file end-to-end and return its final hash.
pub fn verify_trail_file(path: impl AsRef<Path>) -> Result<String, AuditLogError> {
    verify_records(&read_records(path.as_ref())?)
}
