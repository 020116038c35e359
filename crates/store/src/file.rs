use crate::{ensure_discardable, CaseRepository, StoreError};
use caseflow_audit_log::{read_trail, AuditRecord, TrailWriter};
use caseflow_audit_spec::{CaseId, CaseKind};
use caseflow_common::canonical_json_bytes;
use caseflow_workflow::CaseRecord;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use std::sync::Mutex;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaseIndexEntry {
    pub case_id: CaseId,
    pub kind: CaseKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_case_id: Option<CaseId>,
    pub opened_at: DateTime<Utc>,
    pub trail_len: u64,
    pub last_hash: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CaseIndex {
    pub schema_version: u8,
    pub entries: Vec<CaseIndexEntry>,
}

pub struct FileCaseStore {
    root: PathBuf,
    // Serializes index rewrites; trails of different cases never share it.
    index_lock: Mutex<()>,
}

impl FileCaseStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into(), index_lock: Mutex::new(()) }
    }

    pub fn base_dir(&self) -> PathBuf {
        self.root.join("cases")
    }

    pub fn index_path(&self) -> PathBuf {
        self.base_dir().join("index.json")
    }

    /// Case ids are generated, but lookups come from callers; keep them inside the store.
    fn case_dir(&self, case_id: &CaseId) -> Result<PathBuf, StoreError> {
        let id = case_id.as_str();
        let safe = !id.is_empty() && id.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        if !safe {
            return Err(StoreError::NotFound(case_id.clone()));
        }
        Ok(self.base_dir().join(id))
    }

    pub fn trail_path(&self, case_id: &CaseId) -> Result<PathBuf, StoreError> {
        Ok(self.case_dir(case_id)?.join("trail.jsonl"))
    }

    pub fn ensure_dirs(&self) -> Result<(), StoreError> {
        fs::create_dir_all(self.base_dir())?;
        Ok(())
    }

    pub fn load_index(&self) -> Result<CaseIndex, StoreError> {
        self.ensure_dirs()?;
        let p = self.index_path();
        if !p.exists() {
            return Ok(CaseIndex { schema_version: 1, entries: vec![] });
        }
        let bytes = fs::read(p)?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    fn write_index(&self, idx: &CaseIndex) -> Result<(), StoreError> {
        self.ensure_dirs()?;
        let bytes = canonical_json_bytes(idx)?;
        fs::write(self.index_path(), bytes)?;
        Ok(())
    }

    fn update_index(&self, f: impl FnOnce(&mut CaseIndex) -> Result<(), StoreError>) -> Result<(), StoreError> {
        let _guard = self.index_lock.lock().map_err(|_| StoreError::Corrupt("index lock poisoned".into()))?;
        let mut idx = self.load_index()?;
        if idx.schema_version == 0 {
            idx.schema_version = 1;
        }
        f(&mut idx)?;
        self.write_index(&idx)
    }
}

impl CaseRepository for FileCaseStore {
    fn insert(&self, case: &CaseRecord) -> Result<(), StoreError> {
        self.ensure_dirs()?;
        if let Some(parent) = case.parent_case_id() {
            if !self.contains(parent)? {
                return Err(StoreError::MissingParent(parent.clone()));
            }
        }
        let dir = self.case_dir(case.id())?;
        if dir.exists() {
            return Err(StoreError::Duplicate(case.id().clone()));
        }
        fs::create_dir_all(&dir)?;

        let mut writer = TrailWriter::open(dir.join("trail.jsonl"))?;
        for rec in case.trail().records() {
            writer.append_record(rec)?;
        }

        let entry = CaseIndexEntry {
            case_id: case.id().clone(),
            kind: case.kind(),
            parent_case_id: case.parent_case_id().cloned(),
            opened_at: case.header().opened_at,
            trail_len: case.trail().len() as u64,
            last_hash: case.trail().last_hash().to_string(),
        };
        self.update_index(|idx| {
            idx.entries.push(entry);
            Ok(())
        })?;
        debug!(case_id = %case.id(), "case stored");
        Ok(())
    }

    fn load(&self, case_id: &CaseId) -> Result<CaseRecord, StoreError> {
        let path = self.trail_path(case_id)?;
        if !path.exists() {
            return Err(StoreError::NotFound(case_id.clone()));
        }
        let trail = read_trail(&path)?;
        let case = CaseRecord::replay(trail)?;
        if case.id() != case_id {
            return Err(StoreError::Corrupt(format!("{} holds the trail of {}", case_id, case.id())));
        }

        // The index must never be ahead of the trail it describes.
        let idx = self.load_index()?;
        if let Some(entry) = idx.entries.iter().find(|e| &e.case_id == case_id) {
            if entry.trail_len > case.trail().len() as u64 {
                return Err(StoreError::Corrupt(format!(
                    "index records {} events for {case_id}, trail has {}",
                    entry.trail_len,
                    case.trail().len()
                )));
            }
        }
        Ok(case)
    }

    fn append(&self, case_id: &CaseId, expected_len: usize, record: &AuditRecord) -> Result<(), StoreError> {
        let path = self.trail_path(case_id)?;
        if !path.exists() {
            return Err(StoreError::NotFound(case_id.clone()));
        }
        let mut writer = TrailWriter::open(&path)?;
        let actual = writer.len() as usize;
        if actual != expected_len {
            return Err(StoreError::conflict(case_id, expected_len, actual));
        }
        writer.append_record(record)?;

        self.update_index(|idx| {
            let entry = idx
                .entries
                .iter_mut()
                .find(|e| &e.case_id == case_id)
                .ok_or_else(|| StoreError::Corrupt(format!("{case_id} missing from index")))?;
            entry.trail_len = record.seq + 1;
            entry.last_hash = record.hash.clone();
            Ok(())
        })
    }

    fn list(&self) -> Result<Vec<CaseId>, StoreError> {
        Ok(self.load_index()?.entries.into_iter().map(|e| e.case_id).collect())
    }

    fn contains(&self, case_id: &CaseId) -> Result<bool, StoreError> {
        match self.trail_path(case_id) {
            Ok(p) => Ok(p.exists()),
            Err(StoreError::NotFound(_)) => Ok(false),
            Err(e) => Err(e),
        }
    }

    fn discard(&self, case_id: &CaseId) -> Result<(), StoreError> {
        ensure_discardable(&self.load(case_id)?)?;
        fs::remove_dir_all(self.case_dir(case_id)?)?;
        self.update_index(|idx| {
            idx.entries.retain(|e| &e.case_id != case_id);
            Ok(())
        })?;
        debug!(case_id = %case_id, "linked case discarded");
        Ok(())
    }
}

// ----------------------------
// Tests
// ----------------------------
