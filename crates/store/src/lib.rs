//! caseflow_store
//!
//! Durable home of case trails plus the service that serializes writers per case.
//!
//! Storage layout (file repository):
//!   <root>/cases/
//!     index.json           (deterministic index, rewritten canonically)
//!     <case_id>/trail.jsonl (append-only, hash chained)
//!
//! NOTE:
//! - The trail is authoritative; the index only speeds up listing and is
//!   cross-checked against the trail on load.

mod file;
mod memory;
mod service;

pub use file::{CaseIndex, CaseIndexEntry, FileCaseStore};
pub use memory::MemoryCaseStore;
pub use service::{CaseQuery, CaseService};

use caseflow_audit_log::{AuditLogError, AuditRecord};
use caseflow_audit_spec::CaseId;
use caseflow_common::CanonError;
use caseflow_workflow::{CaseRecord, WorkflowError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("canonical json error: {0}")]
    Canon(#[from] CanonError),
    #[error("audit log error: {0}")]
    AuditLog(#[from] AuditLogError),
    #[error(transparent)]
    Workflow(#[from] WorkflowError),
    #[error("case not found: {0}")]
    NotFound(CaseId),
    #[error("case already exists: {0}")]
    Duplicate(CaseId),
    #[error("parent case not found: {0}")]
    MissingParent(CaseId),
    #[error("store corruption: {0}")]
    Corrupt(String),
    #[error("case lock poisoned: {0}")]
    Poisoned(CaseId),
}

impl StoreError {
    pub(crate) fn conflict(case_id: &CaseId, expected: usize, actual: usize) -> Self {
        StoreError::Workflow(WorkflowError::ConcurrentModificationConflict {
            case_id: case_id.clone(),
            expected,
            actual,
        })
    }

    /// The workflow rejection behind this error, if any.
    pub fn workflow(&self) -> Option<&WorkflowError> {
        match self {
            StoreError::Workflow(e) => Some(e),
            _ => None,
        }
    }
}

/// Persistence port for case trails.
///
/// Implementations only ever append; `append` must refuse a record unless the
/// stored trail still has `expected_len` records and the record extends its chain.
pub trait CaseRepository: Send + Sync {
    /// Store a freshly opened case. Fails on a reused id or an unknown parent.
    fn insert(&self, case: &CaseRecord) -> Result<(), StoreError>;

    fn load(&self, case_id: &CaseId) -> Result<CaseRecord, StoreError>;

    fn append(&self, case_id: &CaseId, expected_len: usize, record: &AuditRecord) -> Result<(), StoreError>;

    /// Case ids in insertion order.
    fn list(&self) -> Result<Vec<CaseId>, StoreError>;

    fn contains(&self, case_id: &CaseId) -> Result<bool, StoreError>;

    /// Undo `insert` of a linked case whose parent link never committed.
    /// Refuses anything but a seed-only case with a parent.
    fn discard(&self, case_id: &CaseId) -> Result<(), StoreError>;
}

pub(crate) fn ensure_discardable(case: &CaseRecord) -> Result<(), StoreError> {
    if case.parent_case_id().is_none() || case.trail().len() != 1 {
        return Err(StoreError::Corrupt(format!("refusing to discard committed case {}", case.id())));
    }
    Ok(())
}
