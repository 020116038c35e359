use crate::{ensure_discardable, CaseRepository, StoreError};
use caseflow_audit_log::{verify_records, AuditRecord, Trail};
use caseflow_audit_spec::CaseId;
use caseflow_workflow::CaseRecord;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

#[derive(Default)]
struct Inner {
    trails: HashMap<CaseId, Vec<AuditRecord>>,
    order: Vec<CaseId>,
}

/// In-process repository for tests and embedding.
#[derive(Default)]
pub struct MemoryCaseStore {
    inner: Mutex<Inner>,
}

impl MemoryCaseStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn inner(&self) -> Result<MutexGuard<'_, Inner>, StoreError> {
        self.inner.lock().map_err(|_| StoreError::Corrupt("memory store lock poisoned".into()))
    }
}

impl CaseRepository for MemoryCaseStore {
    fn insert(&self, case: &CaseRecord) -> Result<(), StoreError> {
        let mut inner = self.inner()?;
        if let Some(parent) = case.parent_case_id() {
            if !inner.trails.contains_key(parent) {
                return Err(StoreError::MissingParent(parent.clone()));
            }
        }
        if inner.trails.contains_key(case.id()) {
            return Err(StoreError::Duplicate(case.id().clone()));
        }
        inner.trails.insert(case.id().clone(), case.trail().records().to_vec());
        inner.order.push(case.id().clone());
        Ok(())
    }

    fn load(&self, case_id: &CaseId) -> Result<CaseRecord, StoreError> {
        let records = self
            .inner()?
            .trails
            .get(case_id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(case_id.clone()))?;
        Ok(CaseRecord::replay(Trail::from_records(records)?)?)
    }

    fn append(&self, case_id: &CaseId, expected_len: usize, record: &AuditRecord) -> Result<(), StoreError> {
        let mut inner = self.inner()?;
        let records = inner
            .trails
            .get_mut(case_id)
            .ok_or_else(|| StoreError::NotFound(case_id.clone()))?;
        if records.len() != expected_len {
            return Err(StoreError::conflict(case_id, expected_len, records.len()));
        }
        records.push(record.clone());
        if let Err(e) = verify_records(records) {
            records.pop();
            return Err(e.into());
        }
        Ok(())
    }

    fn list(&self) -> Result<Vec<CaseId>, StoreError> {
        Ok(self.inner()?.order.clone())
    }

    fn contains(&self, case_id: &CaseId) -> Result<bool, StoreError> {
        Ok(self.inner()?.trails.contains_key(case_id))
    }

    fn discard(&self, case_id: &CaseId) -> Result<(), StoreError> {
        ensure_discardable(&self.load(case_id)?)?;
        let mut inner = self.inner()?;
        inner.trails.remove(case_id);
        inner.order.retain(|id| id != case_id);
        Ok(())
    }
}
