//! Case service: the application-facing entry point.
//!
//! Each `apply` holds the lock of its own case for load -> engine -> append, so two
//! writers on one case are serialized while different cases proceed independently.
//! The repository's expected-length check still catches writers in other processes.

use crate::{CaseRepository, StoreError};
use caseflow_audit_spec::{CaseId, CaseKind, Role};
use caseflow_workflow::{engine, ActionRequest, Applied, CaseRecord, CaseSummary, OpenCase};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tracing::{error, info, warn};

/// Filters for listing cases. Empty filters match everything.
#[derive(Debug, Clone, Default)]
pub struct CaseQuery {
    pub kind: Option<CaseKind>,
    pub assigned_to: Option<Role>,
    pub parent: Option<CaseId>,
    pub include_terminal: bool,
}

impl CaseQuery {
    pub fn matches(&self, case: &CaseRecord) -> bool {
        if let Some(k) = self.kind {
            if case.kind() != k {
                return false;
            }
        }
        if let Some(r) = self.assigned_to {
            if !case.is_assigned(r) {
                return false;
            }
        }
        if let Some(p) = &self.parent {
            if case.parent_case_id() != Some(p) {
                return false;
            }
        }
        self.include_terminal || !case.is_terminal()
    }
}

pub struct CaseService<R: CaseRepository> {
    repo: R,
    locks: Mutex<HashMap<CaseId, Arc<Mutex<()>>>>,
}

impl<R: CaseRepository> CaseService<R> {
    pub fn new(repo: R) -> Self {
        Self { repo, locks: Mutex::new(HashMap::new()) }
    }

    pub fn repository(&self) -> &R {
        &self.repo
    }

    fn lock_for(&self, case_id: &CaseId) -> Result<Arc<Mutex<()>>, StoreError> {
        let mut locks = self.locks.lock().map_err(|_| StoreError::Poisoned(case_id.clone()))?;
        Ok(locks.entry(case_id.clone()).or_default().clone())
    }

    /// Drop the map entry once no writer holds or waits on it.
    fn release(&self, case_id: &CaseId, lock: Arc<Mutex<()>>) {
        let Ok(mut locks) = self.locks.lock() else {
            return;
        };
        drop(lock);
        if locks.get(case_id).is_some_and(|l| Arc::strong_count(l) == 1) {
            locks.remove(case_id);
        }
    }

    pub fn open(&self, open: OpenCase, at: DateTime<Utc>) -> Result<CaseRecord, StoreError> {
        let case = engine::open_case(open, at)?;
        self.repo.insert(&case)?;
        Ok(case)
    }

    pub fn apply(&self, case_id: &CaseId, req: ActionRequest, at: DateTime<Utc>) -> Result<Applied, StoreError> {
        let lock = self.lock_for(case_id)?;
        let result = match lock.lock() {
            Ok(_guard) => self.apply_locked(case_id, req, at),
            Err(_) => Err(StoreError::Poisoned(case_id.clone())),
        };
        self.release(case_id, lock);
        result
    }

    fn apply_locked(&self, case_id: &CaseId, req: ActionRequest, at: DateTime<Utc>) -> Result<Applied, StoreError> {
        let case = self.repo.load(case_id)?;
        let (role, action) = (req.actor.role, req.action);
        let applied = match engine::apply(&case, req, at) {
            Ok(a) => a,
            Err(e) => {
                warn!(case_id = %case_id, role = %role, action = %action, error = %e, "action rejected");
                return Err(e.into());
            }
        };

        // A spawned case must exist before the parent event that points at it,
        // and must not outlive a parent append that failed.
        if let Some(child) = &applied.spawned {
            self.repo.insert(child)?;
        }
        if let Err(e) = self.repo.append(case_id, case.trail().len(), &applied.event) {
            if let Some(child) = &applied.spawned {
                match self.repo.discard(child.id()) {
                    Ok(()) => warn!(case_id = %child.id(), parent = %case_id, "linked case discarded"),
                    Err(undo) => {
                        error!(case_id = %child.id(), parent = %case_id, error = %undo, "orphaned linked case")
                    }
                }
            }
            return Err(e);
        }
        if let Some(child) = &applied.spawned {
            info!(case_id = %child.id(), parent = %case_id, "linked case stored");
        }
        Ok(applied)
    }

    pub fn get(&self, case_id: &CaseId) -> Result<CaseRecord, StoreError> {
        self.repo.load(case_id)
    }

    pub fn query(&self, q: &CaseQuery) -> Result<Vec<CaseSummary>, StoreError> {
        let mut out = Vec::new();
        for id in self.repo.list()? {
            let case = self.repo.load(&id)?;
            if q.matches(&case) {
                out.push(CaseSummary::from(&case));
            }
        }
        Ok(out)
    }

    /// Re-verify the stored chain and return its final hash.
    pub fn verify(&self, case_id: &CaseId) -> Result<String, StoreError> {
        let case = self.repo.load(case_id)?;
        Ok(case.trail().verify()?)
    }
}
