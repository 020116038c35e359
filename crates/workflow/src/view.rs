//! Read-only snapshots for dashboards, trail viewers and exports.
//!
//! Views are owned copies; nothing here can reach back into a record.

use crate::record::{CachedResponse, CaseRecord};
use crate::table::ResponseField;
use caseflow_audit_spec::{Actor, CaseId, CaseKind, Role, Visibility};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EventView {
    pub seq: u64,
    pub event: String,
    pub actor: Actor,
    pub timestamp: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    pub visibility: Visibility,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CaseView {
    pub case_id: CaseId,
    pub kind: CaseKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_case_id: Option<CaseId>,
    pub subject: String,
    pub status: String,
    pub status_label: String,
    pub terminal: bool,
    pub assigned_to: Vec<Role>,
    pub responses: BTreeMap<ResponseField, String>,
    pub trail_len: usize,
    pub last_hash: String,
    pub events: Vec<EventView>,
}

impl CaseView {
    /// Full trail, for reviewers of the case.
    pub fn internal(case: &CaseRecord) -> Self {
        Self::build(case, case.responses(), |_| true)
    }

    /// External events only; each cache shows its latest external write.
    pub fn external(case: &CaseRecord) -> Self {
        Self::build(case, case.published_responses(), |v| v == Visibility::External)
    }

    fn build(
        case: &CaseRecord,
        caches: &BTreeMap<ResponseField, CachedResponse>,
        show: impl Fn(Visibility) -> bool,
    ) -> Self {
        let events = case
            .trail()
            .records()
            .iter()
            .filter(|r| show(r.event.visibility))
            .map(|r| EventView {
                seq: r.seq,
                event: r.event.event.clone(),
                actor: r.event.actor.clone(),
                timestamp: r.event.timestamp,
                details: r.event.details.clone(),
                visibility: r.event.visibility,
            })
            .collect();
        let responses = caches.iter().map(|(f, c)| (*f, c.text.clone())).collect();

        Self {
            case_id: case.id().clone(),
            kind: case.kind(),
            parent_case_id: case.parent_case_id().cloned(),
            subject: case.subject().to_string(),
            status: case.status().code(),
            status_label: case.status_label(),
            terminal: case.is_terminal(),
            assigned_to: case.assigned_to().to_vec(),
            responses,
            trail_len: case.trail().len(),
            last_hash: case.trail().last_hash().to_string(),
            events,
        }
    }
}

/// One line of a case listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CaseSummary {
    pub case_id: CaseId,
    pub kind: CaseKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_case_id: Option<CaseId>,
    pub subject: String,
    pub status: String,
    pub terminal: bool,
    pub assigned_to: Vec<Role>,
    pub trail_len: usize,
}

impl From<&CaseRecord> for CaseSummary {
    fn from(case: &CaseRecord) -> Self {
        Self {
            case_id: case.id().clone(),
            kind: case.kind(),
            parent_case_id: case.parent_case_id().cloned(),
            subject: case.subject().to_string(),
            status: case.status().code(),
            terminal: case.is_terminal(),
            assigned_to: case.assigned_to().to_vec(),
            trail_len: case.trail().len(),
        }
    }
}
