//! Case record projection.
//!
//! A `CaseRecord` is only ever produced by replaying a verified trail through the
//! table of its kind, so status, assignees and response caches cannot drift from
//! the events that justify them.

use crate::error::WorkflowError;
use crate::kinds::table_for;
use crate::status::Status;
use crate::table::{ResponseField, TransitionTable};
use caseflow_audit_log::Trail;
use caseflow_audit_spec::{
    Actor, ActorId, AssignmentChange, CaseId, CaseKind, CaseOrigin, Role, Visibility,
};
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaseHeader {
    pub case_id: CaseId,
    pub kind: CaseKind,
    pub parent_case_id: Option<CaseId>,
    pub subject: String,
    pub parties: BTreeMap<Role, ActorId>,
    pub opened_at: DateTime<Utc>,
    pub opened_by: Actor,
}

/// Latest text written to a response cache, with where it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedResponse {
    pub text: String,
    pub seq: u64,
    pub visibility: Visibility,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaseRecord {
    header: CaseHeader,
    trail: Trail,
    status: Status,
    assigned_to: Vec<Role>,
    responses: BTreeMap<ResponseField, CachedResponse>,
    /// Latest externally visible write per cache.
    published: BTreeMap<ResponseField, CachedResponse>,
}

fn corrupt(seq: u64, reason: impl std::fmt::Display) -> WorkflowError {
    WorkflowError::CorruptTrail(format!("record {seq}: {reason}"))
}

impl CaseRecord {
    pub fn replay(trail: Trail) -> Result<Self, WorkflowError> {
        trail.verify()?;

        let seed = &trail.origin().event;
        let origin: &CaseOrigin = seed.origin.as_ref().ok_or_else(|| corrupt(0, "missing origin"))?;
        let table = table_for(origin.kind);

        let mut assigned_to = Vec::new();
        match &seed.assignment {
            Some(change @ AssignmentChange::Set(_)) => change.apply_to(&mut assigned_to),
            _ => return Err(corrupt(0, "seed must set the initial assignees")),
        }
        if assigned_to != table.initial_assignees() {
            return Err(corrupt(0, "initial assignees do not match the table"));
        }

        let mut responses = BTreeMap::new();
        let mut published = BTreeMap::new();
        let mut cache = |field: ResponseField, cached: CachedResponse| {
            if cached.visibility == Visibility::External {
                published.insert(field, cached.clone());
            }
            responses.insert(field, cached);
        };
        if let (Some(field), Some(details)) = (table.origin_cache(), &seed.details) {
            cache(field, CachedResponse { text: details.clone(), seq: 0, visibility: seed.visibility });
        }

        let mut status = table.initial();
        for rec in &trail.records()[1..] {
            let ev = &rec.event;
            if status.is_terminal() {
                return Err(corrupt(rec.seq, format!("event after terminal status {status}")));
            }
            let action = ev.action.ok_or_else(|| corrupt(rec.seq, "event without action"))?;
            let rule = table
                .lookup(status, action)
                .ok_or_else(|| corrupt(rec.seq, format!("{action} undefined in {status}")))?;
            if !rule.roles.contains(&ev.actor.role) {
                return Err(corrupt(rec.seq, format!("{} may not {action}", ev.actor.role)));
            }
            let resolution = table.resolve(rule, &ev.outcome).map_err(|e| corrupt(rec.seq, e))?;
            if resolution.event != ev.event {
                return Err(corrupt(
                    rec.seq,
                    format!("event {:?} does not match table event {:?}", ev.event, resolution.event),
                ));
            }
            if resolution.assignment != ev.assignment {
                return Err(corrupt(rec.seq, "recorded assignment does not match the table"));
            }
            if let Some(change) = &ev.assignment {
                change.apply_to(&mut assigned_to);
            }
            if let (Some(field), Some(details)) = (rule.cache, &ev.details) {
                cache(field, CachedResponse { text: details.clone(), seq: rec.seq, visibility: ev.visibility });
            }
            status = resolution.status;
        }

        let header = CaseHeader {
            case_id: origin.case_id.clone(),
            kind: origin.kind,
            parent_case_id: origin.parent_case_id.clone(),
            subject: origin.subject.clone(),
            parties: origin.parties.clone(),
            opened_at: seed.timestamp,
            opened_by: seed.actor.clone(),
        };

        Ok(Self { header, trail, status, assigned_to, responses, published })
    }

    pub fn header(&self) -> &CaseHeader {
        &self.header
    }

    pub fn id(&self) -> &CaseId {
        &self.header.case_id
    }

    pub fn kind(&self) -> CaseKind {
        self.header.kind
    }

    pub fn parent_case_id(&self) -> Option<&CaseId> {
        self.header.parent_case_id.as_ref()
    }

    pub fn subject(&self) -> &str {
        &self.header.subject
    }

    pub fn parties(&self) -> &BTreeMap<Role, ActorId> {
        &self.header.parties
    }

    pub fn table(&self) -> &'static TransitionTable {
        table_for(self.header.kind)
    }

    pub fn status(&self) -> Status {
        self.status
    }

    pub fn status_label(&self) -> String {
        self.table().status_label(self.status)
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    pub fn assigned_to(&self) -> &[Role] {
        &self.assigned_to
    }

    pub fn is_assigned(&self, role: Role) -> bool {
        self.assigned_to.contains(&role)
    }

    pub fn response(&self, field: ResponseField) -> Option<&str> {
        self.responses.get(&field).map(|r| r.text.as_str())
    }

    pub fn responses(&self) -> &BTreeMap<ResponseField, CachedResponse> {
        &self.responses
    }

    /// Caches as an external reader last saw them.
    pub fn published_responses(&self) -> &BTreeMap<ResponseField, CachedResponse> {
        &self.published
    }

    pub fn trail(&self) -> &Trail {
        &self.trail
    }

    pub fn into_trail(self) -> Trail {
        self.trail
    }
}
