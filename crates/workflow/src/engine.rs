//! Workflow engine: the only path that creates cases or extends their trails.
//!
//! `apply` runs guard -> payload validation -> event construction -> append ->
//! replay on a private copy of the trail. Nothing observable changes unless every
//! step succeeds, and the returned record is rebuilt from the extended trail.

use crate::error::WorkflowError;
use crate::guard::authorize;
use crate::kinds::{complaint, table_for};
use crate::payload::{ActionRequest, Payload};
use crate::record::CaseRecord;
use crate::table::{Assign, Field, Next, SideEffectHint, Target, TransitionRule};
use caseflow_audit_log::{AuditRecord, Trail};
use caseflow_audit_spec::{
    Actor, ActorId, AssignmentChange, AuditEvent, CaseId, CaseKind, CaseOrigin, Outcome, Role,
    Visibility,
};
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use tracing::{debug, info};

/// Request from a case creation trigger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenCase {
    pub kind: CaseKind,
    pub opened_by: Actor,
    pub subject: String,
    pub details: Option<String>,
    pub parties: BTreeMap<Role, ActorId>,
    pub parent_case_id: Option<CaseId>,
}

impl OpenCase {
    /// Raised by the 1-on-1 analysis step, not by a person.
    pub fn critical_insight(
        supervisor: impl Into<String>,
        employee: impl Into<String>,
        subject: impl Into<String>,
        details: impl Into<String>,
    ) -> Self {
        Self {
            kind: CaseKind::CriticalInsight,
            opened_by: Actor::system(),
            subject: subject.into(),
            details: Some(details.into()),
            parties: BTreeMap::from([
                (Role::Supervisor, ActorId::new(supervisor)),
                (Role::Employee, ActorId::new(employee)),
            ]),
            parent_case_id: None,
        }
    }

    pub fn declined_recommendation(
        supervisor: impl Into<String>,
        subject: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        let supervisor = Actor::new(Role::Supervisor, supervisor);
        Self {
            kind: CaseKind::DeclinedRecommendation,
            parties: BTreeMap::from([(Role::Supervisor, supervisor.id.clone())]),
            opened_by: supervisor,
            subject: subject.into(),
            details: Some(reason.into()),
            parent_case_id: None,
        }
    }

    pub fn complaint(
        complainant: impl Into<String>,
        title: impl Into<String>,
        details: impl Into<String>,
    ) -> Self {
        let complainant = Actor::new(complaint::COMPLAINANT, complainant);
        Self {
            kind: CaseKind::Complaint,
            parties: BTreeMap::from([(complaint::COMPLAINANT, complainant.id.clone())]),
            opened_by: complainant,
            subject: title.into(),
            details: Some(details.into()),
            parent_case_id: None,
        }
    }

    pub fn with_party(mut self, role: Role, id: impl Into<String>) -> Self {
        self.parties.insert(role, ActorId::new(id));
        self
    }
}

/// Result of a committed transition.
#[derive(Debug, Clone)]
pub struct Applied {
    pub case: CaseRecord,
    pub event: AuditRecord,
    pub side_effect: SideEffectHint,
    /// Linked case created by this action; the caller must persist it.
    pub spawned: Option<CaseRecord>,
}

pub fn open_case(open: OpenCase, at: DateTime<Utc>) -> Result<CaseRecord, WorkflowError> {
    let event = table_for(open.kind).origin_event();
    seed_case(open, event, at)
}

fn seed_case(open: OpenCase, event: &str, at: DateTime<Utc>) -> Result<CaseRecord, WorkflowError> {
    let table = table_for(open.kind);

    let subject = open.subject.trim();
    if subject.is_empty() {
        return Err(WorkflowError::invalid("subject", "must not be empty"));
    }
    let details = open.details.as_deref().map(str::trim).filter(|d| !d.is_empty());
    if table.origin_cache().is_some() && details.is_none() {
        return Err(WorkflowError::invalid("text", "a reason is required to open this case"));
    }
    if open.parties.contains_key(&Role::System) {
        return Err(WorkflowError::invalid("parties", "system cannot be a party"));
    }
    for role in table.required_parties() {
        if !open.parties.contains_key(role) {
            return Err(WorkflowError::invalid("parties", format!("{role} must be bound")));
        }
    }
    if let Some(bound) = open.parties.get(&open.opened_by.role) {
        if *bound != open.opened_by.id {
            return Err(WorkflowError::invalid("opened_by", "actor is not the bound party"));
        }
    }
    if open.parent_case_id.is_some() && open.kind != CaseKind::Complaint {
        return Err(WorkflowError::invalid("parent_case_id", "only complaints may be linked"));
    }

    let case_id = CaseId::generate(open.kind);
    let seed = AuditEvent {
        event: event.to_string(),
        actor: open.opened_by,
        timestamp: at,
        details: details.map(str::to_string),
        visibility: Visibility::External,
        action: None,
        outcome: Outcome::default(),
        assignment: Some(AssignmentChange::Set(table.initial_assignees().to_vec())),
        origin: Some(CaseOrigin {
            case_id,
            kind: open.kind,
            parent_case_id: open.parent_case_id,
            subject: subject.to_string(),
            parties: open.parties,
        }),
    };

    let case = CaseRecord::replay(Trail::seed(seed)?)?;
    info!(
        case_id = %case.id(),
        kind = ?case.kind(),
        status = %case.status(),
        parent = ?case.parent_case_id(),
        "case opened"
    );
    Ok(case)
}

pub fn apply(case: &CaseRecord, req: ActionRequest, at: DateTime<Utc>) -> Result<Applied, WorkflowError> {
    let actual = case.trail().len();
    if let Some(expected) = req.expected_trail_len {
        if expected != actual {
            return Err(WorkflowError::ConcurrentModificationConflict {
                case_id: case.id().clone(),
                expected,
                actual,
            });
        }
    }

    let rule = authorize(case, &req.actor, req.action)?;
    let mut outcome = validate(case, rule, &req.payload)?;

    let spawned = match rule.side_effect {
        SideEffectHint::SpawnRetaliationCase => {
            let child = spawn_retaliation(case, &req, at)?;
            outcome.linked_case = Some(child.id().clone());
            Some(child)
        }
        _ => None,
    };

    let resolution = case
        .table()
        .resolve(rule, &outcome)
        .map_err(|e| WorkflowError::invalid("payload", e))?;
    let details = compose_details(rule, &req.payload, &outcome);
    let visibility = match (rule.author_visibility, req.payload.visibility) {
        (true, Some(v)) => v,
        _ => rule.visibility,
    };

    let event = AuditEvent {
        event: resolution.event,
        actor: req.actor,
        timestamp: at,
        details,
        visibility,
        action: Some(req.action),
        outcome,
        assignment: resolution.assignment,
        origin: None,
    };

    let mut trail = case.trail().clone();
    let record = trail.append(event)?.clone();
    let updated = CaseRecord::replay(trail)?;

    debug!(
        case_id = %updated.id(),
        action = %req.action,
        from = %case.status(),
        to = %updated.status(),
        seq = record.seq,
        "transition committed"
    );
    if updated.assigned_to() != case.assigned_to() {
        info!(
            case_id = %updated.id(),
            assigned_to = ?updated.assigned_to(),
            event = %record.event.event,
            "assignment changed"
        );
    }

    Ok(Applied { case: updated, event: record, side_effect: rule.side_effect, spawned })
}

fn removes_payload_roles(rule: &TransitionRule) -> bool {
    matches!(rule.next, Next::To(Target { assign: Assign::RemoveFromPayload, .. }))
}

/// Check required fields and collect the replay inputs the rule routes on.
fn validate(case: &CaseRecord, rule: &TransitionRule, payload: &Payload) -> Result<Outcome, WorkflowError> {
    let table = case.table();
    let mut outcome = Outcome::default();

    for field in &rule.required {
        match field {
            Field::Text => {
                if payload.trimmed_text().is_none() {
                    return Err(WorkflowError::invalid("text", "must not be empty"));
                }
            }
            Field::Satisfaction => {
                let s = payload.satisfaction.ok_or_else(|| {
                    WorkflowError::invalid("satisfaction", "choose satisfied, partially_satisfied or dissatisfied")
                })?;
                outcome.satisfaction = Some(s);
            }
            Field::Decision => {
                let d = payload
                    .decision
                    .ok_or_else(|| WorkflowError::invalid("decision", "choose approve or deny"))?;
                outcome.decision = Some(d);
            }
            Field::Disposition => {
                let d = payload
                    .disposition
                    .ok_or_else(|| WorkflowError::invalid("disposition", "a disposition is required"))?;
                if !table.allows_disposition(d) {
                    return Err(WorkflowError::invalid(
                        "disposition",
                        format!("{} is not allowed for {} cases", d.slug(), case.kind()),
                    ));
                }
                outcome.disposition = Some(d);
            }
            Field::Roles => {
                let mut roles: Vec<Role> = Vec::new();
                for r in &payload.roles {
                    if !table.assignable_roles().contains(r) {
                        return Err(WorkflowError::invalid("roles", format!("{r} cannot be assigned")));
                    }
                    if !roles.contains(r) {
                        roles.push(*r);
                    }
                }
                if roles.is_empty() {
                    return Err(WorkflowError::invalid("roles", "at least one role is required"));
                }
                if removes_payload_roles(rule) {
                    if let Some(r) = roles.iter().find(|r| !case.is_assigned(**r)) {
                        return Err(WorkflowError::invalid("roles", format!("{r} is not assigned")));
                    }
                    if let Some(r) = roles.iter().find(|r| table.is_pinned(**r)) {
                        return Err(WorkflowError::invalid(
                            "roles",
                            format!("{r} stays assigned to {} cases until they close", case.kind()),
                        ));
                    }
                    if case.assigned_to().iter().all(|a| roles.contains(a)) {
                        return Err(WorkflowError::invalid("roles", "a case must keep at least one assignee"));
                    }
                }
                outcome.roles = roles;
            }
        }
    }
    Ok(outcome)
}

fn compose_details(rule: &TransitionRule, payload: &Payload, outcome: &Outcome) -> Option<String> {
    let text = payload.trimmed_text();

    if let Some(child) = &outcome.linked_case {
        return Some(format!("A linked retaliation case was filed. New Case ID: {child}"));
    }
    match &rule.next {
        Next::Acknowledgement { .. } => outcome.satisfaction.map(|s| match text {
            Some(t) => format!("{}\n\nComments: {t}", s.statement()),
            None => s.statement().to_string(),
        }),
        Next::Disposition => outcome.disposition.map(|d| {
            format!("Case closed and routed to {}. Final notes: {}", d.destination(), text.unwrap_or_default())
        }),
        _ if rule.requires_field(Field::Roles) => {
            let names: Vec<&str> = outcome.roles.iter().map(Role::label).collect();
            let mut line = format!("{} for: {}.", rule.event, names.join(", "));
            if let Some(t) = text {
                line.push_str(&format!(" Note: \"{t}\""));
            }
            Some(line)
        }
        _ => text.map(str::to_string),
    }
}

fn spawn_retaliation(parent: &CaseRecord, req: &ActionRequest, at: DateTime<Utc>) -> Result<CaseRecord, WorkflowError> {
    let open = OpenCase {
        kind: CaseKind::Complaint,
        opened_by: req.actor.clone(),
        subject: format!("Retaliation Claim for case {}", parent.id()),
        details: req.payload.trimmed_text().map(str::to_string),
        parties: parent.parties().clone(),
        parent_case_id: Some(parent.id().clone()),
    };
    seed_case(open, complaint::RETALIATION_EVENT, at)
}
