//! caseflow_audit_spec
//!
//! Strongly-typed vocabulary shared by every escalation case:
//! - identities (case ids, actor ids) and the roles that act on cases
//! - the three case kinds
//! - action kinds and their recorded outcomes
//! - the `AuditEvent` appended to a case trail
//!
//! NOTE: the seed event of a trail carries the case header (`origin`), so a case
//! can be rebuilt from its trail alone.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
#[error("unknown {what}: {value}")]
pub struct ParseVocabError {
    pub what: &'static str,
    pub value: String,
}

/// Implements `FromStr` by reading the value through its serde (snake_case) name,
/// so CLI flags and JSON payloads accept the same spelling.
macro_rules! from_str_via_serde {
    ($($ty:ty => $what:literal),+ $(,)?) => {
        $(
            impl FromStr for $ty {
                type Err = ParseVocabError;

                fn from_str(s: &str) -> Result<Self, Self::Err> {
                    serde_json::from_value(serde_json::Value::String(s.trim().to_string()))
                        .map_err(|_| ParseVocabError { what: $what, value: s.to_string() })
                }
            }
        )+
    };
}

// ----------------------------
// Identities
// ----------------------------

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CaseId(pub String);

impl CaseId {
    /// Fresh id for a case of `kind`; ids are never reused.
    pub fn generate(kind: CaseKind) -> Self {
        Self(format!("{}-{}", kind.id_prefix(), Uuid::new_v4().simple()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CaseId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ActorId(pub String);

impl ActorId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

impl fmt::Display for ActorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Employee,
    Supervisor,
    #[serde(alias = "am")]
    AreaManager,
    Manager,
    HrHead,
    IccHead,
    IccMember,
    System,
}

impl Role {
    pub fn label(&self) -> &'static str {
        match self {
            Role::Employee => "Employee",
            Role::Supervisor => "Supervisor",
            Role::AreaManager => "AM",
            Role::Manager => "Manager",
            Role::HrHead => "HR Head",
            Role::IccHead => "ICC Head",
            Role::IccMember => "ICC Member",
            Role::System => "System",
        }
    }

    /// Short token used inside status codes (`pending_employee_acknowledgement`).
    pub fn slug(&self) -> &'static str {
        match self {
            Role::Employee => "employee",
            Role::Supervisor => "supervisor",
            Role::AreaManager => "am",
            Role::Manager => "manager",
            Role::HrHead => "hr",
            Role::IccHead => "icc_head",
            Role::IccMember => "icc_member",
            Role::System => "system",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Who performed an action. Compared structurally; display names never participate.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Actor {
    pub role: Role,
    pub id: ActorId,
}

impl Actor {
    pub fn new(role: Role, id: impl Into<String>) -> Self {
        Self { role, id: ActorId::new(id) }
    }

    pub fn system() -> Self {
        Self::new(Role::System, "system")
    }
}

// ----------------------------
// Case kinds
// ----------------------------

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CaseKind {
    CriticalInsight,
    DeclinedRecommendation,
    Complaint,
}

impl CaseKind {
    pub const ALL: [CaseKind; 3] = [
        CaseKind::CriticalInsight,
        CaseKind::DeclinedRecommendation,
        CaseKind::Complaint,
    ];

    pub fn id_prefix(&self) -> &'static str {
        match self {
            CaseKind::CriticalInsight | CaseKind::DeclinedRecommendation => "ref",
            CaseKind::Complaint => "posh",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            CaseKind::CriticalInsight => "Critical Coaching Insight",
            CaseKind::DeclinedRecommendation => "Declined Coaching Recommendation",
            CaseKind::Complaint => "Workplace Complaint",
        }
    }
}

impl fmt::Display for CaseKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

// ----------------------------
// Actions and outcomes
// ----------------------------

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    Respond,
    Acknowledge,
    CoachSupervisor,
    AddressDirectly,
    EscalateToManager,
    Retry,
    Resolve,
    FinalDecision,
    ReviewDecline,
    AcknowledgeNotice,
    BeginReview,
    AdvanceInquiry,
    CloseWithoutAction,
    RequestWithdrawal,
    DecideWithdrawal,
    RequestConciliation,
    DecideConciliation,
    ReportRetaliation,
    Assign,
    Unassign,
    AddNote,
}

impl ActionKind {
    pub const ALL: [ActionKind; 21] = [
        ActionKind::Respond,
        ActionKind::Acknowledge,
        ActionKind::CoachSupervisor,
        ActionKind::AddressDirectly,
        ActionKind::EscalateToManager,
        ActionKind::Retry,
        ActionKind::Resolve,
        ActionKind::FinalDecision,
        ActionKind::ReviewDecline,
        ActionKind::AcknowledgeNotice,
        ActionKind::BeginReview,
        ActionKind::AdvanceInquiry,
        ActionKind::CloseWithoutAction,
        ActionKind::RequestWithdrawal,
        ActionKind::DecideWithdrawal,
        ActionKind::RequestConciliation,
        ActionKind::DecideConciliation,
        ActionKind::ReportRetaliation,
        ActionKind::Assign,
        ActionKind::Unassign,
        ActionKind::AddNote,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ActionKind::Respond => "respond",
            ActionKind::Acknowledge => "acknowledge",
            ActionKind::CoachSupervisor => "coach_supervisor",
            ActionKind::AddressDirectly => "address_directly",
            ActionKind::EscalateToManager => "escalate_to_manager",
            ActionKind::Retry => "retry",
            ActionKind::Resolve => "resolve",
            ActionKind::FinalDecision => "final_decision",
            ActionKind::ReviewDecline => "review_decline",
            ActionKind::AcknowledgeNotice => "acknowledge_notice",
            ActionKind::BeginReview => "begin_review",
            ActionKind::AdvanceInquiry => "advance_inquiry",
            ActionKind::CloseWithoutAction => "close_without_action",
            ActionKind::RequestWithdrawal => "request_withdrawal",
            ActionKind::DecideWithdrawal => "decide_withdrawal",
            ActionKind::RequestConciliation => "request_conciliation",
            ActionKind::DecideConciliation => "decide_conciliation",
            ActionKind::ReportRetaliation => "report_retaliation",
            ActionKind::Assign => "assign",
            ActionKind::Unassign => "unassign",
            ActionKind::AddNote => "add_note",
        }
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Fixed set of acknowledgement answers. Partial and dissatisfied route the same
/// way but keep distinct wording in the trail.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Satisfaction {
    Satisfied,
    #[serde(alias = "partial")]
    PartiallySatisfied,
    Dissatisfied,
}

impl Satisfaction {
    pub fn label(&self) -> &'static str {
        match self {
            Satisfaction::Satisfied => "Satisfied",
            Satisfaction::PartiallySatisfied => "Partially Satisfied",
            Satisfaction::Dissatisfied => "Dissatisfied",
        }
    }

    pub fn statement(&self) -> &'static str {
        match self {
            Satisfaction::Satisfied => "The concern was fully addressed to my satisfaction.",
            Satisfaction::PartiallySatisfied => {
                "The concern was partially addressed, but I still have reservations."
            }
            Satisfaction::Dissatisfied => "I do not feel the concern was adequately addressed.",
        }
    }

    pub fn escalates(&self) -> bool {
        !matches!(self, Satisfaction::Satisfied)
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Decision {
    Approve,
    Deny,
}

impl Decision {
    pub fn label(&self) -> &'static str {
        match self {
            Decision::Approve => "Approved",
            Decision::Deny => "Denied",
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Disposition {
    Ombudsman,
    GrievanceOffice,
    #[serde(alias = "log_close")]
    LogAndClose,
    ExternalAuthority,
}

impl Disposition {
    pub fn label(&self) -> &'static str {
        match self {
            Disposition::Ombudsman => "Assigned to Ombudsman",
            Disposition::GrievanceOffice => "Assigned to Grievance Office",
            Disposition::LogAndClose => "Logged & Closed",
            Disposition::ExternalAuthority => "Escalated to External Authority",
        }
    }

    /// Where the closed case goes, for disposition details.
    pub fn destination(&self) -> &'static str {
        match self {
            Disposition::Ombudsman => "the Ombudsman",
            Disposition::GrievanceOffice => "the Grievance Office",
            Disposition::LogAndClose => "the case log",
            Disposition::ExternalAuthority => "an external authority",
        }
    }

    pub fn slug(&self) -> &'static str {
        match self {
            Disposition::Ombudsman => "ombudsman",
            Disposition::GrievanceOffice => "grievance_office",
            Disposition::LogAndClose => "logged",
            Disposition::ExternalAuthority => "external_authority",
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Visibility {
    /// Only reviewers of the case see the event (ICC-internal notes, assignment).
    Internal,
    #[default]
    External,
}

from_str_via_serde!(
    Role => "role",
    CaseKind => "case kind",
    ActionKind => "action",
    Satisfaction => "satisfaction",
    Decision => "decision",
    Disposition => "disposition",
    Visibility => "visibility",
);

/// Replay inputs recorded with an action. Only the fields the action consumed are set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Outcome {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub satisfaction: Option<Satisfaction>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub decision: Option<Decision>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disposition: Option<Disposition>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub roles: Vec<Role>,
    /// Case spawned by this action (retaliation claims).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub linked_case: Option<CaseId>,
}

impl Outcome {
    pub fn is_empty(&self) -> bool {
        *self == Outcome::default()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "op", content = "roles")]
pub enum AssignmentChange {
    Set(Vec<Role>),
    Add(Vec<Role>),
    Remove(Vec<Role>),
}

impl AssignmentChange {
    /// Apply to an assignee list, keeping first-assigned order and no duplicates.
    pub fn apply_to(&self, assigned: &mut Vec<Role>) {
        match self {
            AssignmentChange::Set(roles) => {
                assigned.clear();
                for r in roles {
                    if !assigned.contains(r) {
                        assigned.push(*r);
                    }
                }
            }
            AssignmentChange::Add(roles) => {
                for r in roles {
                    if !assigned.contains(r) {
                        assigned.push(*r);
                    }
                }
            }
            AssignmentChange::Remove(roles) => assigned.retain(|r| !roles.contains(r)),
        }
    }
}

/// Case header, carried only by the seed event of a trail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaseOrigin {
    pub case_id: CaseId,
    pub kind: CaseKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_case_id: Option<CaseId>,
    pub subject: String,
    /// Identities bound to roles for the life of the case.
    #[serde(default)]
    pub parties: BTreeMap<Role, ActorId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditEvent {
    pub event: String,
    pub actor: Actor,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    pub visibility: Visibility,
    /// `None` only on the seed event.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<ActionKind>,
    #[serde(default, skip_serializing_if = "Outcome::is_empty")]
    pub outcome: Outcome,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assignment: Option<AssignmentChange>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub origin: Option<CaseOrigin>,
}

impl AuditEvent {
    pub fn is_origin(&self) -> bool {
        self.origin.is_some()
    }

    pub fn is_external(&self) -> bool {
        self.visibility == Visibility::External
    }
}
