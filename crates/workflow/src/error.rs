use caseflow_audit_log::AuditLogError;
use caseflow_audit_spec::{ActionKind, CaseId, CaseKind, Role};
use std::fmt;
use thiserror::Error;

/// Why a defined transition was refused for this actor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Denial {
    /// The rule exists but is reserved to other roles.
    WrongRole,
    /// The role may act, but is not among the current assignees.
    NotAssigned,
    /// The case binds a different identity to this role.
    PartyMismatch,
}

impl fmt::Display for Denial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Denial::WrongRole => "role not permitted",
            Denial::NotAssigned => "role not assigned",
            Denial::PartyMismatch => "actor is not the bound party",
        })
    }
}

#[derive(Debug, Error)]
pub enum WorkflowError {
    #[error("{role} may not {action} in status {status}: {denial}")]
    UnauthorizedTransition {
        role: Role,
        action: ActionKind,
        status: String,
        denial: Denial,
    },
    #[error("action {action} is not defined for {kind} cases in status {status}")]
    UnknownTransition {
        kind: CaseKind,
        status: String,
        action: ActionKind,
    },
    #[error("validation failed on {field}: {reason}")]
    ValidationFailure { field: &'static str, reason: String },
    #[error("case {case_id} is in terminal status {status}")]
    TerminalStateViolation { case_id: CaseId, status: String },
    #[error("concurrent modification of case {case_id}: expected trail length {expected}, found {actual}")]
    ConcurrentModificationConflict {
        case_id: CaseId,
        expected: usize,
        actual: usize,
    },
    #[error("corrupt trail: {0}")]
    CorruptTrail(String),
}

impl WorkflowError {
    pub(crate) fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        WorkflowError::ValidationFailure { field, reason: reason.into() }
    }

    /// Only conflicts are worth a caller-side retry after re-reading the case.
    pub fn is_retryable(&self) -> bool {
        matches!(self, WorkflowError::ConcurrentModificationConflict { .. })
    }
}

impl From<AuditLogError> for WorkflowError {
    fn from(e: AuditLogError) -> Self {
        WorkflowError::CorruptTrail(e.to_string())
    }
}
