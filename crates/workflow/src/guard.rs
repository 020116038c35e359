//! Authorization guard: a pure function of the case and the static table.

use crate::error::{Denial, WorkflowError};
use crate::record::CaseRecord;
use crate::table::{Gate, TransitionRule};
use caseflow_audit_spec::{ActionKind, Actor};

/// Resolve the rule `actor` would fire with `action`, or say why not.
///
/// Order of checks: terminal status, undefined `(status, action)`, role, assignment,
/// party binding.
pub fn authorize(
    case: &CaseRecord,
    actor: &Actor,
    action: ActionKind,
) -> Result<&'static TransitionRule, WorkflowError> {
    let status = case.status();
    if status.is_terminal() {
        return Err(WorkflowError::TerminalStateViolation {
            case_id: case.id().clone(),
            status: status.code(),
        });
    }

    let rule = case
        .table()
        .lookup(status, action)
        .ok_or_else(|| WorkflowError::UnknownTransition {
            kind: case.kind(),
            status: status.code(),
            action,
        })?;

    let deny = |denial| WorkflowError::UnauthorizedTransition {
        role: actor.role,
        action,
        status: status.code(),
        denial,
    };

    if !rule.roles.contains(&actor.role) {
        return Err(deny(Denial::WrongRole));
    }
    if rule.gate == Gate::Assignee && !case.is_assigned(actor.role) {
        return Err(deny(Denial::NotAssigned));
    }
    if let Some(bound) = case.parties().get(&actor.role) {
        if *bound != actor.id {
            return Err(deny(Denial::PartyMismatch));
        }
    }
    Ok(rule)
}

/// `Ok(false)` for "not your turn" (including terminal cases); `Err(UnknownTransition)`
/// when the action is undefined for the current status.
pub fn can_act(case: &CaseRecord, actor: &Actor, action: ActionKind) -> Result<bool, WorkflowError> {
    match authorize(case, actor, action) {
        Ok(_) => Ok(true),
        Err(WorkflowError::UnauthorizedTransition { .. })
        | Err(WorkflowError::TerminalStateViolation { .. }) => Ok(false),
        Err(e) => Err(e),
    }
}
