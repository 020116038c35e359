//! Critical coaching insight raised from a 1-on-1.
//!
//! Ladder: supervisor -> AM -> manager -> HR head. Each rung ends with the employee
//! acknowledging; satisfaction resolves, anything less climbs one rung.

use crate::ack_loop::AcknowledgementLoop;
use crate::status::Status;
use crate::table::{Assign, Field, Next, ResponseField, SideEffectHint, Target, TransitionRule, TransitionTable};
use caseflow_audit_spec::{ActionKind, CaseKind, Disposition, Role};

const ACKNOWLEDGED: &str = "Employee Acknowledged";

pub fn table() -> TransitionTable {
    let only = |r: Role| Assign::Only(r);

    let supervisor_tier = AcknowledgementLoop::new(Role::Supervisor, Role::Employee, ACKNOWLEDGED)
        .escalates_to(Target::new(Status::PendingAmReview, only(Role::AreaManager)));
    let am_tier = AcknowledgementLoop::new(Role::AreaManager, Role::Employee, ACKNOWLEDGED)
        .escalates_to(Target::new(Status::PendingManagerReview, only(Role::Manager)));
    let manager_tier = AcknowledgementLoop::new(Role::Manager, Role::Employee, ACKNOWLEDGED)
        .escalates_to(Target::new(Status::PendingHrReview, only(Role::HrHead)));

    TransitionTable::new(CaseKind::CriticalInsight, Status::Open, "Critical Insight Raised")
        .with_assignees(&[Role::Supervisor])
        .with_parties(&[Role::Supervisor, Role::Employee])
        .with_dispositions(&[
            Disposition::Ombudsman,
            Disposition::GrievanceOffice,
            Disposition::LogAndClose,
        ])
        .with_rules([
            supervisor_tier.respond(
                Status::Open,
                Role::Supervisor,
                ActionKind::Respond,
                "Supervisor Responded",
                ResponseField::SupervisorResponse,
            ),
            supervisor_tier.acknowledge(),
            TransitionRule::new(
                Status::PendingAmReview,
                ActionKind::CoachSupervisor,
                &[Role::AreaManager],
                "AM Coaching Notes",
                Next::To(Target::new(Status::PendingSupervisorRetry, only(Role::Supervisor))),
            )
            .requires(&[Field::Text])
            .caches(ResponseField::AmNotes),
            am_tier.respond(
                Status::PendingAmReview,
                Role::AreaManager,
                ActionKind::AddressDirectly,
                "AM Responded to Employee",
                ResponseField::AmNotes,
            ),
            TransitionRule::new(
                Status::PendingAmReview,
                ActionKind::EscalateToManager,
                &[Role::AreaManager],
                "Escalated by AM",
                Next::To(Target::new(Status::PendingManagerReview, only(Role::Manager))),
            )
            .requires(&[Field::Text])
            .caches(ResponseField::AmNotes),
            am_tier.respond(
                Status::PendingSupervisorRetry,
                Role::Supervisor,
                ActionKind::Retry,
                "Supervisor Retry Action",
                ResponseField::SupervisorRetry,
            ),
            am_tier.acknowledge(),
            manager_tier.respond(
                Status::PendingManagerReview,
                Role::Manager,
                ActionKind::Resolve,
                "Manager Resolution",
                ResponseField::ManagerResolution,
            ),
            manager_tier.acknowledge(),
            TransitionRule::new(
                Status::PendingHrReview,
                ActionKind::Resolve,
                &[Role::HrHead],
                "HR Resolution",
                Next::To(Target::new(Status::PendingFinalHrAction, only(Role::HrHead))),
            )
            .requires(&[Field::Text])
            .caches(ResponseField::HrResolution),
            TransitionRule::new(
                Status::PendingFinalHrAction,
                ActionKind::FinalDecision,
                &[Role::HrHead],
                "Final Disposition",
                Next::Disposition,
            )
            .requires(&[Field::Disposition, Field::Text])
            .caches(ResponseField::FinalDisposition)
            .with_side_effect(SideEffectHint::NotifyParties),
        ])
}
