//! Coaching recommendation declined by a supervisor.
//!
//! The AM either accepts the decline (manager is informed) or denies it, in which
//! case the supervisor acknowledges the mandated plan or pushes back to the manager.

use crate::ack_loop::AcknowledgementLoop;
use crate::status::{Closure, Status};
use crate::table::{Assign, Field, Next, ResponseField, SideEffectHint, Target, TransitionRule, TransitionTable};
use caseflow_audit_spec::{ActionKind, CaseKind, Role};

pub fn table() -> TransitionTable {
    let am_tier = AcknowledgementLoop::new(Role::AreaManager, Role::Supervisor, "Supervisor Acknowledged")
        .resolves_to(Target::new(Status::Closed(Closure::PlanMandated), Assign::Clear))
        .escalates_to(Target::new(Status::PendingManagerReview, Assign::Only(Role::Manager)));

    TransitionTable::new(
        CaseKind::DeclinedRecommendation,
        Status::PendingAmReview,
        "Recommendation Declined by Supervisor",
    )
    .with_assignees(&[Role::AreaManager])
    .with_parties(&[Role::Supervisor])
    .with_origin_cache(ResponseField::DeclineReason)
    .with_rules([
        TransitionRule::new(
            Status::PendingAmReview,
            ActionKind::ReviewDecline,
            &[Role::AreaManager],
            "AM Reviewed Decline",
            Next::Approval {
                approved: (
                    Target::new(Status::PendingManagerAcknowledgement, Assign::Only(Role::Manager)),
                    "Decline Approved by AM",
                ),
                denied: (
                    Target::new(am_tier.pending(), Assign::Only(Role::Supervisor)),
                    "Decline Denied by AM",
                ),
            },
        )
        .requires(&[Field::Decision, Field::Text])
        .caches(ResponseField::ReviewNotes),
        am_tier.acknowledge(),
        TransitionRule::new(
            Status::PendingManagerReview,
            ActionKind::Resolve,
            &[Role::Manager],
            "Manager Resolution",
            Next::Approval {
                approved: (
                    Target::new(Status::Closed(Closure::Declined), Assign::Clear),
                    "Decline Upheld by Manager",
                ),
                denied: (
                    Target::new(Status::Closed(Closure::PlanMandated), Assign::Clear),
                    "Development Plan Upheld by Manager",
                ),
            },
        )
        .requires(&[Field::Decision, Field::Text])
        .caches(ResponseField::ManagerResolution)
        .with_side_effect(SideEffectHint::NotifyParties),
        TransitionRule::new(
            Status::PendingManagerAcknowledgement,
            ActionKind::AcknowledgeNotice,
            &[Role::Manager],
            "Manager Acknowledged Declined Recommendation",
            Next::To(Target::new(Status::Closed(Closure::Declined), Assign::Clear)),
        )
        .with_side_effect(SideEffectHint::NotifyParties),
    ])
}
