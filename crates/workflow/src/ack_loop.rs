//! The "party responds, other party acknowledges" cycle.
//!
//! One `AcknowledgementLoop` is declared per tier of a ladder and emits the two
//! rules for that tier: the response moving the case into the pending
//! acknowledgement status, and the acknowledgement that resolves or escalates.

use crate::status::Status;
use crate::table::{Assign, Field, Next, ResponseField, Target, TransitionRule};
use caseflow_audit_spec::{ActionKind, Role};

#[derive(Debug, Clone, Copy)]
pub struct AcknowledgementLoop {
    /// Tier whose response is being acknowledged.
    pub tier: Role,
    pub acknowledger: Role,
    /// Base event name; the satisfaction label is appended.
    pub event: &'static str,
    /// Assignment applied when the response lands.
    pub pending_assign: Assign,
    pub resolve_to: Target,
    pub escalate_to: Target,
}

impl AcknowledgementLoop {
    pub fn new(tier: Role, acknowledger: Role, event: &'static str) -> Self {
        Self {
            tier,
            acknowledger,
            event,
            pending_assign: Assign::Only(acknowledger),
            resolve_to: Target::new(Status::Resolved, Assign::Clear),
            escalate_to: Target::new(Status::Resolved, Assign::Clear),
        }
    }

    pub fn pending_assign(mut self, assign: Assign) -> Self {
        self.pending_assign = assign;
        self
    }

    pub fn resolves_to(mut self, target: Target) -> Self {
        self.resolve_to = target;
        self
    }

    pub fn escalates_to(mut self, target: Target) -> Self {
        self.escalate_to = target;
        self
    }

    pub fn pending(&self) -> Status {
        Status::PendingAcknowledgement { by: self.acknowledger, after: self.tier }
    }

    /// Rule for `responder` answering from `from`; always requires text.
    pub fn respond(
        &self,
        from: Status,
        responder: Role,
        action: ActionKind,
        event: &'static str,
        cache: ResponseField,
    ) -> TransitionRule {
        TransitionRule::new(
            from,
            action,
            &[responder],
            event,
            Next::To(Target::new(self.pending(), self.pending_assign)),
        )
        .requires(&[Field::Text])
        .caches(cache)
    }

    pub fn acknowledge(&self) -> TransitionRule {
        TransitionRule::new(
            self.pending(),
            ActionKind::Acknowledge,
            &[self.acknowledger],
            self.event,
            Next::Acknowledgement { accepted: self.resolve_to, escalated: self.escalate_to },
        )
        .requires(&[Field::Satisfaction])
        .caches(ResponseField::Acknowledgement)
    }
}
