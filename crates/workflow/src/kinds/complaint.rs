//! Workplace complaint (POSH) handled by the internal complaints committee.
//!
//! The ICC head drives the investigation and stays assigned until the case
//! closes; the complainant acts by party binding. Withdrawal and conciliation are
//! small request/decision machines attached to the same record; retaliation claims
//! spawn a linked complaint without moving the parent.

use crate::ack_loop::AcknowledgementLoop;
use crate::status::{Closure, Status};
use crate::table::{
    Assign, Field, Gate, Next, ResponseField, SideEffectHint, Target, TransitionRule, TransitionTable,
};
use caseflow_audit_spec::{ActionKind, CaseKind, Disposition, Role};

/// The complainant is bound as the `Employee` party.
pub const COMPLAINANT: Role = Role::Employee;

pub const RETALIATION_EVENT: &str = "Retaliation Claim Filed";

const INVESTIGATION: [Status; 6] = [
    Status::New,
    Status::UnderPreliminaryReview,
    Status::InquiryInitiated,
    Status::EvidenceReview,
    Status::HearingScheduled,
    Status::ReportDrafted,
];

fn resolution_loop() -> AcknowledgementLoop {
    AcknowledgementLoop::new(Role::IccHead, COMPLAINANT, "Complainant Acknowledged")
        .pending_assign(Assign::Add(COMPLAINANT))
        .resolves_to(Target::new(Status::Resolved, Assign::Clear))
        .escalates_to(Target::new(Status::PendingFinalDisposition, Assign::Remove(COMPLAINANT)))
}

/// Statuses in which the side flows, assignment and notes are available.
pub fn live_statuses() -> Vec<Status> {
    let mut all = INVESTIGATION.to_vec();
    all.extend([
        resolution_loop().pending(),
        Status::PendingFinalDisposition,
        Status::PendingWithdrawal,
        Status::PendingConciliation,
    ]);
    all
}

/// A complainant request that the ICC head approves or denies.
struct RequestFlow {
    request: ActionKind,
    decide: ActionKind,
    pending: Status,
    requested_event: &'static str,
    approved: (Closure, &'static str),
    denied_event: &'static str,
}

impl RequestFlow {
    fn rules(&self) -> Vec<TransitionRule> {
        let mut rules: Vec<TransitionRule> = INVESTIGATION
            .iter()
            .map(|from| {
                TransitionRule::new(
                    *from,
                    self.request,
                    &[COMPLAINANT],
                    self.requested_event,
                    Next::To(Target::new(self.pending, Assign::Keep)),
                )
                .with_gate(Gate::Role)
                .requires(&[Field::Text])
                .internal()
                .caches(ResponseField::ComplainantRequest)
            })
            .collect();
        rules.push(
            TransitionRule::new(
                self.pending,
                self.decide,
                &[Role::IccHead],
                "Complainant Request Decided",
                Next::Approval {
                    approved: (
                        Target::new(Status::Closed(self.approved.0), Assign::Clear),
                        self.approved.1,
                    ),
                    denied: (Target::new(Status::UnderPreliminaryReview, Assign::Keep), self.denied_event),
                },
            )
            .requires(&[Field::Decision, Field::Text])
            .with_side_effect(SideEffectHint::NotifyParties),
        );
        rules
    }
}

fn advance(from: Status, action: ActionKind, event: &'static str, to: Status) -> TransitionRule {
    TransitionRule::new(from, action, &[Role::IccHead], event, Next::To(Target::new(to, Assign::Keep)))
        .caches(ResponseField::ReviewNotes)
}

pub fn table() -> TransitionTable {
    let resolution = resolution_loop();

    let withdrawal = RequestFlow {
        request: ActionKind::RequestWithdrawal,
        decide: ActionKind::DecideWithdrawal,
        pending: Status::PendingWithdrawal,
        requested_event: "Withdrawal Requested by Complainant",
        approved: (Closure::Withdrawn, "Withdrawal Request Approved"),
        denied_event: "Withdrawal Request Denied",
    };
    let conciliation = RequestFlow {
        request: ActionKind::RequestConciliation,
        decide: ActionKind::DecideConciliation,
        pending: Status::PendingConciliation,
        requested_event: "Conciliation Requested by Complainant",
        approved: (Closure::Conciliated, "Conciliation Request Approved"),
        denied_event: "Conciliation Request Denied",
    };

    let mut per_status = Vec::new();
    for s in live_statuses() {
        per_status.push(
            TransitionRule::new(s, ActionKind::ReportRetaliation, &[COMPLAINANT], RETALIATION_EVENT, Next::Stay)
                .with_gate(Gate::Role)
                .requires(&[Field::Text])
                .internal()
                .with_side_effect(SideEffectHint::SpawnRetaliationCase),
        );
        per_status.push(
            TransitionRule::new(
                s,
                ActionKind::Assign,
                &[Role::IccHead],
                "Case Assigned",
                Next::To(Target::new(s, Assign::AddFromPayload)),
            )
            .requires(&[Field::Roles])
            .internal(),
        );
        per_status.push(
            TransitionRule::new(
                s,
                ActionKind::Unassign,
                &[Role::IccHead],
                "Case Unassigned",
                Next::To(Target::new(s, Assign::RemoveFromPayload)),
            )
            .requires(&[Field::Roles])
            .internal(),
        );
        per_status.push(
            TransitionRule::new(
                s,
                ActionKind::AddNote,
                &[Role::IccHead, Role::IccMember, Role::HrHead],
                "Internal Note Added",
                Next::Stay,
            )
            .requires(&[Field::Text])
            .internal()
            .author_visibility()
            .caches(ResponseField::ReviewNotes)
            .with_side_effect(SideEffectHint::None),
        );
    }

    TransitionTable::new(CaseKind::Complaint, Status::New, "Complaint Filed")
        .with_assignees(&[Role::IccHead])
        .with_pinned(&[Role::IccHead])
        .with_parties(&[COMPLAINANT])
        .with_assignable(&[Role::IccHead, Role::IccMember, Role::HrHead])
        .with_dispositions(&[
            Disposition::ExternalAuthority,
            Disposition::GrievanceOffice,
            Disposition::Ombudsman,
            Disposition::LogAndClose,
        ])
        .with_terminal_label(Status::Resolved, "Resolved (Action Taken)")
        .with_rules([
            advance(Status::New, ActionKind::BeginReview, "Preliminary Review Started", Status::UnderPreliminaryReview),
            advance(Status::UnderPreliminaryReview, ActionKind::AdvanceInquiry, "Inquiry Initiated", Status::InquiryInitiated),
            advance(Status::InquiryInitiated, ActionKind::AdvanceInquiry, "Evidence Review Started", Status::EvidenceReview),
            advance(Status::EvidenceReview, ActionKind::AdvanceInquiry, "Hearing Scheduled", Status::HearingScheduled),
            advance(Status::HearingScheduled, ActionKind::AdvanceInquiry, "Report Drafted", Status::ReportDrafted),
            TransitionRule::new(
                Status::UnderPreliminaryReview,
                ActionKind::CloseWithoutAction,
                &[Role::IccHead],
                "Closed Without Action",
                Next::To(Target::new(Status::Closed(Closure::NoActionRequired), Assign::Clear)),
            )
            .requires(&[Field::Text])
            .caches(ResponseField::Resolution)
            .with_side_effect(SideEffectHint::NotifyParties),
            resolution
                .respond(
                    Status::ReportDrafted,
                    Role::IccHead,
                    ActionKind::Resolve,
                    "Resolution Provided",
                    ResponseField::Resolution,
                ),
            resolution.acknowledge(),
            TransitionRule::new(
                Status::PendingFinalDisposition,
                ActionKind::FinalDecision,
                &[Role::IccHead],
                "Final Disposition Logged",
                Next::Disposition,
            )
            .requires(&[Field::Disposition, Field::Text])
            .caches(ResponseField::FinalDisposition)
            .with_side_effect(SideEffectHint::NotifyParties),
        ])
        .with_rules(withdrawal.rules())
        .with_rules(conciliation.rules())
        .with_rules(per_status)
}
