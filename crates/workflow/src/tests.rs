//! End-to-end scenarios over the three case kinds.

use crate::engine::{apply, open_case, Applied, OpenCase};
use crate::error::{Denial, WorkflowError};
use crate::guard::can_act;
use crate::payload::{ActionRequest, Payload};
use crate::record::CaseRecord;
use crate::status::{Closure, Status};
use crate::table::ResponseField;
use crate::view::CaseView;
use caseflow_audit_log::Trail;
use caseflow_audit_spec::{
    ActionKind, Actor, CaseKind, Decision, Disposition, Role, Satisfaction, Visibility,
};
use chrono::{DateTime, Duration, TimeZone, Utc};
use proptest::prelude::*;

const SUP: &str = "sup-7";
const EMP: &str = "emp-3";

fn at(minutes: i64) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 4, 1, 9, 0, 0).unwrap() + Duration::minutes(minutes)
}

fn actor(role: Role) -> Actor {
    match role {
        Role::Supervisor => Actor::new(role, SUP),
        Role::Employee => Actor::new(role, EMP),
        other => Actor::new(other, format!("{}-1", other.slug())),
    }
}

fn insight() -> CaseRecord {
    open_case(
        OpenCase::critical_insight(SUP, EMP, "Missed growth conversations", "Employee feels sidelined in planning"),
        at(0),
    )
    .unwrap()
}

fn declined() -> CaseRecord {
    open_case(
        OpenCase::declined_recommendation(SUP, "Weekly shadowing plan", "Team is at capacity this quarter"),
        at(0),
    )
    .unwrap()
}

fn complaint() -> CaseRecord {
    open_case(OpenCase::complaint(EMP, "Inappropriate remarks", "Repeated comments during standups"), at(0)).unwrap()
}

fn act(case: &CaseRecord, role: Role, action: ActionKind, payload: Payload) -> Result<Applied, WorkflowError> {
    apply(case, ActionRequest::new(actor(role), action, payload), at(case.trail().len() as i64))
}

fn step(case: &CaseRecord, role: Role, action: ActionKind, payload: Payload) -> CaseRecord {
    act(case, role, action, payload).unwrap().case
}

fn ack(s: Satisfaction) -> Payload {
    Payload::default().with_satisfaction(s)
}

fn pending(by: Role, after: Role) -> Status {
    Status::PendingAcknowledgement { by, after }
}

// ----------------------------
// Critical insight
// ----------------------------

#[test]
fn scenario_a_satisfied_employee_resolves_and_locks_case() {
    let case = insight();
    assert_eq!(case.status(), Status::Open);
    assert_eq!(case.assigned_to(), &[Role::Supervisor]);

    let case = step(&case, Role::Supervisor, ActionKind::Respond, Payload::text("Set up fortnightly planning syncs"));
    assert_eq!(case.status(), pending(Role::Employee, Role::Supervisor));
    assert_eq!(case.status().code(), "pending_employee_acknowledgement");
    assert_eq!(case.assigned_to(), &[Role::Employee]);
    assert_eq!(case.response(ResponseField::SupervisorResponse), Some("Set up fortnightly planning syncs"));

    let applied = act(&case, Role::Employee, ActionKind::Acknowledge, ack(Satisfaction::Satisfied)).unwrap();
    assert_eq!(applied.event.event.event, "Employee Acknowledged (Satisfied)");
    let case = applied.case;
    assert_eq!(case.status(), Status::Resolved);
    assert!(case.assigned_to().is_empty());

    let len = case.trail().len();
    for (role, action) in [
        (Role::Employee, ActionKind::Acknowledge),
        (Role::Supervisor, ActionKind::Respond),
        (Role::HrHead, ActionKind::FinalDecision),
    ] {
        let err = act(&case, role, action, Payload::text("again").with_satisfaction(Satisfaction::Satisfied))
            .unwrap_err();
        assert!(matches!(err, WorkflowError::TerminalStateViolation { .. }), "{err}");
    }
    assert_eq!(case.trail().len(), len);
}

#[test]
fn scenario_b_dissatisfied_employee_escalates_to_am_then_supervisor_retry() {
    let case = step(&insight(), Role::Supervisor, ActionKind::Respond, Payload::text("Talked it through"));
    let case = step(&case, Role::Employee, ActionKind::Acknowledge, ack(Satisfaction::Dissatisfied));
    assert_eq!(case.status(), Status::PendingAmReview);
    assert_eq!(case.assigned_to(), &[Role::AreaManager]);

    let case = step(&case, Role::AreaManager, ActionKind::CoachSupervisor, Payload::text("Agree concrete milestones"));
    assert_eq!(case.status(), Status::PendingSupervisorRetry);
    assert_eq!(case.assigned_to(), &[Role::Supervisor]);

    let case = step(&case, Role::Supervisor, ActionKind::Retry, Payload::text("Milestones agreed"));
    assert_eq!(case.status(), pending(Role::Employee, Role::AreaManager));
    let case = step(&case, Role::Employee, ActionKind::Acknowledge, ack(Satisfaction::Dissatisfied));
    assert_eq!(case.status(), Status::PendingManagerReview);
    assert_eq!(case.assigned_to(), &[Role::Manager]);
}

#[test]
fn scenario_d_wrong_role_or_party_is_unauthorized_and_leaves_trail() {
    let case = step(&insight(), Role::Supervisor, ActionKind::Respond, Payload::text("First reply"));
    let case = step(&case, Role::Employee, ActionKind::Acknowledge, ack(Satisfaction::Dissatisfied));
    let len = case.trail().len();

    let err = act(&case, Role::Manager, ActionKind::CoachSupervisor, Payload::text("not mine")).unwrap_err();
    assert!(matches!(err, WorkflowError::UnauthorizedTransition { denial: Denial::WrongRole, .. }));

    let fresh = insight();
    let impostor = Actor::new(Role::Supervisor, "sup-other");
    let err = apply(
        &fresh,
        ActionRequest::new(impostor.clone(), ActionKind::Respond, Payload::text("hello")),
        at(1),
    )
    .unwrap_err();
    assert!(matches!(err, WorkflowError::UnauthorizedTransition { denial: Denial::PartyMismatch, .. }));
    assert_eq!(can_act(&fresh, &impostor, ActionKind::Respond).unwrap(), false);
    assert_eq!(can_act(&fresh, &actor(Role::Supervisor), ActionKind::Respond).unwrap(), true);

    assert_eq!(case.trail().len(), len);
    assert_eq!(fresh.trail().len(), 1);
}

#[test]
fn full_ladder_reaches_hr_disposition_and_replays_from_trail() {
    let mut case = insight();
    let script: Vec<(Role, ActionKind, Payload)> = vec![
        (Role::Supervisor, ActionKind::Respond, Payload::text("Initial plan")),
        (Role::Employee, ActionKind::Acknowledge, ack(Satisfaction::Dissatisfied)),
        (Role::AreaManager, ActionKind::AddressDirectly, Payload::text("AM takes over")),
        (Role::Employee, ActionKind::Acknowledge, ack(Satisfaction::PartiallySatisfied).with_text("Better, not fixed")),
        (Role::Manager, ActionKind::Resolve, Payload::text("Role scope rewritten")),
        (Role::Employee, ActionKind::Acknowledge, ack(Satisfaction::Dissatisfied)),
        (Role::HrHead, ActionKind::Resolve, Payload::text("HR mediation held")),
        (
            Role::HrHead,
            ActionKind::FinalDecision,
            Payload::text("Independent review").with_disposition(Disposition::Ombudsman),
        ),
    ];
    let mut statuses = Vec::new();
    for (role, action, payload) in script {
        case = step(&case, role, action, payload);
        statuses.push(case.status());
    }

    assert_eq!(
        statuses,
        vec![
            pending(Role::Employee, Role::Supervisor),
            Status::PendingAmReview,
            pending(Role::Employee, Role::AreaManager),
            Status::PendingManagerReview,
            pending(Role::Employee, Role::Manager),
            Status::PendingHrReview,
            Status::PendingFinalHrAction,
            Status::Closed(Closure::Disposition(Disposition::Ombudsman)),
        ]
    );
    assert_eq!(case.status().code(), "closed_ombudsman");
    assert!(case.assigned_to().is_empty());

    let events: Vec<&str> = case.trail().events().map(|e| e.event.as_str()).collect();
    assert_eq!(events[4], "Employee Acknowledged (Partially Satisfied)");
    assert_eq!(events[8], "Final Disposition: Assigned to Ombudsman");
    assert_eq!(
        case.response(ResponseField::FinalDisposition),
        Some("Case closed and routed to the Ombudsman. Final notes: Independent review")
    );
    let partial = case.trail().records()[4].event.details.clone().unwrap();
    assert!(partial.starts_with(Satisfaction::PartiallySatisfied.statement()));
    assert!(partial.ends_with("\n\nComments: Better, not fixed"));

    // Round trip through the wire format.
    let json = serde_json::to_string(case.trail()).unwrap();
    let trail: Trail = serde_json::from_str(&json).unwrap();
    let rebuilt = CaseRecord::replay(trail).unwrap();
    assert_eq!(rebuilt, case);
}

#[test]
fn am_can_hand_the_case_straight_to_the_manager() {
    let case = step(&insight(), Role::Supervisor, ActionKind::Respond, Payload::text("Reply"));
    let case = step(&case, Role::Employee, ActionKind::Acknowledge, ack(Satisfaction::PartiallySatisfied));
    let case = step(&case, Role::AreaManager, ActionKind::EscalateToManager, Payload::text("Needs budget"));
    assert_eq!(case.status(), Status::PendingManagerReview);
    assert_eq!(case.assigned_to(), &[Role::Manager]);
    assert_eq!(case.response(ResponseField::AmNotes), Some("Needs budget"));
}

#[test]
fn missing_fields_fail_validation_without_appending() {
    let case = insight();
    let err = act(&case, Role::Supervisor, ActionKind::Respond, Payload::text("   ")).unwrap_err();
    assert!(matches!(err, WorkflowError::ValidationFailure { field: "text", .. }));

    let case = step(&case, Role::Supervisor, ActionKind::Respond, Payload::text("Reply"));
    let err = act(&case, Role::Employee, ActionKind::Acknowledge, Payload::text("fine")).unwrap_err();
    assert!(matches!(err, WorkflowError::ValidationFailure { field: "satisfaction", .. }));
    assert_eq!(case.trail().len(), 2);
}

#[test]
fn disposition_must_belong_to_the_kind() {
    let mut case = insight();
    for (role, action, payload) in [
        (Role::Supervisor, ActionKind::Respond, Payload::text("a")),
        (Role::Employee, ActionKind::Acknowledge, ack(Satisfaction::Dissatisfied)),
        (Role::AreaManager, ActionKind::EscalateToManager, Payload::text("b")),
        (Role::Manager, ActionKind::Resolve, Payload::text("c")),
        (Role::Employee, ActionKind::Acknowledge, ack(Satisfaction::Dissatisfied)),
        (Role::HrHead, ActionKind::Resolve, Payload::text("d")),
    ] {
        case = step(&case, role, action, payload);
    }
    let err = act(
        &case,
        Role::HrHead,
        ActionKind::FinalDecision,
        Payload::text("e").with_disposition(Disposition::ExternalAuthority),
    )
    .unwrap_err();
    assert!(matches!(err, WorkflowError::ValidationFailure { field: "disposition", .. }));
}

#[test]
fn stale_expected_length_is_a_conflict() {
    let case = insight();
    let req = ActionRequest::new(actor(Role::Supervisor), ActionKind::Respond, Payload::text("Reply")).expecting(1);
    let moved = apply(&case, req.clone(), at(1)).unwrap().case;

    let err = apply(&moved, req, at(2)).unwrap_err();
    assert!(err.is_retryable());
    assert!(matches!(
        err,
        WorkflowError::ConcurrentModificationConflict { expected: 1, actual: 2, .. }
    ));
}

#[test]
fn undefined_actions_are_unknown_for_guard_and_engine() {
    let mut cases = vec![insight(), declined(), complaint()];
    cases.push(step(&cases[0], Role::Supervisor, ActionKind::Respond, Payload::text("Reply")));
    cases.push(step(&cases[2], Role::IccHead, ActionKind::BeginReview, Payload::default()));

    for case in &cases {
        for action in ActionKind::ALL {
            if case.table().lookup(case.status(), action).is_some() {
                continue;
            }
            for role in [Role::Supervisor, Role::Employee, Role::IccHead] {
                assert!(matches!(
                    can_act(case, &actor(role), action),
                    Err(WorkflowError::UnknownTransition { .. })
                ));
                assert!(matches!(
                    act(case, role, action, Payload::text("x")),
                    Err(WorkflowError::UnknownTransition { .. })
                ));
            }
        }
    }
}

// ----------------------------
// Declined recommendation
// ----------------------------

#[test]
fn declined_recommendation_requires_a_reason() {
    let err = open_case(OpenCase::declined_recommendation(SUP, "Shadowing", " "), at(0)).unwrap_err();
    assert!(matches!(err, WorkflowError::ValidationFailure { field: "text", .. }));

    let case = declined();
    assert_eq!(case.status(), Status::PendingAmReview);
    assert_eq!(case.response(ResponseField::DeclineReason), Some("Team is at capacity this quarter"));
    assert_eq!(case.trail().origin().event.actor, actor(Role::Supervisor));
}

#[test]
fn denied_decline_loops_through_supervisor_then_manager() {
    let case = step(
        &declined(),
        Role::AreaManager,
        ActionKind::ReviewDecline,
        Payload::text("Plan stays").with_decision(Decision::Deny),
    );
    assert_eq!(case.status(), pending(Role::Supervisor, Role::AreaManager));
    assert_eq!(case.assigned_to(), &[Role::Supervisor]);

    let case = step(&case, Role::Supervisor, ActionKind::Acknowledge, ack(Satisfaction::Dissatisfied));
    assert_eq!(case.status(), Status::PendingManagerReview);

    let applied = act(
        &case,
        Role::Manager,
        ActionKind::Resolve,
        Payload::text("Capacity is real").with_decision(Decision::Approve),
    )
    .unwrap();
    assert_eq!(applied.event.event.event, "Decline Upheld by Manager");
    assert_eq!(applied.case.status(), Status::Closed(Closure::Declined));
}

#[test]
fn satisfied_supervisor_accepts_mandated_plan() {
    let case = step(
        &declined(),
        Role::AreaManager,
        ActionKind::ReviewDecline,
        Payload::text("Plan stays").with_decision(Decision::Deny),
    );
    let case = step(&case, Role::Supervisor, ActionKind::Acknowledge, ack(Satisfaction::Satisfied));
    assert_eq!(case.status().code(), "closed_plan_mandated");
}

#[test]
fn approved_decline_needs_manager_acknowledgement() {
    let case = step(
        &declined(),
        Role::AreaManager,
        ActionKind::ReviewDecline,
        Payload::text("Fair").with_decision(Decision::Approve),
    );
    assert_eq!(case.status(), Status::PendingManagerAcknowledgement);
    assert_eq!(case.assigned_to(), &[Role::Manager]);
    let case = step(&case, Role::Manager, ActionKind::AcknowledgeNotice, Payload::default());
    assert_eq!(case.status(), Status::Closed(Closure::Declined));
}

// ----------------------------
// Complaint
// ----------------------------

fn drafted_complaint() -> CaseRecord {
    let mut case = step(&complaint(), Role::IccHead, ActionKind::BeginReview, Payload::default());
    for _ in 0..4 {
        case = step(&case, Role::IccHead, ActionKind::AdvanceInquiry, Payload::text("next stage"));
    }
    assert_eq!(case.status(), Status::ReportDrafted);
    case
}

#[test]
fn scenario_c_retaliation_spawns_linked_case_without_moving_parent() {
    let parent = step(&complaint(), Role::IccHead, ActionKind::BeginReview, Payload::default());
    let before = parent.trail().len();

    let applied = act(
        &parent,
        Role::Employee,
        ActionKind::ReportRetaliation,
        Payload::text("Moved off my project after filing"),
    )
    .unwrap();
    let child = applied.spawned.clone().unwrap();

    assert_eq!(child.parent_case_id(), Some(parent.id()));
    assert_eq!(child.kind(), CaseKind::Complaint);
    assert_eq!(child.status(), Status::New);
    assert_eq!(child.assigned_to(), &[Role::IccHead]);
    assert_eq!(child.trail().origin().event.event, "Retaliation Claim Filed");
    assert!(child.subject().contains(parent.id().as_str()));

    let updated = applied.case;
    assert_eq!(updated.status(), parent.status());
    assert_eq!(updated.assigned_to(), parent.assigned_to());
    assert_eq!(updated.trail().len(), before + 1);
    assert_eq!(&updated.trail().records()[..before], parent.trail().records());

    let link = &updated.trail().last().event;
    assert_eq!(link.visibility, Visibility::Internal);
    assert_eq!(link.outcome.linked_case.as_ref(), Some(child.id()));
    assert!(link.details.as_deref().unwrap().ends_with(child.id().as_str()));
}

#[test]
fn dissatisfied_complainant_goes_to_final_disposition() {
    let case = step(&drafted_complaint(), Role::IccHead, ActionKind::Resolve, Payload::text("Training mandated"));
    assert_eq!(case.status(), pending(Role::Employee, Role::IccHead));
    assert_eq!(case.assigned_to(), &[Role::IccHead, Role::Employee]);

    let case = step(&case, Role::Employee, ActionKind::Acknowledge, ack(Satisfaction::Dissatisfied));
    assert_eq!(case.status(), Status::PendingFinalDisposition);
    assert_eq!(case.assigned_to(), &[Role::IccHead]);

    let case = step(
        &case,
        Role::IccHead,
        ActionKind::FinalDecision,
        Payload::text("Referred").with_disposition(Disposition::ExternalAuthority),
    );
    assert_eq!(case.status().code(), "closed_external_authority");
}

#[test]
fn satisfied_complainant_resolves_with_action_taken_label() {
    let case = step(&drafted_complaint(), Role::IccHead, ActionKind::Resolve, Payload::text("Apology issued"));
    let case = step(&case, Role::Employee, ActionKind::Acknowledge, ack(Satisfaction::Satisfied));
    assert_eq!(case.status(), Status::Resolved);
    assert_eq!(case.status_label(), "Resolved (Action Taken)");
}

#[test]
fn withdrawal_is_its_own_request_and_decision_machine() {
    let case = step(&complaint(), Role::IccHead, ActionKind::BeginReview, Payload::default());
    let case = step(&case, Role::Employee, ActionKind::RequestWithdrawal, Payload::text("Resolved informally"));
    assert_eq!(case.status(), Status::PendingWithdrawal);
    assert_eq!(case.trail().last().event.visibility, Visibility::Internal);

    let case = step(
        &case,
        Role::IccHead,
        ActionKind::DecideWithdrawal,
        Payload::text("Need to confirm no coercion").with_decision(Decision::Deny),
    );
    assert_eq!(case.status(), Status::UnderPreliminaryReview);
    assert_eq!(case.trail().last().event.event, "Withdrawal Request Denied");

    let external = CaseView::external(&case);
    assert!(external.events.iter().all(|e| e.visibility == Visibility::External));
    assert!(!external.events.iter().any(|e| e.event == "Withdrawal Requested by Complainant"));
    assert!(!external.responses.contains_key(&ResponseField::ComplainantRequest));
    assert!(CaseView::internal(&case).responses.contains_key(&ResponseField::ComplainantRequest));

    let case = step(&case, Role::Employee, ActionKind::RequestWithdrawal, Payload::text("Confirmed"));
    let case = step(
        &case,
        Role::IccHead,
        ActionKind::DecideWithdrawal,
        Payload::text("Approved").with_decision(Decision::Approve),
    );
    assert_eq!(case.status(), Status::Closed(Closure::Withdrawn));
}

#[test]
fn conciliation_approval_closes_case() {
    let case = step(&complaint(), Role::Employee, ActionKind::RequestConciliation, Payload::text("Open to mediation"));
    assert_eq!(case.status(), Status::PendingConciliation);
    let case = step(
        &case,
        Role::IccHead,
        ActionKind::DecideConciliation,
        Payload::text("Mediator booked").with_decision(Decision::Approve),
    );
    assert_eq!(case.status().code(), "closed_conciliated");
}

#[test]
fn assignment_is_projected_from_assign_events() {
    let case = complaint();
    let err = act(&case, Role::IccHead, ActionKind::Assign, Payload::default().with_roles([Role::Employee]))
        .unwrap_err();
    assert!(matches!(err, WorkflowError::ValidationFailure { field: "roles", .. }));

    let applied = act(
        &case,
        Role::IccHead,
        ActionKind::Assign,
        Payload::text("Needs a second reviewer").with_roles([Role::IccMember]),
    )
    .unwrap();
    assert_eq!(
        applied.event.event.details.as_deref(),
        Some("Case Assigned for: ICC Member. Note: \"Needs a second reviewer\"")
    );
    let case = applied.case;
    assert_eq!(case.assigned_to(), &[Role::IccHead, Role::IccMember]);

    let case = step(&case, Role::IccMember, ActionKind::AddNote, Payload::text("Witness list drafted"));
    assert_eq!(case.status(), Status::New);
    assert_eq!(case.trail().last().event.visibility, Visibility::Internal);

    let err = act(
        &case,
        Role::IccHead,
        ActionKind::Unassign,
        Payload::default().with_roles([Role::IccHead, Role::IccMember]),
    )
    .unwrap_err();
    assert!(matches!(err, WorkflowError::ValidationFailure { field: "roles", .. }));

    let case = step(&case, Role::IccHead, ActionKind::Unassign, Payload::default().with_roles([Role::IccMember]));
    assert_eq!(case.assigned_to(), &[Role::IccHead]);
    let err = act(&case, Role::IccMember, ActionKind::AddNote, Payload::text("late note")).unwrap_err();
    assert!(matches!(err, WorkflowError::UnauthorizedTransition { denial: Denial::NotAssigned, .. }));
}

#[test]
fn icc_head_cannot_be_unassigned_and_keeps_the_case_moving() {
    let case = step(&complaint(), Role::IccHead, ActionKind::Assign, Payload::default().with_roles([Role::IccMember]));
    let err = act(&case, Role::IccHead, ActionKind::Unassign, Payload::default().with_roles([Role::IccHead]))
        .unwrap_err();
    assert!(matches!(err, WorkflowError::ValidationFailure { field: "roles", .. }));
    assert_eq!(case.assigned_to(), &[Role::IccHead, Role::IccMember]);

    let err = act(&case, Role::IccMember, ActionKind::BeginReview, Payload::default()).unwrap_err();
    assert!(matches!(err, WorkflowError::UnauthorizedTransition { denial: Denial::WrongRole, .. }));
    assert!(can_act(&case, &actor(Role::IccHead), ActionKind::BeginReview).unwrap());
}

#[test]
fn dissatisfied_complainant_leaves_the_icc_head_assigned() {
    let case = step(&drafted_complaint(), Role::IccHead, ActionKind::Assign, Payload::default().with_roles([Role::HrHead]));
    let case = step(&case, Role::IccHead, ActionKind::Resolve, Payload::text("Written warning"));
    let err = act(&case, Role::IccHead, ActionKind::Unassign, Payload::default().with_roles([Role::IccHead]))
        .unwrap_err();
    assert!(matches!(err, WorkflowError::ValidationFailure { field: "roles", .. }));

    let case = step(&case, Role::Employee, ActionKind::Acknowledge, ack(Satisfaction::Dissatisfied));
    assert_eq!(case.status(), Status::PendingFinalDisposition);
    assert_eq!(case.assigned_to(), &[Role::IccHead, Role::HrHead]);
}

#[test]
fn external_view_keeps_the_last_published_notes() {
    let case = step(&complaint(), Role::IccHead, ActionKind::BeginReview, Payload::default());
    let case = step(&case, Role::IccHead, ActionKind::AdvanceInquiry, Payload::text("Inquiry committee formed"));
    let case = step(&case, Role::IccHead, ActionKind::AddNote, Payload::text("Witness B unreliable"));
    assert_eq!(case.response(ResponseField::ReviewNotes), Some("Witness B unreliable"));

    let internal = CaseView::internal(&case);
    let external = CaseView::external(&case);
    assert_eq!(
        internal.responses.get(&ResponseField::ReviewNotes).map(String::as_str),
        Some("Witness B unreliable")
    );
    assert_eq!(
        external.responses.get(&ResponseField::ReviewNotes).map(String::as_str),
        Some("Inquiry committee formed")
    );
}

#[test]
fn notes_can_be_published_to_the_complainant() {
    let case = step(
        &complaint(),
        Role::IccHead,
        ActionKind::AddNote,
        Payload::text("Hearing moved to Friday").with_visibility(Visibility::External),
    );
    let external = CaseView::external(&case);
    assert_eq!(external.events.last().map(|e| e.event.as_str()), Some("Internal Note Added"));
}

// ----------------------------
// Properties
// ----------------------------

const ACTORS: [Role; 7] = [
    Role::Supervisor,
    Role::Employee,
    Role::AreaManager,
    Role::Manager,
    Role::HrHead,
    Role::IccHead,
    Role::IccMember,
];
const SATISFACTIONS: [Satisfaction; 3] =
    [Satisfaction::Satisfied, Satisfaction::PartiallySatisfied, Satisfaction::Dissatisfied];
const DISPOSITIONS: [Disposition; 4] = [
    Disposition::Ombudsman,
    Disposition::GrievanceOffice,
    Disposition::LogAndClose,
    Disposition::ExternalAuthority,
];
const ASSIGNABLE: [Role; 3] = [Role::IccHead, Role::IccMember, Role::HrHead];

type Step = (bool, usize, usize, usize, usize, bool, usize, usize, bool);

fn request_for(case: &CaseRecord, s: Step) -> ActionRequest {
    let (guided, pick, actor_idx, action_idx, sat, approve, disp, role_idx, with_text) = s;
    let mut choice = None;
    if guided {
        let rules: Vec<_> = case.table().actions_from(case.status()).collect();
        if !rules.is_empty() {
            let rule = rules[pick % rules.len()];
            choice = Some((rule.roles[pick % rule.roles.len()], rule.action));
        }
    }
    let (role, action) =
        choice.unwrap_or((ACTORS[actor_idx % ACTORS.len()], ActionKind::ALL[action_idx % ActionKind::ALL.len()]));

    let mut payload = Payload::default()
        .with_satisfaction(SATISFACTIONS[sat % 3])
        .with_decision(if approve { Decision::Approve } else { Decision::Deny })
        .with_disposition(DISPOSITIONS[disp % 4])
        .with_roles([ASSIGNABLE[role_idx % 3]]);
    if with_text {
        payload = payload.with_text("details");
    }
    ActionRequest::new(actor(role), action, payload)
}

proptest! {
    #[test]
    fn random_sequences_keep_trail_and_status_consistent(
        kind_idx in 0usize..3,
        steps in prop::collection::vec(
            (any::<bool>(), 0usize..64, 0usize..7, 0usize..21, 0usize..3, any::<bool>(), 0usize..4, 0usize..3, any::<bool>()),
            0..40,
        ),
    ) {
        let mut case = match CaseKind::ALL[kind_idx] {
            CaseKind::CriticalInsight => insight(),
            CaseKind::DeclinedRecommendation => declined(),
            CaseKind::Complaint => complaint(),
        };

        for (i, s) in steps.into_iter().enumerate() {
            let before = case.clone();
            match apply(&before, request_for(&before, s), at(i as i64 + 1)) {
                Ok(applied) => {
                    prop_assert!(!before.is_terminal());
                    prop_assert_eq!(applied.case.trail().len(), before.trail().len() + 1);
                    prop_assert_eq!(
                        &applied.case.trail().records()[..before.trail().len()],
                        before.trail().records()
                    );
                    let replayed = CaseRecord::replay(applied.case.trail().clone()).unwrap();
                    prop_assert_eq!(replayed.status(), applied.case.status());
                    prop_assert_eq!(replayed.assigned_to(), applied.case.assigned_to());
                    if !applied.case.is_terminal() {
                        prop_assert!(!applied.case.assigned_to().is_empty());
                    }
                    if let Some(child) = &applied.spawned {
                        prop_assert_eq!(child.parent_case_id(), Some(before.id()));
                        prop_assert_eq!(applied.case.status(), before.status());
                    }
                    case = applied.case;
                }
                Err(e) => {
                    if before.is_terminal() {
                        let is_terminal_violation = matches!(e, WorkflowError::TerminalStateViolation { .. });
                        prop_assert!(is_terminal_violation);
                    }
                    prop_assert!(!matches!(e, WorkflowError::CorruptTrail(_)));
                }
            }
        }
    }
}
