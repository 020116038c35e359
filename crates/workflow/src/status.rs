//! Shared status vocabulary. Each case kind uses its own subset.

use caseflow_audit_spec::{Disposition, Role};
use std::fmt;

/// Closed (terminal) variants.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Closure {
    Disposition(Disposition),
    Declined,
    PlanMandated,
    Withdrawn,
    Conciliated,
    NoActionRequired,
}

impl Closure {
    pub fn slug(&self) -> &'static str {
        match self {
            Closure::Disposition(d) => d.slug(),
            Closure::Declined => "declined",
            Closure::PlanMandated => "plan_mandated",
            Closure::Withdrawn => "withdrawn",
            Closure::Conciliated => "conciliated",
            Closure::NoActionRequired => "no_action",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Closure::Disposition(d) => d.label(),
            Closure::Declined => "Closed - Recommendation Declined",
            Closure::PlanMandated => "Closed - Development Plan Mandated",
            Closure::Withdrawn => "Closed - Withdrawn by Complainant",
            Closure::Conciliated => "Closed - Resolved through Conciliation",
            Closure::NoActionRequired => "Closed - No Action Required",
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Status {
    Open,
    New,
    /// Waiting for `by` to accept or escalate what the `after` tier did.
    PendingAcknowledgement { by: Role, after: Role },
    PendingAmReview,
    PendingSupervisorRetry,
    PendingManagerReview,
    PendingHrReview,
    PendingFinalHrAction,
    PendingManagerAcknowledgement,
    UnderPreliminaryReview,
    InquiryInitiated,
    EvidenceReview,
    HearingScheduled,
    ReportDrafted,
    PendingWithdrawal,
    PendingConciliation,
    PendingFinalDisposition,
    Resolved,
    Closed(Closure),
}

impl Status {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Status::Resolved | Status::Closed(_))
    }

    /// Machine code, e.g. `pending_employee_acknowledgement` or `closed_ombudsman`.
    /// The responding tier of an acknowledgement is not part of the code.
    pub fn code(&self) -> String {
        let fixed = match self {
            Status::PendingAcknowledgement { by, .. } => {
                return format!("pending_{}_acknowledgement", by.slug())
            }
            Status::Closed(c) => return format!("closed_{}", c.slug()),
            Status::Open => "open",
            Status::New => "new",
            Status::PendingAmReview => "pending_am_review",
            Status::PendingSupervisorRetry => "pending_supervisor_retry",
            Status::PendingManagerReview => "pending_manager_review",
            Status::PendingHrReview => "pending_hr_review",
            Status::PendingFinalHrAction => "pending_final_hr_action",
            Status::PendingManagerAcknowledgement => "pending_manager_acknowledgement",
            Status::UnderPreliminaryReview => "under_preliminary_review",
            Status::InquiryInitiated => "inquiry_initiated",
            Status::EvidenceReview => "evidence_review",
            Status::HearingScheduled => "hearing_scheduled",
            Status::ReportDrafted => "report_drafted",
            Status::PendingWithdrawal => "pending_withdrawal",
            Status::PendingConciliation => "pending_conciliation",
            Status::PendingFinalDisposition => "pending_final_disposition",
            Status::Resolved => "resolved",
        };
        fixed.to_string()
    }

    pub fn label(&self) -> String {
        let fixed = match self {
            Status::PendingAcknowledgement { by, after } => {
                return format!("Pending {} Acknowledgement ({} response)", by.label(), after.label())
            }
            Status::Closed(c) => c.label(),
            Status::Open => "Open",
            Status::New => "New",
            Status::PendingAmReview => "Pending AM Review",
            Status::PendingSupervisorRetry => "Pending Supervisor Retry",
            Status::PendingManagerReview => "Pending Manager Review",
            Status::PendingHrReview => "Pending HR Review",
            Status::PendingFinalHrAction => "Pending Final HR Action",
            Status::PendingManagerAcknowledgement => "Pending Manager Acknowledgement",
            Status::UnderPreliminaryReview => "Under Preliminary Review",
            Status::InquiryInitiated => "Inquiry Initiated",
            Status::EvidenceReview => "Evidence Review",
            Status::HearingScheduled => "Hearing Scheduled",
            Status::ReportDrafted => "Report Drafted",
            Status::PendingWithdrawal => "Pending Withdrawal",
            Status::PendingConciliation => "Pending Conciliation",
            Status::PendingFinalDisposition => "Pending Final Disposition",
            Status::Resolved => "Resolved",
        };
        fixed.to_string()
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.code())
    }
}
