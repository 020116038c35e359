//! Concrete case kinds. Tables are built once and shared read-only.

pub mod complaint;
pub mod critical_insight;
pub mod declined_recommendation;

use crate::table::TransitionTable;
use caseflow_audit_spec::CaseKind;
use std::sync::OnceLock;

static CRITICAL_INSIGHT: OnceLock<TransitionTable> = OnceLock::new();
static DECLINED_RECOMMENDATION: OnceLock<TransitionTable> = OnceLock::new();
static COMPLAINT: OnceLock<TransitionTable> = OnceLock::new();

pub fn table_for(kind: CaseKind) -> &'static TransitionTable {
    match kind {
        CaseKind::CriticalInsight => CRITICAL_INSIGHT.get_or_init(critical_insight::table),
        CaseKind::DeclinedRecommendation => {
            DECLINED_RECOMMENDATION.get_or_init(declined_recommendation::table)
        }
        CaseKind::Complaint => COMPLAINT.get_or_init(complaint::table),
    }
}
