//! caseflow_workflow
//!
//! Escalation case workflow engine.
//!
//! Layout:
//! - `status` / `table` / `ack_loop`: declarative transition tables
//! - `kinds`: the three case kinds built from those tables
//! - `record`: the case projection, rebuilt from its trail only
//! - `guard` + `engine`: the single mutation path
//! - `view`: read-only snapshots for reporting surfaces

pub mod ack_loop;
pub mod engine;
pub mod error;
pub mod guard;
pub mod kinds;
pub mod payload;
pub mod record;
pub mod status;
pub mod table;
pub mod view;

#[cfg(test)]
mod tests;

pub use engine::{apply, open_case, Applied, OpenCase};
pub use error::{Denial, WorkflowError};
pub use guard::{authorize, can_act};
pub use kinds::table_for;
pub use payload::{ActionRequest, Payload};
pub use record::CaseRecord;
pub use status::{Closure, Status};
pub use table::{ResponseField, SideEffectHint, TransitionRule, TransitionTable};
pub use view::{CaseSummary, CaseView};
