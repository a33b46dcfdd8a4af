// State machine layer for the intake workflow.
//
// Status enums for the five workflow entities plus the pure case transition
// table. Managers in `orchestration` resolve current state, consult these
// tables, then commit through the versioned store.

pub mod case_machine;
pub mod events;
pub mod states;

pub use case_machine::case_target_state;
pub use events::CaseEvent;
pub use states::{
    ApprovalStatus, CaseStatus, InvolvementStatus, MatchStatus, VariableSearchStatus,
};
