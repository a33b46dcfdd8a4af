//! Orchestration managers for the intake workflow.
//!
//! One manager per coupled concern: case lifecycle, match resolution,
//! involvement tracking, approval escalation, bulk operations, and the
//! pull-based progress queries. Managers share the versioned store and the
//! event publisher; every transition is a single atomic read-modify-write
//! guarded by expected prior state.

pub mod bulk;
pub mod case_lifecycle;
pub mod escalation;
pub mod involvement_tracker;
pub mod match_resolution;
pub mod progress;
pub mod types;

pub use bulk::{bulk_apply, BulkOperationCoordinator};
pub use case_lifecycle::{CaseLifecycleManager, VariableSpec};
pub use escalation::{ApprovalEscalationScheduler, SweepReport};
pub use involvement_tracker::InvolvementTracker;
pub use match_resolution::{MatchResolutionEngine, SearchOutcome};
pub use progress::{
    ApprovalSummary, CaseProgress, InvolvementSummary, ProgressQueries, VariableProgress,
};
pub use types::{Actor, ActorRole, BulkFailure, BulkOutcome, CancelScope, TransitionOutcome};
