#![allow(clippy::missing_errors_doc)] // Allow public functions without # Errors sections
#![allow(clippy::must_use_candidate)] // Allow methods without must_use when context is clear

//! # caseflow-core
//!
//! Workflow state-machine core for a case-intake and data-governance portal.
//!
//! ## Overview
//!
//! Requesters submit **cases** describing a business need and decompose them
//! into **variables** (individual data requirements). The engine matches each
//! variable to a catalog table, routes the **match** to the table's owner for
//! validation, and tracks data-creation requests (**involvements**) when no
//! table exists. **Approvals** gate case review with SLA deadlines, reminders
//! and escalation.
//!
//! ## Architecture
//!
//! Five coupled entities, each mutated by a different actor, move through
//! their lifecycles via version-guarded check-and-set writes: a transition is
//! applied only if the entity still carries the state the caller read, so
//! concurrent actors surface a state conflict instead of silently
//! overwriting each other. A low-frequency background sweep handles SLA
//! escalation and overdue reminders; batch operations degrade gracefully
//! under partial failure.
//!
//! ## Module Organization
//!
//! - [`models`] - Entity records: case, variable, match, involvement, approval
//! - [`state_machine`] - Status enums and the pure case transition table
//! - [`store`] - Versioned entity store trait and in-memory implementation
//! - [`orchestration`] - Lifecycle managers, escalation sweep, bulk ops, queries
//! - [`services`] - External collaborator traits (catalog, directory, notifications)
//! - [`events`] - Broadcast channel of committed transition events
//! - [`config`] - SLA and escalation configuration
//! - [`error`] - Structured error taxonomy
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use caseflow_core::config::SystemConfig;
//! use caseflow_core::events::EventPublisher;
//! use caseflow_core::orchestration::{Actor, ActorRole, CaseLifecycleManager};
//! use caseflow_core::store::InMemoryStore;
//! use uuid::Uuid;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = Arc::new(SystemConfig::default());
//! let store = Arc::new(InMemoryStore::new());
//! let publisher = EventPublisher::new(config.event_channel_capacity);
//! let cases = CaseLifecycleManager::new(store, publisher, config);
//!
//! let requester = Actor::new(Uuid::new_v4(), ActorRole::Requester);
//! let outcome = cases
//!     .create_case("Quarterly credit review", None, requester.id, Uuid::new_v4(), vec![])
//!     .await?;
//! let outcome = cases.submit(outcome.entity.id, &requester).await?;
//! println!("{}", outcome.message);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod events;
pub mod logging;
pub mod models;
pub mod orchestration;
pub mod services;
pub mod state_machine;
pub mod store;

pub use config::SystemConfig;
pub use error::{CoreError, EntityKind, Result};
pub use events::{EventPublisher, WorkflowEvent};
pub use models::{Approval, Case, Involvement, TableMatch, Variable};
pub use orchestration::{
    Actor, ActorRole, ApprovalEscalationScheduler, BulkOperationCoordinator, BulkOutcome,
    CancelScope, CaseLifecycleManager, InvolvementTracker, MatchResolutionEngine, ProgressQueries,
    TransitionOutcome,
};
pub use state_machine::{
    ApprovalStatus, CaseStatus, InvolvementStatus, MatchStatus, VariableSearchStatus,
};
pub use store::{EntityStore, InMemoryStore, TransitionRecord};
