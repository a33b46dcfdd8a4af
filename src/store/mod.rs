//! Versioned entity store.
//!
//! Durable storage is an external collaborator; the core only assumes
//! versioned reads and check-and-set writes per entity behind [`EntityStore`],
//! plus an append-only audit log of transitions and structured responses.
//! Every `update_*` takes the version the caller read; a mismatch at write
//! time is surfaced as a state conflict so the caller can refetch and retry.
//! [`memory::InMemoryStore`] is the reference implementation used for
//! embedding and tests.

pub mod memory;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{EntityKind, Result};
use crate::models::{Approval, Case, Involvement, ResponseRecord, TableMatch, Variable};

pub use memory::InMemoryStore;

/// Append-only audit record of a single state transition
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransitionRecord {
    pub id: Uuid,
    pub entity_kind: EntityKind,
    pub entity_id: Uuid,
    pub from_state: Option<String>,
    pub to_state: String,
    pub event: String,
    pub actor_id: Option<Uuid>,
    pub occurred_at: DateTime<Utc>,
}

impl TransitionRecord {
    pub fn new(
        entity_kind: EntityKind,
        entity_id: Uuid,
        from_state: Option<String>,
        to_state: impl Into<String>,
        event: impl Into<String>,
        actor_id: Option<Uuid>,
        occurred_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            entity_kind,
            entity_id,
            from_state,
            to_state: to_state.into(),
            event: event.into(),
            actor_id,
            occurred_at,
        }
    }
}

/// Versioned reads and check-and-set writes for all five entities.
///
/// Inserts reject duplicate ids. Updates succeed only when the stored version
/// equals `expected_version`; the stored version is then bumped and the
/// updated record returned. Nothing is ever deleted.
#[async_trait]
pub trait EntityStore: Send + Sync {
    // Cases
    async fn insert_case(&self, case: Case) -> Result<Case>;
    async fn get_case(&self, id: Uuid) -> Result<Case>;
    async fn update_case(&self, case: Case, expected_version: u64) -> Result<Case>;

    // Variables
    async fn insert_variable(&self, variable: Variable) -> Result<Variable>;
    async fn get_variable(&self, id: Uuid) -> Result<Variable>;
    async fn update_variable(&self, variable: Variable, expected_version: u64) -> Result<Variable>;
    async fn variables_for_case(&self, case_id: Uuid) -> Result<Vec<Variable>>;

    // Matches
    async fn get_match(&self, id: Uuid) -> Result<TableMatch>;
    async fn update_match(&self, m: TableMatch, expected_version: u64) -> Result<TableMatch>;
    /// Insert a whole candidate set atomically; partial writes are never
    /// visible to readers
    async fn insert_matches(&self, matches: Vec<TableMatch>) -> Result<()>;
    async fn matches_for_variable(&self, variable_id: Uuid) -> Result<Vec<TableMatch>>;

    // Involvements
    async fn insert_involvement(&self, involvement: Involvement) -> Result<Involvement>;
    async fn get_involvement(&self, id: Uuid) -> Result<Involvement>;
    async fn update_involvement(
        &self,
        involvement: Involvement,
        expected_version: u64,
    ) -> Result<Involvement>;
    async fn involvement_for_variable(&self, variable_id: Uuid) -> Result<Option<Involvement>>;
    /// All involvements not yet completed
    async fn list_open_involvements(&self) -> Result<Vec<Involvement>>;

    // Approvals
    async fn insert_approval(&self, approval: Approval) -> Result<Approval>;
    async fn get_approval(&self, id: Uuid) -> Result<Approval>;
    async fn update_approval(&self, approval: Approval, expected_version: u64) -> Result<Approval>;
    async fn open_approval_for_case(&self, case_id: Uuid) -> Result<Option<Approval>>;
    async fn list_pending_approvals(&self) -> Result<Vec<Approval>>;

    // Audit
    async fn append_transition(&self, record: TransitionRecord) -> Result<()>;
    async fn append_response(&self, record: ResponseRecord) -> Result<()>;
    async fn transitions_for(&self, kind: EntityKind, entity_id: Uuid)
        -> Result<Vec<TransitionRecord>>;
    async fn responses_for_match(&self, match_id: Uuid) -> Result<Vec<ResponseRecord>>;
}
