use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::state_machine::CaseStatus;

/// A top-level data request with its own approval lifecycle.
///
/// Owned by the requester; mutated by the requester (submit/cancel/reopen)
/// and the approver (review/approve/reject/close). Never physically deleted,
/// only transitioned to a terminal status.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Case {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub status: CaseStatus,
    pub requester_id: Uuid,
    pub approver_id: Uuid,
    pub variable_ids: Vec<Uuid>,
    pub cancellation_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Optimistic-concurrency token, bumped by the store on every write
    pub version: u64,
}

impl Case {
    pub fn new(
        title: impl Into<String>,
        requester_id: Uuid,
        approver_id: Uuid,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            title: title.into(),
            description: None,
            status: CaseStatus::default(),
            requester_id,
            approver_id,
            variable_ids: Vec::new(),
            cancellation_reason: None,
            created_at: now,
            updated_at: now,
            version: 0,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }
}
