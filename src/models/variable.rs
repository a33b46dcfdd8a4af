use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::state_machine::VariableSearchStatus;

/// Business priority assigned to a variable by the requester
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Low,
    Medium,
    High,
    Critical,
}

impl Default for Priority {
    fn default() -> Self {
        Self::Medium
    }
}

/// One data need within a case, matched to the catalog independently.
///
/// Created with its case; independently cancellable. `selected_match_id`
/// enforces the one-selected-match-at-a-time rule together with the
/// match resolution engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Variable {
    pub id: Uuid,
    pub case_id: Uuid,
    pub name: String,
    pub data_type: String,
    pub concept: String,
    pub desired_lag: Option<String>,
    pub priority: Priority,
    pub search_status: VariableSearchStatus,
    pub is_cancelled: bool,
    pub cancellation_reason: Option<String>,
    pub selected_match_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Optimistic-concurrency token, bumped by the store on every write
    pub version: u64,
}

impl Variable {
    pub fn new(
        case_id: Uuid,
        name: impl Into<String>,
        data_type: impl Into<String>,
        concept: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            case_id,
            name: name.into(),
            data_type: data_type.into(),
            concept: concept.into(),
            desired_lag: None,
            priority: Priority::default(),
            search_status: VariableSearchStatus::default(),
            is_cancelled: false,
            cancellation_reason: None,
            selected_match_id: None,
            created_at: now,
            updated_at: now,
            version: 0,
        }
    }

    /// Active means not cancelled; only active variables count toward case close
    pub fn is_active(&self) -> bool {
        !self.is_cancelled
    }

    /// Whether this variable still blocks its case from closing
    pub fn blocks_close(&self) -> bool {
        self.is_active() && !self.search_status.is_satisfied()
    }
}
