use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::services::CatalogCandidate;
use crate::state_machine::MatchStatus;

/// A candidate binding between a variable and a catalog table.
///
/// Many matches per variable; at most one is selected at a time. A match
/// rejected by the requester is never reused — rework creates a fresh match
/// carrying the incremented loop counter and the rejection note.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableMatch {
    pub id: Uuid,
    pub variable_id: Uuid,
    /// Catalog identifier of the candidate table (e.g. `RISK.PD_MONTHLY`)
    pub table_id: String,
    /// Person accountable for the candidate table; reassigned on delegation
    pub owner_id: Uuid,
    /// Ranking score in [0, 1] from the catalog search
    pub score: f64,
    pub status: MatchStatus,
    pub rationale: String,
    pub matched_columns: Vec<String>,
    /// Criteria the owner attached when confirming the match
    pub usage_criteria: Option<String>,
    /// How many times the owner/requester loop has rejected this binding
    pub loop_count: u32,
    pub rejection_note: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Optimistic-concurrency token, bumped by the store on every write
    pub version: u64,
}

impl TableMatch {
    /// Build a suggested match from a catalog search candidate.
    pub fn from_candidate(variable_id: Uuid, candidate: CatalogCandidate, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            variable_id,
            table_id: candidate.table_id,
            owner_id: candidate.owner_id,
            score: candidate.score.clamp(0.0, 1.0),
            status: MatchStatus::Suggested,
            rationale: candidate.rationale,
            matched_columns: candidate.matched_columns,
            usage_criteria: None,
            loop_count: 0,
            rejection_note: None,
            created_at: now,
            updated_at: now,
            version: 0,
        }
    }

    /// Clone a rejected match into a fresh owner-pending one for rework,
    /// preserving table, owner and score, carrying the loop count forward.
    pub fn rework(&self, rejection_note: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            variable_id: self.variable_id,
            table_id: self.table_id.clone(),
            owner_id: self.owner_id,
            score: self.score,
            status: MatchStatus::PendingOwner,
            rationale: self.rationale.clone(),
            matched_columns: self.matched_columns.clone(),
            usage_criteria: None,
            loop_count: self.loop_count + 1,
            rejection_note: Some(rejection_note.into()),
            created_at: now,
            updated_at: now,
            version: 0,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }
}
