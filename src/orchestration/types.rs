//! Shared types for the orchestration managers.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Who is performing a transition. Role checks come first; ownership checks
/// (requester of this case, owner of this match) follow against the record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub id: Uuid,
    pub role: ActorRole,
}

impl Actor {
    pub fn new(id: Uuid, role: ActorRole) -> Self {
        Self { id, role }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActorRole {
    /// Creates cases, selects and approves matches
    Requester,
    /// Accountable for a catalog table; validates or redirects matches
    Owner,
    /// Reviews and approves/rejects cases
    Approver,
    /// Governance curator; may mark approved variables as in use
    Curator,
}

/// How far a case cancellation cascades into its variables
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CancelScope {
    /// Leave Approved/InUse variables untouched
    #[default]
    ActiveOnly,
    /// Also cancel Approved/InUse variables
    IncludeApproved,
}

/// Result of a successful transition: the new entity state plus a
/// human-readable message suitable for direct user display.
#[derive(Debug, Clone, Serialize)]
pub struct TransitionOutcome<T> {
    pub entity: T,
    pub message: String,
}

impl<T> TransitionOutcome<T> {
    pub fn new(entity: T, message: impl Into<String>) -> Self {
        Self {
            entity,
            message: message.into(),
        }
    }
}

/// One failed item inside a batch
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BulkFailure {
    pub id: Uuid,
    pub reason: String,
}

/// Aggregated outcome of a batch operation. The batch as a whole succeeds
/// even when individual items fail; failures are enumerated per item.
/// `eligible` differs from `requested` when a pre-filter narrowed the input
/// set (bulk approve).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BulkOutcome {
    pub requested: usize,
    pub eligible: usize,
    pub succeeded: Vec<Uuid>,
    pub failed: Vec<BulkFailure>,
}

impl BulkOutcome {
    pub fn new(requested: usize, eligible: usize) -> Self {
        Self {
            requested,
            eligible,
            succeeded: Vec::new(),
            failed: Vec::new(),
        }
    }

    pub fn record_success(&mut self, id: Uuid) {
        self.succeeded.push(id);
    }

    pub fn record_failure(&mut self, id: Uuid, reason: impl Into<String>) {
        self.failed.push(BulkFailure {
            id,
            reason: reason.into(),
        });
    }
}
