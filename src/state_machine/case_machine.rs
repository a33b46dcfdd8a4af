//! Pure transition table for the case lifecycle.
//!
//! Given a current status and an event, either the target status or a
//! state-conflict error. No I/O here; the lifecycle manager resolves current
//! state from the store, consults this table, then commits with a
//! version-guarded write.

use uuid::Uuid;

use super::events::CaseEvent;
use super::states::CaseStatus;
use crate::error::{CoreError, EntityKind, Result};

/// Determine the target case status for an event, or a state conflict.
///
/// Cancelling an already-cancelled case maps to `Cancelled` again; the
/// lifecycle manager treats that as an idempotent no-op rather than a write.
pub fn case_target_state(
    case_id: Uuid,
    current: CaseStatus,
    event: &CaseEvent,
) -> Result<CaseStatus> {
    let target = match (current, event) {
        (CaseStatus::Draft, CaseEvent::Submit) => CaseStatus::Submitted,
        (CaseStatus::Submitted, CaseEvent::BeginReview) => CaseStatus::Review,
        (CaseStatus::Review, CaseEvent::Approve) => CaseStatus::Approved,
        (CaseStatus::Review, CaseEvent::Reject) => CaseStatus::Rejected,
        (CaseStatus::Rejected, CaseEvent::Reopen) => CaseStatus::Draft,
        (CaseStatus::Approved, CaseEvent::Close) => CaseStatus::Closed,

        // Cancel is allowed from any non-closed state; idempotent on Cancelled
        (CaseStatus::Closed, CaseEvent::Cancel(_)) => {
            return Err(CoreError::state_conflict(
                EntityKind::Case,
                case_id,
                "a non-closed status",
                current.to_string(),
            ))
        }
        (_, CaseEvent::Cancel(_)) => CaseStatus::Cancelled,

        (from, event) => {
            return Err(CoreError::state_conflict(
                EntityKind::Case,
                case_id,
                format!("a status accepting '{}'", event.event_type()),
                from.to_string(),
            ))
        }
    };

    Ok(target)
}
