use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::state_machine::ApprovalStatus;

/// An approval gate on a case, with an SLA deadline and escalation level.
///
/// Terminal on Approved/Rejected/Cancelled; the record is retained for audit
/// and never physically deleted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Approval {
    pub id: Uuid,
    pub case_id: Uuid,
    pub approver_id: Uuid,
    pub requester_id: Uuid,
    /// How many times this approval has been reassigned upward
    pub escalation_level: u32,
    pub status: ApprovalStatus,
    pub requested_at: DateTime<Utc>,
    /// `requested_at + approval_sla_hours`, recomputed on escalation
    pub sla_deadline: DateTime<Utc>,
    pub reminder_count: u32,
    pub last_reminder_at: Option<DateTime<Utc>>,
    pub resolved_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Optimistic-concurrency token, bumped by the store on every write
    pub version: u64,
}

impl Approval {
    pub fn new(
        case_id: Uuid,
        approver_id: Uuid,
        requester_id: Uuid,
        now: DateTime<Utc>,
        sla_hours: u32,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            case_id,
            approver_id,
            requester_id,
            escalation_level: 0,
            status: ApprovalStatus::Pending,
            requested_at: now,
            sla_deadline: now + Duration::hours(i64::from(sla_hours)),
            reminder_count: 0,
            last_reminder_at: None,
            resolved_at: None,
            created_at: now,
            updated_at: now,
            version: 0,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Pending and past its SLA deadline
    pub fn is_past_deadline(&self, now: DateTime<Utc>) -> bool {
        self.status == ApprovalStatus::Pending && now > self.sla_deadline
    }

    /// Pending, past the reminder threshold, and outside the re-reminder
    /// cooldown. Deliberately indifferent to the SLA deadline: when the
    /// sweep can escalate it does so instead, and when it cannot (disabled,
    /// max level) an overdue approval keeps getting reminders.
    pub fn reminder_due(
        &self,
        now: DateTime<Utc>,
        reminder_after: Duration,
        cooldown: Duration,
    ) -> bool {
        if self.status != ApprovalStatus::Pending || now <= self.requested_at + reminder_after {
            return false;
        }
        match self.last_reminder_at {
            Some(last) => now - last >= cooldown,
            None => true,
        }
    }
}
