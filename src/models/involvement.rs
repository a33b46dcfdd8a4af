use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::state_machine::InvolvementStatus;

/// A tracked request to create data that does not yet exist.
///
/// Overdue is a derived predicate over `expected_completion_date` and the
/// caller-supplied clock, never a stored status; the stored status only moves
/// Pending → InProgress → Completed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Involvement {
    pub id: Uuid,
    pub variable_id: Uuid,
    /// Ticket number in the external request system (e.g. `INC0012345`)
    pub external_request_number: String,
    pub external_system: Option<String>,
    pub requester_id: Uuid,
    pub owner_id: Uuid,
    pub status: InvolvementStatus,
    pub expected_completion_date: Option<DateTime<Utc>>,
    pub actual_completion_date: Option<DateTime<Utc>>,
    pub created_table_name: Option<String>,
    pub created_concept: Option<String>,
    pub notes: Vec<String>,
    pub reminder_count: u32,
    pub last_reminder_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Optimistic-concurrency token, bumped by the store on every write
    pub version: u64,
}

impl Involvement {
    pub fn new(
        variable_id: Uuid,
        external_request_number: impl Into<String>,
        requester_id: Uuid,
        owner_id: Uuid,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            variable_id,
            external_request_number: external_request_number.into(),
            external_system: None,
            requester_id,
            owner_id,
            status: InvolvementStatus::default(),
            expected_completion_date: None,
            actual_completion_date: None,
            created_table_name: None,
            created_concept: None,
            notes: Vec::new(),
            reminder_count: 0,
            last_reminder_at: None,
            created_at: now,
            updated_at: now,
            version: 0,
        }
    }

    /// `status != Completed && now > expected_completion_date`
    pub fn is_overdue(&self, now: DateTime<Utc>) -> bool {
        match self.expected_completion_date {
            Some(expected) => self.status != InvolvementStatus::Completed && now > expected,
            None => false,
        }
    }

    /// Whole days past the expected completion date; 0 whenever not overdue
    pub fn days_overdue(&self, now: DateTime<Utc>) -> i64 {
        match self.expected_completion_date {
            Some(expected) if self.is_overdue(now) => (now - expected).num_days(),
            _ => 0,
        }
    }

    /// Whole days until the expected completion date, when one is set and
    /// the involvement is neither completed nor overdue
    pub fn days_until_due(&self, now: DateTime<Utc>) -> Option<i64> {
        let expected = self.expected_completion_date?;
        if self.status == InvolvementStatus::Completed || self.is_overdue(now) {
            return None;
        }
        Some((expected - now).num_days())
    }

    /// Whether the reminder sweep may send another notice
    pub fn reminder_due(&self, now: DateTime<Utc>, cooldown: chrono::Duration) -> bool {
        if !self.is_overdue(now) {
            return false;
        }
        match self.last_reminder_at {
            Some(last) => now - last >= cooldown,
            None => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn involvement_with_expected(days_from_now: i64, now: DateTime<Utc>) -> Involvement {
        let mut inv = Involvement::new(Uuid::new_v4(), "INC0012345", Uuid::new_v4(), Uuid::new_v4(), now);
        inv.status = InvolvementStatus::InProgress;
        inv.expected_completion_date = Some(now + Duration::days(days_from_now));
        inv
    }

    #[test]
    fn test_overdue_derivation() {
        let now = Utc::now();
        let inv = involvement_with_expected(14, now);

        assert!(!inv.is_overdue(now));
        assert_eq!(inv.days_overdue(now), 0);
        assert_eq!(inv.days_until_due(now), Some(14));

        // 20 days later the 14-day expectation is 6 days overdue
        let later = now + Duration::days(20);
        assert!(inv.is_overdue(later));
        assert_eq!(inv.days_overdue(later), 6);
        assert_eq!(inv.days_until_due(later), None);
    }

    #[test]
    fn test_completed_never_overdue() {
        let now = Utc::now();
        let mut inv = involvement_with_expected(-10, now);
        assert!(inv.is_overdue(now));

        inv.status = InvolvementStatus::Completed;
        assert!(!inv.is_overdue(now));
        assert_eq!(inv.days_overdue(now), 0);
        assert_eq!(inv.days_until_due(now), None);
    }

    #[test]
    fn test_no_expected_date_not_overdue() {
        let now = Utc::now();
        let inv = Involvement::new(Uuid::new_v4(), "INC1", Uuid::new_v4(), Uuid::new_v4(), now);
        assert!(!inv.is_overdue(now + Duration::days(365)));
        assert_eq!(inv.days_until_due(now), None);
    }

    #[test]
    fn test_reminder_cooldown() {
        let now = Utc::now();
        let mut inv = involvement_with_expected(-5, now);
        let cooldown = Duration::hours(24);

        assert!(inv.reminder_due(now, cooldown));

        inv.last_reminder_at = Some(now - Duration::hours(2));
        assert!(!inv.reminder_due(now, cooldown));

        inv.last_reminder_at = Some(now - Duration::hours(30));
        assert!(inv.reminder_due(now, cooldown));
    }
}
