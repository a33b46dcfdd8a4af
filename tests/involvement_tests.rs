//! Involvement integration tests: the data-creation sub-workflow opened when
//! an owner declares the data does not exist, plus the derived overdue
//! predicates and the reminder sweep.

mod common;

use chrono::{Duration, Utc};
use uuid::Uuid;

use caseflow_core::models::{Involvement, OwnerResponse, Variable};
use caseflow_core::store::EntityStore;
use caseflow_core::{CoreError, InvolvementStatus, VariableSearchStatus};
use common::Harness;

/// Drive one variable to PendingInvolvement and open its involvement.
async fn open_involvement(h: &Harness) -> (Variable, Involvement) {
    let (_, variable, selected) = h.variable_in_owner_review().await;
    h.matches
        .owner_respond(
            selected.id,
            OwnerResponse::DataNotExist {
                note: Some("not collected at this grain".to_string()),
            },
            &h.table_owner,
        )
        .await
        .unwrap();

    let involvement = h
        .involvements
        .create(
            variable.id,
            "INC0012345",
            Some("servicenow".to_string()),
            None,
            &h.requester,
        )
        .await
        .unwrap()
        .entity;
    let variable = h.store.get_variable(variable.id).await.unwrap();
    (variable, involvement)
}

#[tokio::test]
async fn test_create_derives_owner_from_rejected_match() {
    let h = Harness::new();
    let (variable, involvement) = open_involvement(&h).await;

    assert_eq!(variable.search_status, VariableSearchStatus::PendingInvolvement);
    assert_eq!(involvement.status, InvolvementStatus::Pending);
    assert_eq!(involvement.owner_id, h.table_owner.id);
    assert_eq!(involvement.requester_id, h.requester.id);
    assert_eq!(involvement.external_request_number, "INC0012345");
    assert_eq!(involvement.external_system.as_deref(), Some("servicenow"));
}

#[tokio::test]
async fn test_create_guards() {
    let h = Harness::new();
    let (variable, _) = open_involvement(&h).await;

    // One involvement per variable.
    let err = h
        .involvements
        .create(variable.id, "INC0099999", None, None, &h.requester)
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::Validation(_)));

    // Empty request number and wrong state are both rejected.
    let (_, variables) = h.case_with_variables(1).await;
    let err = h
        .involvements
        .create(variables[0].id, "  ", None, None, &h.requester)
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::Validation(_)));
    let err = h
        .involvements
        .create(variables[0].id, "INC0000001", None, None, &h.requester)
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::StateConflict { .. }));
}

#[tokio::test]
async fn test_set_expected_date_starts_progress() {
    let h = Harness::new();
    let (_, involvement) = open_involvement(&h).await;

    // Only the involvement owner may commit to a date.
    let err = h
        .involvements
        .set_expected_date(involvement.id, Utc::now() + Duration::days(14), None, &h.requester)
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::Permission(_)));

    // Dates in the past are rejected.
    let err = h
        .involvements
        .set_expected_date(involvement.id, Utc::now() - Duration::days(2), None, &h.table_owner)
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::Validation(_)));

    let expected_date = Utc::now() + Duration::days(14);
    let updated = h
        .involvements
        .set_expected_date(
            involvement.id,
            expected_date,
            Some("waiting on upstream feed".to_string()),
            &h.table_owner,
        )
        .await
        .unwrap()
        .entity;
    assert_eq!(updated.status, InvolvementStatus::InProgress);
    assert_eq!(updated.expected_completion_date, Some(expected_date));

    // The date may be revised while still in progress.
    let revised_date = Utc::now() + Duration::days(21);
    let revised = h
        .involvements
        .set_expected_date(involvement.id, revised_date, None, &h.table_owner)
        .await
        .unwrap()
        .entity;
    assert_eq!(revised.expected_completion_date, Some(revised_date));
    assert_eq!(revised.status, InvolvementStatus::InProgress);
}

#[tokio::test]
async fn test_complete_reopens_variable_for_search() {
    let h = Harness::new();
    let (variable, involvement) = open_involvement(&h).await;

    // Completion needs the created table details.
    let err = h
        .involvements
        .complete(involvement.id, "", "monthly default rate", None, &h.table_owner)
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::Validation(_)));

    let completed = h
        .involvements
        .complete(
            involvement.id,
            "RISK.PD_MONTHLY_NEW",
            "monthly default rate",
            None,
            &h.table_owner,
        )
        .await
        .unwrap()
        .entity;
    assert_eq!(completed.status, InvolvementStatus::Completed);
    assert!(completed.actual_completion_date.is_some());
    assert_eq!(completed.created_table_name.as_deref(), Some("RISK.PD_MONTHLY_NEW"));

    // The variable is back at Pending with the old selection cleared, so a
    // fresh search can pick up the new table.
    let variable = h.store.get_variable(variable.id).await.unwrap();
    assert_eq!(variable.search_status, VariableSearchStatus::Pending);
    assert_eq!(variable.selected_match_id, None);

    h.catalog.script(vec![h.candidate("RISK.PD_MONTHLY_NEW", 0.95)]);
    let outcome = h.matches.search(variable.id, &h.requester).await.unwrap();
    assert_eq!(outcome.variable.search_status, VariableSearchStatus::Matched);

    // Completion is terminal.
    let err = h
        .involvements
        .complete(involvement.id, "X", "y", None, &h.table_owner)
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::StateConflict { .. }));
}

#[tokio::test]
async fn test_overdue_reminders_respect_cooldown() {
    let h = Harness::new();
    let (_, involvement) = open_involvement(&h).await;
    h.involvements
        .set_expected_date(involvement.id, Utc::now(), None, &h.table_owner)
        .await
        .unwrap();

    let later = Utc::now() + Duration::days(3);
    let sent = h.involvements.remind_overdue(later).await.unwrap();
    assert_eq!(sent, 1);
    assert_eq!(h.notifier.sent_to(h.table_owner.id), 1);

    let reminded = h.store.get_involvement(involvement.id).await.unwrap();
    assert_eq!(reminded.reminder_count, 1);
    assert_eq!(reminded.last_reminder_at, Some(later));

    // Inside the cooldown nothing is sent; past it the next notice goes out.
    let sent = h
        .involvements
        .remind_overdue(later + Duration::hours(2))
        .await
        .unwrap();
    assert_eq!(sent, 0);

    let sent = h
        .involvements
        .remind_overdue(later + Duration::hours(25))
        .await
        .unwrap();
    assert_eq!(sent, 1);
    assert_eq!(h.notifier.sent_to(h.table_owner.id), 2);
}

#[tokio::test]
async fn test_notifier_failure_leaves_reminder_pending() {
    let h = Harness::new();
    let (_, involvement) = open_involvement(&h).await;
    h.involvements
        .set_expected_date(involvement.id, Utc::now(), None, &h.table_owner)
        .await
        .unwrap();

    h.notifier.set_failing(true);
    let later = Utc::now() + Duration::days(2);
    let sent = h.involvements.remind_overdue(later).await.unwrap();
    assert_eq!(sent, 0);

    // No bookkeeping happened, so the next healthy sweep still reminds.
    let unreminded = h.store.get_involvement(involvement.id).await.unwrap();
    assert_eq!(unreminded.reminder_count, 0);

    h.notifier.set_failing(false);
    let sent = h.involvements.remind_overdue(later).await.unwrap();
    assert_eq!(sent, 1);
}

#[tokio::test]
async fn test_completed_involvements_are_never_reminded() {
    let h = Harness::new();
    let (_, involvement) = open_involvement(&h).await;
    h.involvements
        .set_expected_date(involvement.id, Utc::now(), None, &h.table_owner)
        .await
        .unwrap();
    h.involvements
        .complete(involvement.id, "RISK.NEW", "concept", None, &h.table_owner)
        .await
        .unwrap();

    let sent = h
        .involvements
        .remind_overdue(Utc::now() + Duration::days(30))
        .await
        .unwrap();
    assert_eq!(sent, 0);
}

mod overdue_properties {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        /// Overdue is derived, consistent, and never negative.
        #[test]
        fn overdue_derivation_is_consistent(
            expected_offset_hours in -2000i64..2000,
            observe_offset_hours in 0i64..4000,
            completed in any::<bool>(),
        ) {
            let created = Utc::now();
            let mut inv = Involvement::new(
                Uuid::new_v4(),
                "INC0000042",
                Uuid::new_v4(),
                Uuid::new_v4(),
                created,
            );
            inv.status = if completed {
                InvolvementStatus::Completed
            } else {
                InvolvementStatus::InProgress
            };
            inv.expected_completion_date = Some(created + Duration::hours(expected_offset_hours));
            let now = created + Duration::hours(observe_offset_hours);

            prop_assert!(inv.days_overdue(now) >= 0);
            if completed {
                prop_assert!(!inv.is_overdue(now));
                prop_assert_eq!(inv.days_overdue(now), 0);
            }
            if inv.is_overdue(now) {
                prop_assert!(inv.days_until_due(now).is_none());
            }
            if inv.days_until_due(now).is_some() {
                prop_assert!(!inv.is_overdue(now));
                prop_assert_eq!(inv.days_overdue(now), 0);
            }
        }
    }
}
