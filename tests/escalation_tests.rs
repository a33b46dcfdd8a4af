//! Escalation sweep integration tests: deadline-driven reassignment up the
//! approver chain, reminder windows with cooldowns, and the sweep report.

mod common;

use chrono::{Duration, Utc};
use uuid::Uuid;

use caseflow_core::config::SystemConfig;
use caseflow_core::models::Approval;
use caseflow_core::orchestration::SweepReport;
use caseflow_core::store::EntityStore;
use caseflow_core::ApprovalStatus;
use common::Harness;

/// Submit a one-variable case and return its pending approval.
async fn submitted_approval(h: &Harness) -> Approval {
    let (case, _) = h.case_with_variables(1).await;
    h.cases.submit(case.id, &h.requester).await.unwrap();
    h.store
        .open_approval_for_case(case.id)
        .await
        .unwrap()
        .unwrap()
}

#[tokio::test]
async fn test_sweep_escalates_past_deadline() {
    let h = Harness::new();
    let chain: Vec<Uuid> = (0..3).map(|_| Uuid::new_v4()).collect();
    *h.directory.escalation_chain.lock() = chain.clone();

    let approval = submitted_approval(&h).await;
    let past_deadline = approval.sla_deadline + Duration::hours(1);

    let report = h.scheduler.sweep_once(past_deadline).await;
    assert_eq!(report.escalated, 1);
    assert_eq!(report.errors, 0);

    let escalated = h.store.get_approval(approval.id).await.unwrap();
    assert_eq!(escalated.status, ApprovalStatus::Pending);
    assert_eq!(escalated.escalation_level, 1);
    assert_eq!(escalated.approver_id, chain[0]);
    assert_eq!(
        escalated.sla_deadline,
        past_deadline + h.config.escalation_sla()
    );
    assert_eq!(h.notifier.sent_to(chain[0]), 1);

    // The new deadline is in the future, so an immediate re-sweep does not
    // escalate again.
    let report = h.scheduler.sweep_once(past_deadline).await;
    assert_eq!(report.escalated, 0);
    let unchanged = h.store.get_approval(approval.id).await.unwrap();
    assert_eq!(unchanged.escalation_level, 1);
    assert_eq!(unchanged.approver_id, chain[0]);
}

#[tokio::test]
async fn test_escalation_walks_the_chain_to_max_level() {
    let config = SystemConfig {
        escalation_max_level: 2,
        ..SystemConfig::default()
    };
    let h = Harness::with_config(config);
    let chain: Vec<Uuid> = (0..3).map(|_| Uuid::new_v4()).collect();
    *h.directory.escalation_chain.lock() = chain.clone();

    let approval = submitted_approval(&h).await;
    let mut now = approval.sla_deadline + Duration::hours(1);

    for expected_level in 1..=2u32 {
        let report = h.scheduler.sweep_once(now).await;
        assert_eq!(report.escalated, 1);
        let current = h.store.get_approval(approval.id).await.unwrap();
        assert_eq!(current.escalation_level, expected_level);
        assert_eq!(current.approver_id, chain[(expected_level - 1) as usize]);
        now = current.sla_deadline + Duration::hours(1);
    }

    // At the max level the approval stays put, overdue or not, but the
    // current approver still gets nudged.
    let report = h.scheduler.sweep_once(now).await;
    assert_eq!(report.escalated, 0);
    assert_eq!(report.errors, 0);
    assert_eq!(report.approvals_reminded, 1);
    let stuck = h.store.get_approval(approval.id).await.unwrap();
    assert_eq!(stuck.escalation_level, 2);
    assert_eq!(h.notifier.sent_to(chain[1]), 2);
}

#[tokio::test]
async fn test_escalation_disabled_still_reminds_overdue_approvals() {
    let config = SystemConfig {
        escalation_enabled: false,
        ..SystemConfig::default()
    };
    let h = Harness::with_config(config);
    *h.directory.escalation_chain.lock() = vec![Uuid::new_v4()];

    let approval = submitted_approval(&h).await;
    let overdue = approval.sla_deadline + Duration::days(3);
    let report = h.scheduler.sweep_once(overdue).await;
    assert_eq!(report.escalated, 0);
    assert_eq!(report.approvals_reminded, 1);
    assert_eq!(h.notifier.sent_to(h.approver.id), 1);

    let reminded = h.store.get_approval(approval.id).await.unwrap();
    assert_eq!(reminded.escalation_level, 0);
    assert_eq!(reminded.approver_id, h.approver.id);
    assert_eq!(reminded.reminder_count, 1);

    // Reminders keep flowing on the cooldown cadence, indefinitely.
    let report = h.scheduler.sweep_once(overdue + Duration::hours(2)).await;
    assert_eq!(report.approvals_reminded, 0);
    let report = h.scheduler.sweep_once(overdue + Duration::days(30)).await;
    assert_eq!(report.approvals_reminded, 1);
    assert_eq!(h.notifier.sent_to(h.approver.id), 2);
}

#[tokio::test]
async fn test_exhausted_chain_is_not_an_error() {
    let h = Harness::new();
    // No approvers above the current one.
    let approval = submitted_approval(&h).await;

    let report = h
        .scheduler
        .sweep_once(approval.sla_deadline + Duration::hours(1))
        .await;
    assert_eq!(report.escalated, 0);
    assert_eq!(report.errors, 0);
    let unchanged = h.store.get_approval(approval.id).await.unwrap();
    assert_eq!(unchanged.escalation_level, 0);
}

#[tokio::test]
async fn test_reminder_inside_deadline_window() {
    let h = Harness::new();
    let approval = submitted_approval(&h).await;

    // Before the reminder threshold nothing happens.
    let report = h
        .scheduler
        .sweep_once(approval.requested_at + Duration::hours(12))
        .await;
    assert_eq!(report, SweepReport::default());
    assert_eq!(h.notifier.sent_to(h.approver.id), 0);

    // Past the threshold but within the deadline the approver gets a nudge.
    let report = h
        .scheduler
        .sweep_once(approval.requested_at + Duration::hours(30))
        .await;
    assert_eq!(report.approvals_reminded, 1);
    assert_eq!(report.escalated, 0);
    assert_eq!(h.notifier.sent_to(h.approver.id), 1);

    let reminded = h.store.get_approval(approval.id).await.unwrap();
    assert_eq!(reminded.reminder_count, 1);

    // The cooldown suppresses an immediate second notice.
    let report = h
        .scheduler
        .sweep_once(approval.requested_at + Duration::hours(32))
        .await;
    assert_eq!(report.approvals_reminded, 0);
    assert_eq!(h.notifier.sent_to(h.approver.id), 1);
}

#[tokio::test]
async fn test_resolved_approvals_are_ignored() {
    let h = Harness::new();
    *h.directory.escalation_chain.lock() = vec![Uuid::new_v4()];

    let approval = submitted_approval(&h).await;
    h.cases
        .begin_review(approval.case_id, &h.approver)
        .await
        .unwrap();
    h.cases.approve(approval.case_id, &h.approver).await.unwrap();

    let report = h
        .scheduler
        .sweep_once(approval.sla_deadline + Duration::days(30))
        .await;
    assert_eq!(report.escalated, 0);
    assert_eq!(report.approvals_reminded, 0);
}

#[tokio::test]
async fn test_sweep_covers_involvement_reminders_too() {
    use caseflow_core::models::OwnerResponse;

    let h = Harness::new();
    let (_, variable, selected) = h.variable_in_owner_review().await;
    h.matches
        .owner_respond(
            selected.id,
            OwnerResponse::DataNotExist { note: None },
            &h.table_owner,
        )
        .await
        .unwrap();
    let involvement = h
        .involvements
        .create(variable.id, "INC0031415", None, None, &h.requester)
        .await
        .unwrap()
        .entity;
    h.involvements
        .set_expected_date(involvement.id, Utc::now(), None, &h.table_owner)
        .await
        .unwrap();

    let report = h.scheduler.sweep_once(Utc::now() + Duration::days(5)).await;
    assert_eq!(report.involvements_reminded, 1);
    assert_eq!(h.notifier.sent_to(h.table_owner.id), 1);
}

#[tokio::test]
async fn test_notifier_outage_is_counted_and_retried() {
    let h = Harness::new();
    *h.directory.escalation_chain.lock() = vec![Uuid::new_v4()];
    let approval = submitted_approval(&h).await;

    h.notifier.set_failing(true);
    let now = approval.sla_deadline + Duration::hours(1);
    let report = h.scheduler.sweep_once(now).await;
    assert_eq!(report.errors, 1);

    // The escalation write landed before the notification failed; the next
    // cycle does not double-escalate.
    h.notifier.set_failing(false);
    let report = h.scheduler.sweep_once(now).await;
    assert_eq!(report.escalated, 0);
    let escalated = h.store.get_approval(approval.id).await.unwrap();
    assert_eq!(escalated.escalation_level, 1);
}
