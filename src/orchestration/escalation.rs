//! Approval escalation scheduler.
//!
//! A low-frequency background sweep, independent of any request. The
//! escalation pass reassigns pending approvals past their SLA deadline one
//! level up the hierarchy; the reminder pass nudges approvers inside the
//! deadline window. Every mutation is a version-guarded check-and-set, so
//! concurrent sweeps cannot double-escalate; per-item failures are logged
//! and retried on the next cycle.

use chrono::{DateTime, Utc};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{error, info, warn};

use crate::config::SystemConfig;
use crate::error::{EntityKind, Result};
use crate::events::EventPublisher;
use crate::models::Approval;
use crate::services::{DirectoryService, NotificationChannel};
use crate::state_machine::ApprovalStatus;
use crate::store::{EntityStore, TransitionRecord};

use super::involvement_tracker::InvolvementTracker;

/// What a single sweep cycle did
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub escalated: usize,
    pub approvals_reminded: usize,
    pub involvements_reminded: usize,
    pub errors: usize,
}

pub struct ApprovalEscalationScheduler {
    store: Arc<dyn EntityStore>,
    directory: Arc<dyn DirectoryService>,
    notifier: Arc<dyn NotificationChannel>,
    publisher: EventPublisher,
    config: Arc<SystemConfig>,
    involvements: Arc<InvolvementTracker>,
}

impl ApprovalEscalationScheduler {
    pub fn new(
        store: Arc<dyn EntityStore>,
        directory: Arc<dyn DirectoryService>,
        notifier: Arc<dyn NotificationChannel>,
        publisher: EventPublisher,
        config: Arc<SystemConfig>,
        involvements: Arc<InvolvementTracker>,
    ) -> Self {
        Self {
            store,
            directory,
            notifier,
            publisher,
            config,
            involvements,
        }
    }

    /// Run the sweep on the configured interval until the shutdown signal
    /// flips to true.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        let period = std::time::Duration::from_secs(self.config.sweep_interval_seconds);
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let report = self.sweep_once(Utc::now()).await;
                    if report.errors > 0 {
                        warn!(?report, "sweep cycle finished with errors");
                    }
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        info!("escalation scheduler shutting down");
                        return;
                    }
                }
            }
        }
    }

    /// One full sweep cycle at the given instant. Exposed for deterministic
    /// testing; `run` calls it with the wall clock.
    pub async fn sweep_once(&self, now: DateTime<Utc>) -> SweepReport {
        let mut report = SweepReport::default();

        let pending = match self.store.list_pending_approvals().await {
            Ok(pending) => pending,
            Err(err) => {
                error!(%err, "sweep could not list pending approvals");
                report.errors += 1;
                return report;
            }
        };

        for approval in pending {
            // Escalation takes precedence when it can act; otherwise an
            // overdue approval falls through to the reminder pass, so
            // disabling escalation never silences reminders.
            if self.escalation_applies(&approval, now) {
                match self.escalate(approval, now).await {
                    Ok(true) => report.escalated += 1,
                    Ok(false) => {}
                    Err(err) => {
                        warn!(%err, "escalation failed; will retry next cycle");
                        report.errors += 1;
                    }
                }
            } else if approval.reminder_due(now, self.config.reminder_after(), self.config.reminder_cooldown())
            {
                match self.remind(approval, now).await {
                    Ok(()) => report.approvals_reminded += 1,
                    Err(err) => {
                        warn!(%err, "approval reminder failed; will retry next cycle");
                        report.errors += 1;
                    }
                }
            }
        }

        match self.involvements.remind_overdue(now).await {
            Ok(sent) => report.involvements_reminded = sent,
            Err(err) => {
                warn!(%err, "involvement reminder pass failed");
                report.errors += 1;
            }
        }

        info!(
            escalated = report.escalated,
            approvals_reminded = report.approvals_reminded,
            involvements_reminded = report.involvements_reminded,
            errors = report.errors,
            "sweep cycle complete"
        );
        report
    }

    /// Whether the sweep may reassign this approval upward right now.
    fn escalation_applies(&self, approval: &Approval, now: DateTime<Utc>) -> bool {
        if !approval.is_past_deadline(now) || !self.config.escalation_enabled {
            return false;
        }
        if approval.escalation_level >= self.config.escalation_max_level {
            warn!(
                approval_id = %approval.id,
                level = approval.escalation_level,
                "approval stuck at max escalation level"
            );
            return false;
        }
        true
    }

    /// Escalate one overdue approval. Returns false when the hierarchy is
    /// exhausted or a concurrent sweep got there first.
    async fn escalate(&self, approval: Approval, now: DateTime<Utc>) -> Result<bool> {
        let next_level = approval.escalation_level + 1;
        let Some(next_approver) = self
            .directory
            .next_approver(approval.approver_id, next_level)
            .await?
        else {
            warn!(approval_id = %approval.id, "no approver above the current one");
            return Ok(false);
        };

        let previous_approver = approval.approver_id;
        let expected = approval.version;
        let mut updated = approval;
        updated.escalation_level = next_level;
        updated.approver_id = next_approver;
        updated.sla_deadline = now + self.config.escalation_sla();
        updated.updated_at = now;
        // A concurrent sweep that escalated first wins the version check;
        // losing here is not an error.
        let committed = match self.store.update_approval(updated, expected).await {
            Ok(committed) => committed,
            Err(err) if err.is_retryable() => {
                info!(%err, "approval already escalated by a concurrent sweep");
                return Ok(false);
            }
            Err(err) => return Err(err),
        };

        // Escalated is a waypoint; the approval is pending again at the new
        // level, which the audit trail records explicitly.
        self.store
            .append_transition(TransitionRecord::new(
                EntityKind::Approval,
                committed.id,
                Some(ApprovalStatus::Pending.to_string()),
                ApprovalStatus::Escalated.to_string(),
                "escalate",
                None,
                now,
            ))
            .await?;
        self.store
            .append_transition(TransitionRecord::new(
                EntityKind::Approval,
                committed.id,
                Some(ApprovalStatus::Escalated.to_string()),
                ApprovalStatus::Pending.to_string(),
                "reassign",
                None,
                now,
            ))
            .await?;
        self.publisher.publish_transition(
            EntityKind::Approval,
            committed.id,
            Some(ApprovalStatus::Pending.to_string()),
            ApprovalStatus::Pending.to_string(),
            "escalate",
            format!("Approval escalated to level {next_level}"),
        );

        info!(
            approval_id = %committed.id,
            case_id = %committed.case_id,
            from_approver = %previous_approver,
            to_approver = %next_approver,
            level = next_level,
            "approval escalated"
        );
        self.notifier
            .notify(
                next_approver,
                "Approval escalated to you",
                &format!(
                    "Case {} breached its approval SLA and is now assigned to you (level {next_level}).",
                    committed.case_id
                ),
            )
            .await?;
        Ok(true)
    }

    async fn remind(&self, approval: Approval, now: DateTime<Utc>) -> Result<()> {
        self.notifier
            .notify(
                approval.approver_id,
                "Approval pending your review",
                &format!(
                    "Case {} has been waiting since {}.",
                    approval.case_id,
                    approval.requested_at.to_rfc3339()
                ),
            )
            .await?;

        let expected = approval.version;
        let mut updated = approval;
        updated.reminder_count += 1;
        updated.last_reminder_at = Some(now);
        updated.updated_at = now;
        match self.store.update_approval(updated, expected).await {
            Ok(_) => Ok(()),
            Err(err) if err.is_retryable() => {
                info!(%err, "reminder bookkeeping lost a write race");
                Ok(())
            }
            Err(err) => Err(err),
        }
    }
}
