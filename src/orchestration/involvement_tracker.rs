//! Involvement tracker.
//!
//! The data-creation sub-workflow behind a DATA_NOT_EXIST owner response.
//! Stored status only moves Pending → InProgress → Completed; overdue is
//! derived from the expected completion date at read time. The reminder
//! sweep notifies owners of overdue involvements, bounded by the configured
//! cooldown so duplicate notices are not sent.

use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::config::SystemConfig;
use crate::error::{CoreError, EntityKind, Result};
use crate::events::EventPublisher;
use crate::models::Involvement;
use crate::services::NotificationChannel;
use crate::state_machine::{InvolvementStatus, VariableSearchStatus};
use crate::store::{EntityStore, TransitionRecord};

use super::types::{Actor, ActorRole, TransitionOutcome};

pub struct InvolvementTracker {
    store: Arc<dyn EntityStore>,
    notifier: Arc<dyn NotificationChannel>,
    publisher: EventPublisher,
    config: Arc<SystemConfig>,
}

impl InvolvementTracker {
    pub fn new(
        store: Arc<dyn EntityStore>,
        notifier: Arc<dyn NotificationChannel>,
        publisher: EventPublisher,
        config: Arc<SystemConfig>,
    ) -> Self {
        Self {
            store,
            notifier,
            publisher,
            config,
        }
    }

    /// Open a data-creation request for a variable the owner declared
    /// unmatched. The variable must be pending involvement; the owner is
    /// taken from the rejected selected match.
    pub async fn create(
        &self,
        variable_id: Uuid,
        external_request_number: impl Into<String>,
        external_system: Option<String>,
        notes: Option<String>,
        actor: &Actor,
    ) -> Result<TransitionOutcome<Involvement>> {
        let external_request_number = external_request_number.into();
        if external_request_number.trim().is_empty() {
            return Err(CoreError::validation(
                "external request number must not be empty",
            ));
        }

        let variable = self.store.get_variable(variable_id).await?;
        let case = self.store.get_case(variable.case_id).await?;
        if actor.role != ActorRole::Requester || actor.id != case.requester_id {
            return Err(CoreError::permission(
                "only the case requester may open an involvement",
            ));
        }
        if variable.search_status != VariableSearchStatus::PendingInvolvement {
            return Err(CoreError::state_conflict(
                EntityKind::Variable,
                variable_id,
                VariableSearchStatus::PendingInvolvement.to_string(),
                variable.search_status.to_string(),
            ));
        }
        if self.store.involvement_for_variable(variable_id).await?.is_some() {
            return Err(CoreError::validation(format!(
                "variable {variable_id} already has an involvement"
            )));
        }

        let selected = variable.selected_match_id.ok_or_else(|| {
            CoreError::validation("variable has no rejected match to derive an owner from")
        })?;
        let owner_id = self.store.get_match(selected).await?.owner_id;

        let now = Utc::now();
        let mut involvement = Involvement::new(
            variable_id,
            external_request_number,
            case.requester_id,
            owner_id,
            now,
        );
        involvement.external_system = external_system;
        if let Some(note) = notes {
            involvement.notes.push(note);
        }
        let involvement = self.store.insert_involvement(involvement).await?;

        self.store
            .append_transition(TransitionRecord::new(
                EntityKind::Involvement,
                involvement.id,
                None,
                involvement.status.to_string(),
                "create",
                Some(actor.id),
                now,
            ))
            .await?;
        info!(
            involvement_id = %involvement.id,
            variable_id = %variable_id,
            request = %involvement.external_request_number,
            "involvement opened"
        );
        Ok(TransitionOutcome::new(
            involvement,
            "Data-creation request opened",
        ))
    }

    /// Owner commits to an expected completion date; Pending → InProgress.
    /// The date may be revised while still in progress.
    pub async fn set_expected_date(
        &self,
        involvement_id: Uuid,
        expected_completion_date: DateTime<Utc>,
        notes: Option<String>,
        actor: &Actor,
    ) -> Result<TransitionOutcome<Involvement>> {
        let involvement = self.store.get_involvement(involvement_id).await?;
        check_owner(&involvement, actor)?;

        if involvement.status == InvolvementStatus::Completed {
            return Err(CoreError::state_conflict(
                EntityKind::Involvement,
                involvement_id,
                "pending or in_progress",
                involvement.status.to_string(),
            ));
        }
        let now = Utc::now();
        if expected_completion_date.date_naive() < now.date_naive() {
            return Err(CoreError::validation(
                "expected completion date must not be in the past",
            ));
        }

        let from = involvement.status;
        let expected = involvement.version;
        let mut updated = involvement;
        updated.expected_completion_date = Some(expected_completion_date);
        updated.status = InvolvementStatus::InProgress;
        if let Some(note) = notes {
            updated.notes.push(note);
        }
        updated.updated_at = now;
        let committed = self.store.update_involvement(updated, expected).await?;

        self.audit(&committed, Some(from), "set_expected_date", actor.id)
            .await?;
        self.publisher.publish_transition(
            EntityKind::Involvement,
            committed.id,
            Some(from.to_string()),
            committed.status.to_string(),
            "set_expected_date",
            "Expected completion date set",
        );
        Ok(TransitionOutcome::new(
            committed,
            "Expected completion date set",
        ))
    }

    /// Owner delivers the data. Any non-terminal status completes; the
    /// variable returns to Pending so the requester can search again.
    pub async fn complete(
        &self,
        involvement_id: Uuid,
        created_table_name: impl Into<String>,
        created_concept: impl Into<String>,
        notes: Option<String>,
        actor: &Actor,
    ) -> Result<TransitionOutcome<Involvement>> {
        let created_table_name = created_table_name.into();
        let created_concept = created_concept.into();
        if created_table_name.trim().is_empty() || created_concept.trim().is_empty() {
            return Err(CoreError::validation(
                "created table name and concept are required to complete an involvement",
            ));
        }

        let involvement = self.store.get_involvement(involvement_id).await?;
        check_owner(&involvement, actor)?;
        if involvement.status == InvolvementStatus::Completed {
            return Err(CoreError::state_conflict(
                EntityKind::Involvement,
                involvement_id,
                "pending or in_progress",
                involvement.status.to_string(),
            ));
        }

        let now = Utc::now();
        let from = involvement.status;
        let expected = involvement.version;
        let mut updated = involvement;
        updated.status = InvolvementStatus::Completed;
        updated.actual_completion_date = Some(now);
        updated.created_table_name = Some(created_table_name);
        updated.created_concept = Some(created_concept);
        if let Some(note) = notes {
            updated.notes.push(note);
        }
        updated.updated_at = now;
        let committed = self.store.update_involvement(updated, expected).await?;

        self.audit(&committed, Some(from), "complete", actor.id).await?;
        self.publisher.publish_transition(
            EntityKind::Involvement,
            committed.id,
            Some(from.to_string()),
            committed.status.to_string(),
            "complete",
            "Data-creation request completed",
        );

        // Completion does not auto-search; it reopens the variable so the
        // requester can run a fresh search over the new table.
        if let Err(error) = self.reopen_variable(committed.variable_id, actor.id).await {
            warn!(
                variable_id = %committed.variable_id,
                %error,
                "could not reopen variable after involvement completion"
            );
        }

        Ok(TransitionOutcome::new(
            committed,
            "Data-creation request completed",
        ))
    }

    /// Remind owners of overdue involvements. Per-item failures are logged
    /// and retried on the next sweep; the cooldown prevents duplicate
    /// notices. Returns the number of reminders sent.
    pub async fn remind_overdue(&self, now: DateTime<Utc>) -> Result<usize> {
        let cooldown = self.config.reminder_cooldown();
        let open = self.store.list_open_involvements().await?;

        let mut sent = 0;
        for involvement in open {
            if !involvement.reminder_due(now, cooldown) {
                continue;
            }
            let days = involvement.days_overdue(now);
            let subject = format!(
                "Data-creation request {} is {days} day(s) overdue",
                involvement.external_request_number
            );
            if let Err(error) = self
                .notifier
                .notify(involvement.owner_id, &subject, &subject)
                .await
            {
                warn!(involvement_id = %involvement.id, %error, "overdue reminder failed");
                continue;
            }

            let expected = involvement.version;
            let mut updated = involvement;
            updated.reminder_count += 1;
            updated.last_reminder_at = Some(now);
            updated.updated_at = now;
            match self.store.update_involvement(updated, expected).await {
                Ok(_) => sent += 1,
                Err(error) => {
                    // A concurrent sweep already recorded this reminder.
                    warn!(%error, "reminder bookkeeping lost a write race");
                }
            }
        }
        if sent > 0 {
            info!(sent, "overdue involvement reminders sent");
        }
        Ok(sent)
    }

    async fn reopen_variable(&self, variable_id: Uuid, actor_id: Uuid) -> Result<()> {
        let variable = self.store.get_variable(variable_id).await?;
        if variable.is_cancelled
            || variable.search_status != VariableSearchStatus::PendingInvolvement
        {
            return Ok(());
        }
        let from = variable.search_status;
        let expected = variable.version;
        let mut updated = variable;
        updated.search_status = VariableSearchStatus::Pending;
        updated.selected_match_id = None;
        updated.updated_at = Utc::now();
        let committed = self.store.update_variable(updated, expected).await?;
        self.store
            .append_transition(TransitionRecord::new(
                EntityKind::Variable,
                committed.id,
                Some(from.to_string()),
                committed.search_status.to_string(),
                "involvement_completed",
                Some(actor_id),
                committed.updated_at,
            ))
            .await?;
        self.publisher.publish_transition(
            EntityKind::Variable,
            committed.id,
            Some(from.to_string()),
            committed.search_status.to_string(),
            "involvement_completed",
            "Data created; variable ready for a new search",
        );
        Ok(())
    }

    async fn audit(
        &self,
        involvement: &Involvement,
        from: Option<InvolvementStatus>,
        event: &str,
        actor_id: Uuid,
    ) -> Result<()> {
        self.store
            .append_transition(TransitionRecord::new(
                EntityKind::Involvement,
                involvement.id,
                from.map(|s| s.to_string()),
                involvement.status.to_string(),
                event,
                Some(actor_id),
                involvement.updated_at,
            ))
            .await
    }
}

fn check_owner(involvement: &Involvement, actor: &Actor) -> Result<()> {
    if actor.role != ActorRole::Owner {
        return Err(CoreError::permission(
            "involvement updates require the owner role",
        ));
    }
    if actor.id != involvement.owner_id {
        return Err(CoreError::permission(format!(
            "actor {} is not the owner of involvement {}",
            actor.id, involvement.id
        )));
    }
    Ok(())
}
