//! Case lifecycle manager.
//!
//! Enforces actor roles and state preconditions for every case transition,
//! opens the approval gate on submit, resolves it on approve/reject/cancel,
//! and cascades cancellation into the case's variables. All writes go through
//! the versioned store; a stale read surfaces as a state conflict.

use chrono::Utc;
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::config::SystemConfig;
use crate::error::{CoreError, EntityKind, Result};
use crate::events::EventPublisher;
use crate::models::{Approval, Case, Priority, Variable};
use crate::state_machine::{case_target_state, ApprovalStatus, CaseEvent, CaseStatus, VariableSearchStatus};
use crate::store::{EntityStore, TransitionRecord};

use super::types::{Actor, ActorRole, CancelScope, TransitionOutcome};

/// Input for a variable created together with its case
#[derive(Debug, Clone)]
pub struct VariableSpec {
    pub name: String,
    pub data_type: String,
    pub concept: String,
    pub desired_lag: Option<String>,
    pub priority: Priority,
}

pub struct CaseLifecycleManager {
    store: Arc<dyn EntityStore>,
    publisher: EventPublisher,
    config: Arc<SystemConfig>,
}

impl CaseLifecycleManager {
    pub fn new(
        store: Arc<dyn EntityStore>,
        publisher: EventPublisher,
        config: Arc<SystemConfig>,
    ) -> Self {
        Self {
            store,
            publisher,
            config,
        }
    }

    /// Create a draft case together with its variables.
    pub async fn create_case(
        &self,
        title: impl Into<String>,
        description: Option<String>,
        requester_id: Uuid,
        approver_id: Uuid,
        variables: Vec<VariableSpec>,
    ) -> Result<TransitionOutcome<Case>> {
        let title = title.into();
        if title.trim().is_empty() {
            return Err(CoreError::validation("case title must not be empty"));
        }

        let now = Utc::now();
        let mut case = Case::new(title, requester_id, approver_id, now);
        case.description = description;

        let mut created = Vec::with_capacity(variables.len());
        for spec in variables {
            if spec.name.trim().is_empty() {
                return Err(CoreError::validation("variable name must not be empty"));
            }
            let mut variable = Variable::new(case.id, spec.name, spec.data_type, spec.concept, now);
            variable.desired_lag = spec.desired_lag;
            variable.priority = spec.priority;
            case.variable_ids.push(variable.id);
            created.push(variable);
        }

        let case = self.store.insert_case(case).await?;
        for variable in created {
            let variable = self.store.insert_variable(variable).await?;
            self.store
                .append_transition(TransitionRecord::new(
                    EntityKind::Variable,
                    variable.id,
                    None,
                    variable.search_status.to_string(),
                    "create",
                    Some(requester_id),
                    now,
                ))
                .await?;
        }
        self.store
            .append_transition(TransitionRecord::new(
                EntityKind::Case,
                case.id,
                None,
                case.status.to_string(),
                "create",
                Some(requester_id),
                now,
            ))
            .await?;

        info!(case_id = %case.id, variables = case.variable_ids.len(), "case created");
        let count = case.variable_ids.len();
        Ok(TransitionOutcome::new(
            case,
            format!("Case created with {count} variable(s)"),
        ))
    }

    /// Submit a draft case for approval; opens the approval gate.
    pub async fn submit(&self, case_id: Uuid, actor: &Actor) -> Result<TransitionOutcome<Case>> {
        let case = self.transition(case_id, actor, CaseEvent::Submit).await?;

        let now = Utc::now();
        let approval = Approval::new(
            case.id,
            case.approver_id,
            case.requester_id,
            now,
            self.config.approval_sla_hours,
        );
        let approval = self.store.insert_approval(approval).await?;
        self.store
            .append_transition(TransitionRecord::new(
                EntityKind::Approval,
                approval.id,
                None,
                approval.status.to_string(),
                "requested",
                Some(actor.id),
                now,
            ))
            .await?;

        Ok(TransitionOutcome::new(case, "Case submitted for review"))
    }

    /// Approver picks the case up for review.
    pub async fn begin_review(&self, case_id: Uuid, actor: &Actor) -> Result<TransitionOutcome<Case>> {
        let case = self.transition(case_id, actor, CaseEvent::BeginReview).await?;
        Ok(TransitionOutcome::new(case, "Case review started"))
    }

    /// Approver accepts the case; the open approval resolves with it.
    pub async fn approve(&self, case_id: Uuid, actor: &Actor) -> Result<TransitionOutcome<Case>> {
        let case = self.transition(case_id, actor, CaseEvent::Approve).await?;
        self.resolve_open_approval(case.id, ApprovalStatus::Approved, actor)
            .await?;
        Ok(TransitionOutcome::new(case, "Case approved"))
    }

    /// Approver rejects the case; the open approval resolves with it.
    pub async fn reject(&self, case_id: Uuid, actor: &Actor) -> Result<TransitionOutcome<Case>> {
        let case = self.transition(case_id, actor, CaseEvent::Reject).await?;
        self.resolve_open_approval(case.id, ApprovalStatus::Rejected, actor)
            .await?;
        Ok(TransitionOutcome::new(case, "Case rejected"))
    }

    /// Requester reopens a rejected case for rework.
    pub async fn reopen(&self, case_id: Uuid, actor: &Actor) -> Result<TransitionOutcome<Case>> {
        let case = self.transition(case_id, actor, CaseEvent::Reopen).await?;
        Ok(TransitionOutcome::new(case, "Case reopened as draft"))
    }

    /// Close a fully approved case. Fails with the count of active variables
    /// that are not yet approved.
    pub async fn close(&self, case_id: Uuid, actor: &Actor) -> Result<TransitionOutcome<Case>> {
        let case = self.store.get_case(case_id).await?;
        check_actor(&case, actor, &CaseEvent::Close)?;

        let variables = self.store.variables_for_case(case_id).await?;
        let pending = variables.iter().filter(|v| v.blocks_close()).count();
        if pending > 0 {
            return Err(CoreError::VariablesNotApproved { case_id, pending });
        }

        let case = self.transition(case_id, actor, CaseEvent::Close).await?;
        Ok(TransitionOutcome::new(case, "Case closed"))
    }

    /// Cancel a case and cascade into its variables. Idempotent: cancelling
    /// an already-cancelled case succeeds without a case transition, but the
    /// cascade still runs so a retry sweeps up variables the first pass
    /// missed.
    pub async fn cancel(
        &self,
        case_id: Uuid,
        actor: &Actor,
        reason: Option<String>,
        scope: CancelScope,
    ) -> Result<TransitionOutcome<Case>> {
        let case = self.store.get_case(case_id).await?;
        let event = CaseEvent::Cancel(reason.clone());
        check_actor(&case, actor, &event)?;

        if case.status == CaseStatus::Cancelled {
            // Still run the cascade: it is a no-op for already-cancelled
            // variables, and it picks up any variable that lost a version
            // race during an earlier cancel.
            let reason = reason.or_else(|| case.cancellation_reason.clone());
            let cancelled = self
                .cascade_cancel_variables(&case, actor, reason.as_deref(), scope)
                .await;
            let message = if cancelled > 0 {
                format!("Case already cancelled; {cancelled} variable(s) cancelled")
            } else {
                "Case already cancelled".to_string()
            };
            return Ok(TransitionOutcome::new(case, message));
        }

        let case = self.transition(case_id, actor, event).await?;
        let cancelled = self
            .cascade_cancel_variables(&case, actor, reason.as_deref(), scope)
            .await;
        self.resolve_open_approval(case.id, ApprovalStatus::Cancelled, actor)
            .await?;

        Ok(TransitionOutcome::new(
            case,
            format!("Case cancelled; {cancelled} variable(s) cancelled"),
        ))
    }

    /// Cancel one variable independently of its case.
    pub async fn cancel_variable(
        &self,
        variable_id: Uuid,
        actor: &Actor,
        reason: Option<String>,
    ) -> Result<TransitionOutcome<Variable>> {
        let variable = self.store.get_variable(variable_id).await?;
        let case = self.store.get_case(variable.case_id).await?;
        if actor.role != ActorRole::Requester {
            return Err(CoreError::permission(
                "only the requester may cancel a variable",
            ));
        }
        if actor.id != case.requester_id {
            return Err(CoreError::permission(format!(
                "actor {} is not the requester of case {}",
                actor.id, case.id
            )));
        }

        if variable.is_cancelled {
            return Ok(TransitionOutcome::new(variable, "Variable already cancelled"));
        }

        let from = variable.search_status;
        let expected = variable.version;
        let mut updated = variable;
        updated.is_cancelled = true;
        updated.cancellation_reason = reason;
        updated.search_status = VariableSearchStatus::Cancelled;
        updated.updated_at = Utc::now();
        let updated = self.store.update_variable(updated, expected).await?;

        self.audit_variable(&updated, from, "cancel", actor.id).await?;
        self.publisher.publish_transition(
            EntityKind::Variable,
            updated.id,
            Some(from.to_string()),
            updated.search_status.to_string(),
            "cancel",
            "Variable cancelled",
        );
        Ok(TransitionOutcome::new(updated, "Variable cancelled"))
    }

    /// Resolve current state, consult the transition table, commit, audit
    /// and publish. The single path every case transition goes through.
    async fn transition(&self, case_id: Uuid, actor: &Actor, event: CaseEvent) -> Result<Case> {
        let case = self.store.get_case(case_id).await?;
        check_actor(&case, actor, &event)?;

        let from = case.status;
        let target = case_target_state(case.id, from, &event)?;

        let expected = case.version;
        let mut updated = case;
        updated.status = target;
        updated.updated_at = Utc::now();
        if let CaseEvent::Cancel(reason) = &event {
            updated.cancellation_reason = reason.clone();
        }
        let committed = self.store.update_case(updated, expected).await?;

        self.store
            .append_transition(TransitionRecord::new(
                EntityKind::Case,
                committed.id,
                Some(from.to_string()),
                committed.status.to_string(),
                event.event_type(),
                Some(actor.id),
                committed.updated_at,
            ))
            .await?;
        self.publisher.publish_transition(
            EntityKind::Case,
            committed.id,
            Some(from.to_string()),
            committed.status.to_string(),
            event.event_type(),
            format!("Case moved to {}", committed.status),
        );
        info!(
            case_id = %committed.id,
            from = %from,
            to = %committed.status,
            event = event.event_type(),
            "case transition committed"
        );
        Ok(committed)
    }

    async fn cascade_cancel_variables(
        &self,
        case: &Case,
        actor: &Actor,
        reason: Option<&str>,
        scope: CancelScope,
    ) -> usize {
        let variables = match self.store.variables_for_case(case.id).await {
            Ok(variables) => variables,
            Err(error) => {
                warn!(case_id = %case.id, %error, "cascade cancel could not list variables");
                return 0;
            }
        };

        let mut cancelled = 0;
        for variable in variables {
            if variable.is_cancelled {
                continue;
            }
            if scope == CancelScope::ActiveOnly && variable.search_status.is_satisfied() {
                continue;
            }

            let from = variable.search_status;
            let expected = variable.version;
            let mut updated = variable;
            updated.is_cancelled = true;
            updated.cancellation_reason = reason.map(str::to_string);
            updated.search_status = VariableSearchStatus::Cancelled;
            updated.updated_at = Utc::now();
            let id = updated.id;

            match self.store.update_variable(updated, expected).await {
                Ok(committed) => {
                    cancelled += 1;
                    if let Err(error) = self.audit_variable(&committed, from, "cascade_cancel", actor.id).await
                    {
                        warn!(variable_id = %id, %error, "cascade cancel audit failed");
                    }
                    self.publisher.publish_transition(
                        EntityKind::Variable,
                        id,
                        Some(from.to_string()),
                        VariableSearchStatus::Cancelled.to_string(),
                        "cascade_cancel",
                        "Variable cancelled with its case",
                    );
                }
                Err(error) => {
                    // A concurrent writer got there first; the variable will be
                    // picked up by a retry of the cancel, not silently dropped.
                    warn!(variable_id = %id, %error, "cascade cancel skipped variable");
                }
            }
        }
        cancelled
    }

    async fn resolve_open_approval(
        &self,
        case_id: Uuid,
        status: ApprovalStatus,
        actor: &Actor,
    ) -> Result<()> {
        let Some(approval) = self.store.open_approval_for_case(case_id).await? else {
            return Ok(());
        };
        let from = approval.status;
        let expected = approval.version;
        let mut updated = approval;
        updated.status = status;
        updated.resolved_at = Some(Utc::now());
        updated.updated_at = Utc::now();
        let committed = self.store.update_approval(updated, expected).await?;

        self.store
            .append_transition(TransitionRecord::new(
                EntityKind::Approval,
                committed.id,
                Some(from.to_string()),
                committed.status.to_string(),
                "resolve",
                Some(actor.id),
                committed.updated_at,
            ))
            .await?;
        Ok(())
    }

    async fn audit_variable(
        &self,
        variable: &Variable,
        from: VariableSearchStatus,
        event: &str,
        actor_id: Uuid,
    ) -> Result<()> {
        self.store
            .append_transition(TransitionRecord::new(
                EntityKind::Variable,
                variable.id,
                Some(from.to_string()),
                variable.search_status.to_string(),
                event,
                Some(actor_id),
                variable.updated_at,
            ))
            .await
    }
}

/// Role and ownership validation for a case event.
fn check_actor(case: &Case, actor: &Actor, event: &CaseEvent) -> Result<()> {
    if event.is_requester_event() {
        if actor.role != ActorRole::Requester {
            return Err(CoreError::permission(format!(
                "'{}' requires the requester role",
                event.event_type()
            )));
        }
        if actor.id != case.requester_id {
            return Err(CoreError::permission(format!(
                "actor {} is not the requester of case {}",
                actor.id, case.id
            )));
        }
    } else if actor.role != ActorRole::Approver {
        return Err(CoreError::permission(format!(
            "'{}' requires the approver role",
            event.event_type()
        )));
    }
    Ok(())
}
