//! Match resolution engine.
//!
//! Drives a variable from catalog search through owner validation and
//! requester sign-off. Candidate-set creation is all-or-nothing; every
//! single-entity transition is a version-guarded check-and-set, so two
//! actors racing on the same match surface a state conflict instead of a
//! silent overwrite.

use chrono::Utc;
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::{CoreError, EntityKind, Result};
use crate::events::EventPublisher;
use crate::models::{
    OwnerResponse, RejectionRouting, RequesterResponse, ResponseRecord, TableMatch, Variable,
};
use crate::services::{CatalogSearch, DirectoryService};
use crate::state_machine::{MatchStatus, VariableSearchStatus};
use crate::store::{EntityStore, TransitionRecord};

use super::types::{Actor, ActorRole, TransitionOutcome};

pub struct MatchResolutionEngine {
    store: Arc<dyn EntityStore>,
    catalog: Arc<dyn CatalogSearch>,
    directory: Arc<dyn DirectoryService>,
    publisher: EventPublisher,
}

/// Result of a catalog search for one variable
#[derive(Debug, Clone)]
pub struct SearchOutcome {
    pub variable: Variable,
    pub match_count: usize,
    pub top_score: Option<f64>,
    pub message: String,
}

impl MatchResolutionEngine {
    pub fn new(
        store: Arc<dyn EntityStore>,
        catalog: Arc<dyn CatalogSearch>,
        directory: Arc<dyn DirectoryService>,
        publisher: EventPublisher,
    ) -> Self {
        Self {
            store,
            catalog,
            directory,
            publisher,
        }
    }

    /// Run a catalog search for a variable and create its candidate set.
    ///
    /// Pending/Searching/NoMatch are valid starting points; the variable ends
    /// in Matched or NoMatch. Candidate writes are atomic: a failed search
    /// leaves no partial candidates visible.
    pub async fn search(&self, variable_id: Uuid, actor: &Actor) -> Result<SearchOutcome> {
        let variable = self.store.get_variable(variable_id).await?;
        self.check_requester(&variable, actor).await?;

        if variable.is_cancelled {
            return Err(CoreError::state_conflict(
                EntityKind::Variable,
                variable_id,
                "an active variable",
                "cancelled",
            ));
        }
        if !variable.search_status.allows_search() {
            return Err(CoreError::state_conflict(
                EntityKind::Variable,
                variable_id,
                "pending, searching or no_match",
                variable.search_status.to_string(),
            ));
        }

        // Claim the search by moving to Searching first; a concurrent search
        // on the same variable loses the version check here.
        let variable = if variable.search_status != VariableSearchStatus::Searching {
            self.transition_variable(variable, VariableSearchStatus::Searching, "search", actor.id)
                .await?
        } else {
            variable
        };

        let candidates = self
            .catalog
            .find_candidates(&variable.concept, &variable.data_type)
            .await?;

        let now = Utc::now();
        let mut matches: Vec<TableMatch> = candidates
            .into_iter()
            .map(|candidate| TableMatch::from_candidate(variable.id, candidate, now))
            .collect();
        matches.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));

        let match_count = matches.len();
        let top_score = matches.first().map(|m| m.score);
        self.store.insert_matches(matches).await?;

        let target = if match_count > 0 {
            VariableSearchStatus::Matched
        } else {
            VariableSearchStatus::NoMatch
        };
        let variable = self
            .transition_variable(variable, target, "search_completed", actor.id)
            .await?;

        info!(
            variable_id = %variable.id,
            match_count,
            top_score,
            "catalog search completed"
        );
        let message = if match_count > 0 {
            format!("{match_count} candidate table(s) found")
        } else {
            "No matching tables found".to_string()
        };
        Ok(SearchOutcome {
            variable,
            match_count,
            top_score,
            message,
        })
    }

    /// Requester chooses one suggested match. Siblings stay Suggested for
    /// potential re-selection; the variable routes to the table owner.
    pub async fn select(
        &self,
        variable_id: Uuid,
        match_id: Uuid,
        actor: &Actor,
    ) -> Result<TransitionOutcome<TableMatch>> {
        let variable = self.store.get_variable(variable_id).await?;
        self.check_requester(&variable, actor).await?;

        if variable.search_status != VariableSearchStatus::Matched {
            return Err(CoreError::state_conflict(
                EntityKind::Variable,
                variable_id,
                "matched",
                variable.search_status.to_string(),
            ));
        }
        if let Some(existing) = variable.selected_match_id {
            return Err(CoreError::state_conflict(
                EntityKind::Match,
                existing,
                "no match selected",
                "already selected",
            ));
        }

        let m = self.store.get_match(match_id).await?;
        if m.variable_id != variable_id {
            return Err(CoreError::validation(format!(
                "match {match_id} does not belong to variable {variable_id}"
            )));
        }
        if m.status != MatchStatus::Suggested {
            return Err(CoreError::state_conflict(
                EntityKind::Match,
                match_id,
                MatchStatus::Suggested.to_string(),
                m.status.to_string(),
            ));
        }

        // Record the selection on the variable before touching the match.
        // Losing a concurrent select here leaves every match Suggested; the
        // inverse order could strand an owner-pending match nothing points to.
        let expected = variable.version;
        let mut updated = variable;
        updated.selected_match_id = Some(match_id);
        updated.search_status = VariableSearchStatus::OwnerReview;
        updated.updated_at = Utc::now();
        let committed = self.store.update_variable(updated, expected).await?;
        self.audit_variable(&committed, VariableSearchStatus::Matched, "select", actor.id)
            .await?;
        self.publisher.publish_transition(
            EntityKind::Variable,
            committed.id,
            Some(VariableSearchStatus::Matched.to_string()),
            committed.search_status.to_string(),
            "select",
            "Match selected, awaiting owner validation",
        );

        // Selected is a waypoint; the committed status is owner-pending.
        let m = self
            .transition_match(m, MatchStatus::Selected, "select", actor.id)
            .await?;
        let m = self
            .transition_match(m, MatchStatus::PendingOwner, "route_to_owner", actor.id)
            .await?;

        Ok(TransitionOutcome::new(
            m,
            "Match selected and routed to the table owner",
        ))
    }

    /// Table owner answers the selected match. Exhaustive over the structured
    /// response type; each variant has a deterministic
    /// (match status, variable status) result.
    pub async fn owner_respond(
        &self,
        match_id: Uuid,
        response: OwnerResponse,
        actor: &Actor,
    ) -> Result<TransitionOutcome<TableMatch>> {
        let m = self.store.get_match(match_id).await?;
        if actor.role != ActorRole::Owner {
            return Err(CoreError::permission("owner responses require the owner role"));
        }
        if actor.id != m.owner_id {
            return Err(CoreError::permission(format!(
                "actor {} is not the owner of match {}",
                actor.id, match_id
            )));
        }
        if !m.status.is_owner_pending() {
            return Err(CoreError::state_conflict(
                EntityKind::Match,
                match_id,
                "pending_owner or redirected",
                m.status.to_string(),
            ));
        }

        let variable = self.store.get_variable(m.variable_id).await?;
        let now = Utc::now();
        self.store
            .append_response(ResponseRecord::owner(
                match_id,
                variable.id,
                actor.id,
                response.clone(),
                now,
            ))
            .await?;

        let outcome = match response {
            OwnerResponse::ConfirmMatch { usage_criteria } => {
                let mut staged = m.clone();
                staged.usage_criteria = usage_criteria;
                let m = self
                    .commit_match(staged, m.status, MatchStatus::PendingRequester, "confirm_match", actor.id)
                    .await?;
                self.transition_variable(
                    variable,
                    VariableSearchStatus::RequesterReview,
                    "owner_confirmed",
                    actor.id,
                )
                .await?;
                TransitionOutcome::new(m, "Match confirmed, awaiting requester approval")
            }
            OwnerResponse::CorrectTable {
                table_id,
                usage_criteria,
            } => {
                if table_id.trim().is_empty() {
                    return Err(CoreError::validation("corrected table id must not be empty"));
                }
                let mut staged = m.clone();
                staged.table_id = table_id;
                staged.usage_criteria = usage_criteria;
                let m = self
                    .commit_match(staged, m.status, MatchStatus::PendingRequester, "correct_table", actor.id)
                    .await?;
                self.transition_variable(
                    variable,
                    VariableSearchStatus::RequesterReview,
                    "owner_corrected_table",
                    actor.id,
                )
                .await?;
                TransitionOutcome::new(m, "Table corrected, awaiting requester approval")
            }
            OwnerResponse::DataNotExist { .. } => {
                let m = self
                    .commit_match(m.clone(), m.status, MatchStatus::Rejected, "data_not_exist", actor.id)
                    .await?;
                self.transition_variable(
                    variable,
                    VariableSearchStatus::PendingInvolvement,
                    "data_not_exist",
                    actor.id,
                )
                .await?;
                TransitionOutcome::new(
                    m,
                    "Data does not exist; a data-creation request can be opened",
                )
            }
            OwnerResponse::DelegatePerson { person_id, .. } => {
                let mut staged = m.clone();
                staged.owner_id = person_id;
                let m = self
                    .commit_match(staged, m.status, MatchStatus::Redirected, "delegate_person", actor.id)
                    .await?;
                // Variable stays in owner review so the delegate sees it.
                TransitionOutcome::new(m, "Match delegated to another owner")
            }
            OwnerResponse::DelegateArea { area_id, .. } => {
                if area_id.trim().is_empty() {
                    return Err(CoreError::validation("delegation area must not be empty"));
                }
                let delegate = self.directory.area_owner(&area_id).await?;
                let mut staged = m.clone();
                staged.owner_id = delegate;
                let m = self
                    .commit_match(staged, m.status, MatchStatus::Redirected, "delegate_area", actor.id)
                    .await?;
                TransitionOutcome::new(m, format!("Match delegated to the {area_id} area"))
            }
        };

        Ok(outcome)
    }

    /// Requester's verdict on an owner-confirmed match.
    pub async fn requester_respond(
        &self,
        match_id: Uuid,
        response: RequesterResponse,
        actor: &Actor,
    ) -> Result<TransitionOutcome<TableMatch>> {
        let m = self.store.get_match(match_id).await?;
        let variable = self.store.get_variable(m.variable_id).await?;
        self.check_requester(&variable, actor).await?;

        if m.status != MatchStatus::PendingRequester {
            return Err(CoreError::state_conflict(
                EntityKind::Match,
                match_id,
                MatchStatus::PendingRequester.to_string(),
                m.status.to_string(),
            ));
        }

        let now = Utc::now();
        self.store
            .append_response(ResponseRecord::requester(
                match_id,
                variable.id,
                actor.id,
                response.clone(),
                now,
            ))
            .await?;

        match response.routing() {
            None => {
                let m = self
                    .commit_match(m.clone(), m.status, MatchStatus::Approved, "approve", actor.id)
                    .await?;
                self.transition_variable(variable, VariableSearchStatus::Approved, "approve", actor.id)
                    .await?;
                Ok(TransitionOutcome::new(m, "Match approved"))
            }
            Some(routing) => {
                let note = response.note().unwrap_or_default().to_string();
                let mut staged = m.clone();
                staged.loop_count += 1;
                staged.rejection_note = Some(note.clone());
                let rejected = self
                    .commit_match(
                        staged,
                        m.status,
                        MatchStatus::RejectedByRequester,
                        response.response_type(),
                        actor.id,
                    )
                    .await?;

                match routing {
                    RejectionRouting::Research => {
                        let expected = variable.version;
                        let from = variable.search_status;
                        let mut updated = variable;
                        updated.selected_match_id = None;
                        updated.search_status = VariableSearchStatus::Searching;
                        updated.updated_at = Utc::now();
                        let committed = self.store.update_variable(updated, expected).await?;
                        self.audit_variable(&committed, from, response.response_type(), actor.id)
                            .await?;
                        self.publisher.publish_transition(
                            EntityKind::Variable,
                            committed.id,
                            Some(from.to_string()),
                            committed.search_status.to_string(),
                            response.response_type(),
                            "Match rejected; a new search is due",
                        );
                        Ok(TransitionOutcome::new(
                            rejected,
                            "Match rejected; variable returned to search",
                        ))
                    }
                    RejectionRouting::ReturnToOwner => {
                        // Same table, same owner, fresh owner-pending match
                        // carrying the note and the incremented loop count.
                        let rework = rejected.rework(note, Utc::now());
                        self.store.insert_matches(vec![rework.clone()]).await?;
                        self.store
                            .append_transition(TransitionRecord::new(
                                EntityKind::Match,
                                rework.id,
                                None,
                                rework.status.to_string(),
                                "rework",
                                Some(actor.id),
                                rework.created_at,
                            ))
                            .await?;

                        let expected = variable.version;
                        let from = variable.search_status;
                        let mut updated = variable;
                        updated.selected_match_id = Some(rework.id);
                        updated.search_status = VariableSearchStatus::OwnerReview;
                        updated.updated_at = Utc::now();
                        let committed = self.store.update_variable(updated, expected).await?;
                        self.audit_variable(&committed, from, response.response_type(), actor.id)
                            .await?;
                        self.publisher.publish_transition(
                            EntityKind::Variable,
                            committed.id,
                            Some(from.to_string()),
                            committed.search_status.to_string(),
                            response.response_type(),
                            "Match rejected; returned to the table owner",
                        );
                        Ok(TransitionOutcome::new(
                            rejected,
                            "Match rejected; returned to the table owner for rework",
                        ))
                    }
                }
            }
        }
    }

    /// Signal downstream consumption of an approved variable.
    pub async fn mark_in_use(
        &self,
        variable_id: Uuid,
        actor: &Actor,
    ) -> Result<TransitionOutcome<Variable>> {
        let variable = self.store.get_variable(variable_id).await?;
        match actor.role {
            ActorRole::Curator => {}
            ActorRole::Requester => {
                let case = self.store.get_case(variable.case_id).await?;
                if actor.id != case.requester_id {
                    return Err(CoreError::permission(format!(
                        "actor {} is not the requester of case {}",
                        actor.id, case.id
                    )));
                }
            }
            _ => {
                return Err(CoreError::permission(
                    "marking a variable in use requires the requester or curator role",
                ))
            }
        }

        if variable.search_status != VariableSearchStatus::Approved {
            return Err(CoreError::state_conflict(
                EntityKind::Variable,
                variable_id,
                "approved",
                variable.search_status.to_string(),
            ));
        }

        let variable = self
            .transition_variable(variable, VariableSearchStatus::InUse, "mark_in_use", actor.id)
            .await?;
        Ok(TransitionOutcome::new(variable, "Variable marked in use"))
    }

    async fn check_requester(&self, variable: &Variable, actor: &Actor) -> Result<()> {
        if actor.role != ActorRole::Requester {
            return Err(CoreError::permission("this operation requires the requester role"));
        }
        let case = self.store.get_case(variable.case_id).await?;
        if actor.id != case.requester_id {
            return Err(CoreError::permission(format!(
                "actor {} is not the requester of case {}",
                actor.id, case.id
            )));
        }
        Ok(())
    }

    async fn transition_variable(
        &self,
        variable: Variable,
        target: VariableSearchStatus,
        event: &str,
        actor_id: Uuid,
    ) -> Result<Variable> {
        let from = variable.search_status;
        let expected = variable.version;
        let mut updated = variable;
        updated.search_status = target;
        updated.updated_at = Utc::now();
        let committed = self.store.update_variable(updated, expected).await?;

        self.audit_variable(&committed, from, event, actor_id).await?;
        self.publisher.publish_transition(
            EntityKind::Variable,
            committed.id,
            Some(from.to_string()),
            committed.search_status.to_string(),
            event,
            format!("Variable moved to {}", committed.search_status),
        );
        Ok(committed)
    }

    /// Commit a staged match mutation with its status transition.
    async fn commit_match(
        &self,
        staged: TableMatch,
        from: MatchStatus,
        target: MatchStatus,
        event: &str,
        actor_id: Uuid,
    ) -> Result<TableMatch> {
        let expected = staged.version;
        let mut updated = staged;
        updated.status = target;
        updated.updated_at = Utc::now();
        let committed = self.store.update_match(updated, expected).await?;

        self.store
            .append_transition(TransitionRecord::new(
                EntityKind::Match,
                committed.id,
                Some(from.to_string()),
                committed.status.to_string(),
                event,
                Some(actor_id),
                committed.updated_at,
            ))
            .await?;
        self.publisher.publish_transition(
            EntityKind::Match,
            committed.id,
            Some(from.to_string()),
            committed.status.to_string(),
            event,
            format!("Match moved to {}", committed.status),
        );
        Ok(committed)
    }

    async fn transition_match(
        &self,
        m: TableMatch,
        target: MatchStatus,
        event: &str,
        actor_id: Uuid,
    ) -> Result<TableMatch> {
        let from = m.status;
        self.commit_match(m, from, target, event, actor_id).await
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
            .map_err(|error| {
                warn!(variable_id = %variable.id, %error, "variable audit append failed");
                error
            })
    }
}
