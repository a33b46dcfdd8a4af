//! Bulk operation coordinator.
//!
//! Applies a single-item action to each id independently, recording per-item
//! failures without aborting the batch. No cross-item locking: an item that
//! races with an unrelated single-item request simply surfaces its state
//! conflict in the failure list. Destructive bulk actions validate their
//! reason before any item is touched; bulk approve pre-filters to items in
//! an approvable state and reports requested vs eligible distinctly.

use std::future::Future;
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

use crate::error::{CoreError, Result};
use crate::models::RequesterResponse;
use crate::state_machine::VariableSearchStatus;
use crate::store::EntityStore;

use super::case_lifecycle::CaseLifecycleManager;
use super::match_resolution::MatchResolutionEngine;
use super::types::{Actor, BulkOutcome, CancelScope};

/// Apply `action` to every id, collecting successes and per-item failures.
pub async fn bulk_apply<F, Fut>(ids: &[Uuid], mut action: F) -> BulkOutcome
where
    F: FnMut(Uuid) -> Fut,
    Fut: Future<Output = Result<String>>,
{
    let mut outcome = BulkOutcome::new(ids.len(), ids.len());
    for &id in ids {
        match action(id).await {
            Ok(_) => outcome.record_success(id),
            Err(err) => outcome.record_failure(id, err.to_string()),
        }
    }
    outcome
}

pub struct BulkOperationCoordinator {
    store: Arc<dyn EntityStore>,
    cases: Arc<CaseLifecycleManager>,
    matches: Arc<MatchResolutionEngine>,
}

impl BulkOperationCoordinator {
    pub fn new(
        store: Arc<dyn EntityStore>,
        cases: Arc<CaseLifecycleManager>,
        matches: Arc<MatchResolutionEngine>,
    ) -> Self {
        Self {
            store,
            cases,
            matches,
        }
    }

    /// Cancel many cases. The reason is required before any item is
    /// processed.
    pub async fn bulk_cancel_cases(
        &self,
        ids: &[Uuid],
        actor: &Actor,
        reason: &str,
        scope: CancelScope,
    ) -> Result<BulkOutcome> {
        require_reason(reason)?;
        let outcome = bulk_apply(ids, |id| async move {
            self.cases
                .cancel(id, actor, Some(reason.to_string()), scope)
                .await
                .map(|o| o.message)
        })
        .await;
        info!(
            requested = outcome.requested,
            succeeded = outcome.succeeded.len(),
            failed = outcome.failed.len(),
            "bulk case cancel finished"
        );
        Ok(outcome)
    }

    /// Cancel many variables. The reason is required before any item is
    /// processed.
    pub async fn bulk_cancel_variables(
        &self,
        ids: &[Uuid],
        actor: &Actor,
        reason: &str,
    ) -> Result<BulkOutcome> {
        require_reason(reason)?;
        let outcome = bulk_apply(ids, |id| async move {
            self.cases
                .cancel_variable(id, actor, Some(reason.to_string()))
                .await
                .map(|o| o.message)
        })
        .await;
        info!(
            requested = outcome.requested,
            succeeded = outcome.succeeded.len(),
            failed = outcome.failed.len(),
            "bulk variable cancel finished"
        );
        Ok(outcome)
    }

    /// Approve many variables' selected matches. Input is filtered down to
    /// variables actually awaiting the requester's verdict; ineligible ids
    /// are neither processed nor reported as failures, only reflected in
    /// the requested/eligible counts.
    pub async fn bulk_approve_variables(&self, ids: &[Uuid], actor: &Actor) -> Result<BulkOutcome> {
        let mut eligible = Vec::new();
        for &id in ids {
            let Ok(variable) = self.store.get_variable(id).await else {
                continue;
            };
            if variable.search_status == VariableSearchStatus::RequesterReview {
                if let Some(match_id) = variable.selected_match_id {
                    eligible.push((id, match_id));
                }
            }
        }

        let mut outcome = BulkOutcome::new(ids.len(), eligible.len());
        for (variable_id, match_id) in eligible {
            match self
                .matches
                .requester_respond(match_id, RequesterResponse::Approve, actor)
                .await
            {
                Ok(_) => outcome.record_success(variable_id),
                Err(err) => outcome.record_failure(variable_id, err.to_string()),
            }
        }
        info!(
            requested = outcome.requested,
            eligible = outcome.eligible,
            succeeded = outcome.succeeded.len(),
            failed = outcome.failed.len(),
            "bulk approve finished"
        );
        Ok(outcome)
    }
}

fn require_reason(reason: &str) -> Result<()> {
    if reason.trim().is_empty() {
        return Err(CoreError::validation(
            "a non-empty reason is required for bulk cancellation",
        ));
    }
    Ok(())
}
