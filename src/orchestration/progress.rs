//! Pull-based progress summaries per case and per variable.
//!
//! Read models aggregated from the store on demand; correct at any polling
//! cadence. The event channel only reduces staleness, it is never the
//! source of truth.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

use crate::error::Result;
use crate::state_machine::{ApprovalStatus, CaseStatus, InvolvementStatus, VariableSearchStatus};
use crate::store::EntityStore;

/// Snapshot of an open approval for display
#[derive(Debug, Clone, Serialize)]
pub struct ApprovalSummary {
    pub approval_id: Uuid,
    pub approver_id: Uuid,
    pub status: ApprovalStatus,
    pub escalation_level: u32,
    pub sla_deadline: DateTime<Utc>,
}

/// Per-case progress: counts by variable status plus the best match score
#[derive(Debug, Clone, Serialize)]
pub struct CaseProgress {
    pub case_id: Uuid,
    pub status: CaseStatus,
    pub total_variables: usize,
    pub active_variables: usize,
    pub satisfied_variables: usize,
    pub cancelled_variables: usize,
    pub by_status: HashMap<VariableSearchStatus, usize>,
    pub top_match_score: Option<f64>,
    pub open_approval: Option<ApprovalSummary>,
}

/// Snapshot of a variable's involvement, with the derived overdue fields
#[derive(Debug, Clone, Serialize)]
pub struct InvolvementSummary {
    pub involvement_id: Uuid,
    pub external_request_number: String,
    pub status: InvolvementStatus,
    pub is_overdue: bool,
    pub days_overdue: i64,
    pub days_until_due: Option<i64>,
}

/// Per-variable progress: candidate counts and the selected match
#[derive(Debug, Clone, Serialize)]
pub struct VariableProgress {
    pub variable_id: Uuid,
    pub search_status: VariableSearchStatus,
    pub is_cancelled: bool,
    pub match_count: usize,
    pub top_score: Option<f64>,
    pub selected_match_id: Option<Uuid>,
    pub involvement: Option<InvolvementSummary>,
}

pub struct ProgressQueries {
    store: Arc<dyn EntityStore>,
}

impl ProgressQueries {
    pub fn new(store: Arc<dyn EntityStore>) -> Self {
        Self { store }
    }

    pub async fn case_progress(&self, case_id: Uuid) -> Result<CaseProgress> {
        let case = self.store.get_case(case_id).await?;
        let variables = self.store.variables_for_case(case_id).await?;

        let mut by_status: HashMap<VariableSearchStatus, usize> = HashMap::new();
        let mut top_match_score: Option<f64> = None;
        for variable in &variables {
            *by_status.entry(variable.search_status).or_default() += 1;
            let matches = self.store.matches_for_variable(variable.id).await?;
            if let Some(best) = matches.first() {
                top_match_score = Some(match top_match_score {
                    Some(current) => current.max(best.score),
                    None => best.score,
                });
            }
        }

        let open_approval = self
            .store
            .open_approval_for_case(case_id)
            .await?
            .map(|a| ApprovalSummary {
                approval_id: a.id,
                approver_id: a.approver_id,
                status: a.status,
                escalation_level: a.escalation_level,
                sla_deadline: a.sla_deadline,
            });

        Ok(CaseProgress {
            case_id,
            status: case.status,
            total_variables: variables.len(),
            active_variables: variables.iter().filter(|v| v.is_active()).count(),
            satisfied_variables: variables
                .iter()
                .filter(|v| v.is_active() && v.search_status.is_satisfied())
                .count(),
            cancelled_variables: variables.iter().filter(|v| v.is_cancelled).count(),
            by_status,
            top_match_score,
            open_approval,
        })
    }

    pub async fn variable_progress(&self, variable_id: Uuid) -> Result<VariableProgress> {
        let variable = self.store.get_variable(variable_id).await?;
        let matches = self.store.matches_for_variable(variable_id).await?;
        let now = Utc::now();

        let involvement = self
            .store
            .involvement_for_variable(variable_id)
            .await?
            .map(|i| InvolvementSummary {
                involvement_id: i.id,
                external_request_number: i.external_request_number.clone(),
                status: i.status,
                is_overdue: i.is_overdue(now),
                days_overdue: i.days_overdue(now),
                days_until_due: i.days_until_due(now),
            });

        Ok(VariableProgress {
            variable_id,
            search_status: variable.search_status,
            is_cancelled: variable.is_cancelled,
            match_count: matches.len(),
            top_score: matches.first().map(|m| m.score),
            selected_match_id: variable.selected_match_id,
            involvement,
        })
    }
}
