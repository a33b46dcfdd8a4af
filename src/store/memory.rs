//! In-memory reference implementation of [`EntityStore`].
//!
//! Per-entity maps with per-record version checks give the same
//! check-and-set semantics a durable backend would. The match map sits
//! behind a single RwLock so candidate-set inserts are all-or-nothing;
//! audit logs are append-only vectors.

use async_trait::async_trait;
use dashmap::DashMap;
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use uuid::Uuid;

use super::{EntityStore, TransitionRecord};
use crate::error::{CoreError, EntityKind, Result};
use crate::models::{Approval, Case, Involvement, ResponseRecord, TableMatch, Variable};
use crate::state_machine::{ApprovalStatus, InvolvementStatus};

#[derive(Default)]
pub struct InMemoryStore {
    cases: DashMap<Uuid, Case>,
    variables: DashMap<Uuid, Variable>,
    matches: RwLock<HashMap<Uuid, TableMatch>>,
    involvements: DashMap<Uuid, Involvement>,
    approvals: DashMap<Uuid, Approval>,
    transitions: Mutex<Vec<TransitionRecord>>,
    responses: Mutex<Vec<ResponseRecord>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn version_conflict(kind: EntityKind, id: Uuid, expected: u64, actual: u64) -> CoreError {
    CoreError::state_conflict(
        kind,
        id,
        format!("version {expected}"),
        format!("version {actual}"),
    )
}

fn duplicate(kind: EntityKind, id: Uuid) -> CoreError {
    CoreError::Storage(format!("{kind} {id} already exists"))
}

#[async_trait]
impl EntityStore for InMemoryStore {
    async fn insert_case(&self, case: Case) -> Result<Case> {
        if self.cases.contains_key(&case.id) {
            return Err(duplicate(EntityKind::Case, case.id));
        }
        self.cases.insert(case.id, case.clone());
        Ok(case)
    }

    async fn get_case(&self, id: Uuid) -> Result<Case> {
        self.cases
            .get(&id)
            .map(|entry| entry.clone())
            .ok_or_else(|| CoreError::not_found(EntityKind::Case, id))
    }

    async fn update_case(&self, mut case: Case, expected_version: u64) -> Result<Case> {
        let mut entry = self
            .cases
            .get_mut(&case.id)
            .ok_or_else(|| CoreError::not_found(EntityKind::Case, case.id))?;
        if entry.version != expected_version {
            return Err(version_conflict(
                EntityKind::Case,
                case.id,
                expected_version,
                entry.version,
            ));
        }
        case.version = expected_version + 1;
        *entry = case.clone();
        Ok(case)
    }

    async fn insert_variable(&self, variable: Variable) -> Result<Variable> {
        if self.variables.contains_key(&variable.id) {
            return Err(duplicate(EntityKind::Variable, variable.id));
        }
        self.variables.insert(variable.id, variable.clone());
        Ok(variable)
    }

    async fn get_variable(&self, id: Uuid) -> Result<Variable> {
        self.variables
            .get(&id)
            .map(|entry| entry.clone())
            .ok_or_else(|| CoreError::not_found(EntityKind::Variable, id))
    }

    async fn update_variable(&self, mut variable: Variable, expected_version: u64) -> Result<Variable> {
        let mut entry = self
            .variables
            .get_mut(&variable.id)
            .ok_or_else(|| CoreError::not_found(EntityKind::Variable, variable.id))?;
        if entry.version != expected_version {
            return Err(version_conflict(
                EntityKind::Variable,
                variable.id,
                expected_version,
                entry.version,
            ));
        }
        variable.version = expected_version + 1;
        *entry = variable.clone();
        Ok(variable)
    }

    async fn variables_for_case(&self, case_id: Uuid) -> Result<Vec<Variable>> {
        let mut result: Vec<Variable> = self
            .variables
            .iter()
            .filter(|entry| entry.case_id == case_id)
            .map(|entry| entry.clone())
            .collect();
        result.sort_by_key(|v| v.created_at);
        Ok(result)
    }

    async fn get_match(&self, id: Uuid) -> Result<TableMatch> {
        self.matches
            .read()
            .get(&id)
            .cloned()
            .ok_or_else(|| CoreError::not_found(EntityKind::Match, id))
    }

    async fn update_match(&self, mut m: TableMatch, expected_version: u64) -> Result<TableMatch> {
        let mut matches = self.matches.write();
        let entry = matches
            .get_mut(&m.id)
            .ok_or_else(|| CoreError::not_found(EntityKind::Match, m.id))?;
        if entry.version != expected_version {
            return Err(version_conflict(
                EntityKind::Match,
                m.id,
                expected_version,
                entry.version,
            ));
        }
        m.version = expected_version + 1;
        *entry = m.clone();
        Ok(m)
    }

    async fn insert_matches(&self, batch: Vec<TableMatch>) -> Result<()> {
        let mut matches = self.matches.write();
        for m in &batch {
            if matches.contains_key(&m.id) {
                return Err(duplicate(EntityKind::Match, m.id));
            }
        }
        for m in batch {
            matches.insert(m.id, m);
        }
        Ok(())
    }

    async fn matches_for_variable(&self, variable_id: Uuid) -> Result<Vec<TableMatch>> {
        let mut result: Vec<TableMatch> = self
            .matches
            .read()
            .values()
            .filter(|m| m.variable_id == variable_id)
            .cloned()
            .collect();
        result.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        Ok(result)
    }

    async fn insert_involvement(&self, involvement: Involvement) -> Result<Involvement> {
        if self.involvements.contains_key(&involvement.id) {
            return Err(duplicate(EntityKind::Involvement, involvement.id));
        }
        self.involvements.insert(involvement.id, involvement.clone());
        Ok(involvement)
    }

    async fn get_involvement(&self, id: Uuid) -> Result<Involvement> {
        self.involvements
            .get(&id)
            .map(|entry| entry.clone())
            .ok_or_else(|| CoreError::not_found(EntityKind::Involvement, id))
    }

    async fn update_involvement(
        &self,
        mut involvement: Involvement,
        expected_version: u64,
    ) -> Result<Involvement> {
        let mut entry = self
            .involvements
            .get_mut(&involvement.id)
            .ok_or_else(|| CoreError::not_found(EntityKind::Involvement, involvement.id))?;
        if entry.version != expected_version {
            return Err(version_conflict(
                EntityKind::Involvement,
                involvement.id,
                expected_version,
                entry.version,
            ));
        }
        involvement.version = expected_version + 1;
        *entry = involvement.clone();
        Ok(involvement)
    }

    async fn involvement_for_variable(&self, variable_id: Uuid) -> Result<Option<Involvement>> {
        Ok(self
            .involvements
            .iter()
            .find(|entry| entry.variable_id == variable_id)
            .map(|entry| entry.clone()))
    }

    async fn list_open_involvements(&self) -> Result<Vec<Involvement>> {
        let mut result: Vec<Involvement> = self
            .involvements
            .iter()
            .filter(|entry| entry.status != InvolvementStatus::Completed)
            .map(|entry| entry.clone())
            .collect();
        result.sort_by_key(|i| i.created_at);
        Ok(result)
    }

    async fn insert_approval(&self, approval: Approval) -> Result<Approval> {
        if self.approvals.contains_key(&approval.id) {
            return Err(duplicate(EntityKind::Approval, approval.id));
        }
        self.approvals.insert(approval.id, approval.clone());
        Ok(approval)
    }

    async fn get_approval(&self, id: Uuid) -> Result<Approval> {
        self.approvals
            .get(&id)
            .map(|entry| entry.clone())
            .ok_or_else(|| CoreError::not_found(EntityKind::Approval, id))
    }

    async fn update_approval(&self, mut approval: Approval, expected_version: u64) -> Result<Approval> {
        let mut entry = self
            .approvals
            .get_mut(&approval.id)
            .ok_or_else(|| CoreError::not_found(EntityKind::Approval, approval.id))?;
        if entry.version != expected_version {
            return Err(version_conflict(
                EntityKind::Approval,
                approval.id,
                expected_version,
                entry.version,
            ));
        }
        approval.version = expected_version + 1;
        *entry = approval.clone();
        Ok(approval)
    }

    async fn open_approval_for_case(&self, case_id: Uuid) -> Result<Option<Approval>> {
        Ok(self
            .approvals
            .iter()
            .find(|entry| entry.case_id == case_id && !entry.status.is_terminal())
            .map(|entry| entry.clone()))
    }

    async fn list_pending_approvals(&self) -> Result<Vec<Approval>> {
        let mut result: Vec<Approval> = self
            .approvals
            .iter()
            .filter(|entry| entry.status == ApprovalStatus::Pending)
            .map(|entry| entry.clone())
            .collect();
        result.sort_by_key(|a| a.requested_at);
        Ok(result)
    }

    async fn append_transition(&self, record: TransitionRecord) -> Result<()> {
        self.transitions.lock().push(record);
        Ok(())
    }

    async fn append_response(&self, record: ResponseRecord) -> Result<()> {
        self.responses.lock().push(record);
        Ok(())
    }

    async fn transitions_for(
        &self,
        kind: EntityKind,
        entity_id: Uuid,
    ) -> Result<Vec<TransitionRecord>> {
        Ok(self
            .transitions
            .lock()
            .iter()
            .filter(|t| t.entity_kind == kind && t.entity_id == entity_id)
            .cloned()
            .collect())
    }

    async fn responses_for_match(&self, match_id: Uuid) -> Result<Vec<ResponseRecord>> {
        Ok(self
            .responses
            .lock()
            .iter()
            .filter(|r| r.match_id == match_id)
            .cloned()
            .collect())
    }
}
