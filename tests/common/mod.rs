//! Shared fixtures for the integration suite: an in-memory store wired to
//! scripted external collaborators, plus helpers that drive entities into
//! the states a scenario starts from.

#![allow(dead_code)]

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use uuid::Uuid;

use caseflow_core::config::SystemConfig;
use caseflow_core::error::{CoreError, Result};
use caseflow_core::events::EventPublisher;
use caseflow_core::models::{Case, Priority, TableMatch, Variable};
use caseflow_core::orchestration::{
    Actor, ActorRole, ApprovalEscalationScheduler, BulkOperationCoordinator, CaseLifecycleManager,
    InvolvementTracker, MatchResolutionEngine, ProgressQueries, VariableSpec,
};
use caseflow_core::services::{
    CatalogCandidate, CatalogSearch, DirectoryService, NotificationChannel,
};
use caseflow_core::store::{EntityStore, InMemoryStore};

/// Catalog double returning whatever the test scripted
#[derive(Default)]
pub struct ScriptedCatalog {
    pub candidates: Mutex<Vec<CatalogCandidate>>,
}

impl ScriptedCatalog {
    pub fn script(&self, candidates: Vec<CatalogCandidate>) {
        *self.candidates.lock() = candidates;
    }
}

#[async_trait]
impl CatalogSearch for ScriptedCatalog {
    async fn find_candidates(&self, _concept: &str, _data_type: &str) -> Result<Vec<CatalogCandidate>> {
        Ok(self.candidates.lock().clone())
    }
}

/// Directory double with a fixed escalation chain and area owners
#[derive(Default)]
pub struct StaticDirectory {
    pub escalation_chain: Mutex<Vec<Uuid>>,
    pub area_owners: Mutex<HashMap<String, Uuid>>,
}

#[async_trait]
impl DirectoryService for StaticDirectory {
    async fn area_owner(&self, area_id: &str) -> Result<Uuid> {
        self.area_owners
            .lock()
            .get(area_id)
            .copied()
            .ok_or_else(|| CoreError::External(format!("unknown area {area_id}")))
    }

    async fn next_approver(&self, _current: Uuid, level: u32) -> Result<Option<Uuid>> {
        Ok(self
            .escalation_chain
            .lock()
            .get((level as usize).saturating_sub(1))
            .copied())
    }
}

/// Notification double recording every notice; can be told to fail
#[derive(Default)]
pub struct RecordingNotifier {
    pub sent: Mutex<Vec<(Uuid, String)>>,
    pub fail: AtomicBool,
}

impl RecordingNotifier {
    pub fn sent_to(&self, recipient: Uuid) -> usize {
        self.sent.lock().iter().filter(|(r, _)| *r == recipient).count()
    }

    pub fn set_failing(&self, failing: bool) {
        self.fail.store(failing, Ordering::SeqCst);
    }
}

#[async_trait]
impl NotificationChannel for RecordingNotifier {
    async fn notify(&self, recipient: Uuid, subject: &str, _body: &str) -> Result<()> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(CoreError::External("notification channel down".to_string()));
        }
        self.sent.lock().push((recipient, subject.to_string()));
        Ok(())
    }
}

pub struct Harness {
    pub store: Arc<InMemoryStore>,
    pub catalog: Arc<ScriptedCatalog>,
    pub directory: Arc<StaticDirectory>,
    pub notifier: Arc<RecordingNotifier>,
    pub config: Arc<SystemConfig>,
    pub publisher: EventPublisher,
    pub cases: Arc<CaseLifecycleManager>,
    pub matches: Arc<MatchResolutionEngine>,
    pub involvements: Arc<InvolvementTracker>,
    pub scheduler: ApprovalEscalationScheduler,
    pub bulk: BulkOperationCoordinator,
    pub progress: ProgressQueries,
    pub requester: Actor,
    pub approver: Actor,
    pub table_owner: Actor,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_config(SystemConfig::default())
    }

    pub fn with_config(config: SystemConfig) -> Self {
        caseflow_core::logging::init_logging();
        let store = Arc::new(InMemoryStore::new());
        let store_dyn: Arc<dyn EntityStore> = store.clone();
        let catalog = Arc::new(ScriptedCatalog::default());
        let directory = Arc::new(StaticDirectory::default());
        let notifier = Arc::new(RecordingNotifier::default());
        let config = Arc::new(config);
        let publisher = EventPublisher::new(config.event_channel_capacity);

        let cases = Arc::new(CaseLifecycleManager::new(
            store_dyn.clone(),
            publisher.clone(),
            config.clone(),
        ));
        let matches = Arc::new(MatchResolutionEngine::new(
            store_dyn.clone(),
            catalog.clone(),
            directory.clone(),
            publisher.clone(),
        ));
        let involvements = Arc::new(InvolvementTracker::new(
            store_dyn.clone(),
            notifier.clone(),
            publisher.clone(),
            config.clone(),
        ));
        let scheduler = ApprovalEscalationScheduler::new(
            store_dyn.clone(),
            directory.clone(),
            notifier.clone(),
            publisher.clone(),
            config.clone(),
            involvements.clone(),
        );
        let bulk = BulkOperationCoordinator::new(store_dyn.clone(), cases.clone(), matches.clone());
        let progress = ProgressQueries::new(store_dyn);

        Self {
            store,
            catalog,
            directory,
            notifier,
            config,
            publisher,
            cases,
            matches,
            involvements,
            scheduler,
            bulk,
            progress,
            requester: Actor::new(Uuid::new_v4(), ActorRole::Requester),
            approver: Actor::new(Uuid::new_v4(), ActorRole::Approver),
            table_owner: Actor::new(Uuid::new_v4(), ActorRole::Owner),
        }
    }

    /// A scripted candidate owned by the harness table owner.
    pub fn candidate(&self, table_id: &str, score: f64) -> CatalogCandidate {
        CatalogCandidate {
            table_id: table_id.to_string(),
            owner_id: self.table_owner.id,
            score,
            rationale: "concept and grain match".to_string(),
            matched_columns: vec!["value".to_string()],
        }
    }

    /// Create a draft case with `n` pending variables, in a stable order.
    pub async fn case_with_variables(&self, n: usize) -> (Case, Vec<Variable>) {
        let specs = (0..n)
            .map(|i| VariableSpec {
                name: format!("var_{i}"),
                data_type: "numeric".to_string(),
                concept: "monthly default rate".to_string(),
                desired_lag: None,
                priority: Priority::Medium,
            })
            .collect();
        let case = self
            .cases
            .create_case(
                "Credit risk refresh",
                None,
                self.requester.id,
                self.approver.id,
                specs,
            )
            .await
            .unwrap()
            .entity;

        let mut variables = Vec::with_capacity(n);
        for id in &case.variable_ids {
            variables.push(self.store.get_variable(*id).await.unwrap());
        }
        (case, variables)
    }

    /// Search one variable against the given scripted scores; returns the
    /// refreshed variable and its candidate matches, best first.
    pub async fn searched_variable(&self, scores: &[f64]) -> (Case, Variable, Vec<TableMatch>) {
        let candidates = scores
            .iter()
            .enumerate()
            .map(|(i, &score)| self.candidate(&format!("RISK.TABLE_{i}"), score))
            .collect();
        self.catalog.script(candidates);

        let (case, variables) = self.case_with_variables(1).await;
        let variable_id = variables[0].id;
        self.matches.search(variable_id, &self.requester).await.unwrap();

        let variable = self.store.get_variable(variable_id).await.unwrap();
        let matches = self.store.matches_for_variable(variable_id).await.unwrap();
        (case, variable, matches)
    }

    /// Drive one variable to owner review with the top match selected.
    pub async fn variable_in_owner_review(&self) -> (Case, Variable, TableMatch) {
        let (case, variable, matches) = self.searched_variable(&[0.9]).await;
        let selected = self
            .matches
            .select(variable.id, matches[0].id, &self.requester)
            .await
            .unwrap()
            .entity;
        let variable = self.store.get_variable(variable.id).await.unwrap();
        (case, variable, selected)
    }

    /// Drive one variable through owner confirmation into requester review.
    pub async fn variable_in_requester_review(&self) -> (Case, Variable, TableMatch) {
        let (case, variable, selected) = self.variable_in_owner_review().await;
        let confirmed = self
            .matches
            .owner_respond(
                selected.id,
                caseflow_core::models::OwnerResponse::ConfirmMatch { usage_criteria: None },
                &self.table_owner,
            )
            .await
            .unwrap()
            .entity;
        let variable = self.store.get_variable(variable.id).await.unwrap();
        (case, variable, confirmed)
    }
}
