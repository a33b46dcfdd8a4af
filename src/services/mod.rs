//! External collaborator seams.
//!
//! The core never talks to the catalog, the directory, or a notification
//! transport directly; it goes through these traits. Implementations live
//! outside the crate (test doubles live in the integration suite).

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::Result;

/// A ranked candidate table returned by the catalog for a variable's concept
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogCandidate {
    pub table_id: String,
    pub owner_id: Uuid,
    pub score: f64,
    pub rationale: String,
    pub matched_columns: Vec<String>,
}

/// Catalog/search provider returning ranked candidate tables
#[async_trait]
pub trait CatalogSearch: Send + Sync {
    async fn find_candidates(&self, concept: &str, data_type: &str) -> Result<Vec<CatalogCandidate>>;
}

/// Directory service resolving delegation targets and escalation chains
#[async_trait]
pub trait DirectoryService: Send + Sync {
    /// The accountable person for an organizational area
    async fn area_owner(&self, area_id: &str) -> Result<Uuid>;

    /// The approver one level above the given one, if the hierarchy goes
    /// that high
    async fn next_approver(&self, current: Uuid, level: u32) -> Result<Option<Uuid>>;
}

/// Outbound channel for reminders and escalation notices
#[async_trait]
pub trait NotificationChannel: Send + Sync {
    async fn notify(&self, recipient: Uuid, subject: &str, body: &str) -> Result<()>;
}
