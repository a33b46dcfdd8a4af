//! Crate-wide error taxonomy.
//!
//! Every fallible operation in the core returns [`Result`]. Validation and
//! permission failures are never retried; state conflicts carry the observed
//! current state so callers can refetch and retry. Partial batch failure is a
//! structured result (see `orchestration::bulk`), not an error.

use std::fmt;
use uuid::Uuid;

/// The kinds of entities managed by the core, used in errors and audit records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Case,
    Variable,
    Match,
    Involvement,
    Approval,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Case => write!(f, "case"),
            Self::Variable => write!(f, "variable"),
            Self::Match => write!(f, "match"),
            Self::Involvement => write!(f, "involvement"),
            Self::Approval => write!(f, "approval"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CoreError {
    /// A required field is missing or an input value is invalid.
    #[error("validation error: {0}")]
    Validation(String),

    /// The acting party is not allowed to perform the requested transition.
    #[error("permission error: {0}")]
    Permission(String),

    /// No entity with the given id exists.
    #[error("{kind} {id} not found")]
    NotFound { kind: EntityKind, id: Uuid },

    /// A transition was attempted from a stale or incompatible current state.
    /// Carries the actual state observed at write time so the caller can
    /// re-sync and retry.
    #[error("state conflict on {kind} {id}: expected {expected}, found {actual}")]
    StateConflict {
        kind: EntityKind,
        id: Uuid,
        expected: String,
        actual: String,
    },

    /// A case cannot be closed while active variables remain unapproved.
    /// Data-carrying validation failure so callers can report the count.
    #[error("case {case_id} has {pending} variable(s) not approved")]
    VariablesNotApproved { case_id: Uuid, pending: usize },

    /// The underlying entity store failed.
    #[error("storage error: {0}")]
    Storage(String),

    /// Configuration could not be loaded or failed validation.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// An external collaborator (catalog, directory, notifications) failed.
    #[error("external service error: {0}")]
    External(String),
}

impl CoreError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn permission(msg: impl Into<String>) -> Self {
        Self::Permission(msg.into())
    }

    pub fn not_found(kind: EntityKind, id: Uuid) -> Self {
        Self::NotFound { kind, id }
    }

    pub fn state_conflict(
        kind: EntityKind,
        id: Uuid,
        expected: impl Into<String>,
        actual: impl Into<String>,
    ) -> Self {
        Self::StateConflict {
            kind,
            id,
            expected: expected.into(),
            actual: actual.into(),
        }
    }

    /// Whether a caller may reasonably retry after refetching current state.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::StateConflict { .. } | Self::External(_))
    }
}

pub type Result<T> = std::result::Result<T, CoreError>;
