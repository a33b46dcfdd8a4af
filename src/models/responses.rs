//! Structured owner and requester responses.
//!
//! Payloads differ per response type, so both are tagged unions with
//! exhaustive handling in the match resolution engine rather than a bag of
//! optional fields. Every response is also persisted as an audit record.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A table owner's structured answer to a selected match
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "response_type", rename_all = "snake_case")]
pub enum OwnerResponse {
    /// The table fits; optionally constrain how it may be used
    ConfirmMatch { usage_criteria: Option<String> },
    /// The data exists, but in a different table
    CorrectTable {
        table_id: String,
        usage_criteria: Option<String>,
    },
    /// The requested data does not exist anywhere the owner knows of
    DataNotExist { note: Option<String> },
    /// Another person should answer for this table
    DelegatePerson { person_id: Uuid, note: Option<String> },
    /// Another area should answer for this table
    DelegateArea { area_id: String, note: Option<String> },
}

impl OwnerResponse {
    /// Response type string for audit records and logging
    pub fn response_type(&self) -> &'static str {
        match self {
            Self::ConfirmMatch { .. } => "confirm_match",
            Self::CorrectTable { .. } => "correct_table",
            Self::DataNotExist { .. } => "data_not_exist",
            Self::DelegatePerson { .. } => "delegate_person",
            Self::DelegateArea { .. } => "delegate_area",
        }
    }

    /// Whether the response hands the match to a different owner
    pub fn is_delegation(&self) -> bool {
        matches!(self, Self::DelegatePerson { .. } | Self::DelegateArea { .. })
    }
}

/// Where a requester rejection routes the variable next
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectionRouting {
    /// The binding itself is wrong; run a fresh catalog search
    Research,
    /// The table is right but needs rework; return to the same owner
    ReturnToOwner,
}

/// The requester's structured verdict on an owner-confirmed match
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "response_type", rename_all = "snake_case")]
pub enum RequesterResponse {
    Approve,
    RejectWrongData { note: String },
    RejectIncomplete { note: String },
    RejectWrongGranularity { note: String },
    RejectWrongPeriod { note: String },
    RejectOther { note: String },
}

impl RequesterResponse {
    /// Response type string for audit records and logging
    pub fn response_type(&self) -> &'static str {
        match self {
            Self::Approve => "approve",
            Self::RejectWrongData { .. } => "reject_wrong_data",
            Self::RejectIncomplete { .. } => "reject_incomplete",
            Self::RejectWrongGranularity { .. } => "reject_wrong_granularity",
            Self::RejectWrongPeriod { .. } => "reject_wrong_period",
            Self::RejectOther { .. } => "reject_other",
        }
    }

    pub fn is_rejection(&self) -> bool {
        !matches!(self, Self::Approve)
    }

    /// The rejection note, if any
    pub fn note(&self) -> Option<&str> {
        match self {
            Self::Approve => None,
            Self::RejectWrongData { note }
            | Self::RejectIncomplete { note }
            | Self::RejectWrongGranularity { note }
            | Self::RejectWrongPeriod { note }
            | Self::RejectOther { note } => Some(note),
        }
    }

    /// Routing for a rejection. Wrong data, incomplete and other restart the
    /// search; wrong granularity and wrong period go back to the same owner.
    pub fn routing(&self) -> Option<RejectionRouting> {
        match self {
            Self::Approve => None,
            Self::RejectWrongData { .. } | Self::RejectIncomplete { .. } | Self::RejectOther { .. } => {
                Some(RejectionRouting::Research)
            }
            Self::RejectWrongGranularity { .. } | Self::RejectWrongPeriod { .. } => {
                Some(RejectionRouting::ReturnToOwner)
            }
        }
    }
}

/// Either side of the validation dialogue, for the audit log
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "party", rename_all = "snake_case")]
pub enum ResponsePayload {
    Owner(OwnerResponse),
    Requester(RequesterResponse),
}

/// Persisted audit record of a structured response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResponseRecord {
    pub id: Uuid,
    pub match_id: Uuid,
    pub variable_id: Uuid,
    pub actor_id: Uuid,
    pub payload: ResponsePayload,
    pub recorded_at: DateTime<Utc>,
}

impl ResponseRecord {
    pub fn owner(
        match_id: Uuid,
        variable_id: Uuid,
        actor_id: Uuid,
        response: OwnerResponse,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            match_id,
            variable_id,
            actor_id,
            payload: ResponsePayload::Owner(response),
            recorded_at: now,
        }
    }

    pub fn requester(
        match_id: Uuid,
        variable_id: Uuid,
        actor_id: Uuid,
        response: RequesterResponse,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            match_id,
            variable_id,
            actor_id,
            payload: ResponsePayload::Requester(response),
            recorded_at: now,
        }
    }
}
