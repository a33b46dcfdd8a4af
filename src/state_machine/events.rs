use serde::{Deserialize, Serialize};

/// Events that can trigger case state transitions
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum CaseEvent {
    /// Requester submits the case for approval
    Submit,
    /// Approver picks the case up for review
    BeginReview,
    /// Approver accepts the case
    Approve,
    /// Approver rejects the case
    Reject,
    /// Requester reopens a rejected case for rework
    Reopen,
    /// Approver closes a fully approved case
    Close,
    /// Requester cancels the case with an optional reason
    Cancel(Option<String>),
}

impl CaseEvent {
    /// Get a string representation of the event type for audit and logging
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::Submit => "submit",
            Self::BeginReview => "begin_review",
            Self::Approve => "approve",
            Self::Reject => "reject",
            Self::Reopen => "reopen",
            Self::Close => "close",
            Self::Cancel(_) => "cancel",
        }
    }

    /// Extract the cancellation reason if this is a cancel event
    pub fn cancellation_reason(&self) -> Option<&str> {
        match self {
            Self::Cancel(reason) => reason.as_deref(),
            _ => None,
        }
    }

    /// Check if this event leads to a terminal state
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Close | Self::Cancel(_))
    }

    /// Events only the case's requester may fire
    pub fn is_requester_event(&self) -> bool {
        matches!(self, Self::Submit | Self::Reopen | Self::Cancel(_))
    }

    /// Events only an approver may fire
    pub fn is_approver_event(&self) -> bool {
        !self.is_requester_event()
    }
}

impl CaseEvent {
    /// Create a cancel event with the given reason
    pub fn cancel_with_reason(reason: impl Into<String>) -> Self {
        Self::Cancel(Some(reason.into()))
    }
}
