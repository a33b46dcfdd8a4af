use serde::{Deserialize, Serialize};
use std::fmt;

/// Case lifecycle states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CaseStatus {
    /// Initial state when the requester is still composing the case
    Draft,
    /// Submitted for approval, waiting for the approver to pick it up
    Submitted,
    /// Approver is actively reviewing
    Review,
    /// Approver accepted the case; variables proceed through matching
    Approved,
    /// Approver rejected the case; requester may reopen
    Rejected,
    /// All active variables approved and the case wrapped up
    Closed,
    /// Cancelled by the requester; cascades to active variables
    Cancelled,
}

impl CaseStatus {
    /// Check if this is a terminal state (no further transitions allowed)
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Closed | Self::Cancelled)
    }

    /// Check if the case is still in flight
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Submitted | Self::Review | Self::Approved)
    }
}

impl fmt::Display for CaseStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Draft => write!(f, "draft"),
            Self::Submitted => write!(f, "submitted"),
            Self::Review => write!(f, "review"),
            Self::Approved => write!(f, "approved"),
            Self::Rejected => write!(f, "rejected"),
            Self::Closed => write!(f, "closed"),
            Self::Cancelled => write!(f, "cancelled"),
        }
    }
}

impl std::str::FromStr for CaseStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "draft" => Ok(Self::Draft),
            "submitted" => Ok(Self::Submitted),
            "review" => Ok(Self::Review),
            "approved" => Ok(Self::Approved),
            "rejected" => Ok(Self::Rejected),
            "closed" => Ok(Self::Closed),
            "cancelled" => Ok(Self::Cancelled),
            _ => Err(format!("Invalid case status: {s}")),
        }
    }
}

impl Default for CaseStatus {
    fn default() -> Self {
        Self::Draft
    }
}

/// Search/matching progress of a single variable
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VariableSearchStatus {
    /// Created with its case, not yet searched
    Pending,
    /// Catalog query in flight
    Searching,
    /// Candidate matches exist, none selected yet
    Matched,
    /// Catalog query returned no candidates
    NoMatch,
    /// A match was selected and awaits the table owner's response
    OwnerReview,
    /// Owner confirmed; awaiting the requester's decision
    RequesterReview,
    /// Requester approved the match
    Approved,
    /// Downstream consumption started; terminal success
    InUse,
    /// Owner declared the data does not exist; a data-creation request is due
    PendingInvolvement,
    /// Cancelled, individually or via case cascade
    Cancelled,
}

impl VariableSearchStatus {
    /// Check if this is a terminal state (no further transitions allowed)
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::InUse | Self::Cancelled)
    }

    /// Check if the variable counts as satisfied for case close purposes
    pub fn is_satisfied(&self) -> bool {
        matches!(self, Self::Approved | Self::InUse)
    }

    /// Check if a catalog search may be started from this state
    pub fn allows_search(&self) -> bool {
        matches!(self, Self::Pending | Self::Searching | Self::NoMatch)
    }
}

impl fmt::Display for VariableSearchStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Searching => write!(f, "searching"),
            Self::Matched => write!(f, "matched"),
            Self::NoMatch => write!(f, "no_match"),
            Self::OwnerReview => write!(f, "owner_review"),
            Self::RequesterReview => write!(f, "requester_review"),
            Self::Approved => write!(f, "approved"),
            Self::InUse => write!(f, "in_use"),
            Self::PendingInvolvement => write!(f, "pending_involvement"),
            Self::Cancelled => write!(f, "cancelled"),
        }
    }
}

impl std::str::FromStr for VariableSearchStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "searching" => Ok(Self::Searching),
            "matched" => Ok(Self::Matched),
            "no_match" => Ok(Self::NoMatch),
            "owner_review" => Ok(Self::OwnerReview),
            "requester_review" => Ok(Self::RequesterReview),
            "approved" => Ok(Self::Approved),
            "in_use" => Ok(Self::InUse),
            "pending_involvement" => Ok(Self::PendingInvolvement),
            "cancelled" => Ok(Self::Cancelled),
            _ => Err(format!("Invalid variable search status: {s}")),
        }
    }
}

impl Default for VariableSearchStatus {
    fn default() -> Self {
        Self::Pending
    }
}

/// Status of a candidate binding between a variable and a catalog table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchStatus {
    /// Produced by a catalog search, not yet chosen
    Suggested,
    /// Chosen by the requester
    Selected,
    /// Routed to the table owner for validation
    PendingOwner,
    /// Owner confirmed; waiting on the requester's decision
    PendingRequester,
    /// Requester approved the binding
    Approved,
    /// Rejected by the owner (data does not exist)
    Rejected,
    /// Rejected by the requester with a structured reason
    RejectedByRequester,
    /// Delegated to another owner or area; still owner-pending
    Redirected,
    /// Awaiting an out-of-band validation step
    PendingValidation,
}

impl MatchStatus {
    /// Check if this is a terminal state (no further transitions allowed)
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Approved | Self::Rejected | Self::RejectedByRequester)
    }

    /// Check if the match sits in the owner's queue
    pub fn is_owner_pending(&self) -> bool {
        matches!(self, Self::PendingOwner | Self::Redirected)
    }
}

impl fmt::Display for MatchStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Suggested => write!(f, "suggested"),
            Self::Selected => write!(f, "selected"),
            Self::PendingOwner => write!(f, "pending_owner"),
            Self::PendingRequester => write!(f, "pending_requester"),
            Self::Approved => write!(f, "approved"),
            Self::Rejected => write!(f, "rejected"),
            Self::RejectedByRequester => write!(f, "rejected_by_requester"),
            Self::Redirected => write!(f, "redirected"),
            Self::PendingValidation => write!(f, "pending_validation"),
        }
    }
}

impl std::str::FromStr for MatchStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "suggested" => Ok(Self::Suggested),
            "selected" => Ok(Self::Selected),
            "pending_owner" => Ok(Self::PendingOwner),
            "pending_requester" => Ok(Self::PendingRequester),
            "approved" => Ok(Self::Approved),
            "rejected" => Ok(Self::Rejected),
            "rejected_by_requester" => Ok(Self::RejectedByRequester),
            "redirected" => Ok(Self::Redirected),
            "pending_validation" => Ok(Self::PendingValidation),
            _ => Err(format!("Invalid match status: {s}")),
        }
    }
}

/// Stored status of a data-creation request. Overdue is derived, never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvolvementStatus {
    /// Created, waiting for the owner to commit to a date
    Pending,
    /// Owner set an expected completion date
    InProgress,
    /// Owner delivered the data
    Completed,
}

impl InvolvementStatus {
    /// Check if this is a terminal state (no further transitions allowed)
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed)
    }
}

impl fmt::Display for InvolvementStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::InProgress => write!(f, "in_progress"),
            Self::Completed => write!(f, "completed"),
        }
    }
}

impl std::str::FromStr for InvolvementStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "in_progress" => Ok(Self::InProgress),
            "completed" => Ok(Self::Completed),
            _ => Err(format!("Invalid involvement status: {s}")),
        }
    }
}

impl Default for InvolvementStatus {
    fn default() -> Self {
        Self::Pending
    }
}

/// Status of an approval gate on a case
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalStatus {
    /// Waiting on the current approver
    Pending,
    /// Approver accepted; terminal
    Approved,
    /// Approver rejected; terminal
    Rejected,
    /// Reassigned upward past its SLA deadline; transient within a sweep
    Escalated,
    /// Cancelled along with its case; terminal
    Cancelled,
}

impl ApprovalStatus {
    /// Check if this is a terminal state (record retained for audit only)
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Approved | Self::Rejected | Self::Cancelled)
    }
}

impl fmt::Display for ApprovalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Approved => write!(f, "approved"),
            Self::Rejected => write!(f, "rejected"),
            Self::Escalated => write!(f, "escalated"),
            Self::Cancelled => write!(f, "cancelled"),
        }
    }
}

impl std::str::FromStr for ApprovalStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "approved" => Ok(Self::Approved),
            "rejected" => Ok(Self::Rejected),
            "escalated" => Ok(Self::Escalated),
            "cancelled" => Ok(Self::Cancelled),
            _ => Err(format!("Invalid approval status: {s}")),
        }
    }
}
