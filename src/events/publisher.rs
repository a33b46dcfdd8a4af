use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::error::EntityKind;

/// A committed state transition, published after the store write succeeds.
///
/// Subscribers are optional: the core is correct without any listener, the
/// channel only reduces staleness for pull-based readers.
#[derive(Debug, Clone, Serialize)]
pub struct WorkflowEvent {
    pub entity_kind: EntityKind,
    pub entity_id: Uuid,
    pub from_state: Option<String>,
    pub to_state: String,
    pub event: String,
    pub message: String,
    pub occurred_at: DateTime<Utc>,
}

/// Broadcast publisher for workflow transition events
#[derive(Debug, Clone)]
pub struct EventPublisher {
    sender: broadcast::Sender<WorkflowEvent>,
}

impl EventPublisher {
    /// Create a new event publisher with the specified channel capacity
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish a transition event. Having no subscribers is not an error.
    pub fn publish(&self, event: WorkflowEvent) {
        let _ = self.sender.send(event);
    }

    /// Convenience constructor + publish for the common case
    pub fn publish_transition(
        &self,
        entity_kind: EntityKind,
        entity_id: Uuid,
        from_state: Option<String>,
        to_state: impl Into<String>,
        event: impl Into<String>,
        message: impl Into<String>,
    ) {
        self.publish(WorkflowEvent {
            entity_kind,
            entity_id,
            from_state,
            to_state: to_state.into(),
            event: event.into(),
            message: message.into(),
            occurred_at: Utc::now(),
        });
    }

    /// Subscribe to transition events
    pub fn subscribe(&self) -> broadcast::Receiver<WorkflowEvent> {
        self.sender.subscribe()
    }

    /// Get the number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventPublisher {
    fn default() -> Self {
        Self::new(1024)
    }
}
