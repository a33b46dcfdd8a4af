// Event system foundation: an in-process broadcast channel carrying one
// typed record per committed transition.

pub mod publisher;

pub use publisher::{EventPublisher, WorkflowEvent};
