//! Typed lifecycle events emitted by workflow instances.
//!
//! Every event carries a strongly-typed payload; subscribers either take a
//! broadcast receiver (async fan-out) or register a synchronous callback
//! invoked in registration order.

pub mod publisher;

pub use publisher::{EventPublisher, PublishedEvent, SubscriptionId, WorkflowEvent};
