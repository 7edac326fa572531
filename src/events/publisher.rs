use crate::constants::{events as event_names, system};
use crate::models::User;
use parking_lot::RwLock;
use serde::Serialize;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use tokio::sync::broadcast;

/// Lifecycle events a workflow instance emits.
///
/// The payloads are typed rather than free-form maps, so subscribers can
/// pattern-match instead of probing string-keyed dictionaries.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WorkflowEvent {
    StateAdded {
        workflow_id: String,
        state: String,
    },
    StateChanged {
        workflow_id: String,
        from_state: Option<String>,
        to_state: String,
        user: User,
        context: Value,
    },
    ContextUpdated {
        workflow_id: String,
        old_context: Value,
        new_context: Value,
        user: User,
    },
    WorkflowReset {
        workflow_id: String,
        user: User,
        reset_context: Value,
    },
}

impl WorkflowEvent {
    /// String tag for logging.
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::StateAdded { .. } => event_names::STATE_ADDED,
            Self::StateChanged { .. } => event_names::STATE_CHANGED,
            Self::ContextUpdated { .. } => event_names::CONTEXT_UPDATED,
            Self::WorkflowReset { .. } => event_names::WORKFLOW_RESET,
        }
    }

    /// The workflow instance this event belongs to.
    pub fn workflow_id(&self) -> &str {
        match self {
            Self::StateAdded { workflow_id, .. }
            | Self::StateChanged { workflow_id, .. }
            | Self::ContextUpdated { workflow_id, .. }
            | Self::WorkflowReset { workflow_id, .. } => workflow_id,
        }
    }
}

/// An event that has been published, stamped with its publication time.
#[derive(Debug, Clone, Serialize)]
pub struct PublishedEvent {
    pub event: WorkflowEvent,
    pub published_at: chrono::DateTime<chrono::Utc>,
}

/// Handle returned by [`EventPublisher::on`], used to deregister.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type EventCallback = Box<dyn Fn(&PublishedEvent) + Send + Sync>;

struct CallbackEntry {
    id: SubscriptionId,
    callback: EventCallback,
}

struct CallbackRegistry {
    entries: Vec<CallbackEntry>,
    next_id: u64,
}

/// Event publisher for workflow lifecycle events.
///
/// Fan-out happens two ways: a `tokio` broadcast channel for async
/// consumers, and synchronous callbacks run in registration order during
/// `publish`. Zero subscribers is not an error; a lagging broadcast
/// receiver drops its own backlog without affecting the transition that
/// emitted the event.
#[derive(Clone)]
pub struct EventPublisher {
    sender: broadcast::Sender<PublishedEvent>,
    callbacks: Arc<RwLock<CallbackRegistry>>,
}

impl EventPublisher {
    /// Create a new event publisher with the specified channel capacity.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self {
            sender,
            callbacks: Arc::new(RwLock::new(CallbackRegistry {
                entries: Vec::new(),
                next_id: 0,
            })),
        }
    }

    /// Publish an event to all broadcast receivers and registered
    /// callbacks.
    pub async fn publish(&self, event: WorkflowEvent) {
        let published = PublishedEvent {
            event,
            published_at: chrono::Utc::now(),
        };

        {
            let registry = self.callbacks.read();
            for entry in &registry.entries {
                (entry.callback)(&published);
            }
        }

        // send() errors only when no receiver exists, which is fine here
        let _ = self.sender.send(published);
    }

    /// Subscribe to the async broadcast stream.
    pub fn subscribe(&self) -> broadcast::Receiver<PublishedEvent> {
        self.sender.subscribe()
    }

    /// Register a synchronous callback, returning a handle for [`off`].
    ///
    /// [`off`]: EventPublisher::off
    pub fn on(&self, callback: impl Fn(&PublishedEvent) + Send + Sync + 'static) -> SubscriptionId {
        let mut registry = self.callbacks.write();
        let id = SubscriptionId(registry.next_id);
        registry.next_id += 1;
        registry.entries.push(CallbackEntry {
            id,
            callback: Box::new(callback),
        });
        id
    }

    /// Deregister a callback. Returns false if the handle was unknown.
    pub fn off(&self, id: SubscriptionId) -> bool {
        let mut registry = self.callbacks.write();
        let before = registry.entries.len();
        registry.entries.retain(|entry| entry.id != id);
        registry.entries.len() != before
    }

    /// Number of active subscribers across both delivery paths.
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count() + self.callbacks.read().entries.len()
    }
}

impl Default for EventPublisher {
    fn default() -> Self {
        Self::new(system::DEFAULT_EVENT_CHANNEL_CAPACITY)
    }
}

impl fmt::Debug for EventPublisher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventPublisher")
            .field("broadcast_receivers", &self.sender.receiver_count())
            .field("callbacks", &self.callbacks.read().entries.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn sample_event() -> WorkflowEvent {
        WorkflowEvent::StateAdded {
            workflow_id: "wf-1".to_string(),
            state: "draft".to_string(),
        }
    }

    #[tokio::test]
    async fn test_publish_without_subscribers_is_ok() {
        let publisher = EventPublisher::new(16);
        publisher.publish(sample_event()).await;
        assert_eq!(publisher.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn test_broadcast_delivery() {
        let publisher = EventPublisher::new(16);
        let mut receiver = publisher.subscribe();

        publisher.publish(sample_event()).await;

        let received = receiver.recv().await.unwrap();
        assert_eq!(received.event.event_type(), "state_added");
        assert_eq!(received.event.workflow_id(), "wf-1");
    }

    #[tokio::test]
    async fn test_callbacks_run_in_registration_order() {
        let publisher = EventPublisher::new(16);
        let order = Arc::new(RwLock::new(Vec::new()));

        for tag in ["first", "second", "third"] {
            let order = Arc::clone(&order);
            publisher.on(move |_| order.write().push(tag));
        }

        publisher.publish(sample_event()).await;
        assert_eq!(*order.read(), vec!["first", "second", "third"]);
    }

    #[tokio::test]
    async fn test_off_deregisters() {
        let publisher = EventPublisher::new(16);
        let calls = Arc::new(AtomicUsize::new(0));

        let counter = Arc::clone(&calls);
        let id = publisher.on(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        publisher.publish(sample_event()).await;
        assert!(publisher.off(id));
        assert!(!publisher.off(id));
        publisher.publish(sample_event()).await;

        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_event_serialization_is_tagged() {
        let event = WorkflowEvent::ContextUpdated {
            workflow_id: "wf-2".to_string(),
            old_context: json!({}),
            new_context: json!({"a": 1}),
            user: User::new("u1", "adeel"),
        };
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["type"], "context_updated");
        assert_eq!(value["new_context"]["a"], 1);
    }
}
