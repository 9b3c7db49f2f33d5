//! Change notifications
//!
//! After every successful write the engine publishes the complete module set
//! on a broadcast channel. Publishing never blocks and never fails the write:
//! with no subscribers the event is dropped, and a subscriber that falls
//! behind sees `RecvError::Lagged` on its own receiver.

use serde::Serialize;
use tokio::sync::broadcast;
use tracing::trace;

use crate::models::ModuleRecord;

/// Name of the event published after each successful write
pub const MODULES_CHANGED_EVENT: &str = "modules:changed";

/// Payload carried by a change notification
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ChangeDetail {
    /// The full module set after the triggering write
    pub modules: Vec<ModuleRecord>,
}

/// A change notification
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ModulesChanged {
    pub detail: ChangeDetail,
}

impl ModulesChanged {
    pub fn new(modules: Vec<ModuleRecord>) -> Self {
        Self {
            detail: ChangeDetail { modules },
        }
    }

    /// Event name, always `MODULES_CHANGED_EVENT`
    pub fn name(&self) -> &'static str {
        MODULES_CHANGED_EVENT
    }

    /// The module set carried by this event
    pub fn modules(&self) -> &[ModuleRecord] {
        &self.detail.modules
    }
}

/// Publish side of the change channel
#[derive(Debug, Clone)]
pub struct ChangeNotifier {
    tx: broadcast::Sender<ModulesChanged>,
}

impl ChangeNotifier {
    /// Create a notifier buffering up to `capacity` events per subscriber
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// Register a new subscriber
    pub fn subscribe(&self) -> broadcast::Receiver<ModulesChanged> {
        self.tx.subscribe()
    }

    /// Number of live subscribers
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    /// Publish the module set; fire-and-forget
    pub fn emit(&self, modules: Vec<ModuleRecord>) {
        let count = modules.len();
        match self.tx.send(ModulesChanged::new(modules)) {
            Ok(receivers) => trace!(receivers, count, "published {}", MODULES_CHANGED_EVENT),
            Err(_) => trace!(count, "no subscribers for {}", MODULES_CHANGED_EVENT),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::broadcast::error::{RecvError, TryRecvError};

    #[test]
    fn test_emit_without_subscribers() {
        let notifier = ChangeNotifier::new(4);
        assert_eq!(notifier.subscriber_count(), 0);

        // Must not panic or error
        notifier.emit(Vec::new());
    }

    #[tokio::test]
    async fn test_every_subscriber_receives_event() {
        let notifier = ChangeNotifier::new(4);
        let mut a = notifier.subscribe();
        let mut b = notifier.subscribe();

        notifier.emit(Vec::new());

        let event_a = a.recv().await.unwrap();
        let event_b = b.recv().await.unwrap();
        assert_eq!(event_a, event_b);
        assert_eq!(event_a.name(), "modules:changed");
        assert!(event_a.modules().is_empty());
    }

    #[tokio::test]
    async fn test_slow_subscriber_lags_without_blocking() {
        let notifier = ChangeNotifier::new(1);
        let mut rx = notifier.subscribe();

        notifier.emit(Vec::new());
        notifier.emit(Vec::new());

        assert!(matches!(rx.recv().await, Err(RecvError::Lagged(1))));
        assert!(rx.recv().await.is_ok());
        assert!(matches!(rx.try_recv(), Err(TryRecvError::Empty)));
    }

    #[test]
    fn test_dropped_subscriber_is_ignored() {
        let notifier = ChangeNotifier::new(4);
        let rx = notifier.subscribe();
        drop(rx);

        notifier.emit(Vec::new());
        assert_eq!(notifier.subscriber_count(), 0);
    }

    #[test]
    fn test_payload_shape() {
        let event = ModulesChanged::new(Vec::new());
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value, serde_json::json!({ "detail": { "modules": [] } }));
    }
}
