//! In-memory publisher for tests/dev.

use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use serde_json::Value as JsonValue;
use tracing::debug;

use crate::publisher::{EventPublisher, PublishError};

/// A message accepted by the in-memory publisher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishedMessage {
    pub topic: String,
    pub key: String,
    pub payload: JsonValue,
}

/// In-memory transport that records every published message.
///
/// Supports failure injection so dispatcher retry behavior can be exercised:
/// `fail_next(n)` makes the next `n` publish calls fail with a transport
/// error before delivery resumes.
#[derive(Debug, Default)]
pub struct InMemoryPublisher {
    messages: Mutex<Vec<PublishedMessage>>,
    failures_remaining: AtomicUsize,
}

impl InMemoryPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    /// All messages accepted so far, in publish order.
    pub fn published(&self) -> Vec<PublishedMessage> {
        self.messages.lock().unwrap().clone()
    }

    /// Messages accepted on one topic, in publish order.
    pub fn published_on(&self, topic: &str) -> Vec<PublishedMessage> {
        self.messages
            .lock()
            .unwrap()
            .iter()
            .filter(|m| m.topic == topic)
            .cloned()
            .collect()
    }

    /// Make the next `n` publish calls fail.
    pub fn fail_next(&self, n: usize) {
        self.failures_remaining.store(n, Ordering::SeqCst);
    }
}

#[async_trait]
impl EventPublisher for InMemoryPublisher {
    async fn publish(&self, topic: &str, key: &str, payload: &JsonValue) -> Result<(), PublishError> {
        let remaining = self.failures_remaining.load(Ordering::SeqCst);
        if remaining > 0
            && self
                .failures_remaining
                .compare_exchange(remaining, remaining - 1, Ordering::SeqCst, Ordering::SeqCst)
                .is_ok()
        {
            debug!(topic, key, "rejecting publish (injected failure)");
            return Err(PublishError::Transport("injected failure".to_string()));
        }

        debug!(topic, key, "message accepted");
        self.messages.lock().unwrap().push(PublishedMessage {
            topic: topic.to_string(),
            key: key.to_string(),
            payload: payload.clone(),
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn records_messages_in_order() {
        let publisher = InMemoryPublisher::new();
        publisher
            .publish("inventory-changes", "SKU-1", &serde_json::json!({"n": 1}))
            .await
            .unwrap();
        publisher
            .publish("low-stock-alerts", "SKU-1", &serde_json::json!({"n": 2}))
            .await
            .unwrap();

        let all = publisher.published();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].topic, "inventory-changes");
        assert_eq!(publisher.published_on("low-stock-alerts").len(), 1);
    }

    #[tokio::test]
    async fn injected_failures_then_recovers() {
        let publisher = InMemoryPublisher::new();
        publisher.fail_next(2);

        let payload = serde_json::json!({});
        assert!(publisher.publish("t", "k", &payload).await.is_err());
        assert!(publisher.publish("t", "k", &payload).await.is_err());
        assert!(publisher.publish("t", "k", &payload).await.is_ok());
        assert_eq!(publisher.published().len(), 1);
    }
}
