//! Event publishing abstraction (transport seam).
//!
//! The publisher is the boundary to the message bus. Delivery is
//! asynchronous and best-effort from the mutation engine's point of view:
//! the engine never calls this directly — it commits outbox records in the
//! same atomic step as the quantity change, and the outbox dispatcher calls
//! `publish` with retry until acknowledged. Consumers therefore see
//! at-least-once delivery and must be idempotent.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value as JsonValue;
use thiserror::Error;

/// Publish failure. Observed by the dispatcher (which retries), never by the
/// mutation path.
#[derive(Debug, Error, Clone)]
pub enum PublishError {
    #[error("transport failure: {0}")]
    Transport(String),
}

/// Message-bus seam: `publish(topic, key, payload)`.
///
/// - `key` partitions messages (always the item SKU here), so one item's
///   events stay ordered on one partition.
/// - `payload` is the serialized event; the transport does not interpret it.
///
/// Implementations must be safe to share across tasks.
#[async_trait]
pub trait EventPublisher: Send + Sync {
    async fn publish(&self, topic: &str, key: &str, payload: &JsonValue) -> Result<(), PublishError>;
}

#[async_trait]
impl<P> EventPublisher for Arc<P>
where
    P: EventPublisher + ?Sized,
{
    async fn publish(&self, topic: &str, key: &str, payload: &JsonValue) -> Result<(), PublishError> {
        (**self).publish(topic, key, payload).await
    }
}
