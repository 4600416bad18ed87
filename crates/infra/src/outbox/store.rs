//! Outbox record model and storage.

use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use uuid::Uuid;

/// Delivery state of an outbox record.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutboxStatus {
    /// Waiting for delivery (or for its next retry slot).
    Pending,
    /// Acknowledged by the transport.
    Dispatched,
    /// Gave up after `max_attempts` failures; kept for inspection.
    Exhausted,
}

/// One event awaiting delivery, persisted in the same atomic step as the
/// mutation that produced it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutboxRecord {
    pub id: Uuid,
    pub topic: String,
    /// Bus partition key (the item SKU).
    pub key: String,
    pub payload: JsonValue,
    pub status: OutboxStatus,
    pub attempts: u32,
    /// Earliest instant the dispatcher may (re)try this record.
    pub next_attempt_at: DateTime<Utc>,
    pub last_error: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl OutboxRecord {
    pub fn new(topic: impl Into<String>, key: impl Into<String>, payload: JsonValue) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::now_v7(),
            topic: topic.into(),
            key: key.into(),
            payload,
            status: OutboxStatus::Pending,
            attempts: 0,
            next_attempt_at: now,
            last_error: None,
            created_at: now,
        }
    }
}

/// Outbox store error.
#[derive(Debug, Clone, thiserror::Error)]
pub enum OutboxStoreError {
    #[error("outbox record not found: {0}")]
    NotFound(Uuid),
    #[error("storage error: {0}")]
    Storage(String),
}

/// Outbox storage abstraction.
///
/// `append` is called from inside an item lease commit; the in-memory store
/// appends under the lease, the Postgres store appends in the same
/// transaction as the item update (see `PostgresItemStore`, which writes
/// records directly rather than through this trait). The remaining methods
/// serve the dispatcher.
#[async_trait]
pub trait OutboxStore: Send + Sync {
    /// Append freshly-created pending records.
    async fn append(&self, records: Vec<OutboxRecord>) -> Result<(), OutboxStoreError>;

    /// Pending records whose `next_attempt_at` has passed, oldest first,
    /// up to `limit`.
    async fn fetch_due(
        &self,
        now: DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<OutboxRecord>, OutboxStoreError>;

    /// Record a successful delivery.
    async fn mark_dispatched(&self, id: Uuid) -> Result<(), OutboxStoreError>;

    /// Record a failed attempt and schedule the retry.
    async fn mark_retry(
        &self,
        id: Uuid,
        attempts: u32,
        next_attempt_at: DateTime<Utc>,
        last_error: String,
    ) -> Result<(), OutboxStoreError>;

    /// Record a final failure after the attempt budget is spent.
    async fn mark_exhausted(
        &self,
        id: Uuid,
        attempts: u32,
        last_error: String,
    ) -> Result<(), OutboxStoreError>;

    /// Counts by status.
    async fn stats(&self) -> Result<OutboxStats, OutboxStoreError>;
}

#[async_trait]
impl<S> OutboxStore for std::sync::Arc<S>
where
    S: OutboxStore + ?Sized,
{
    async fn append(&self, records: Vec<OutboxRecord>) -> Result<(), OutboxStoreError> {
        (**self).append(records).await
    }

    async fn fetch_due(
        &self,
        now: DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<OutboxRecord>, OutboxStoreError> {
        (**self).fetch_due(now, limit).await
    }

    async fn mark_dispatched(&self, id: Uuid) -> Result<(), OutboxStoreError> {
        (**self).mark_dispatched(id).await
    }

    async fn mark_retry(
        &self,
        id: Uuid,
        attempts: u32,
        next_attempt_at: DateTime<Utc>,
        last_error: String,
    ) -> Result<(), OutboxStoreError> {
        (**self).mark_retry(id, attempts, next_attempt_at, last_error).await
    }

    async fn mark_exhausted(
        &self,
        id: Uuid,
        attempts: u32,
        last_error: String,
    ) -> Result<(), OutboxStoreError> {
        (**self).mark_exhausted(id, attempts, last_error).await
    }

    async fn stats(&self) -> Result<OutboxStats, OutboxStoreError> {
        (**self).stats().await
    }
}

/// Outbox counts by delivery state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct OutboxStats {
    pub pending: usize,
    pub dispatched: usize,
    pub exhausted: usize,
}

/// In-memory outbox for tests/dev.
#[derive(Debug, Default)]
pub struct InMemoryOutboxStore {
    records: Mutex<Vec<OutboxRecord>>,
}

impl InMemoryOutboxStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of every record, append order.
    pub fn records(&self) -> Vec<OutboxRecord> {
        self.records.lock().unwrap().clone()
    }

    fn update<F>(&self, id: Uuid, f: F) -> Result<(), OutboxStoreError>
    where
        F: FnOnce(&mut OutboxRecord),
    {
        let mut records = self.records.lock().unwrap();
        let record = records
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or(OutboxStoreError::NotFound(id))?;
        f(record);
        Ok(())
    }
}

#[async_trait]
impl OutboxStore for InMemoryOutboxStore {
    async fn append(&self, records: Vec<OutboxRecord>) -> Result<(), OutboxStoreError> {
        self.records.lock().unwrap().extend(records);
        Ok(())
    }

    async fn fetch_due(
        &self,
        now: DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<OutboxRecord>, OutboxStoreError> {
        let records = self.records.lock().unwrap();
        Ok(records
            .iter()
            .filter(|r| r.status == OutboxStatus::Pending && r.next_attempt_at <= now)
            .take(limit)
            .cloned()
            .collect())
    }

    async fn mark_dispatched(&self, id: Uuid) -> Result<(), OutboxStoreError> {
        self.update(id, |r| {
            r.status = OutboxStatus::Dispatched;
            r.last_error = None;
        })
    }

    async fn mark_retry(
        &self,
        id: Uuid,
        attempts: u32,
        next_attempt_at: DateTime<Utc>,
        last_error: String,
    ) -> Result<(), OutboxStoreError> {
        self.update(id, |r| {
            r.attempts = attempts;
            r.next_attempt_at = next_attempt_at;
            r.last_error = Some(last_error);
        })
    }

    async fn mark_exhausted(
        &self,
        id: Uuid,
        attempts: u32,
        last_error: String,
    ) -> Result<(), OutboxStoreError> {
        self.update(id, |r| {
            r.status = OutboxStatus::Exhausted;
            r.attempts = attempts;
            r.last_error = Some(last_error);
        })
    }

    async fn stats(&self) -> Result<OutboxStats, OutboxStoreError> {
        let records = self.records.lock().unwrap();
        let mut stats = OutboxStats::default();
        for r in records.iter() {
            match r.status {
                OutboxStatus::Pending => stats.pending += 1,
                OutboxStatus::Dispatched => stats.dispatched += 1,
                OutboxStatus::Exhausted => stats.exhausted += 1,
            }
        }
        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration as ChronoDuration;

    fn record(topic: &str) -> OutboxRecord {
        OutboxRecord::new(topic, "SKU-1", serde_json::json!({"x": 1}))
    }

    #[tokio::test]
    async fn fetch_due_skips_future_and_terminal_records() {
        let store = InMemoryOutboxStore::new();
        let due = record("a");
        let mut future = record("b");
        future.next_attempt_at = Utc::now() + ChronoDuration::hours(1);
        let done = record("c");

        store
            .append(vec![due.clone(), future, done.clone()])
            .await
            .unwrap();
        store.mark_dispatched(done.id).await.unwrap();

        let fetched = store.fetch_due(Utc::now(), 10).await.unwrap();
        assert_eq!(fetched.len(), 1);
        assert_eq!(fetched[0].id, due.id);
    }

    #[tokio::test]
    async fn retry_then_exhaust_tracks_attempts_and_error() {
        let store = InMemoryOutboxStore::new();
        let rec = record("a");
        store.append(vec![rec.clone()]).await.unwrap();

        store
            .mark_retry(rec.id, 1, Utc::now(), "boom".to_string())
            .await
            .unwrap();
        let after = store.records();
        assert_eq!(after[0].attempts, 1);
        assert_eq!(after[0].status, OutboxStatus::Pending);
        assert_eq!(after[0].last_error.as_deref(), Some("boom"));

        store
            .mark_exhausted(rec.id, 5, "boom".to_string())
            .await
            .unwrap();
        assert_eq!(store.records()[0].status, OutboxStatus::Exhausted);

        let stats = store.stats().await.unwrap();
        assert_eq!(stats.exhausted, 1);
    }

    #[tokio::test]
    async fn mark_unknown_record_is_not_found() {
        let store = InMemoryOutboxStore::new();
        let err = store.mark_dispatched(Uuid::now_v7()).await.unwrap_err();
        assert!(matches!(err, OutboxStoreError::NotFound(_)));
    }
}
