//! Postgres-backed outbox store.
//!
//! Records are normally written by `PostgresItemStore` inside the lease
//! transaction (that is what makes them atomic with the item update); this
//! store serves the dispatcher side — fetching due records and recording
//! delivery outcomes. `append` exists for completeness (tooling, backfills)
//! and writes outside any item transaction.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use uuid::Uuid;

use super::store::{OutboxRecord, OutboxStats, OutboxStatus, OutboxStore, OutboxStoreError};

pub(crate) fn status_str(status: OutboxStatus) -> &'static str {
    match status {
        OutboxStatus::Pending => "pending",
        OutboxStatus::Dispatched => "dispatched",
        OutboxStatus::Exhausted => "exhausted",
    }
}

fn status_from_str(s: &str) -> Result<OutboxStatus, OutboxStoreError> {
    match s {
        "pending" => Ok(OutboxStatus::Pending),
        "dispatched" => Ok(OutboxStatus::Dispatched),
        "exhausted" => Ok(OutboxStatus::Exhausted),
        other => Err(OutboxStoreError::Storage(format!(
            "unknown outbox status: {other}"
        ))),
    }
}

fn storage(op: &str, e: sqlx::Error) -> OutboxStoreError {
    OutboxStoreError::Storage(format!("{op}: {e}"))
}

fn record_from_row(row: &PgRow) -> Result<OutboxRecord, OutboxStoreError> {
    let get = |name: &str| -> Result<String, OutboxStoreError> {
        row.try_get::<String, _>(name)
            .map_err(|e| OutboxStoreError::Storage(format!("column {name}: {e}")))
    };
    let status = status_from_str(&get("status")?)?;
    Ok(OutboxRecord {
        id: row.try_get("id").map_err(|e| storage("id", e))?,
        topic: get("topic")?,
        key: get("key")?,
        payload: row.try_get("payload").map_err(|e| storage("payload", e))?,
        status,
        attempts: row
            .try_get::<i32, _>("attempts")
            .map_err(|e| storage("attempts", e))? as u32,
        next_attempt_at: row
            .try_get("next_attempt_at")
            .map_err(|e| storage("next_attempt_at", e))?,
        last_error: row
            .try_get("last_error")
            .map_err(|e| storage("last_error", e))?,
        created_at: row
            .try_get("created_at")
            .map_err(|e| storage("created_at", e))?,
    })
}

/// Dispatcher-side view of the `inventory_outbox` table.
#[derive(Debug, Clone)]
pub struct PostgresOutboxStore {
    pool: Arc<PgPool>,
}

impl PostgresOutboxStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }
}

#[async_trait]
impl OutboxStore for PostgresOutboxStore {
    async fn append(&self, records: Vec<OutboxRecord>) -> Result<(), OutboxStoreError> {
        for record in &records {
            sqlx::query(
                "INSERT INTO inventory_outbox \
                 (id, topic, key, payload, status, attempts, next_attempt_at, last_error, created_at) \
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)",
            )
            .bind(record.id)
            .bind(&record.topic)
            .bind(&record.key)
            .bind(&record.payload)
            .bind(status_str(record.status))
            .bind(record.attempts as i32)
            .bind(record.next_attempt_at)
            .bind(&record.last_error)
            .bind(record.created_at)
            .execute(&*self.pool)
            .await
            .map_err(|e| storage("append", e))?;
        }
        Ok(())
    }

    async fn fetch_due(
        &self,
        now: DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<OutboxRecord>, OutboxStoreError> {
        let rows = sqlx::query(
            "SELECT id, topic, key, payload, status, attempts, next_attempt_at, last_error, created_at \
             FROM inventory_outbox \
             WHERE status = 'pending' AND next_attempt_at <= $1 \
             ORDER BY created_at ASC \
             LIMIT $2",
        )
        .bind(now)
        .bind(limit as i64)
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| storage("fetch_due", e))?;

        rows.iter().map(record_from_row).collect()
    }

    async fn mark_dispatched(&self, id: Uuid) -> Result<(), OutboxStoreError> {
        let result = sqlx::query(
            "UPDATE inventory_outbox SET status = 'dispatched', last_error = NULL WHERE id = $1",
        )
        .bind(id)
        .execute(&*self.pool)
        .await
        .map_err(|e| storage("mark_dispatched", e))?;
        if result.rows_affected() == 0 {
            return Err(OutboxStoreError::NotFound(id));
        }
        Ok(())
    }

    async fn mark_retry(
        &self,
        id: Uuid,
        attempts: u32,
        next_attempt_at: DateTime<Utc>,
        last_error: String,
    ) -> Result<(), OutboxStoreError> {
        let result = sqlx::query(
            "UPDATE inventory_outbox \
             SET attempts = $2, next_attempt_at = $3, last_error = $4 \
             WHERE id = $1",
        )
        .bind(id)
        .bind(attempts as i32)
        .bind(next_attempt_at)
        .bind(last_error)
        .execute(&*self.pool)
        .await
        .map_err(|e| storage("mark_retry", e))?;
        if result.rows_affected() == 0 {
            return Err(OutboxStoreError::NotFound(id));
        }
        Ok(())
    }

    async fn mark_exhausted(
        &self,
        id: Uuid,
        attempts: u32,
        last_error: String,
    ) -> Result<(), OutboxStoreError> {
        let result = sqlx::query(
            "UPDATE inventory_outbox \
             SET status = 'exhausted', attempts = $2, last_error = $3 \
             WHERE id = $1",
        )
        .bind(id)
        .bind(attempts as i32)
        .bind(last_error)
        .execute(&*self.pool)
        .await
        .map_err(|e| storage("mark_exhausted", e))?;
        if result.rows_affected() == 0 {
            return Err(OutboxStoreError::NotFound(id));
        }
        Ok(())
    }

    async fn stats(&self) -> Result<OutboxStats, OutboxStoreError> {
        let rows = sqlx::query(
            "SELECT status, COUNT(*) AS n FROM inventory_outbox GROUP BY status",
        )
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| storage("stats", e))?;

        let mut stats = OutboxStats::default();
        for row in rows {
            let status: String = row.try_get("status").map_err(|e| storage("status", e))?;
            let n: i64 = row.try_get("n").map_err(|e| storage("n", e))?;
            match status_from_str(&status)? {
                OutboxStatus::Pending => stats.pending = n as usize,
                OutboxStatus::Dispatched => stats.dispatched = n as usize,
                OutboxStatus::Exhausted => stats.exhausted = n as usize,
            }
        }
        Ok(stats)
    }
}
