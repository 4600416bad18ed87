//! Postgres-backed item store.
//!
//! The exclusive-access protocol is a database row lock: `lock_and_get` opens
//! a transaction and takes `SELECT … FOR UPDATE` on the item row, so the
//! mutual-exclusion guarantee holds across every process sharing the
//! database — a language-level mutex cannot provide that once the engine is
//! scaled out. Acquisition is bounded with `SET LOCAL lock_timeout`.
//!
//! Commit atomicity: the item update and the outbox inserts run in the lease
//! transaction, so a crash leaves either both durable or neither.
//!
//! ## Schema
//!
//! ```sql
//! CREATE TABLE inventory_items (
//!     id              UUID PRIMARY KEY,
//!     sku             TEXT NOT NULL UNIQUE,
//!     name            TEXT NOT NULL,
//!     description     TEXT NOT NULL DEFAULT '',
//!     quantity        BIGINT NOT NULL CHECK (quantity >= 0),
//!     threshold       BIGINT NOT NULL CHECK (threshold >= 0),
//!     category_id     UUID NOT NULL,
//!     category_name   TEXT NOT NULL,
//!     location_id     UUID NOT NULL,
//!     location_name   TEXT NOT NULL,
//!     updated_at      TIMESTAMPTZ NOT NULL
//! );
//!
//! CREATE TABLE inventory_outbox (
//!     id              UUID PRIMARY KEY,
//!     topic           TEXT NOT NULL,
//!     key             TEXT NOT NULL,
//!     payload         JSONB NOT NULL,
//!     status          TEXT NOT NULL,
//!     attempts        INT NOT NULL DEFAULT 0,
//!     next_attempt_at TIMESTAMPTZ NOT NULL,
//!     last_error      TEXT,
//!     created_at      TIMESTAMPTZ NOT NULL
//! );
//! CREATE INDEX inventory_outbox_due
//!     ON inventory_outbox (next_attempt_at) WHERE status = 'pending';
//! ```
//!
//! ## Error mapping
//!
//! | PostgreSQL error code | StoreError | Scenario |
//! |---|---|---|
//! | `55P03` (lock not available) | `LockTimeout` | `lock_timeout` expired waiting on the row lock |
//! | `23505` (unique violation) | `Conflict` | duplicate SKU on insert |
//! | any other / connection | `Storage` | backend failure with context |

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Postgres, Row, Transaction};
use tracing::instrument;

use stockforge_core::{CategoryId, Entity, ItemId, ItemKey, LocationId, Sku};
use stockforge_inventory::{CategoryRef, InventoryItem, LocationRef};

use super::r#trait::{ItemLease, ItemStore, StoreError};
use crate::outbox::OutboxRecord;
use crate::outbox::postgres::status_str;

const ITEM_COLUMNS: &str = "id, sku, name, description, quantity, threshold, \
     category_id, category_name, location_id, location_name, updated_at";

/// Postgres-backed item store (deployment-wide exclusion scope).
#[derive(Debug, Clone)]
pub struct PostgresItemStore {
    pool: Arc<PgPool>,
}

impl PostgresItemStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }

    async fn fetch_by_key(&self, key: &ItemKey) -> Result<Option<InventoryItem>, StoreError> {
        let query = match key {
            ItemKey::Id(_) => format!("SELECT {ITEM_COLUMNS} FROM inventory_items WHERE id = $1"),
            ItemKey::Sku(_) => format!("SELECT {ITEM_COLUMNS} FROM inventory_items WHERE sku = $1"),
        };
        let mut q = sqlx::query(&query);
        q = match key {
            ItemKey::Id(id) => q.bind(*id.as_uuid()),
            ItemKey::Sku(sku) => q.bind(sku.as_str().to_string()),
        };
        let row = q
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("get", e))?;
        row.map(|r| item_from_row(&r)).transpose()
    }
}

/// Exclusive lease backed by an open transaction holding the row lock.
///
/// Dropping the lease drops the transaction, which rolls back: release
/// without persisting on every non-commit exit path.
pub struct PostgresLease {
    tx: Transaction<'static, Postgres>,
    item: InventoryItem,
}

#[async_trait]
impl ItemLease for PostgresLease {
    fn item(&self) -> &InventoryItem {
        &self.item
    }

    async fn commit(
        mut self,
        item: InventoryItem,
        records: Vec<OutboxRecord>,
    ) -> Result<InventoryItem, StoreError> {
        sqlx::query("UPDATE inventory_items SET quantity = $2, updated_at = $3 WHERE id = $1")
            .bind(*item.id().as_uuid())
            .bind(item.quantity())
            .bind(item.updated_at())
            .execute(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx_error("commit/update", e))?;

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
            .execute(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx_error("commit/outbox", e))?;
        }

        self.tx
            .commit()
            .await
            .map_err(|e| map_sqlx_error("commit", e))?;
        Ok(item)
    }
}

#[async_trait]
impl ItemStore for PostgresItemStore {
    type Lease = PostgresLease;

    #[instrument(skip(self), fields(key = %key))]
    async fn resolve(&self, key: &ItemKey) -> Result<ItemId, StoreError> {
        match key {
            ItemKey::Id(id) => Ok(*id),
            ItemKey::Sku(sku) => {
                let row = sqlx::query("SELECT id FROM inventory_items WHERE sku = $1")
                    .bind(sku.as_str().to_string())
                    .fetch_optional(&*self.pool)
                    .await
                    .map_err(|e| map_sqlx_error("resolve", e))?;
                let row = row.ok_or(StoreError::NotFound)?;
                Ok(ItemId::from_uuid(column(&row, "id")?))
            }
        }
    }

    async fn exists(&self, key: &ItemKey) -> Result<bool, StoreError> {
        Ok(self.fetch_by_key(key).await?.is_some())
    }

    async fn get(&self, key: &ItemKey) -> Result<Option<InventoryItem>, StoreError> {
        self.fetch_by_key(key).await
    }

    #[instrument(skip(self), fields(item_id = %id))]
    async fn lock_and_get(
        &self,
        id: ItemId,
        timeout: Duration,
    ) -> Result<Self::Lease, StoreError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("lock_and_get/begin", e))?;

        // lock_timeout does not accept bind parameters; the value is a
        // clamped integer, not caller input.
        let millis = timeout.as_millis().clamp(1, i32::MAX as u128);
        sqlx::query(&format!("SET LOCAL lock_timeout = '{millis}ms'"))
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("lock_and_get/timeout", e))?;

        let row = sqlx::query(&format!(
            "SELECT {ITEM_COLUMNS} FROM inventory_items WHERE id = $1 FOR UPDATE"
        ))
        .bind(*id.as_uuid())
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("lock_and_get", e))?;

        // tx drops (rolls back) on both error paths.
        let row = row.ok_or(StoreError::NotFound)?;
        let item = item_from_row(&row)?;

        Ok(PostgresLease { tx, item })
    }

    async fn insert(&self, item: InventoryItem) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO inventory_items \
             (id, sku, name, description, quantity, threshold, \
              category_id, category_name, location_id, location_name, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)",
        )
        .bind(*item.id().as_uuid())
        .bind(item.sku().as_str().to_string())
        .bind(item.name().to_string())
        .bind(item.description().to_string())
        .bind(item.quantity())
        .bind(item.threshold())
        .bind(*item.category().id.as_uuid())
        .bind(item.category().name.clone())
        .bind(*item.location().id.as_uuid())
        .bind(item.location().name.clone())
        .bind(item.updated_at())
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("insert", e))?;
        Ok(())
    }
}

fn column<'r, T>(row: &'r PgRow, name: &str) -> Result<T, StoreError>
where
    T: sqlx::Decode<'r, Postgres> + sqlx::Type<Postgres>,
{
    row.try_get(name)
        .map_err(|e| StoreError::Storage(format!("column {name}: {e}")))
}

fn item_from_row(row: &PgRow) -> Result<InventoryItem, StoreError> {
    let sku = Sku::new(column::<String>(row, "sku")?)
        .map_err(|e| StoreError::Storage(format!("persisted SKU rejected: {e}")))?;
    Ok(InventoryItem::rehydrate(
        ItemId::from_uuid(column(row, "id")?),
        sku,
        column(row, "name")?,
        column(row, "description")?,
        column(row, "quantity")?,
        column(row, "threshold")?,
        CategoryRef {
            id: CategoryId::from_uuid(column(row, "category_id")?),
            name: column(row, "category_name")?,
        },
        LocationRef {
            id: LocationId::from_uuid(column(row, "location_id")?),
            name: column(row, "location_name")?,
        },
        column(row, "updated_at")?,
    ))
}

pub(crate) fn map_sqlx_error(op: &str, e: sqlx::Error) -> StoreError {
    if let Some(db) = e.as_database_error() {
        match db.code().as_deref() {
            Some("55P03") => return StoreError::LockTimeout,
            Some("23505") => return StoreError::Conflict(db.message().to_string()),
            _ => {}
        }
    }
    StoreError::Storage(format!("{op}: {e}"))
}
