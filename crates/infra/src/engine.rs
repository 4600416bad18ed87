//! Quantity mutation engine and reservation façade.
//!
//! This is the one place with real concurrency hazards, and it is deliberately
//! a single pipeline:
//!
//! ```text
//! caller
//!   ↓
//! 1. resolve key → canonical item id        (never lock on a raw SKU)
//!   ↓
//! 2. lock_and_get(id, timeout)              (exclusive lease, bounded)
//!   ↓
//! 3. apply delta                            (non-negativity enforced, pure)
//!   ↓
//! 4. shape change (+ alert) events
//!   ↓
//! 5. commit item + outbox atomically, release
//! ```
//!
//! Every failure before step 5 releases the lease without persisting — a
//! caller that saw `InsufficientQuantity` or `LockTimeout` has mutated
//! nothing. All accepted mutations on one item are totally ordered by lease
//! acquisition, so the value after N concurrent deltas is the initial value
//! plus the sum of the accepted ones.
//!
//! The reservation façade delegates into this same pipeline: exactly one
//! acquisition per operation, no matter which key form the caller used.

use std::time::Duration;

use serde::Serialize;
use tracing::{info, warn};

use stockforge_core::{InventoryError, InventoryResult, ItemKey, Sku};
use stockforge_events::{
    AlertType, ChangeKind, InventoryChangeEvent, LowStockAlertEvent, TOPIC_INVENTORY_CHANGES,
    TOPIC_LOW_STOCK_ALERTS,
};
use stockforge_inventory::InventoryItem;

use crate::item_store::{ItemLease, ItemStore};
use crate::outbox::OutboxRecord;

/// Engine configuration.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Bound on exclusive-lease acquisition.
    pub lock_timeout: Duration,
    /// Topic for `InventoryChangeEvent`s.
    pub change_topic: String,
    /// Topic for `LowStockAlertEvent`s.
    pub alert_topic: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            lock_timeout: Duration::from_secs(5),
            change_topic: TOPIC_INVENTORY_CHANGES.to_string(),
            alert_topic: TOPIC_LOW_STOCK_ALERTS.to_string(),
        }
    }
}

impl EngineConfig {
    pub fn with_lock_timeout(mut self, timeout: Duration) -> Self {
        self.lock_timeout = timeout;
        self
    }
}

/// The inventory quantity mutation engine.
///
/// Composes an [`ItemStore`] (which carries the exclusive-access protocol)
/// with the pure domain delta rule and the outbox contract. Share it across
/// tasks behind an `Arc`; it holds no mutable state of its own.
pub struct InventoryEngine<S> {
    store: S,
    config: EngineConfig,
}

impl<S: ItemStore> InventoryEngine<S> {
    pub fn new(store: S) -> Self {
        Self::with_config(store, EngineConfig::default())
    }

    pub fn with_config(store: S, config: EngineConfig) -> Self {
        Self { store, config }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Apply a signed delta to an item's quantity.
    ///
    /// On success returns the committed post-mutation snapshot; an
    /// `InventoryChangeEvent` (and, when the item ends at or below threshold,
    /// a `LowStockAlertEvent`) is committed to the outbox in the same atomic
    /// step. On failure returns a typed error and has persisted nothing —
    /// never a silent clamp to zero.
    pub async fn apply_delta(
        &self,
        key: &ItemKey,
        delta: i64,
        kind: ChangeKind,
    ) -> InventoryResult<InventoryItem> {
        info!(%key, delta, ?kind, "applying quantity delta");

        let id = self.store.resolve(key).await?;
        let lease = self
            .store
            .lock_and_get(id, self.config.lock_timeout)
            .await?;

        let before = lease.item().clone();
        // Lease drops (releases, persists nothing) if the delta is rejected.
        let updated = before.apply_delta(delta)?;

        let pre_low = before.is_low_stock();
        let post_low = updated.is_low_stock();

        let mut records = Vec::with_capacity(2);
        let change = InventoryChangeEvent::from_item(&updated, before.quantity(), kind);
        records.push(outbox_record(
            &self.config.change_topic,
            updated.sku().as_str(),
            &change,
        )?);

        if post_low {
            let alert_type = if pre_low {
                AlertType::Continued
            } else {
                AlertType::New
            };
            warn!(
                sku = %updated.sku(),
                quantity = updated.quantity(),
                threshold = updated.threshold(),
                ?alert_type,
                "inventory item is low on stock"
            );
            let alert =
                LowStockAlertEvent::from_item(&updated, alert_type, kind.trigger_action());
            records.push(outbox_record(
                &self.config.alert_topic,
                updated.sku().as_str(),
                &alert,
            )?);
        }

        let committed = lease.commit(updated, records).await?;
        Ok(committed)
    }

    /// Plain quantity update; the change kind follows the delta sign.
    pub async fn update_quantity(
        &self,
        key: &ItemKey,
        delta: i64,
    ) -> InventoryResult<InventoryItem> {
        self.apply_delta(key, delta, ChangeKind::for_update(delta)).await
    }

    /// Reserve stock for an order: a yes/no convenience over `apply_delta`.
    ///
    /// `Ok(false)` covers exactly "no such item" and "not enough stock" —
    /// outcomes where retrying the same request cannot succeed. A lock
    /// timeout means the outcome is *unknown*, so it propagates as an error
    /// the caller can distinguish and retry; callers that need the full
    /// detail should use [`InventoryEngine::apply_delta`] directly.
    pub async fn reserve(&self, sku: &Sku, quantity: i64) -> InventoryResult<bool> {
        if quantity <= 0 {
            return Err(InventoryError::validation(
                "reservation quantity must be positive",
            ));
        }
        info!(%sku, quantity, "attempting reservation");

        let key = ItemKey::Sku(sku.clone());
        match self
            .apply_delta(&key, -quantity, ChangeKind::Reservation)
            .await
        {
            Ok(_) => Ok(true),
            Err(InventoryError::NotFound) => {
                warn!(%sku, "reservation failed: item not found");
                Ok(false)
            }
            Err(InventoryError::InsufficientQuantity { deficit }) => {
                warn!(%sku, quantity, deficit, "reservation failed: insufficient stock");
                Ok(false)
            }
            Err(other) => Err(other),
        }
    }
}

fn outbox_record<E: Serialize>(topic: &str, key: &str, event: &E) -> InventoryResult<OutboxRecord> {
    let payload = serde_json::to_value(event)
        .map_err(|e| InventoryError::storage(format!("event serialization: {e}")))?;
    Ok(OutboxRecord::new(topic, key, payload))
}
