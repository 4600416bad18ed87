use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

use stockforge_core::{InventoryError, ItemId, ItemKey};
use stockforge_inventory::InventoryItem;

use crate::outbox::OutboxRecord;

/// Item store operation error.
///
/// Infrastructure failures (storage, locking) as opposed to domain failures
/// (insufficient quantity, malformed input). Mapped into `InventoryError` at
/// the engine boundary.
#[derive(Debug, Error)]
pub enum StoreError {
    /// No item for the given key.
    #[error("item not found")]
    NotFound,

    /// The lease could not be acquired within the bound. Nothing was mutated.
    #[error("lock acquisition timed out")]
    LockTimeout,

    /// A uniqueness conflict (e.g. inserting a duplicate SKU).
    #[error("conflict: {0}")]
    Conflict(String),

    /// Backend failure (connection, transaction, serialization).
    #[error("storage failure: {0}")]
    Storage(String),
}

impl From<StoreError> for InventoryError {
    fn from(value: StoreError) -> Self {
        match value {
            StoreError::NotFound => InventoryError::NotFound,
            StoreError::LockTimeout => InventoryError::LockTimeout,
            StoreError::Conflict(msg) => InventoryError::Validation(msg),
            StoreError::Storage(msg) => InventoryError::Storage(msg),
        }
    }
}

/// Exclusive access to one item, held from `lock_and_get` until drop.
///
/// The lease **is** the exclusive-access protocol: while it lives, no other
/// caller in the deployment holds the same item. Release is RAII — dropping
/// the lease on any exit path (invariant failure, panic unwind, early return)
/// releases without persisting. The only way to make a mutation visible is
/// `commit`, which writes the item **and** its outbox records in one atomic
/// step, then releases.
#[async_trait]
pub trait ItemLease: Send {
    /// The item state observed under the lease. No other mutation can change
    /// it while the lease is held.
    fn item(&self) -> &InventoryItem;

    /// Persist the updated item together with its outbox records, atomically,
    /// and release the lease. Consumes the lease — a lease commits at most
    /// once.
    async fn commit(
        self,
        item: InventoryItem,
        records: Vec<OutboxRecord>,
    ) -> Result<InventoryItem, StoreError>;
}

/// Durable record of inventory items plus the lock-and-read primitive.
///
/// ## Canonical keys
///
/// `resolve` normalizes either caller-facing key form to the one `ItemId`
/// **before** any acquisition; `lock_and_get` only accepts canonical ids.
/// This is what makes id-form and SKU-form callers contend on the same lock
/// rather than mutating the same item side by side.
///
/// ## Exclusion scope
///
/// Implementations must state their mutual-exclusion scope. The in-memory
/// store excludes within one process (tests, single-process deployments);
/// the Postgres store excludes deployment-wide via row locks.
///
/// ## Unlocked reads
///
/// `get` and `exists` read without the lock and may observe a quantity a
/// concurrent committed mutation supersedes. Acceptable for display; the
/// reservation decision always goes through `lock_and_get`.
#[async_trait]
pub trait ItemStore: Send + Sync {
    type Lease: ItemLease;

    /// Normalize a caller-facing key to the canonical item id.
    async fn resolve(&self, key: &ItemKey) -> Result<ItemId, StoreError>;

    /// Lock-free existence check.
    async fn exists(&self, key: &ItemKey) -> Result<bool, StoreError>;

    /// Lock-free read (eventually consistent; see trait docs).
    async fn get(&self, key: &ItemKey) -> Result<Option<InventoryItem>, StoreError>;

    /// Acquire the exclusive lease for `id`, bounded by `timeout`, and read
    /// the current item state under it.
    async fn lock_and_get(&self, id: ItemId, timeout: Duration)
        -> Result<Self::Lease, StoreError>;

    /// Administrative creation path. Fails with `Conflict` on a duplicate SKU.
    async fn insert(&self, item: InventoryItem) -> Result<(), StoreError>;
}
