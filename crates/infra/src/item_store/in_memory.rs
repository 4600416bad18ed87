//! In-memory item store for tests/dev and single-process deployments.

use std::collections::HashMap;
use std::sync::{Arc, Mutex as StdMutex, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

use stockforge_core::{Entity, ItemId, ItemKey};
use stockforge_inventory::InventoryItem;

use super::r#trait::{ItemLease, ItemStore, StoreError};
use crate::outbox::{InMemoryOutboxStore, OutboxRecord, OutboxStore};

#[derive(Debug, Default)]
struct State {
    items: HashMap<ItemId, InventoryItem>,
    by_sku: HashMap<String, ItemId>,
}

#[derive(Debug)]
struct Inner {
    state: RwLock<State>,
    /// One async mutex per canonical item id. Entries are created on first
    /// acquisition and never removed; the map only grows with the catalog.
    locks: StdMutex<HashMap<ItemId, Arc<AsyncMutex<()>>>>,
    outbox: Arc<InMemoryOutboxStore>,
}

/// In-memory item store.
///
/// Mutual-exclusion scope: **one process**. Leases are per-item
/// `tokio::sync::Mutex` acquisitions bounded by `tokio::time::timeout`, so
/// every caller sharing this store (via `Clone`) serializes per canonical id.
/// For deployment-wide exclusion use `PostgresItemStore`.
///
/// Commit atomicity: the item write and the outbox append happen while the
/// per-item lease is still held, so no competing mutation can interleave
/// between them.
#[derive(Debug, Clone)]
pub struct InMemoryItemStore {
    inner: Arc<Inner>,
}

impl InMemoryItemStore {
    /// The outbox is shared with the dispatcher, so it is injected.
    pub fn new(outbox: Arc<InMemoryOutboxStore>) -> Self {
        Self {
            inner: Arc::new(Inner {
                state: RwLock::new(State::default()),
                locks: StdMutex::new(HashMap::new()),
                outbox,
            }),
        }
    }

    fn lock_for(&self, id: ItemId) -> Arc<AsyncMutex<()>> {
        let mut locks = self.inner.locks.lock().unwrap();
        locks
            .entry(id)
            .or_insert_with(|| Arc::new(AsyncMutex::new(())))
            .clone()
    }

    fn lookup(&self, key: &ItemKey) -> Option<ItemId> {
        let state = self.inner.state.read().unwrap();
        match key {
            ItemKey::Id(id) => state.items.contains_key(id).then_some(*id),
            ItemKey::Sku(sku) => state.by_sku.get(sku.as_str()).copied(),
        }
    }
}

/// Exclusive lease over one in-memory item.
#[derive(Debug)]
pub struct InMemoryLease {
    inner: Arc<Inner>,
    item: InventoryItem,
    _guard: OwnedMutexGuard<()>,
}

#[async_trait]
impl ItemLease for InMemoryLease {
    fn item(&self) -> &InventoryItem {
        &self.item
    }

    async fn commit(
        self,
        item: InventoryItem,
        records: Vec<OutboxRecord>,
    ) -> Result<InventoryItem, StoreError> {
        {
            let mut state = self.inner.state.write().unwrap();
            state
                .by_sku
                .insert(item.sku().as_str().to_string(), *item.id());
            state.items.insert(*item.id(), item.clone());
        }
        self.inner
            .outbox
            .append(records)
            .await
            .map_err(|e| StoreError::Storage(e.to_string()))?;
        Ok(item)
        // _guard drops here: lease released after the commit is visible.
    }
}

#[async_trait]
impl ItemStore for InMemoryItemStore {
    type Lease = InMemoryLease;

    async fn resolve(&self, key: &ItemKey) -> Result<ItemId, StoreError> {
        match key {
            // Id form is already canonical; existence is checked at
            // lock_and_get so a racing delete still surfaces as NotFound.
            ItemKey::Id(id) => Ok(*id),
            ItemKey::Sku(sku) => {
                let state = self.inner.state.read().unwrap();
                state
                    .by_sku
                    .get(sku.as_str())
                    .copied()
                    .ok_or(StoreError::NotFound)
            }
        }
    }

    async fn exists(&self, key: &ItemKey) -> Result<bool, StoreError> {
        Ok(self.lookup(key).is_some())
    }

    async fn get(&self, key: &ItemKey) -> Result<Option<InventoryItem>, StoreError> {
        let id = match self.lookup(key) {
            Some(id) => id,
            None => return Ok(None),
        };
        let state = self.inner.state.read().unwrap();
        Ok(state.items.get(&id).cloned())
    }

    async fn lock_and_get(
        &self,
        id: ItemId,
        timeout: Duration,
    ) -> Result<Self::Lease, StoreError> {
        let lock = self.lock_for(id);
        let guard = tokio::time::timeout(timeout, lock.lock_owned())
            .await
            .map_err(|_| StoreError::LockTimeout)?;

        let item = {
            let state = self.inner.state.read().unwrap();
            state.items.get(&id).cloned()
        };
        // Guard drops on the error path: no lease outlives a missing item.
        let item = item.ok_or(StoreError::NotFound)?;

        Ok(InMemoryLease {
            inner: self.inner.clone(),
            item,
            _guard: guard,
        })
    }

    async fn insert(&self, item: InventoryItem) -> Result<(), StoreError> {
        let mut state = self.inner.state.write().unwrap();
        let sku = item.sku().as_str().to_string();
        if state.by_sku.contains_key(&sku) {
            return Err(StoreError::Conflict(format!(
                "inventory item with SKU {sku} already exists"
            )));
        }
        state.by_sku.insert(sku, *item.id());
        state.items.insert(*item.id(), item);
        Ok(())
    }
}
