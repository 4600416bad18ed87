//! Infrastructure layer: item storage, exclusive access, outbox delivery,
//! and the mutation engine that composes them.

pub mod engine;
pub mod item_store;
pub mod outbox;


pub use engine::{EngineConfig, InventoryEngine};
pub use item_store::{InMemoryItemStore, ItemLease, ItemStore, PostgresItemStore, StoreError};
pub use outbox::{
    DispatcherHandle, DispatcherStats, InMemoryOutboxStore, OutboxDispatcher,
    OutboxDispatcherConfig, OutboxRecord, OutboxStats, OutboxStatus, OutboxStore,
    OutboxStoreError, PostgresOutboxStore,
};
