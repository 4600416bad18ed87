//! Transactional outbox: durable event records committed atomically with the
//! quantity change they describe, delivered asynchronously with retry.
//!
//! This replaces fire-and-forget publishing on the mutation path. A crash
//! between commit and delivery loses nothing: the record is already durable
//! and the dispatcher picks it up on restart. Delivery is therefore
//! at-least-once; consumers must be idempotent.

pub mod dispatcher;
pub mod postgres;
pub mod store;

pub use dispatcher::{DispatcherHandle, DispatcherStats, OutboxDispatcher, OutboxDispatcherConfig};
pub use postgres::PostgresOutboxStore;
pub use store::{
    InMemoryOutboxStore, OutboxRecord, OutboxStats, OutboxStatus, OutboxStore, OutboxStoreError,
};
