//! Item storage with exclusive-access leases.

pub mod in_memory;
pub mod postgres;
mod r#trait;

pub use in_memory::InMemoryItemStore;
pub use postgres::PostgresItemStore;
pub use r#trait::{ItemLease, ItemStore, StoreError};
