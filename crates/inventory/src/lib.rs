//! Inventory domain module.
//!
//! This crate contains the business rules for on-hand stock, implemented
//! purely as deterministic domain logic (no IO, no locking, no storage).
//! The non-negativity rule lives here; serialization of mutations lives in
//! the infrastructure layer.

pub mod item;

pub use item::{CategoryRef, InventoryItem, LocationRef, StockStatus};
