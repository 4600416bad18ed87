//! `stockforge-core` — domain foundation building blocks.
//!
//! This crate contains **pure domain** primitives (no infrastructure concerns).

pub mod entity;
pub mod error;
pub mod id;
pub mod key;
pub mod sku;
pub mod value_object;

pub use entity::Entity;
pub use error::{InventoryError, InventoryResult};
pub use id::{CategoryId, ItemId, LocationId};
pub use key::ItemKey;
pub use sku::Sku;
pub use value_object::ValueObject;
