//! Caller-facing item addressing.

use serde::{Deserialize, Serialize};

use crate::id::ItemId;
use crate::sku::Sku;

/// The two forms callers may use to address an item.
///
/// Both forms resolve to the one canonical `ItemId` **before** any lock
/// acquisition, so id-form and SKU-form callers always contend on the same
/// lock. Nothing in the system ever locks on a SKU.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ItemKey {
    Id(ItemId),
    Sku(Sku),
}

impl From<ItemId> for ItemKey {
    fn from(id: ItemId) -> Self {
        Self::Id(id)
    }
}

impl From<Sku> for ItemKey {
    fn from(sku: Sku) -> Self {
        Self::Sku(sku)
    }
}

impl core::fmt::Display for ItemKey {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Id(id) => write!(f, "id:{id}"),
            Self::Sku(sku) => write!(f, "sku:{sku}"),
        }
    }
}
