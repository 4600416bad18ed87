use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use stockforge_core::{CategoryId, Entity, InventoryError, InventoryResult, ItemId, LocationId, Sku};

/// Reference to a category owned by an external administrative system.
///
/// The name is carried along because change/alert events embed it; it is
/// denormalized display data, not authoritative state of this core.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryRef {
    pub id: CategoryId,
    pub name: String,
}

/// Reference to a warehouse location owned by an external system.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocationRef {
    pub id: LocationId,
    pub name: String,
}

/// Derived low-stock status. Never stored — recomputed from quantity and
/// threshold at every observation.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StockStatus {
    Normal,
    LowStock,
}

impl StockStatus {
    /// `LowStock` iff `quantity <= threshold`.
    pub fn of(quantity: i64, threshold: i64) -> Self {
        if quantity <= threshold {
            Self::LowStock
        } else {
            Self::Normal
        }
    }

    pub fn is_low(self) -> bool {
        self == Self::LowStock
    }
}

/// An inventory item: the only shared mutable record in this core.
///
/// Invariant: `quantity >= 0` at every observable state. The only path that
/// changes `quantity` is [`InventoryItem::apply_delta`], which enforces the
/// invariant; overlapping mutations are prevented by the store's exclusive
/// lease, not by this type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryItem {
    id: ItemId,
    sku: Sku,
    name: String,
    description: String,
    quantity: i64,
    threshold: i64,
    category: CategoryRef,
    location: LocationRef,
    updated_at: DateTime<Utc>,
}

impl InventoryItem {
    /// Construct a new item (administrative creation path).
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: ItemId,
        sku: Sku,
        name: impl Into<String>,
        description: impl Into<String>,
        quantity: i64,
        threshold: i64,
        category: CategoryRef,
        location: LocationRef,
    ) -> InventoryResult<Self> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(InventoryError::validation("item name must not be empty"));
        }
        if quantity < 0 {
            return Err(InventoryError::validation("quantity must not be negative"));
        }
        if threshold < 0 {
            return Err(InventoryError::validation("threshold must not be negative"));
        }
        Ok(Self {
            id,
            sku,
            name,
            description: description.into(),
            quantity,
            threshold,
            category,
            location,
            updated_at: Utc::now(),
        })
    }

    /// Reconstruct an item from persisted state.
    ///
    /// Skips creation-time validation: the store is trusted to hold state
    /// that satisfied the invariants when it was written.
    #[allow(clippy::too_many_arguments)]
    pub fn rehydrate(
        id: ItemId,
        sku: Sku,
        name: String,
        description: String,
        quantity: i64,
        threshold: i64,
        category: CategoryRef,
        location: LocationRef,
        updated_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            sku,
            name,
            description,
            quantity,
            threshold,
            category,
            location,
            updated_at,
        }
    }

    pub fn sku(&self) -> &Sku {
        &self.sku
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn quantity(&self) -> i64 {
        self.quantity
    }

    pub fn threshold(&self) -> i64 {
        self.threshold
    }

    pub fn category(&self) -> &CategoryRef {
        &self.category
    }

    pub fn location(&self) -> &LocationRef {
        &self.location
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Current derived status.
    pub fn stock_status(&self) -> StockStatus {
        StockStatus::of(self.quantity, self.threshold)
    }

    pub fn is_low_stock(&self) -> bool {
        self.stock_status().is_low()
    }

    /// Apply a signed delta, enforcing the non-negativity invariant.
    ///
    /// Returns the updated item with a fresh `updated_at`. If the delta would
    /// drive the quantity below zero, fails with `InsufficientQuantity`
    /// carrying the positive shortfall; the item is untouched. Never clamps.
    pub fn apply_delta(&self, delta: i64) -> InventoryResult<Self> {
        let new_quantity = self
            .quantity
            .checked_add(delta)
            .ok_or_else(|| InventoryError::validation("quantity overflow"))?;
        if new_quantity < 0 {
            return Err(InventoryError::insufficient(-new_quantity));
        }
        let mut updated = self.clone();
        updated.quantity = new_quantity;
        updated.updated_at = Utc::now();
        Ok(updated)
    }
}

impl Entity for InventoryItem {
    type Id = ItemId;

    fn id(&self) -> &ItemId {
        &self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn test_item(quantity: i64, threshold: i64) -> InventoryItem {
        InventoryItem::new(
            ItemId::new(),
            Sku::new("SKU-001").unwrap(),
            "Widget",
            "A test widget",
            quantity,
            threshold,
            CategoryRef {
                id: CategoryId::new(),
                name: "Widgets".to_string(),
            },
            LocationRef {
                id: LocationId::new(),
                name: "Warehouse A".to_string(),
            },
        )
        .unwrap()
    }

    #[test]
    fn apply_delta_adds_and_subtracts() {
        let item = test_item(10, 3);
        let item = item.apply_delta(5).unwrap();
        assert_eq!(item.quantity(), 15);
        let item = item.apply_delta(-15).unwrap();
        assert_eq!(item.quantity(), 0);
    }

    #[test]
    fn apply_delta_rejects_negative_result_with_deficit() {
        let item = test_item(3, 0);
        let err = item.apply_delta(-5).unwrap_err();
        match err {
            InventoryError::InsufficientQuantity { deficit } => assert_eq!(deficit, 2),
            other => panic!("expected InsufficientQuantity, got {other:?}"),
        }
        // Rejected delta leaves the item untouched.
        assert_eq!(item.quantity(), 3);
    }

    #[test]
    fn status_boundary_is_inclusive() {
        assert_eq!(StockStatus::of(11, 10), StockStatus::Normal);
        assert_eq!(StockStatus::of(10, 10), StockStatus::LowStock);
        assert_eq!(StockStatus::of(9, 10), StockStatus::LowStock);
        assert_eq!(StockStatus::of(0, 0), StockStatus::LowStock);
    }

    #[test]
    fn new_rejects_negative_quantity_and_threshold() {
        let make = |q, t| {
            InventoryItem::new(
                ItemId::new(),
                Sku::new("SKU-002").unwrap(),
                "Widget",
                "",
                q,
                t,
                CategoryRef {
                    id: CategoryId::new(),
                    name: "Widgets".to_string(),
                },
                LocationRef {
                    id: LocationId::new(),
                    name: "Warehouse A".to_string(),
                },
            )
        };
        assert!(matches!(make(-1, 0), Err(InventoryError::Validation(_))));
        assert!(matches!(make(0, -1), Err(InventoryError::Validation(_))));
        assert!(make(0, 0).is_ok());
    }

    proptest! {
        /// The quantity after an accepted delta is never negative, and a
        /// delta is rejected exactly when it would go negative.
        #[test]
        fn delta_rule_never_goes_negative(q in 0i64..1_000_000, d in -2_000_000i64..2_000_000) {
            let item = test_item(q, 10);
            match item.apply_delta(d) {
                Ok(updated) => {
                    prop_assert!(updated.quantity() >= 0);
                    prop_assert_eq!(updated.quantity(), q + d);
                }
                Err(InventoryError::InsufficientQuantity { deficit }) => {
                    prop_assert!(q + d < 0);
                    prop_assert_eq!(deficit, -(q + d));
                }
                Err(other) => prop_assert!(false, "unexpected error: {:?}", other),
            }
        }

        /// Conservation: a sequence of accepted deltas sums exactly.
        #[test]
        fn accepted_deltas_sum(q in 0i64..10_000, deltas in proptest::collection::vec(-100i64..100, 0..50)) {
            let mut item = test_item(q, 10);
            let mut accepted = 0i64;
            for d in deltas {
                if let Ok(updated) = item.apply_delta(d) {
                    item = updated;
                    accepted += d;
                }
            }
            prop_assert_eq!(item.quantity(), q + accepted);
        }
    }
}
