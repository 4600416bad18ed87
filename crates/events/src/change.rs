use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use stockforge_core::{CategoryId, Entity, ItemId, LocationId, Sku};
use stockforge_inventory::InventoryItem;

use crate::kinds::ChangeKind;

/// Published for **every** accepted quantity mutation, describing the
/// before/after state. Keyed by SKU on the bus so all changes to one item
/// land on one partition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InventoryChangeEvent {
    item_id: ItemId,
    sku: Sku,
    item_name: String,
    category_id: CategoryId,
    category_name: String,
    location_id: LocationId,
    location_name: String,
    old_quantity: i64,
    new_quantity: i64,
    threshold: i64,
    change_type: ChangeKind,
    timestamp: DateTime<Utc>,
}

impl InventoryChangeEvent {
    /// Shape a change event from the post-mutation item and the quantity
    /// observed under the lease before the delta was applied.
    pub fn from_item(item: &InventoryItem, old_quantity: i64, change_type: ChangeKind) -> Self {
        Self {
            item_id: *item.id(),
            sku: item.sku().clone(),
            item_name: item.name().to_string(),
            category_id: item.category().id,
            category_name: item.category().name.clone(),
            location_id: item.location().id,
            location_name: item.location().name.clone(),
            old_quantity,
            new_quantity: item.quantity(),
            threshold: item.threshold(),
            change_type,
            timestamp: Utc::now(),
        }
    }

    pub fn item_id(&self) -> ItemId {
        self.item_id
    }

    pub fn sku(&self) -> &Sku {
        &self.sku
    }

    pub fn item_name(&self) -> &str {
        &self.item_name
    }

    pub fn old_quantity(&self) -> i64 {
        self.old_quantity
    }

    pub fn new_quantity(&self) -> i64 {
        self.new_quantity
    }

    pub fn threshold(&self) -> i64 {
        self.threshold
    }

    pub fn change_type(&self) -> ChangeKind {
        self.change_type
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    /// Whether the post-mutation quantity is at or below threshold.
    pub fn is_low_stock(&self) -> bool {
        self.new_quantity <= self.threshold
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stockforge_core::{CategoryId, LocationId};
    use stockforge_inventory::{CategoryRef, LocationRef};

    fn test_item(quantity: i64, threshold: i64) -> InventoryItem {
        InventoryItem::new(
            ItemId::new(),
            Sku::new("WIDGET-001").unwrap(),
            "Widget",
            "",
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
    fn wire_format_is_camel_case_with_screaming_kind() {
        let item = test_item(9, 10);
        let event = InventoryChangeEvent::from_item(&item, 11, ChangeKind::Reservation);
        let json = serde_json::to_value(&event).unwrap();

        assert_eq!(json["sku"], "WIDGET-001");
        assert_eq!(json["itemName"], "Widget");
        assert_eq!(json["oldQuantity"], 11);
        assert_eq!(json["newQuantity"], 9);
        assert_eq!(json["changeType"], "RESERVATION");
        assert!(json.get("timestamp").is_some());
        assert!(json.get("categoryName").is_some());
        assert!(json.get("locationName").is_some());
    }

    #[test]
    fn low_stock_follows_new_quantity() {
        let item = test_item(9, 10);
        let event = InventoryChangeEvent::from_item(&item, 11, ChangeKind::Decrement);
        assert!(event.is_low_stock());

        let item = test_item(11, 10);
        let event = InventoryChangeEvent::from_item(&item, 9, ChangeKind::Increment);
        assert!(!event.is_low_stock());
    }
}
