use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use stockforge_core::{CategoryId, Entity, ItemId, LocationId, Sku};
use stockforge_inventory::InventoryItem;

use crate::kinds::{AlertType, TriggerAction};

/// Published when a mutation leaves an item at or below its threshold.
///
/// Rides alongside the change event for the same mutation; restocking
/// consumers subscribe to this topic alone.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LowStockAlertEvent {
    item_id: ItemId,
    sku: Sku,
    item_name: String,
    category_id: CategoryId,
    category_name: String,
    location_id: LocationId,
    location_name: String,
    current_quantity: i64,
    threshold: i64,
    alert_type: AlertType,
    trigger_action: TriggerAction,
    timestamp: DateTime<Utc>,
}

impl LowStockAlertEvent {
    /// Shape an alert from the post-mutation item.
    ///
    /// Callers only construct this when the item is actually low; the deficit
    /// accessors assume `current_quantity <= threshold`.
    pub fn from_item(item: &InventoryItem, alert_type: AlertType, trigger_action: TriggerAction) -> Self {
        Self {
            item_id: *item.id(),
            sku: item.sku().clone(),
            item_name: item.name().to_string(),
            category_id: item.category().id,
            category_name: item.category().name.clone(),
            location_id: item.location().id,
            location_name: item.location().name.clone(),
            current_quantity: item.quantity(),
            threshold: item.threshold(),
            alert_type,
            trigger_action,
            timestamp: Utc::now(),
        }
    }

    pub fn item_id(&self) -> ItemId {
        self.item_id
    }

    pub fn sku(&self) -> &Sku {
        &self.sku
    }

    pub fn current_quantity(&self) -> i64 {
        self.current_quantity
    }

    pub fn threshold(&self) -> i64 {
        self.threshold
    }

    pub fn alert_type(&self) -> AlertType {
        self.alert_type
    }

    pub fn trigger_action(&self) -> TriggerAction {
        self.trigger_action
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    /// How many units below threshold the item sits (>= 0 by construction).
    pub fn deficit_quantity(&self) -> i64 {
        self.threshold - self.current_quantity
    }

    /// Deficit as a percentage of the threshold; 0 when the threshold is 0.
    pub fn deficit_percentage(&self) -> f64 {
        if self.threshold > 0 {
            (self.threshold - self.current_quantity) as f64 / self.threshold as f64 * 100.0
        } else {
            0.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
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
    fn deficit_quantity_and_percentage() {
        let alert = LowStockAlertEvent::from_item(
            &test_item(9, 10),
            AlertType::New,
            TriggerAction::Reservation,
        );
        assert_eq!(alert.deficit_quantity(), 1);
        assert!((alert.deficit_percentage() - 10.0).abs() < f64::EPSILON);
    }

    #[test]
    fn zero_threshold_reports_zero_percentage() {
        let alert =
            LowStockAlertEvent::from_item(&test_item(0, 0), AlertType::New, TriggerAction::Update);
        assert_eq!(alert.deficit_quantity(), 0);
        assert_eq!(alert.deficit_percentage(), 0.0);
    }

    #[test]
    fn wire_format_includes_alert_tags() {
        let alert = LowStockAlertEvent::from_item(
            &test_item(2, 10),
            AlertType::Continued,
            TriggerAction::Update,
        );
        let json = serde_json::to_value(&alert).unwrap();
        assert_eq!(json["alertType"], "CONTINUED");
        assert_eq!(json["triggerAction"], "UPDATE");
        assert_eq!(json["currentQuantity"], 2);
    }
}
