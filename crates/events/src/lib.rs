//! Integration events emitted on every accepted quantity mutation, plus the
//! publisher abstraction they leave the process through.
//!
//! Events are immutable values created fresh per mutation — they have no
//! lifecycle of their own and are not persisted entities of this crate (the
//! infra outbox persists their serialized form for delivery).
//!
//! Wire format matches the downstream consumers' expectations: camelCase
//! field names, SCREAMING_SNAKE_CASE kind tags.

pub mod alert;
pub mod change;
pub mod in_memory;
pub mod kinds;
pub mod publisher;

pub use alert::LowStockAlertEvent;
pub use change::InventoryChangeEvent;
pub use in_memory::{InMemoryPublisher, PublishedMessage};
pub use kinds::{AlertType, ChangeKind, TriggerAction};
pub use publisher::{EventPublisher, PublishError};

/// Topic carrying one `InventoryChangeEvent` per accepted mutation.
pub const TOPIC_INVENTORY_CHANGES: &str = "inventory-changes";

/// Topic carrying `LowStockAlertEvent`s for items at or below threshold.
pub const TOPIC_LOW_STOCK_ALERTS: &str = "low-stock-alerts";
