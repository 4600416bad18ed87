//! Domain error model.

use thiserror::Error;

/// Result type used across the domain layer.
pub type InventoryResult<T> = Result<T, InventoryError>;

/// Inventory domain error.
///
/// Every mutation failure is a distinct, inspectable variant. The engine never
/// clamps a quantity or swallows a failure into a success value; callers that
/// want a boolean contract get it through the reservation façade, which
/// collapses only the variants that mean "no stock for you".
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum InventoryError {
    /// No item exists for the given key (id or SKU).
    #[error("inventory item not found")]
    NotFound,

    /// Applying the delta would drive the quantity below zero.
    ///
    /// `deficit` is the positive shortfall: how many units short the item is
    /// of satisfying the request.
    #[error("insufficient quantity (short by {deficit})")]
    InsufficientQuantity { deficit: i64 },

    /// Exclusive access could not be obtained within the bound.
    ///
    /// The caller has mutated nothing and may retry. This means "unknown
    /// outcome", never "no stock" — the reservation façade does not fold it
    /// into `false`.
    #[error("timed out waiting for exclusive access to the item")]
    LockTimeout,

    /// Malformed input (e.g. empty SKU, non-positive reservation quantity).
    #[error("validation failed: {0}")]
    Validation(String),

    /// Infrastructure failure surfaced with context (store, serialization).
    #[error("storage failure: {0}")]
    Storage(String),
}

impl InventoryError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn storage(msg: impl Into<String>) -> Self {
        Self::Storage(msg.into())
    }

    pub fn insufficient(deficit: i64) -> Self {
        Self::InsufficientQuantity { deficit }
    }

    pub fn not_found() -> Self {
        Self::NotFound
    }

    /// True for failures worth retrying without changing the request.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::LockTimeout | Self::Storage(_))
    }
}
