//! Entity marker: something with a stable identity.
//!
//! An inventory item keeps being "the same item" while its quantity changes;
//! the id is what persists across those states. Contrast with
//! [`crate::value_object::ValueObject`], where the value *is* the identity.

/// Implemented by domain types addressed by a typed id.
pub trait Entity {
    /// The id newtype for this entity (see [`crate::id`]).
    type Id: Clone + Eq + core::hash::Hash + core::fmt::Debug;

    /// The identity that survives state changes.
    fn id(&self) -> &Self::Id;
}
