//! Entity trait: objects with identity that persists across state changes.

/// Marker + minimal interface for entities.
///
/// Unlike a [`crate::ValueObject`], two entities with equal field values
/// are still different things if their ids differ.
pub trait Entity {
    /// Strongly-typed entity identifier.
    type Id: Clone + Eq + core::hash::Hash + core::fmt::Debug;

    fn id(&self) -> &Self::Id;
}
