//! Value object trait: equality by value, not identity.

/// Marker trait for value objects.
///
/// Value objects are **immutable** and **compared by value**: two value
/// objects with the same attribute values are the same value. A monetary
/// breakdown or a shipping address snapshot is a value object; an order is
/// an entity.
///
/// To "modify" a value object, create a new one with the new values.
pub trait ValueObject: Clone + PartialEq + core::fmt::Debug {}
