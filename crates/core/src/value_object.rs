//! Value object trait: equality by value, not identity.

/// Marker trait for value objects.
///
/// Value objects have no identity; two values with the same attributes are
/// interchangeable. In this domain an ingredient quantity or an aggregated
/// shopping-list line is a value, while a recipe is an entity.
///
/// ```ignore
/// #[derive(Debug, Clone, PartialEq, Eq)]
/// struct Quantity {
///     amount: u32,
///     unit: String,
/// }
///
/// impl ValueObject for Quantity {}
/// ```
pub trait ValueObject: Clone + PartialEq + core::fmt::Debug {}
