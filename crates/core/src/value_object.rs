//! Value object trait: equality by value, not identity.

/// Marker trait for value objects.
///
/// Value objects are immutable and compared by their attribute values. Two stock
/// quantities of `4 Bosta (50kg) + 8 KG` are the same quantity, no matter which
/// purchase produced them. To "modify" one, build a new value.
///
/// ```ignore
/// #[derive(Debug, Clone, PartialEq, Eq)]
/// struct Rate {
///     per_kg: Decimal,
/// }
///
/// impl ValueObject for Rate {}
/// ```
pub trait ValueObject: Clone + PartialEq + core::fmt::Debug {}
