//! Entity trait: records that are compared and tracked by identity.

/// Entity marker + minimal interface.
///
/// Catalog records coming back from the product service are entities: two
/// payloads with the same id describe the same product, whatever their fields.
pub trait Entity {
    /// Strongly-typed entity identifier.
    type Id: Copy + Ord + core::hash::Hash + core::fmt::Debug;

    /// Returns the entity identifier.
    fn id(&self) -> Self::Id;
}
