//! Entity trait: identity + continuity across state changes.

/// Entity marker + minimal interface.
///
/// Recipes, ingredients, tags and users are entities: two records with the
/// same id are the same record, whatever their other attributes say.
pub trait Entity {
    /// Strongly-typed entity identifier.
    type Id: Copy + Eq + core::hash::Hash + core::fmt::Debug;

    /// Returns the entity identifier.
    fn id(&self) -> Self::Id;
}
