//! Persistence boundary.
//!
//! One trait per concern, all async, all `Send + Sync` so handlers can share a
//! single `Arc<dyn Store>`. Two adapters implement every trait:
//! [`InMemoryStore`](crate::memory::InMemoryStore) for tests and development,
//! [`PostgresStore`](crate::postgres::PostgresStore) for deployments.

mod error;

pub use error::{StoreError, StoreResult};

use std::sync::Arc;

use larder_core::{IngredientId, RecipeId, TagId, UserId};
use larder_recipes::{
    Ingredient, MembershipKind, NewIngredient, NewRecipe, NewTag, NewUser, PageRequest, Paged,
    ProfileChanges, Recipe, RecipeChanges, RecipeQuery, Subscription, Tag, User,
};
use larder_shopping::IngredientRow;
use serde::Serialize;

/// Result of a get-or-create ingredient import.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ImportSummary {
    pub created: usize,
    pub existing: usize,
}

/// Tags and ingredients.
#[async_trait::async_trait]
pub trait CatalogStore: Send + Sync {
    /// All tags, ordered by name.
    async fn list_tags(&self) -> StoreResult<Vec<Tag>>;

    async fn get_tag(&self, id: TagId) -> StoreResult<Tag>;

    /// Fails with `Conflict` when the name or slug is taken.
    async fn create_tag(&self, tag: NewTag) -> StoreResult<Tag>;

    /// Ingredients whose name starts with `prefix` (case-insensitive), ordered by name.
    async fn search_ingredients(&self, prefix: Option<&str>) -> StoreResult<Vec<Ingredient>>;

    async fn get_ingredient(&self, id: IngredientId) -> StoreResult<Ingredient>;

    async fn create_ingredient(&self, ingredient: NewIngredient) -> StoreResult<Ingredient>;

    /// Get-or-create by exact `(name, measurement_unit)`.
    async fn import_ingredients(&self, rows: Vec<NewIngredient>) -> StoreResult<ImportSummary>;
}

/// Profiles and author subscriptions.
#[async_trait::async_trait]
pub trait UserStore: Send + Sync {
    /// Fails with `Conflict` when the email or username is taken.
    async fn create_user(&self, user: NewUser) -> StoreResult<User>;

    async fn get_user(&self, id: UserId) -> StoreResult<User>;

    async fn update_user(&self, id: UserId, changes: ProfileChanges) -> StoreResult<User>;

    /// Ordered by id.
    async fn list_users(&self, page: PageRequest) -> StoreResult<Paged<User>>;

    /// `NotFound` for an unknown author, `Conflict` when already subscribed.
    async fn subscribe(&self, subscription: Subscription) -> StoreResult<()>;

    /// `NotFound` when the subscription does not exist.
    async fn unsubscribe(&self, subscription: Subscription) -> StoreResult<()>;

    async fn is_subscribed(&self, subscriber: UserId, author: UserId) -> StoreResult<bool>;

    /// Authors followed by `subscriber`, ordered by author id.
    async fn list_subscriptions(
        &self,
        subscriber: UserId,
        page: PageRequest,
    ) -> StoreResult<Paged<User>>;
}

/// Recipes with their tag and ingredient associations.
#[async_trait::async_trait]
pub trait RecipeStore: Send + Sync {
    /// Inserts the recipe and its associations atomically. Unknown tag or
    /// ingredient ids fail with a field-scoped domain error.
    async fn create_recipe(&self, author: UserId, recipe: NewRecipe) -> StoreResult<Recipe>;

    /// Applies scalar changes and replaces both association sets atomically.
    async fn update_recipe(&self, id: RecipeId, changes: RecipeChanges) -> StoreResult<Recipe>;

    /// Cascades to associations and memberships.
    async fn delete_recipe(&self, id: RecipeId) -> StoreResult<()>;

    async fn get_recipe(&self, id: RecipeId) -> StoreResult<Recipe>;

    /// Newest first.
    async fn list_recipes(&self, query: &RecipeQuery, page: PageRequest) -> StoreResult<Paged<Recipe>>;

    async fn count_recipes_by(&self, author: UserId) -> StoreResult<u64>;
}

/// Favorites and shopping cart.
#[async_trait::async_trait]
pub trait MembershipStore: Send + Sync {
    /// `NotFound` for an unknown recipe, `Conflict` when already present.
    async fn add_membership(
        &self,
        kind: MembershipKind,
        user: UserId,
        recipe: RecipeId,
    ) -> StoreResult<()>;

    /// `NotFound` when the pair is absent.
    async fn remove_membership(
        &self,
        kind: MembershipKind,
        user: UserId,
        recipe: RecipeId,
    ) -> StoreResult<()>;

    async fn has_membership(
        &self,
        kind: MembershipKind,
        user: UserId,
        recipe: RecipeId,
    ) -> StoreResult<bool>;

    /// Every recipe-ingredient row of every recipe in the user's cart, joined
    /// with the ingredient's name and unit. Unmerged and unordered.
    async fn cart_ingredient_rows(&self, user: UserId) -> StoreResult<Vec<IngredientRow>>;
}

/// Everything the API needs from persistence.
pub trait Store: CatalogStore + UserStore + RecipeStore + MembershipStore {}

impl<T> Store for T where T: CatalogStore + UserStore + RecipeStore + MembershipStore {}

pub type SharedStore = Arc<dyn Store>;
