//! Recipes domain module.
//!
//! Catalog records (tags, ingredients), recipes with their ingredient
//! quantities, user profiles and the membership records (favorites, shopping
//! cart, author subscriptions). Everything here is deterministic domain logic:
//! validation and value construction, no IO, no HTTP, no storage.

pub mod image;
pub mod ingredient;
pub mod membership;
pub mod query;
pub mod recipe;
pub mod tag;
pub mod user;

pub use image::RecipeImage;
pub use ingredient::{Ingredient, NewIngredient};
pub use membership::{MembershipKind, Subscription};
pub use query::{PageRequest, Paged, RecipeQuery};
pub use recipe::{
    IngredientAmount, IngredientAmountDraft, NewRecipe, Recipe, RecipeChanges, RecipeContent, RecipeDraft,
    RecipeIngredient, RecipeUpdate,
};
pub use tag::{NewTag, Tag, TagDraft};
pub use user::{NewUser, ProfileChanges, ProfilePatch, User, UserDraft};
