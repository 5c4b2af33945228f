//! Recipes and their ingredient associations.
//!
//! Writes replace the tag and ingredient collections wholesale: a
//! [`NewRecipe`] or [`RecipeChanges`] always carries the complete lists, and
//! the store clears the old association rows before inserting the new ones.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use larder_core::{
    DomainError, DomainResult, Entity, IngredientId, RecipeId, TagId, UserId, ValueObject, validate,
};

use crate::image::RecipeImage;
use crate::ingredient::Ingredient;
use crate::tag::Tag;

pub const NAME_MAX: usize = 200;

/// Association entity: one ingredient of a recipe with its quantity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecipeIngredient {
    pub ingredient: Ingredient,
    pub amount: u32,
}

/// Scalar recipe fields (everything but the collections and identity).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecipeContent {
    pub name: String,
    pub text: String,
    pub cooking_time: u32,
    pub image: RecipeImage,
}

/// Recipe read model, fully joined.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Recipe {
    pub id: RecipeId,
    pub author: UserId,
    pub name: String,
    pub text: String,
    pub cooking_time: u32,
    pub image: RecipeImage,
    pub pub_date: DateTime<Utc>,
    /// Ordered by tag name.
    pub tags: Vec<Tag>,
    pub ingredients: Vec<RecipeIngredient>,
}

impl Recipe {
    pub fn has_tag_slug(&self, slug: &str) -> bool {
        self.tags.iter().any(|t| t.slug == slug)
    }
}

impl Entity for Recipe {
    type Id = RecipeId;

    fn id(&self) -> RecipeId {
        self.id
    }
}

/// Validated `(ingredient, amount)` pair.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct IngredientAmount {
    pub ingredient_id: IngredientId,
    pub amount: u32,
}

impl ValueObject for IngredientAmount {}

/// Raw ingredient line as submitted by clients.
#[derive(Debug, Clone, Deserialize)]
pub struct IngredientAmountDraft {
    pub id: IngredientId,
    pub amount: i64,
}

/// Unvalidated create payload.
#[derive(Debug, Clone, Deserialize)]
pub struct RecipeDraft {
    pub name: String,
    pub text: String,
    pub cooking_time: i64,
    pub image: Option<String>,
    pub tags: Vec<TagId>,
    pub ingredients: Vec<IngredientAmountDraft>,
}

/// Validated create payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewRecipe {
    pub content: RecipeContent,
    pub tags: Vec<TagId>,
    pub ingredients: Vec<IngredientAmount>,
}

impl RecipeDraft {
    pub fn validate(self) -> DomainResult<NewRecipe> {
        let image = match self.image.as_deref() {
            Some(raw) => RecipeImage::parse(raw)?,
            None => return Err(DomainError::invalid_field("image", "this field is required")),
        };
        let content = RecipeContent {
            name: validate::bounded_text("name", &self.name, NAME_MAX)?,
            text: non_blank("text", &self.text)?,
            cooking_time: validate::positive_integer("cooking_time", self.cooking_time)?,
            image,
        };
        Ok(NewRecipe {
            content,
            tags: validate_tags(self.tags)?,
            ingredients: validate_ingredients(self.ingredients)?,
        })
    }
}

/// Unvalidated update payload.
///
/// Scalars are optional (partial update). The collections are mandatory:
/// every update resubmits the complete tag and ingredient lists.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RecipeUpdate {
    pub name: Option<String>,
    pub text: Option<String>,
    pub cooking_time: Option<i64>,
    pub image: Option<String>,
    pub tags: Option<Vec<TagId>>,
    pub ingredients: Option<Vec<IngredientAmountDraft>>,
}

/// Validated update payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecipeChanges {
    pub name: Option<String>,
    pub text: Option<String>,
    pub cooking_time: Option<u32>,
    pub image: Option<RecipeImage>,
    pub tags: Vec<TagId>,
    pub ingredients: Vec<IngredientAmount>,
}

impl RecipeUpdate {
    pub fn validate(self) -> DomainResult<RecipeChanges> {
        let tags = self
            .tags
            .ok_or_else(|| DomainError::invalid_field("tags", "this field is required"))?;
        let ingredients = self
            .ingredients
            .ok_or_else(|| DomainError::invalid_field("ingredients", "this field is required"))?;
        Ok(RecipeChanges {
            name: self
                .name
                .map(|n| validate::bounded_text("name", &n, NAME_MAX))
                .transpose()?,
            text: self.text.map(|t| non_blank("text", &t)).transpose()?,
            cooking_time: self
                .cooking_time
                .map(|c| validate::positive_integer("cooking_time", c))
                .transpose()?,
            image: self.image.map(|i| RecipeImage::parse(&i)).transpose()?,
            tags: validate_tags(tags)?,
            ingredients: validate_ingredients(ingredients)?,
        })
    }
}

impl RecipeChanges {
    /// Overlay the provided scalars on the current content.
    pub fn apply(&self, current: &RecipeContent) -> RecipeContent {
        RecipeContent {
            name: self.name.clone().unwrap_or_else(|| current.name.clone()),
            text: self.text.clone().unwrap_or_else(|| current.text.clone()),
            cooking_time: self.cooking_time.unwrap_or(current.cooking_time),
            image: self.image.clone().unwrap_or_else(|| current.image.clone()),
        }
    }
}

fn non_blank(field: &str, value: &str) -> DomainResult<String> {
    if value.trim().is_empty() {
        return Err(DomainError::invalid_field(field, "must not be blank"));
    }
    Ok(value.to_string())
}

fn validate_tags(tags: Vec<TagId>) -> DomainResult<Vec<TagId>> {
    if tags.is_empty() {
        return Err(DomainError::invalid_field("tags", "at least one tag is required"));
    }
    let mut seen = HashSet::with_capacity(tags.len());
    for tag in &tags {
        if !seen.insert(*tag) {
            return Err(DomainError::invalid_field("tags", format!("tag {tag} is listed twice")));
        }
    }
    Ok(tags)
}

fn validate_ingredients(lines: Vec<IngredientAmountDraft>) -> DomainResult<Vec<IngredientAmount>> {
    if lines.is_empty() {
        return Err(DomainError::invalid_field(
            "ingredients",
            "at least one ingredient is required",
        ));
    }
    let mut seen = HashSet::with_capacity(lines.len());
    let mut out = Vec::with_capacity(lines.len());
    for line in lines {
        if !seen.insert(line.id) {
            return Err(DomainError::invalid_field(
                "ingredients",
                format!("ingredient {} is listed twice", line.id),
            ));
        }
        out.push(IngredientAmount {
            ingredient_id: line.id,
            amount: validate::positive_integer("amount", line.amount)?,
        });
    }
    Ok(out)
}
