//! Response representations and query-string parsing.

use chrono::{DateTime, Utc};
use serde::Serialize;

use larder_core::{DomainError, DomainResult, IngredientId, RecipeId, UserId};
use larder_recipes::{PageRequest, Recipe, RecipeQuery, Tag, User};

/// A user as seen by the viewer.
#[derive(Debug, Clone, Serialize)]
pub struct UserView {
    pub email: String,
    pub id: UserId,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub is_subscribed: bool,
}

impl UserView {
    pub fn new(user: User, is_subscribed: bool) -> Self {
        Self {
            email: user.email,
            id: user.id,
            username: user.username,
            first_name: user.first_name,
            last_name: user.last_name,
            is_subscribed,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RecipeIngredientView {
    pub id: IngredientId,
    pub name: String,
    pub measurement_unit: String,
    pub amount: u32,
}

/// Full recipe representation.
#[derive(Debug, Clone, Serialize)]
pub struct RecipeView {
    pub id: RecipeId,
    pub tags: Vec<Tag>,
    pub author: UserView,
    pub ingredients: Vec<RecipeIngredientView>,
    pub image: String,
    pub is_favorited: bool,
    pub is_in_shopping_cart: bool,
    pub name: String,
    pub text: String,
    pub cooking_time: u32,
    pub pub_date: DateTime<Utc>,
}

/// Flags relative to the viewer.
#[derive(Debug, Copy, Clone, Default)]
pub struct RecipeFlags {
    pub is_favorited: bool,
    pub is_in_shopping_cart: bool,
}

impl RecipeView {
    pub fn new(recipe: Recipe, author: UserView, flags: RecipeFlags) -> Self {
        Self {
            id: recipe.id,
            tags: recipe.tags,
            author,
            ingredients: recipe
                .ingredients
                .into_iter()
                .map(|line| RecipeIngredientView {
                    id: line.ingredient.id,
                    name: line.ingredient.name,
                    measurement_unit: line.ingredient.measurement_unit,
                    amount: line.amount,
                })
                .collect(),
            image: recipe.image.as_str().to_string(),
            is_favorited: flags.is_favorited,
            is_in_shopping_cart: flags.is_in_shopping_cart,
            name: recipe.name,
            text: recipe.text,
            cooking_time: recipe.cooking_time,
            pub_date: recipe.pub_date,
        }
    }
}

/// Compact form used by favorites, cart and subscription listings.
#[derive(Debug, Clone, Serialize)]
pub struct RecipeShortView {
    pub id: RecipeId,
    pub name: String,
    pub image: String,
    pub cooking_time: u32,
}

impl From<&Recipe> for RecipeShortView {
    fn from(recipe: &Recipe) -> Self {
        Self {
            id: recipe.id,
            name: recipe.name.clone(),
            image: recipe.image.as_str().to_string(),
            cooking_time: recipe.cooking_time,
        }
    }
}

/// A followed author with a preview of their recipes.
#[derive(Debug, Clone, Serialize)]
pub struct SubscriptionView {
    #[serde(flatten)]
    pub user: UserView,
    pub recipes: Vec<RecipeShortView>,
    pub recipes_count: u64,
}

/// Raw query-string pairs; keys may repeat (`?tags=a&tags=b`).
#[derive(Debug, Clone, Default)]
pub struct QueryParams(Vec<(String, String)>);

impl QueryParams {
    pub fn new(pairs: Vec<(String, String)>) -> Self {
        Self(pairs)
    }

    pub fn first(&self, key: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn all<'a>(&'a self, key: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.0
            .iter()
            .filter(move |(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// `page` (default 1) and `limit` (default `default_limit`).
    pub fn page_request(&self, default_limit: u32) -> DomainResult<PageRequest> {
        let page = self.number("page")?.unwrap_or(1);
        let limit = self.number("limit")?.unwrap_or(default_limit);
        PageRequest::new(page, limit)
    }

    /// `recipes_limit` override for subscription listings.
    pub fn recipes_limit(&self, default: u32) -> DomainResult<u32> {
        Ok(self.number("recipes_limit")?.unwrap_or(default))
    }

    /// Recipe listing filters. The favorite/cart filters only apply to
    /// authenticated viewers.
    pub fn recipe_query(&self, viewer: Option<UserId>) -> DomainResult<RecipeQuery> {
        let authors = self
            .all("author")
            .map(|raw| {
                raw.parse::<UserId>()
                    .map_err(|_| DomainError::invalid_field("author", format!("\"{raw}\" is not a user id")))
            })
            .collect::<DomainResult<Vec<_>>>()?;
        let tags = self
            .all("tags")
            .filter(|slug| !slug.is_empty())
            .map(str::to_string)
            .collect();
        Ok(RecipeQuery {
            tags,
            authors,
            favorited_by: viewer.filter(|_| self.flag("is_favorited")),
            in_cart_of: viewer.filter(|_| self.flag("is_in_shopping_cart")),
        })
    }

    fn flag(&self, key: &str) -> bool {
        matches!(self.first(key), Some("1" | "true"))
    }

    fn number(&self, key: &'static str) -> DomainResult<Option<u32>> {
        self.first(key)
            .map(|raw| {
                raw.trim()
                    .parse::<u32>()
                    .map_err(|_| DomainError::invalid_field(key, format!("\"{raw}\" is not a valid number")))
            })
            .transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(pairs: &[(&str, &str)]) -> QueryParams {
        QueryParams::new(
            pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        )
    }

    #[test]
    fn repeated_filters_are_collected() {
        let q = params(&[("tags", "breakfast"), ("tags", "lunch"), ("author", "3")])
            .recipe_query(None)
            .unwrap();
        assert_eq!(q.tags, vec!["breakfast", "lunch"]);
        assert_eq!(q.authors, vec![UserId::new(3)]);
    }

    #[test]
    fn membership_filters_need_a_viewer() {
        let p = params(&[("is_favorited", "1"), ("is_in_shopping_cart", "true")]);
        let anonymous = p.recipe_query(None).unwrap();
        assert_eq!(anonymous.favorited_by, None);
        assert_eq!(anonymous.in_cart_of, None);

        let me = UserId::new(5);
        let q = p.recipe_query(Some(me)).unwrap();
        assert_eq!(q.favorited_by, Some(me));
        assert_eq!(q.in_cart_of, Some(me));

        let off = params(&[("is_favorited", "0")]).recipe_query(Some(me)).unwrap();
        assert_eq!(off.favorited_by, None);
    }

    #[test]
    fn bad_numbers_name_their_field() {
        let err = params(&[("page", "two")]).page_request(6).unwrap_err();
        assert_eq!(err.field(), Some("page"));
        let err = params(&[("author", "x")]).recipe_query(None).unwrap_err();
        assert_eq!(err.field(), Some("author"));
    }

    #[test]
    fn page_defaults() {
        let page = params(&[]).page_request(6).unwrap();
        assert_eq!((page.page(), page.limit()), (1, 6));
        assert_eq!(params(&[]).recipes_limit(2).unwrap(), 2);
    }
}
