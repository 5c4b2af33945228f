//! In-memory store for tests and development.
//!
//! All state sits behind one `RwLock`, so every write (including the
//! uniqueness checks that precede it) is serialized exactly like a unique
//! constraint would serialize it in the database.

use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::{DateTime, Utc};

use larder_core::{DomainError, IngredientId, RecipeId, TagId, UserId};
use larder_recipes::{
    Ingredient, IngredientAmount, MembershipKind, NewIngredient, NewRecipe, NewTag, NewUser,
    PageRequest, Paged, ProfileChanges, Recipe, RecipeChanges, RecipeContent, RecipeIngredient,
    RecipeQuery, Subscription, Tag, User,
};
use larder_shopping::IngredientRow;

use crate::store::{
    CatalogStore, ImportSummary, MembershipStore, RecipeStore, StoreError, StoreResult, UserStore,
};

#[derive(Debug, Clone)]
struct StoredRecipe {
    author: UserId,
    content: RecipeContent,
    pub_date: DateTime<Utc>,
    tags: Vec<TagId>,
    ingredients: Vec<IngredientAmount>,
}

#[derive(Debug, Default)]
struct State {
    next_id: i64,
    users: BTreeMap<UserId, User>,
    tags: BTreeMap<TagId, Tag>,
    ingredients: BTreeMap<IngredientId, Ingredient>,
    recipes: BTreeMap<RecipeId, StoredRecipe>,
    favorites: HashSet<(UserId, RecipeId)>,
    cart: HashSet<(UserId, RecipeId)>,
    /// `(subscriber, author)`; ordered so listings come out by author id.
    subscriptions: BTreeSet<(UserId, UserId)>,
}

impl State {
    fn allocate(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    fn memberships(&self, kind: MembershipKind) -> &HashSet<(UserId, RecipeId)> {
        match kind {
            MembershipKind::Favorite => &self.favorites,
            MembershipKind::ShoppingCart => &self.cart,
        }
    }

    fn memberships_mut(&mut self, kind: MembershipKind) -> &mut HashSet<(UserId, RecipeId)> {
        match kind {
            MembershipKind::Favorite => &mut self.favorites,
            MembershipKind::ShoppingCart => &mut self.cart,
        }
    }

    fn check_references(&self, tags: &[TagId], ingredients: &[IngredientAmount]) -> StoreResult<()> {
        if let Some(missing) = tags.iter().find(|id| !self.tags.contains_key(*id)) {
            return Err(DomainError::invalid_field("tags", format!("unknown tag id {missing}")).into());
        }
        if let Some(missing) = ingredients
            .iter()
            .find(|line| !self.ingredients.contains_key(&line.ingredient_id))
        {
            return Err(DomainError::invalid_field(
                "ingredients",
                format!("unknown ingredient id {}", missing.ingredient_id),
            )
            .into());
        }
        Ok(())
    }

    /// Unknown acting user, reported the way the Postgres foreign key is.
    fn check_user(&self, user: UserId) -> StoreResult<()> {
        if self.users.contains_key(&user) {
            Ok(())
        } else {
            Err(DomainError::invalid_field("reference", "references a record that does not exist").into())
        }
    }

    fn hydrate(&self, id: RecipeId, stored: &StoredRecipe) -> Recipe {
        let mut tags: Vec<Tag> = stored
            .tags
            .iter()
            .filter_map(|tag_id| self.tags.get(tag_id).cloned())
            .collect();
        tags.sort_by(|a, b| a.name.cmp(&b.name));
        let ingredients = stored
            .ingredients
            .iter()
            .filter_map(|line| {
                self.ingredients
                    .get(&line.ingredient_id)
                    .map(|ingredient| RecipeIngredient {
                        ingredient: ingredient.clone(),
                        amount: line.amount,
                    })
            })
            .collect();
        Recipe {
            id,
            author: stored.author,
            name: stored.content.name.clone(),
            text: stored.content.text.clone(),
            cooking_time: stored.content.cooking_time,
            image: stored.content.image.clone(),
            pub_date: stored.pub_date,
            tags,
            ingredients,
        }
    }

    fn recipe(&self, id: RecipeId) -> StoreResult<Recipe> {
        self.recipes
            .get(&id)
            .map(|stored| self.hydrate(id, stored))
            .ok_or_else(|| StoreError::not_found("recipe"))
    }

    fn unique_user_fields(&self, except: Option<UserId>, email: &str, username: &str) -> StoreResult<()> {
        for user in self.users.values().filter(|u| Some(u.id) != except) {
            if user.email == email {
                return Err(StoreError::conflict("a user with this email already exists"));
            }
            if user.username == username {
                return Err(StoreError::conflict("a user with this username already exists"));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct InMemoryStore {
    state: RwLock<State>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> StoreResult<RwLockReadGuard<'_, State>> {
        self.state
            .read()
            .map_err(|_| StoreError::backend("in-memory store lock poisoned"))
    }

    fn write(&self) -> StoreResult<RwLockWriteGuard<'_, State>> {
        self.state
            .write()
            .map_err(|_| StoreError::backend("in-memory store lock poisoned"))
    }
}

#[async_trait::async_trait]
impl CatalogStore for InMemoryStore {
    async fn list_tags(&self) -> StoreResult<Vec<Tag>> {
        let state = self.read()?;
        let mut tags: Vec<Tag> = state.tags.values().cloned().collect();
        tags.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(tags)
    }

    async fn get_tag(&self, id: TagId) -> StoreResult<Tag> {
        self.read()?
            .tags
            .get(&id)
            .cloned()
            .ok_or_else(|| StoreError::not_found("tag"))
    }

    async fn create_tag(&self, tag: NewTag) -> StoreResult<Tag> {
        let mut state = self.write()?;
        if state.tags.values().any(|t| t.name == tag.name) {
            return Err(StoreError::conflict("a tag with this name already exists"));
        }
        if state.tags.values().any(|t| t.slug == tag.slug) {
            return Err(StoreError::conflict("a tag with this slug already exists"));
        }
        let id = TagId::new(state.allocate());
        let tag = Tag {
            id,
            name: tag.name,
            color: tag.color,
            slug: tag.slug,
        };
        state.tags.insert(id, tag.clone());
        Ok(tag)
    }

    async fn search_ingredients(&self, prefix: Option<&str>) -> StoreResult<Vec<Ingredient>> {
        let prefix = prefix.map(str::to_lowercase);
        let state = self.read()?;
        let mut found: Vec<Ingredient> = state
            .ingredients
            .values()
            .filter(|i| match &prefix {
                Some(p) => i.name.to_lowercase().starts_with(p.as_str()),
                None => true,
            })
            .cloned()
            .collect();
        found.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
        Ok(found)
    }

    async fn get_ingredient(&self, id: IngredientId) -> StoreResult<Ingredient> {
        self.read()?
            .ingredients
            .get(&id)
            .cloned()
            .ok_or_else(|| StoreError::not_found("ingredient"))
    }

    async fn create_ingredient(&self, ingredient: NewIngredient) -> StoreResult<Ingredient> {
        let mut state = self.write()?;
        let id = IngredientId::new(state.allocate());
        let ingredient = Ingredient {
            id,
            name: ingredient.name,
            measurement_unit: ingredient.measurement_unit,
        };
        state.ingredients.insert(id, ingredient.clone());
        Ok(ingredient)
    }

    async fn import_ingredients(&self, rows: Vec<NewIngredient>) -> StoreResult<ImportSummary> {
        let mut state = self.write()?;
        let mut summary = ImportSummary::default();
        for row in rows {
            let exists = state
                .ingredients
                .values()
                .any(|i| i.name == row.name && i.measurement_unit == row.measurement_unit);
            if exists {
                summary.existing += 1;
                continue;
            }
            let id = IngredientId::new(state.allocate());
            state.ingredients.insert(
                id,
                Ingredient {
                    id,
                    name: row.name,
                    measurement_unit: row.measurement_unit,
                },
            );
            summary.created += 1;
        }
        Ok(summary)
    }
}

#[async_trait::async_trait]
impl UserStore for InMemoryStore {
    async fn create_user(&self, user: NewUser) -> StoreResult<User> {
        let mut state = self.write()?;
        state.unique_user_fields(None, &user.email, &user.username)?;
        let id = UserId::new(state.allocate());
        let user = User {
            id,
            email: user.email,
            username: user.username,
            first_name: user.first_name,
            last_name: user.last_name,
        };
        state.users.insert(id, user.clone());
        Ok(user)
    }

    async fn get_user(&self, id: UserId) -> StoreResult<User> {
        self.read()?
            .users
            .get(&id)
            .cloned()
            .ok_or_else(|| StoreError::not_found("user"))
    }

    async fn update_user(&self, id: UserId, changes: ProfileChanges) -> StoreResult<User> {
        let mut state = self.write()?;
        let current = state
            .users
            .get(&id)
            .ok_or_else(|| StoreError::not_found("user"))?;
        let updated = changes.apply(current);
        state.unique_user_fields(Some(id), &updated.email, &updated.username)?;
        state.users.insert(id, updated.clone());
        Ok(updated)
    }

    async fn list_users(&self, page: PageRequest) -> StoreResult<Paged<User>> {
        let state = self.read()?;
        let all: Vec<User> = state.users.values().cloned().collect();
        Ok(Paged::new(page, all.len() as u64, page.slice(&all)))
    }

    async fn subscribe(&self, subscription: Subscription) -> StoreResult<()> {
        let mut state = self.write()?;
        if !state.users.contains_key(&subscription.author()) {
            return Err(StoreError::not_found("user"));
        }
        state.check_user(subscription.subscriber())?;
        if !state
            .subscriptions
            .insert((subscription.subscriber(), subscription.author()))
        {
            return Err(StoreError::conflict("already subscribed to this author"));
        }
        Ok(())
    }

    async fn unsubscribe(&self, subscription: Subscription) -> StoreResult<()> {
        let mut state = self.write()?;
        if state
            .subscriptions
            .remove(&(subscription.subscriber(), subscription.author()))
        {
            Ok(())
        } else {
            Err(StoreError::not_found("subscription"))
        }
    }

    async fn is_subscribed(&self, subscriber: UserId, author: UserId) -> StoreResult<bool> {
        Ok(self.read()?.subscriptions.contains(&(subscriber, author)))
    }

    async fn list_subscriptions(
        &self,
        subscriber: UserId,
        page: PageRequest,
    ) -> StoreResult<Paged<User>> {
        let state = self.read()?;
        let authors: Vec<User> = state
            .subscriptions
            .iter()
            .filter(|(s, _)| *s == subscriber)
            .filter_map(|(_, author)| state.users.get(author).cloned())
            .collect();
        Ok(Paged::new(page, authors.len() as u64, page.slice(&authors)))
    }
}

#[async_trait::async_trait]
impl RecipeStore for InMemoryStore {
    async fn create_recipe(&self, author: UserId, recipe: NewRecipe) -> StoreResult<Recipe> {
        let mut state = self.write()?;
        if !state.users.contains_key(&author) {
            return Err(StoreError::not_found("user"));
        }
        state.check_references(&recipe.tags, &recipe.ingredients)?;
        let id = RecipeId::new(state.allocate());
        state.recipes.insert(
            id,
            StoredRecipe {
                author,
                content: recipe.content,
                pub_date: Utc::now(),
                tags: recipe.tags,
                ingredients: recipe.ingredients,
            },
        );
        state.recipe(id)
    }

    async fn update_recipe(&self, id: RecipeId, changes: RecipeChanges) -> StoreResult<Recipe> {
        let mut state = self.write()?;
        if !state.recipes.contains_key(&id) {
            return Err(StoreError::not_found("recipe"));
        }
        state.check_references(&changes.tags, &changes.ingredients)?;
        let stored = state
            .recipes
            .get_mut(&id)
            .ok_or_else(|| StoreError::not_found("recipe"))?;
        stored.content = changes.apply(&stored.content);
        stored.tags = changes.tags;
        stored.ingredients = changes.ingredients;
        state.recipe(id)
    }

    async fn delete_recipe(&self, id: RecipeId) -> StoreResult<()> {
        let mut state = self.write()?;
        if state.recipes.remove(&id).is_none() {
            return Err(StoreError::not_found("recipe"));
        }
        state.favorites.retain(|(_, r)| *r != id);
        state.cart.retain(|(_, r)| *r != id);
        Ok(())
    }

    async fn get_recipe(&self, id: RecipeId) -> StoreResult<Recipe> {
        self.read()?.recipe(id)
    }

    async fn list_recipes(&self, query: &RecipeQuery, page: PageRequest) -> StoreResult<Paged<Recipe>> {
        let state = self.read()?;
        let mut matching: Vec<Recipe> = state
            .recipes
            .iter()
            .filter(|(id, _)| match query.favorited_by {
                Some(user) => state.favorites.contains(&(user, **id)),
                None => true,
            })
            .filter(|(id, _)| match query.in_cart_of {
                Some(user) => state.cart.contains(&(user, **id)),
                None => true,
            })
            .map(|(id, stored)| state.hydrate(*id, stored))
            .filter(|recipe| query.matches(recipe))
            .collect();
        matching.sort_by(|a, b| b.pub_date.cmp(&a.pub_date).then(b.id.cmp(&a.id)));
        Ok(Paged::new(page, matching.len() as u64, page.slice(&matching)))
    }

    async fn count_recipes_by(&self, author: UserId) -> StoreResult<u64> {
        let state = self.read()?;
        Ok(state.recipes.values().filter(|r| r.author == author).count() as u64)
    }
}

#[async_trait::async_trait]
impl MembershipStore for InMemoryStore {
    async fn add_membership(
        &self,
        kind: MembershipKind,
        user: UserId,
        recipe: RecipeId,
    ) -> StoreResult<()> {
        let mut state = self.write()?;
        if !state.recipes.contains_key(&recipe) {
            return Err(StoreError::not_found("recipe"));
        }
        state.check_user(user)?;
        if !state.memberships_mut(kind).insert((user, recipe)) {
            return Err(kind.already_present().into());
        }
        Ok(())
    }

    async fn remove_membership(
        &self,
        kind: MembershipKind,
        user: UserId,
        recipe: RecipeId,
    ) -> StoreResult<()> {
        let mut state = self.write()?;
        if state.memberships_mut(kind).remove(&(user, recipe)) {
            Ok(())
        } else {
            Err(kind.absent().into())
        }
    }

    async fn has_membership(
        &self,
        kind: MembershipKind,
        user: UserId,
        recipe: RecipeId,
    ) -> StoreResult<bool> {
        Ok(self.read()?.memberships(kind).contains(&(user, recipe)))
    }

    async fn cart_ingredient_rows(&self, user: UserId) -> StoreResult<Vec<IngredientRow>> {
        let state = self.read()?;
        let rows = state
            .cart
            .iter()
            .filter(|(u, _)| *u == user)
            .filter_map(|(_, recipe)| state.recipes.get(recipe))
            .flat_map(|stored| stored.ingredients.iter())
            .filter_map(|line| {
                state.ingredients.get(&line.ingredient_id).map(|ingredient| {
                    IngredientRow::new(
                        ingredient.name.clone(),
                        ingredient.measurement_unit.clone(),
                        line.amount,
                    )
                })
            })
            .collect();
        Ok(rows)
    }
}
