//! Handler-facing services over the shared store.

use tracing::instrument;

use larder_auth::Principal;
use larder_core::{RecipeId, UserId};
use larder_infra::{SharedStore, StoreError};
use larder_recipes::query::MAX_PAGE_SIZE;
use larder_recipes::{MembershipKind, PageRequest, Recipe, RecipeQuery, User};

use crate::app::dto::{RecipeFlags, RecipeShortView, RecipeView, SubscriptionView, UserView};
use crate::app::errors::ApiError;
use crate::config::ApiSettings;
use crate::context::Viewer;

pub struct AppServices {
    pub store: SharedStore,
    pub settings: ApiSettings,
}

impl AppServices {
    pub fn new(store: SharedStore, settings: ApiSettings) -> Self {
        Self { store, settings }
    }

    /// The registered user behind a token. A token for a deleted or never
    /// registered user is treated as missing credentials.
    pub async fn current_user(&self, principal: &Principal) -> Result<User, ApiError> {
        match self.store.get_user(principal.user_id).await {
            Ok(user) => Ok(user),
            Err(StoreError::NotFound(_)) => Err(ApiError::Unauthenticated),
            Err(e) => Err(e.into()),
        }
    }

    pub async fn user_view(&self, viewer: &Viewer, user: User) -> Result<UserView, ApiError> {
        let is_subscribed = match viewer.user_id() {
            Some(me) if me != user.id => self.store.is_subscribed(me, user.id).await?,
            _ => false,
        };
        Ok(UserView::new(user, is_subscribed))
    }

    pub async fn recipe_view(&self, viewer: &Viewer, recipe: Recipe) -> Result<RecipeView, ApiError> {
        let author = self.store.get_user(recipe.author).await?;
        let author = self.user_view(viewer, author).await?;
        let flags = match viewer.user_id() {
            Some(me) => RecipeFlags {
                is_favorited: self
                    .store
                    .has_membership(MembershipKind::Favorite, me, recipe.id)
                    .await?,
                is_in_shopping_cart: self
                    .store
                    .has_membership(MembershipKind::ShoppingCart, me, recipe.id)
                    .await?,
            },
            None => RecipeFlags::default(),
        };
        Ok(RecipeView::new(recipe, author, flags))
    }

    /// An author with their newest `recipes_limit` recipes (at most
    /// `MAX_PAGE_SIZE`) and total count.
    #[instrument(skip(self, viewer, author), fields(author_id = %author.id), err)]
    pub async fn subscription_view(
        &self,
        viewer: &Viewer,
        author: User,
        recipes_limit: u32,
    ) -> Result<SubscriptionView, ApiError> {
        let author_id = author.id;
        let (recipes, recipes_count) = if recipes_limit == 0 {
            (Vec::new(), self.store.count_recipes_by(author_id).await?)
        } else {
            let query = RecipeQuery {
                authors: vec![author_id],
                ..RecipeQuery::default()
            };
            let page = PageRequest::new(1, recipes_limit.min(MAX_PAGE_SIZE))?;
            let listed = self.store.list_recipes(&query, page).await?;
            let short = listed.results.iter().map(RecipeShortView::from).collect();
            (short, listed.count)
        };
        Ok(SubscriptionView {
            user: self.user_view(viewer, author).await?,
            recipes,
            recipes_count,
        })
    }

    /// Add a recipe to favorites or the cart and return its short form.
    #[instrument(skip(self), err)]
    pub async fn add_membership(
        &self,
        kind: MembershipKind,
        user: UserId,
        recipe: RecipeId,
    ) -> Result<RecipeShortView, ApiError> {
        let found = self.store.get_recipe(recipe).await?;
        self.store.add_membership(kind, user, recipe).await?;
        tracing::info!(%kind, user_id = %user, recipe_id = %recipe, "membership added");
        Ok(RecipeShortView::from(&found))
    }

    #[instrument(skip(self), err)]
    pub async fn remove_membership(
        &self,
        kind: MembershipKind,
        user: UserId,
        recipe: RecipeId,
    ) -> Result<(), ApiError> {
        self.store.get_recipe(recipe).await?;
        self.store.remove_membership(kind, user, recipe).await?;
        tracing::info!(%kind, user_id = %user, recipe_id = %recipe, "membership removed");
        Ok(())
    }

    /// Aggregate the user's cart and render it to PDF bytes.
    #[instrument(skip(self), err)]
    pub async fn shopping_list_pdf(&self, user: UserId) -> Result<Vec<u8>, ApiError> {
        let rows = self.store.cart_ingredient_rows(user).await?;
        let row_count = rows.len();
        let bytes = larder_shopping::render_shopping_list(rows)?;
        tracing::info!(user_id = %user, rows = row_count, bytes = bytes.len(), "shopping list rendered");
        Ok(bytes)
    }
}
