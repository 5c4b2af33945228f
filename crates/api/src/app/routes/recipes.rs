use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Extension, Path, Query},
    http::{header, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};

use larder_auth::authorize_author_or_admin;
use larder_core::RecipeId;
use larder_recipes::{MembershipKind, Paged, RecipeDraft, RecipeUpdate};

use crate::app::dto::{QueryParams, RecipeShortView, RecipeView};
use crate::app::errors::ApiError;
use crate::app::services::AppServices;
use crate::context::Viewer;

const SHOPPING_LIST_DISPOSITION: &str = "attachment; filename=\"shopping_cart.pdf\"";

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_recipes).post(create_recipe))
        .route("/download_shopping_cart", get(download_shopping_cart))
        .route("/:id", get(get_recipe).patch(update_recipe).delete(delete_recipe))
        .route("/:id/favorite", post(add_favorite).delete(remove_favorite))
        .route("/:id/shopping_cart", post(add_to_cart).delete(remove_from_cart))
}

pub async fn list_recipes(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(viewer): Extension<Viewer>,
    Query(params): Query<Vec<(String, String)>>,
) -> Result<Json<Paged<RecipeView>>, ApiError> {
    let params = QueryParams::new(params);
    let page = params.page_request(services.settings.page_size)?;
    let query = params.recipe_query(viewer.user_id())?;

    let listed = services.store.list_recipes(&query, page).await?;
    let mut results = Vec::with_capacity(listed.results.len());
    for recipe in listed.results {
        results.push(services.recipe_view(&viewer, recipe).await?);
    }
    Ok(Json(Paged::new(page, listed.count, results)))
}

pub async fn get_recipe(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(viewer): Extension<Viewer>,
    Path(id): Path<String>,
) -> Result<Json<RecipeView>, ApiError> {
    let id: RecipeId = id.parse()?;
    let recipe = services.store.get_recipe(id).await?;
    Ok(Json(services.recipe_view(&viewer, recipe).await?))
}

pub async fn create_recipe(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(viewer): Extension<Viewer>,
    payload: Result<Json<RecipeDraft>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let author = services.current_user(viewer.require()?).await?;
    let Json(draft) = payload?;
    let recipe = services.store.create_recipe(author.id, draft.validate()?).await?;
    tracing::info!(recipe_id = %recipe.id, author_id = %author.id, "recipe created");
    let view = services.recipe_view(&viewer, recipe).await?;
    Ok((StatusCode::CREATED, Json(view)))
}

/// Scalars are optional; `tags` and `ingredients` replace the stored lists.
pub async fn update_recipe(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(viewer): Extension<Viewer>,
    Path(id): Path<String>,
    payload: Result<Json<RecipeUpdate>, JsonRejection>,
) -> Result<Json<RecipeView>, ApiError> {
    let principal = viewer.require()?;
    let id: RecipeId = id.parse()?;
    let existing = services.store.get_recipe(id).await?;
    authorize_author_or_admin(principal, existing.author, "update this recipe")?;

    let Json(update) = payload?;
    let recipe = services.store.update_recipe(id, update.validate()?).await?;
    tracing::info!(recipe_id = %recipe.id, "recipe updated");
    Ok(Json(services.recipe_view(&viewer, recipe).await?))
}

pub async fn delete_recipe(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(viewer): Extension<Viewer>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let principal = viewer.require()?;
    let id: RecipeId = id.parse()?;
    let existing = services.store.get_recipe(id).await?;
    authorize_author_or_admin(principal, existing.author, "delete this recipe")?;

    services.store.delete_recipe(id).await?;
    tracing::info!(recipe_id = %id, "recipe deleted");
    Ok(StatusCode::NO_CONTENT)
}

async fn add_membership(
    services: &AppServices,
    viewer: &Viewer,
    kind: MembershipKind,
    id: &str,
) -> Result<(StatusCode, Json<RecipeShortView>), ApiError> {
    let user = services.current_user(viewer.require()?).await?;
    let id: RecipeId = id.parse()?;
    let view = services.add_membership(kind, user.id, id).await?;
    Ok((StatusCode::CREATED, Json(view)))
}

async fn remove_membership(
    services: &AppServices,
    viewer: &Viewer,
    kind: MembershipKind,
    id: &str,
) -> Result<StatusCode, ApiError> {
    let user = services.current_user(viewer.require()?).await?;
    let id: RecipeId = id.parse()?;
    services.remove_membership(kind, user.id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn add_favorite(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(viewer): Extension<Viewer>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    add_membership(&services, &viewer, MembershipKind::Favorite, &id).await
}

pub async fn remove_favorite(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(viewer): Extension<Viewer>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    remove_membership(&services, &viewer, MembershipKind::Favorite, &id).await
}

pub async fn add_to_cart(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(viewer): Extension<Viewer>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    add_membership(&services, &viewer, MembershipKind::ShoppingCart, &id).await
}

pub async fn remove_from_cart(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(viewer): Extension<Viewer>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    remove_membership(&services, &viewer, MembershipKind::ShoppingCart, &id).await
}

pub async fn download_shopping_cart(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(viewer): Extension<Viewer>,
) -> Result<impl IntoResponse, ApiError> {
    let user = services.current_user(viewer.require()?).await?;
    let bytes = services.shopping_list_pdf(user.id).await?;
    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "application/pdf"),
            (header::CONTENT_DISPOSITION, SHOPPING_LIST_DISPOSITION),
        ],
        bytes,
    ))
}
