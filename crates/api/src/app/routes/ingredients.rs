use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Extension, Path, Query},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use serde::Deserialize;

use larder_auth::require_admin;
use larder_core::IngredientId;
use larder_recipes::{Ingredient, NewIngredient};

use crate::app::errors::ApiError;
use crate::app::services::AppServices;
use crate::context::Viewer;

pub fn router() -> Router {
    Router::new()
        .route("/", get(search_ingredients).post(create_ingredient))
        .route("/:id", get(get_ingredient))
}

#[derive(Debug, Default, Deserialize)]
pub struct SearchParams {
    pub name: Option<String>,
}

/// `?name=` is a case-insensitive prefix match.
pub async fn search_ingredients(
    Extension(services): Extension<Arc<AppServices>>,
    Query(params): Query<SearchParams>,
) -> Result<Json<Vec<Ingredient>>, ApiError> {
    let prefix = params.name.as_deref().map(str::trim).filter(|p| !p.is_empty());
    Ok(Json(services.store.search_ingredients(prefix).await?))
}

pub async fn get_ingredient(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> Result<Json<Ingredient>, ApiError> {
    let id: IngredientId = id.parse()?;
    Ok(Json(services.store.get_ingredient(id).await?))
}

pub async fn create_ingredient(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(viewer): Extension<Viewer>,
    payload: Result<Json<NewIngredient>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    require_admin(viewer.require()?)?;
    let Json(raw) = payload?;
    let ingredient = services.store.create_ingredient(raw.validated()?).await?;
    tracing::info!(ingredient_id = %ingredient.id, "ingredient created");
    Ok((StatusCode::CREATED, Json(ingredient)))
}
