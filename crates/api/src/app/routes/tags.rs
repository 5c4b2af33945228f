use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};

use larder_auth::require_admin;
use larder_core::TagId;
use larder_recipes::{Tag, TagDraft};

use crate::app::errors::ApiError;
use crate::app::services::AppServices;
use crate::context::Viewer;

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_tags).post(create_tag))
        .route("/:id", get(get_tag))
}

pub async fn list_tags(
    Extension(services): Extension<Arc<AppServices>>,
) -> Result<Json<Vec<Tag>>, ApiError> {
    Ok(Json(services.store.list_tags().await?))
}

pub async fn get_tag(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> Result<Json<Tag>, ApiError> {
    let id: TagId = id.parse()?;
    Ok(Json(services.store.get_tag(id).await?))
}

pub async fn create_tag(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(viewer): Extension<Viewer>,
    payload: Result<Json<TagDraft>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    require_admin(viewer.require()?)?;
    let Json(draft) = payload?;
    let tag = services.store.create_tag(draft.validate()?).await?;
    tracing::info!(tag_id = %tag.id, slug = %tag.slug, "tag created");
    Ok((StatusCode::CREATED, Json(tag)))
}
