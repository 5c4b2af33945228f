use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Extension, Path, Query},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};

use larder_core::UserId;
use larder_recipes::{Paged, ProfilePatch, Subscription, UserDraft};

use crate::app::dto::{QueryParams, SubscriptionView, UserView};
use crate::app::errors::ApiError;
use crate::app::services::AppServices;
use crate::context::Viewer;

pub fn router() -> Router {
    Router::new()
        .route("/", post(register).get(list_users))
        .route("/me", get(me).patch(update_me))
        .route("/subscriptions", get(subscriptions))
        .route("/:id", get(get_user))
        .route("/:id/subscribe", post(subscribe).delete(unsubscribe))
}

/// Registration is open to anonymous callers.
pub async fn register(
    Extension(services): Extension<Arc<AppServices>>,
    payload: Result<Json<UserDraft>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(draft) = payload?;
    let user = services.store.create_user(draft.validate()?).await?;
    tracing::info!(user_id = %user.id, "user registered");
    Ok((StatusCode::CREATED, Json(UserView::new(user, false))))
}

pub async fn list_users(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(viewer): Extension<Viewer>,
    Query(params): Query<Vec<(String, String)>>,
) -> Result<Json<Paged<UserView>>, ApiError> {
    let page = QueryParams::new(params).page_request(services.settings.page_size)?;
    let listed = services.store.list_users(page).await?;

    let mut results = Vec::with_capacity(listed.results.len());
    for user in listed.results {
        results.push(services.user_view(&viewer, user).await?);
    }
    Ok(Json(Paged::new(page, listed.count, results)))
}

pub async fn get_user(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(viewer): Extension<Viewer>,
    Path(id): Path<String>,
) -> Result<Json<UserView>, ApiError> {
    let id: UserId = id.parse()?;
    let user = services.store.get_user(id).await?;
    Ok(Json(services.user_view(&viewer, user).await?))
}

pub async fn me(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(viewer): Extension<Viewer>,
) -> Result<Json<UserView>, ApiError> {
    let user = services.current_user(viewer.require()?).await?;
    Ok(Json(UserView::new(user, false)))
}

pub async fn update_me(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(viewer): Extension<Viewer>,
    payload: Result<Json<ProfilePatch>, JsonRejection>,
) -> Result<Json<UserView>, ApiError> {
    let user = services.current_user(viewer.require()?).await?;
    let Json(patch) = payload?;
    let updated = services.store.update_user(user.id, patch.validate()?).await?;
    tracing::info!(user_id = %updated.id, "profile updated");
    Ok(Json(UserView::new(updated, false)))
}

/// Followed authors, each with a preview of their newest recipes.
pub async fn subscriptions(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(viewer): Extension<Viewer>,
    Query(params): Query<Vec<(String, String)>>,
) -> Result<Json<Paged<SubscriptionView>>, ApiError> {
    let me = services.current_user(viewer.require()?).await?;
    let params = QueryParams::new(params);
    let page = params.page_request(services.settings.page_size)?;
    let recipes_limit = params.recipes_limit(services.settings.recipes_limit)?;

    let listed = services.store.list_subscriptions(me.id, page).await?;
    let mut results = Vec::with_capacity(listed.results.len());
    for author in listed.results {
        results.push(services.subscription_view(&viewer, author, recipes_limit).await?);
    }
    Ok(Json(Paged::new(page, listed.count, results)))
}

pub async fn subscribe(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(viewer): Extension<Viewer>,
    Path(id): Path<String>,
    Query(params): Query<Vec<(String, String)>>,
) -> Result<impl IntoResponse, ApiError> {
    let me = services.current_user(viewer.require()?).await?;
    let author_id: UserId = id.parse()?;
    let subscription = Subscription::new(me.id, author_id)?;
    let author = services.store.get_user(author_id).await?;
    services.store.subscribe(subscription).await?;
    tracing::info!(subscriber_id = %me.id, author_id = %author_id, "subscribed");

    let recipes_limit = QueryParams::new(params).recipes_limit(services.settings.recipes_limit)?;
    let view = services.subscription_view(&viewer, author, recipes_limit).await?;
    Ok((StatusCode::CREATED, Json(view)))
}

pub async fn unsubscribe(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(viewer): Extension<Viewer>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let me = services.current_user(viewer.require()?).await?;
    let author_id: UserId = id.parse()?;
    let subscription = Subscription::new(me.id, author_id)?;
    services.store.get_user(author_id).await?;
    services.store.unsubscribe(subscription).await?;
    tracing::info!(subscriber_id = %me.id, author_id = %author_id, "unsubscribed");
    Ok(StatusCode::NO_CONTENT)
}
