use axum::{extract::Extension, http::StatusCode, response::IntoResponse, Json};

use crate::app::errors::ApiError;
use crate::context::Viewer;

pub async fn health() -> StatusCode {
    StatusCode::OK
}

pub async fn whoami(Extension(viewer): Extension<Viewer>) -> Result<impl IntoResponse, ApiError> {
    let principal = viewer.require()?;
    Ok(Json(serde_json::json!({
        "user_id": principal.user_id,
        "roles": principal.roles.iter().map(|r| r.as_str()).collect::<Vec<_>>(),
    })))
}
