use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use thiserror::Error;

use larder_auth::AuthzError;
use larder_core::DomainError;
use larder_infra::StoreError;
use larder_shopping::LayoutError;

/// Every way a handler can fail, rendered as `{"error", "message"}` JSON.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error(transparent)]
    Forbidden(#[from] AuthzError),

    #[error("authentication credentials were not provided")]
    Unauthenticated,

    #[error("invalid token: {0}")]
    InvalidToken(String),

    #[error("{0}")]
    MalformedPayload(String),

    #[error(transparent)]
    Render(#[from] LayoutError),
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::MalformedPayload(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            Self::Store(err) => store_error_to_response(err),
            Self::Domain(err) => domain_error_to_response(err),
            Self::Forbidden(err) => json_error(StatusCode::FORBIDDEN, "forbidden", err.to_string()),
            Self::Unauthenticated => json_error(
                StatusCode::UNAUTHORIZED,
                "unauthenticated",
                "authentication credentials were not provided",
            ),
            Self::InvalidToken(reason) => json_error(
                StatusCode::UNAUTHORIZED,
                "invalid_token",
                format!("invalid token: {reason}"),
            ),
            Self::MalformedPayload(msg) => json_error(StatusCode::BAD_REQUEST, "malformed_payload", msg),
            Self::Render(err) => {
                tracing::error!(error = %err, "shopping list rendering failed");
                json_error(StatusCode::INTERNAL_SERVER_ERROR, "render_error", err.to_string())
            }
        }
    }
}

fn store_error_to_response(err: StoreError) -> Response {
    match err {
        StoreError::NotFound(what) => json_error(StatusCode::NOT_FOUND, "not_found", format!("{what} not found")),
        StoreError::Conflict(msg) => json_error(StatusCode::BAD_REQUEST, "conflict", msg),
        StoreError::Domain(err) => domain_error_to_response(err),
        StoreError::Backend(msg) => {
            tracing::error!(error = %msg, "storage backend failure");
            json_error(StatusCode::INTERNAL_SERVER_ERROR, "store_error", "internal storage error")
        }
    }
}

fn domain_error_to_response(err: DomainError) -> Response {
    let message = err.to_string();
    match err {
        DomainError::InvalidField { field, message } => field_error(&field, message),
        DomainError::Validation(_) => json_error(StatusCode::BAD_REQUEST, "validation_error", message),
        DomainError::InvalidId(_) => json_error(StatusCode::BAD_REQUEST, "invalid_id", message),
        DomainError::InvariantViolation(_) => {
            json_error(StatusCode::UNPROCESSABLE_ENTITY, "invariant_violation", message)
        }
        DomainError::NotFound(_) => json_error(StatusCode::NOT_FOUND, "not_found", message),
        DomainError::Conflict(msg) => json_error(StatusCode::BAD_REQUEST, "conflict", msg),
    }
}

pub fn json_error(status: StatusCode, code: &'static str, message: impl Into<String>) -> Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}

fn field_error(field: &str, message: String) -> Response {
    (
        StatusCode::BAD_REQUEST,
        axum::Json(json!({
            "error": "validation_error",
            "field": field,
            "message": message,
        })),
    )
        .into_response()
}
