use std::sync::Arc;
use std::time::Instant;

use axum::{
    extract::{Request, State},
    http::HeaderMap,
    middleware::Next,
    response::Response,
};
use chrono::Utc;

use larder_auth::{JwtValidator, Principal};

use crate::app::errors::ApiError;
use crate::context::Viewer;

#[derive(Clone)]
pub struct AuthState {
    pub jwt: Arc<dyn JwtValidator>,
}

/// Resolve the bearer token (if any) into a [`Viewer`].
///
/// No `Authorization` header means an anonymous viewer; handlers that need an
/// identity reject those themselves. A header that is present but malformed,
/// forged or expired is rejected here with a JSON 401.
pub async fn auth_middleware(
    State(state): State<AuthState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let viewer = match extract_bearer(req.headers()).map_err(ApiError::InvalidToken)? {
        None => Viewer::anonymous(),
        Some(token) => {
            let claims = state
                .jwt
                .validate(token, Utc::now())
                .map_err(|e| ApiError::InvalidToken(e.to_string()))?;
            Viewer::authenticated(Principal::from(claims))
        }
    };

    req.extensions_mut().insert(viewer);
    Ok(next.run(req).await)
}

fn extract_bearer(headers: &HeaderMap) -> Result<Option<&str>, String> {
    let Some(header) = headers.get(axum::http::header::AUTHORIZATION) else {
        return Ok(None);
    };

    let header = header
        .to_str()
        .map_err(|_| "authorization header is not valid text".to_string())?;

    let header = header
        .strip_prefix("Bearer ")
        .ok_or_else(|| "expected a `Bearer` authorization header".to_string())?;

    let token = header.trim();
    if token.is_empty() {
        return Err("bearer token is empty".to_string());
    }

    Ok(Some(token))
}

/// One log event per request: method, path, status, latency.
pub async fn trace_requests(req: Request, next: Next) -> Response {
    let method = req.method().clone();
    let path = req.uri().path().to_string();
    let started = Instant::now();

    let response = next.run(req).await;

    tracing::info!(
        method = %method,
        path = %path,
        status = response.status().as_u16(),
        latency_ms = started.elapsed().as_millis() as u64,
        "request"
    );
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(value: &str) -> HeaderMap {
        let mut h = HeaderMap::new();
        h.insert(
            axum::http::header::AUTHORIZATION,
            HeaderValue::from_str(value).unwrap(),
        );
        h
    }

    #[test]
    fn missing_header_is_anonymous() {
        assert_eq!(extract_bearer(&HeaderMap::new()), Ok(None));
    }

    #[test]
    fn bearer_token_is_extracted() {
        assert_eq!(extract_bearer(&headers("Bearer abc.def")), Ok(Some("abc.def")));
    }

    #[test]
    fn other_schemes_are_rejected() {
        assert!(extract_bearer(&headers("Token abc")).is_err());
        assert!(extract_bearer(&headers("Bearer   ")).is_err());
    }
}
