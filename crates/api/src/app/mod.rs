//! HTTP application wiring (Axum router + store selection).
//!
//! - `services.rs`: handler-facing operations over the shared store
//! - `routes/`: HTTP routes + handlers (one file per resource)
//! - `dto.rs`: response representations and query-string parsing
//! - `errors.rs`: consistent error responses

use std::sync::Arc;

use axum::{routing::get, Extension, Router};
use tower::ServiceBuilder;

use larder_auth::Hs256JwtValidator;
use larder_infra::{InMemoryStore, PostgresStore, SharedStore};

use crate::config::{ApiConfig, ApiSettings};
use crate::middleware;

pub mod dto;
pub mod errors;
pub mod routes;
pub mod services;

/// Select the store from configuration and build the full router.
pub async fn build_app(config: &ApiConfig) -> anyhow::Result<Router> {
    let store: SharedStore = match config.database_url.as_deref() {
        Some(url) => {
            let store = PostgresStore::connect(url).await?;
            store.migrate().await?;
            tracing::info!("using postgres store");
            Arc::new(store)
        }
        None => {
            tracing::warn!("DATABASE_URL not set; using in-memory store");
            Arc::new(InMemoryStore::new())
        }
    };
    Ok(build_router(config.jwt_secret.clone(), store, config.settings))
}

/// Router over an already constructed store (used directly by tests).
pub fn build_router(jwt_secret: String, store: SharedStore, settings: ApiSettings) -> Router {
    let jwt = Arc::new(Hs256JwtValidator::new(jwt_secret.into_bytes()));
    let auth_state = middleware::AuthState { jwt };

    let services = Arc::new(services::AppServices::new(store, settings));

    let resolved = routes::router()
        .layer(Extension(services))
        .layer(axum::middleware::from_fn_with_state(
            auth_state,
            middleware::auth_middleware,
        ));

    Router::new()
        .route("/health", get(routes::system::health))
        .merge(resolved)
        .layer(ServiceBuilder::new().layer(axum::middleware::from_fn(middleware::trace_requests)))
}
