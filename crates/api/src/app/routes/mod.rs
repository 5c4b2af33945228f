use axum::{routing::get, Router};

pub mod ingredients;
pub mod recipes;
pub mod system;
pub mod tags;
pub mod users;

/// Router for every endpoint behind the auth middleware. Each handler decides
/// whether an anonymous viewer is acceptable.
pub fn router() -> Router {
    Router::new()
        .route("/whoami", get(system::whoami))
        .nest("/users", users::router())
        .nest("/tags", tags::router())
        .nest("/ingredients", ingredients::router())
        .nest("/recipes", recipes::router())
}
