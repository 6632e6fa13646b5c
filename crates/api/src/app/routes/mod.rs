use axum::Router;

pub mod common;
pub mod groups;
pub mod policies;
pub mod system;
pub mod users;

/// Router for all authenticated endpoints.
pub fn router() -> Router {
    Router::new()
        .route("/v1/whoami", axum::routing::get(system::whoami))
        .nest("/v1/users", users::router())
        .nest("/v1/groups", groups::router())
        .nest("/v1/policies", policies::router())
}
