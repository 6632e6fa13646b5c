//! HTTP API application wiring (Axum router + service wiring).
//!
//! - `services.rs`: storage, account bridge and enforcement wiring
//! - `routes/`: HTTP routes + handlers (one file per resource)
//! - `dto.rs`: request DTOs
//! - `errors.rs`: consistent error responses

use std::sync::Arc;

use axum::{Extension, Router, routing::get};
use tower::ServiceBuilder;

use crate::config::AppConfig;
use crate::middleware;

pub mod dto;
pub mod errors;
pub mod routes;
pub mod services;

pub use services::{AppServices, Backend};

/// Build the full HTTP router (public entrypoint used by `main.rs`).
pub async fn build_app(config: &AppConfig) -> anyhow::Result<Router> {
    let services = AppServices::from_config(config).await?;
    Ok(router(Arc::new(services)))
}

/// Router over already wired services.
pub fn router(services: Arc<AppServices>) -> Router {
    let auth_state = middleware::AuthState {
        authenticator: services.authenticator.clone(),
    };

    // Protected routes: require an authenticated subject.
    let protected = routes::router()
        .layer(Extension(services))
        .layer(axum::middleware::from_fn_with_state(
            auth_state,
            middleware::auth_middleware,
        ));

    Router::new()
        .route("/health", get(routes::system::health))
        .merge(protected)
        .layer(ServiceBuilder::new())
}
