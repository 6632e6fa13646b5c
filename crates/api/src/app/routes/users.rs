use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path},
    http::{Method, StatusCode},
    response::Response,
    routing::{get, put},
};
use serde_json::Value;

use iam_core::{Attributes, Context, ResourceKind, UserUrn, urn};

use super::common::{accepted, guard, items, respond};
use crate::app::{dto, services::AppServices};
use crate::context::SubjectContext;

pub const ACTION_WRITE: &str = "iam:user:write";
pub const ACTION_LOAD: &str = "iam:user:load";
pub const ACTION_LIST: &str = "iam:user:list";
pub const ACTION_DELETE: &str = "iam:user:delete";
pub const ACTION_LOCK_UNLOCK: &str = "iam:user:lock-unlock";
pub const ACTION_WRITE_ATTR: &str = "iam:user:write-attr";

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_users).post(create_user))
        .route("/:id", get(load_user).delete(delete_user))
        .route("/:id/locked", put(set_locked).delete(set_locked))
        .route("/:id/attrs", put(update_attrs))
        .route("/:id/attrs/:key", put(set_attr).delete(delete_attr))
}

fn collection() -> String {
    urn::build(ResourceKind::User, "")
}

pub async fn list_users(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(subject): Extension<SubjectContext>,
) -> Response {
    let ctx = Context::new();
    guard!(services, &ctx, subject, ACTION_LIST, collection());
    items(services.users.users(&ctx).await)
}

pub async fn create_user(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(subject): Extension<SubjectContext>,
    Json(body): Json<dto::CreateUserRequest>,
) -> Response {
    let ctx = Context::new();
    guard!(services, &ctx, subject, ACTION_WRITE, collection());

    let created = services
        .users
        .create_user(&ctx, &body.username, &body.password, body.attrs)
        .await;
    let result = match created {
        Ok(urn) => services.users.load_user(&ctx, &urn).await,
        Err(e) => Err(e),
    };
    respond(StatusCode::CREATED, result)
}

pub async fn load_user(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(subject): Extension<SubjectContext>,
    Path(id): Path<String>,
) -> Response {
    let ctx = Context::new();
    let urn = UserUrn::from_name(&id);
    guard!(services, &ctx, subject, ACTION_LOAD, urn.as_str());
    respond(StatusCode::OK, services.users.load_user(&ctx, &urn).await)
}

pub async fn delete_user(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(subject): Extension<SubjectContext>,
    Path(id): Path<String>,
) -> Response {
    let ctx = Context::new();
    let urn = UserUrn::from_name(&id);
    guard!(services, &ctx, subject, ACTION_DELETE, urn.as_str());
    accepted(services.users.delete_user(&ctx, &urn).await)
}

/// PUT locks the account, DELETE unlocks it.
pub async fn set_locked(
    method: Method,
    Extension(services): Extension<Arc<AppServices>>,
    Extension(subject): Extension<SubjectContext>,
    Path(id): Path<String>,
) -> Response {
    let ctx = Context::new();
    let urn = UserUrn::from_name(&id);
    guard!(services, &ctx, subject, ACTION_LOCK_UNLOCK, urn.as_str());
    accepted(services.users.lock_user(&ctx, &urn, method == Method::PUT).await)
}

pub async fn update_attrs(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(subject): Extension<SubjectContext>,
    Path(id): Path<String>,
    Json(attrs): Json<Attributes>,
) -> Response {
    let ctx = Context::new();
    let urn = UserUrn::from_name(&id);
    guard!(services, &ctx, subject, ACTION_WRITE_ATTR, urn.as_str());
    accepted(services.users.update_attrs(&ctx, &urn, attrs).await)
}

pub async fn set_attr(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(subject): Extension<SubjectContext>,
    Path((id, key)): Path<(String, String)>,
    Json(value): Json<Value>,
) -> Response {
    let ctx = Context::new();
    let urn = UserUrn::from_name(&id);
    guard!(services, &ctx, subject, ACTION_WRITE_ATTR, urn.as_str());
    accepted(services.users.set_attr(&ctx, &urn, &key, value).await)
}

pub async fn delete_attr(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(subject): Extension<SubjectContext>,
    Path((id, key)): Path<(String, String)>,
) -> Response {
    let ctx = Context::new();
    let urn = UserUrn::from_name(&id);
    guard!(services, &ctx, subject, ACTION_WRITE_ATTR, urn.as_str());
    accepted(services.users.delete_attr(&ctx, &urn, &key).await)
}
