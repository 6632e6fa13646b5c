use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path, Query},
    http::StatusCode,
    response::Response,
    routing::get,
};

use iam_core::{Context, Policy, PolicyUrn, ResourceKind, urn};

use super::common::{accepted, guard, items, respond};
use crate::app::{dto, services::AppServices};
use crate::context::SubjectContext;

pub const ACTION_WRITE: &str = "iam:policy:write";
pub const ACTION_DELETE: &str = "iam:policy:delete";
pub const ACTION_LOAD: &str = "iam:policy:load";
pub const ACTION_LIST: &str = "iam:policy:list";

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_policies).post(create_policy))
        .route("/:id", get(load_policy).put(update_policy).delete(delete_policy))
}

fn collection() -> String {
    urn::build(ResourceKind::Policy, "")
}

pub async fn list_policies(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(subject): Extension<SubjectContext>,
    Query(page): Query<dto::PageQuery>,
) -> Response {
    let ctx = Context::new();
    guard!(services, &ctx, subject, ACTION_LIST, collection());
    items(services.policies.list_page(&ctx, page.limit, page.offset).await)
}

pub async fn create_policy(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(subject): Extension<SubjectContext>,
    Json(body): Json<dto::CreatePolicyRequest>,
) -> Response {
    let ctx = Context::new();
    guard!(services, &ctx, subject, ACTION_WRITE, collection());

    let result = match services.policies.create(&ctx, &body.name, body.policy).await {
        Ok(urn) => services.policies.load(&ctx, &urn).await,
        Err(e) => Err(e),
    };
    respond(StatusCode::CREATED, result)
}

pub async fn load_policy(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(subject): Extension<SubjectContext>,
    Path(id): Path<String>,
) -> Response {
    let ctx = Context::new();
    let urn = PolicyUrn::from_name(&id);
    guard!(services, &ctx, subject, ACTION_LOAD, urn.as_str());
    respond(StatusCode::OK, services.policies.load(&ctx, &urn).await)
}

pub async fn update_policy(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(subject): Extension<SubjectContext>,
    Path(id): Path<String>,
    Json(policy): Json<Policy>,
) -> Response {
    let ctx = Context::new();
    let urn = PolicyUrn::from_name(&id);
    guard!(services, &ctx, subject, ACTION_WRITE, urn.as_str());
    accepted(services.policies.update(&ctx, &urn, policy).await)
}

pub async fn delete_policy(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(subject): Extension<SubjectContext>,
    Path(id): Path<String>,
) -> Response {
    let ctx = Context::new();
    let urn = PolicyUrn::from_name(&id);
    guard!(services, &ctx, subject, ACTION_DELETE, urn.as_str());
    accepted(services.policies.delete(&ctx, &urn).await)
}
