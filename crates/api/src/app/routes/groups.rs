use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path},
    http::StatusCode,
    response::Response,
    routing::{get, put},
};

use iam_core::{Context, GroupUrn, ResourceKind, UserUrn, urn};

use super::common::{accepted, guard, items, respond};
use crate::app::{dto, services::AppServices};
use crate::context::SubjectContext;

pub const ACTION_READ: &str = "iam:groups.read";
pub const ACTION_WRITE: &str = "iam:groups.write";

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_groups).post(create_group))
        .route(
            "/:id",
            get(load_group)
                .put(update_comment)
                .patch(update_comment)
                .delete(delete_group),
        )
        .route("/:id/members", get(list_members))
        .route("/:id/members/:user", put(add_member).delete(delete_member))
}

fn collection() -> String {
    urn::build(ResourceKind::Group, "")
}

pub async fn list_groups(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(subject): Extension<SubjectContext>,
) -> Response {
    let ctx = Context::new();
    guard!(services, &ctx, subject, ACTION_READ, collection());
    items(services.groups.get(&ctx).await)
}

pub async fn create_group(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(subject): Extension<SubjectContext>,
    Json(body): Json<dto::CreateGroupRequest>,
) -> Response {
    let ctx = Context::new();
    guard!(services, &ctx, subject, ACTION_WRITE, collection());

    let result = match services.groups.create(&ctx, &body.name, body.comment).await {
        Ok(urn) => services.groups.load(&ctx, &urn).await,
        Err(e) => Err(e),
    };
    respond(StatusCode::CREATED, result)
}

pub async fn load_group(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(subject): Extension<SubjectContext>,
    Path(id): Path<String>,
) -> Response {
    let ctx = Context::new();
    let urn = GroupUrn::from_name(&id);
    guard!(services, &ctx, subject, ACTION_READ, urn.as_str());
    respond(StatusCode::OK, services.groups.load(&ctx, &urn).await)
}

pub async fn update_comment(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(subject): Extension<SubjectContext>,
    Path(id): Path<String>,
    Json(body): Json<dto::UpdateCommentRequest>,
) -> Response {
    let ctx = Context::new();
    let urn = GroupUrn::from_name(&id);
    guard!(services, &ctx, subject, ACTION_WRITE, urn.as_str());
    accepted(services.groups.update_comment(&ctx, &urn, body.comment).await)
}

pub async fn delete_group(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(subject): Extension<SubjectContext>,
    Path(id): Path<String>,
) -> Response {
    let ctx = Context::new();
    let urn = GroupUrn::from_name(&id);
    guard!(services, &ctx, subject, ACTION_WRITE, urn.as_str());
    accepted(services.groups.delete(&ctx, &urn).await)
}

pub async fn list_members(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(subject): Extension<SubjectContext>,
    Path(id): Path<String>,
) -> Response {
    let ctx = Context::new();
    let urn = GroupUrn::from_name(&id);
    guard!(services, &ctx, subject, ACTION_READ, urn.as_str());
    items(services.groups.members(&ctx, &urn).await)
}

pub async fn add_member(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(subject): Extension<SubjectContext>,
    Path((id, user)): Path<(String, String)>,
) -> Response {
    let ctx = Context::new();
    let group = GroupUrn::from_name(&id);
    guard!(services, &ctx, subject, ACTION_WRITE, group.as_str());
    accepted(
        services
            .groups
            .add_member(&ctx, &group, &UserUrn::from_name(&user))
            .await,
    )
}

pub async fn delete_member(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(subject): Extension<SubjectContext>,
    Path((id, user)): Path<(String, String)>,
) -> Response {
    let ctx = Context::new();
    let group = GroupUrn::from_name(&id);
    guard!(services, &ctx, subject, ACTION_WRITE, group.as_str());
    accepted(
        services
            .groups
            .delete_member(&ctx, &group, &UserUrn::from_name(&user))
            .await,
    )
}
