//! API-side enforcement guard.
//!
//! Every handler calls [`authorize`] with its static action and the URN of
//! the resource it operates on, before touching any service.

use axum::response::Response;

use iam_auth::{EnforcementPoint, RequestScope};
use iam_core::Context;

use crate::app::errors;
use crate::context::SubjectContext;

/// Enforce `action` on `resource` for the request subject.
pub async fn authorize(
    enforcement: &EnforcementPoint,
    ctx: &Context,
    subject: &SubjectContext,
    action: &'static str,
    resource: impl Into<String>,
) -> Result<(), Response> {
    let scope = RequestScope::new()
        .subject(subject.subject().as_str())
        .action(action)
        .resource(resource);

    enforcement.enforce(ctx, &scope).await.map_err(|e| {
        tracing::warn!(subject = %subject.subject(), action, error = %e, "request denied");
        errors::iam_error_to_response(e)
    })
}
