use axum::{extract::State, http::header, middleware::Next, response::Response};

use iam_auth::Authenticator;
use iam_core::Context;

use crate::app::errors;
use crate::context::SubjectContext;

#[derive(Clone)]
pub struct AuthState {
    pub authenticator: Authenticator,
}

/// Authenticate the bearer token and attach the subject to the request.
pub async fn auth_middleware(
    State(state): State<AuthState>,
    mut req: axum::http::Request<axum::body::Body>,
    next: Next,
) -> Response {
    let header = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok());

    let subject = match state.authenticator.authenticate(&Context::new(), header).await {
        Ok(subject) => subject,
        Err(e) => {
            tracing::debug!(error = %e, "authentication failed");
            return errors::iam_error_to_response(e);
        }
    };

    req.extensions_mut().insert(SubjectContext::new(subject));
    next.run(req).await
}
