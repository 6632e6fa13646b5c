use axum::{Json, http::StatusCode, response::IntoResponse, response::Response};
use serde::Serialize;

use iam_core::IamResult;

use crate::app::errors;

/// `status` with `value` as JSON body, or the mapped error.
pub fn respond<T: Serialize>(status: StatusCode, result: IamResult<T>) -> Response {
    match result {
        Ok(value) => (status, Json(value)).into_response(),
        Err(e) => errors::iam_error_to_response(e),
    }
}

/// Status-only success (202), or the mapped error.
pub fn accepted(result: IamResult<()>) -> Response {
    match result {
        Ok(()) => StatusCode::ACCEPTED.into_response(),
        Err(e) => errors::iam_error_to_response(e),
    }
}

/// Items wrapper used by every list endpoint.
pub fn items<T: Serialize>(result: IamResult<Vec<T>>) -> Response {
    respond(StatusCode::OK, result.map(|items| serde_json::json!({ "items": items })))
}

/// Bail out of a handler with the denial response.
macro_rules! guard {
    ($services:expr, $ctx:expr, $subject:expr, $action:expr, $resource:expr) => {
        if let Err(resp) =
            crate::authz::authorize(&$services.enforcement, $ctx, &$subject, $action, $resource).await
        {
            return resp;
        }
    };
}

pub(crate) use guard;
