use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;

use iam_core::{ErrorKind, IamError};

/// HTTP status and error code for an error kind.
fn status_of(kind: ErrorKind) -> (StatusCode, &'static str) {
    match kind {
        ErrorKind::InvalidArgument => (StatusCode::BAD_REQUEST, "invalid_argument"),
        ErrorKind::NotFound => (StatusCode::NOT_FOUND, "not_found"),
        ErrorKind::Conflict => (StatusCode::CONFLICT, "conflict"),
        ErrorKind::Unauthenticated => (StatusCode::UNAUTHORIZED, "unauthenticated"),
        ErrorKind::PermissionDenied => (StatusCode::FORBIDDEN, "forbidden"),
        ErrorKind::NotImplemented => (StatusCode::NOT_IMPLEMENTED, "not_implemented"),
        ErrorKind::Cancelled => (StatusCode::REQUEST_TIMEOUT, "cancelled"),
        ErrorKind::Internal => (StatusCode::INTERNAL_SERVER_ERROR, "internal"),
    }
}

pub fn iam_error_to_response(err: IamError) -> axum::response::Response {
    let (status, code) = status_of(err.kind());
    if status == StatusCode::INTERNAL_SERVER_ERROR {
        tracing::error!(error = %err, "request failed");
    }
    json_error(status, code, err.to_string())
}

pub fn json_error(
    status: StatusCode,
    code: &'static str,
    message: impl Into<String>,
) -> axum::response::Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_every_kind() {
        let cases = [
            (IamError::invalid("x"), StatusCode::BAD_REQUEST),
            (IamError::not_found("user"), StatusCode::NOT_FOUND),
            (IamError::conflict("group"), StatusCode::CONFLICT),
            (IamError::unauthenticated("x"), StatusCode::UNAUTHORIZED),
            (IamError::denied("x"), StatusCode::FORBIDDEN),
            (IamError::not_implemented("x"), StatusCode::NOT_IMPLEMENTED),
            (IamError::Cancelled, StatusCode::REQUEST_TIMEOUT),
            (IamError::internal("x"), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (err, status) in cases {
            assert_eq!(iam_error_to_response(err).status(), status);
        }
    }
}
