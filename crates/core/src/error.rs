//! Error taxonomy shared by every IAM layer.

use thiserror::Error;

/// Result type used across the IAM crates.
pub type IamResult<T> = Result<T, IamError>;

/// Coarse classification of an [`IamError`], used by transports to pick a
/// status code without matching on messages.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    InvalidArgument,
    NotFound,
    Conflict,
    Unauthenticated,
    PermissionDenied,
    NotImplemented,
    Cancelled,
    Internal,
}

/// IAM error.
///
/// Adapters (storage, HTTP clients, token verification) convert their own
/// failures into one of these variants at the boundary.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum IamError {
    /// Malformed or missing input (empty name, invalid URN).
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The named kind of entity does not exist.
    #[error("Request {0} not found")]
    NotFound(String),

    /// Uniqueness violation (e.g. duplicate user).
    #[error("{0} already exists")]
    Conflict(String),

    /// Missing or invalid credentials.
    #[error("unauthenticated: {0}")]
    Unauthenticated(String),

    /// The enforcement pipeline refused the request.
    #[error("Access denied: {0}")]
    PermissionDenied(String),

    #[error("not implemented: {0}")]
    NotImplemented(String),

    /// The caller's context was cancelled before the operation finished.
    #[error("operation cancelled")]
    Cancelled,

    /// Storage, remote or encoding failure.
    #[error("internal error: {0}")]
    Internal(String),
}

impl IamError {
    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }

    pub fn not_found(kind: impl Into<String>) -> Self {
        Self::NotFound(kind.into())
    }

    pub fn conflict(kind: impl Into<String>) -> Self {
        Self::Conflict(kind.into())
    }

    pub fn unauthenticated(msg: impl Into<String>) -> Self {
        Self::Unauthenticated(msg.into())
    }

    pub fn denied(reason: impl Into<String>) -> Self {
        Self::PermissionDenied(reason.into())
    }

    pub fn not_implemented(what: impl Into<String>) -> Self {
        Self::NotImplemented(what.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidArgument(_) => ErrorKind::InvalidArgument,
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::Conflict(_) => ErrorKind::Conflict,
            Self::Unauthenticated(_) => ErrorKind::Unauthenticated,
            Self::PermissionDenied(_) => ErrorKind::PermissionDenied,
            Self::NotImplemented(_) => ErrorKind::NotImplemented,
            Self::Cancelled => ErrorKind::Cancelled,
            Self::Internal(_) => ErrorKind::Internal,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.kind() == ErrorKind::NotFound
    }

    /// Prefix the message with `context` while keeping the kind.
    ///
    /// `NotFound`, `Conflict` and `Cancelled` carry structured payloads and are
    /// returned unchanged.
    pub fn with_context(self, context: &str) -> Self {
        match self {
            Self::InvalidArgument(m) => Self::InvalidArgument(format!("{context}: {m}")),
            Self::Unauthenticated(m) => Self::Unauthenticated(format!("{context}: {m}")),
            Self::PermissionDenied(m) => Self::PermissionDenied(format!("{context}: {m}")),
            Self::NotImplemented(m) => Self::NotImplemented(format!("{context}: {m}")),
            Self::Internal(m) => Self::Internal(format!("{context}: {m}")),
            other => other,
        }
    }
}

impl From<serde_json::Error> for IamError {
    fn from(err: serde_json::Error) -> Self {
        Self::Internal(format!("encoding: {err}"))
    }
}
