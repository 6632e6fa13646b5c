use iam_core::UserUrn;

/// Authenticated subject of a request.
///
/// Inserted by the auth middleware; present for every `/v1` route.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubjectContext {
    subject: UserUrn,
}

impl SubjectContext {
    pub fn new(subject: UserUrn) -> Self {
        Self { subject }
    }

    pub fn subject(&self) -> &UserUrn {
        &self.subject
    }
}
