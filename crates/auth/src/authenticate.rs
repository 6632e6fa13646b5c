//! Bearer token authentication.

use std::sync::Arc;

use async_trait::async_trait;

use iam_core::{Context, IamError, IamResult, UserUrn};

/// Verifies a bearer token and returns the remote account id it names.
///
/// Implementations verify signature, audience and issuer themselves.
#[async_trait]
pub trait SubjectExtractor: Send + Sync {
    async fn extract_subject(&self, ctx: &Context, token: &str) -> IamResult<String>;
}

#[async_trait]
impl<S> SubjectExtractor for Arc<S>
where
    S: SubjectExtractor + ?Sized,
{
    async fn extract_subject(&self, ctx: &Context, token: &str) -> IamResult<String> {
        (**self).extract_subject(ctx, token).await
    }
}

/// Pull the token out of an `Authorization` header value.
pub fn extract_bearer(header: Option<&str>) -> IamResult<&str> {
    let header = header.ok_or_else(|| IamError::unauthenticated("missing authorization header"))?;

    let token = header
        .strip_prefix("Bearer ")
        .ok_or_else(|| IamError::unauthenticated("authorization scheme must be Bearer"))?
        .trim();

    if token.is_empty() {
        return Err(IamError::unauthenticated("empty bearer token"));
    }

    Ok(token)
}

/// First stage of the pipeline: header → subject URN.
#[derive(Clone)]
pub struct Authenticator {
    extractor: Arc<dyn SubjectExtractor>,
    issuer: String,
}

impl Authenticator {
    pub fn new(extractor: Arc<dyn SubjectExtractor>, issuer: impl Into<String>) -> Self {
        Self {
            extractor,
            issuer: issuer.into(),
        }
    }

    pub fn issuer(&self) -> &str {
        &self.issuer
    }

    pub async fn authenticate(&self, ctx: &Context, header: Option<&str>) -> IamResult<UserUrn> {
        let token = extract_bearer(header)?;

        let subject = self
            .extractor
            .extract_subject(ctx, token)
            .await
            .map_err(|e| e.with_context(&self.issuer))?;

        Ok(UserUrn::from_name(&subject))
    }
}
