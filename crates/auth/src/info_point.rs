//! Policy information points and their routing.

use std::sync::Arc;

use async_trait::async_trait;
use regex::Regex;

use iam_core::{Context, IamResult};

use crate::scope::PolicyContext;

/// Supplies attributes about a subject or resource URN.
#[async_trait]
pub trait InfoPoint: Send + Sync {
    async fn context(&self, ctx: &Context, urn: &str) -> IamResult<PolicyContext>;
}

#[async_trait]
impl<P> InfoPoint for Arc<P>
where
    P: InfoPoint + ?Sized,
{
    async fn context(&self, ctx: &Context, urn: &str) -> IamResult<PolicyContext> {
        (**self).context(ctx, urn).await
    }
}

/// Decides whether an info point handles a URN.
#[derive(Clone)]
pub enum ResourceMatcher {
    Prefix(String),
    Regex(Regex),
    Fn(Arc<dyn Fn(&str) -> bool + Send + Sync>),
}

impl ResourceMatcher {
    pub fn prefix(prefix: impl Into<String>) -> Self {
        Self::Prefix(prefix.into())
    }

    pub fn regex(re: Regex) -> Self {
        Self::Regex(re)
    }

    pub fn func(f: impl Fn(&str) -> bool + Send + Sync + 'static) -> Self {
        Self::Fn(Arc::new(f))
    }

    pub fn matches(&self, urn: &str) -> bool {
        match self {
            Self::Prefix(p) => urn.starts_with(p.as_str()),
            Self::Regex(re) => re.is_match(urn),
            Self::Fn(f) => f(urn),
        }
    }
}

impl std::fmt::Debug for ResourceMatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Prefix(p) => f.debug_tuple("Prefix").field(p).finish(),
            Self::Regex(re) => f.debug_tuple("Regex").field(&re.as_str()).finish(),
            Self::Fn(_) => f.write_str("Fn(..)"),
        }
    }
}

/// Dispatches to the first registered info point whose matcher accepts the
/// URN. Registration order is the priority; overlapping matchers are allowed.
/// A URN nobody claims gets an empty context.
#[derive(Default, Clone)]
pub struct InfoPointRouter {
    routes: Vec<(ResourceMatcher, Arc<dyn InfoPoint>)>,
}

impl InfoPointRouter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn route(mut self, matcher: ResourceMatcher, point: Arc<dyn InfoPoint>) -> Self {
        self.routes.push((matcher, point));
        self
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}

#[async_trait]
impl InfoPoint for InfoPointRouter {
    async fn context(&self, ctx: &Context, urn: &str) -> IamResult<PolicyContext> {
        match self.routes.iter().find(|(m, _)| m.matches(urn)) {
            Some((_, point)) => point.context(ctx, urn).await,
            None => Ok(PolicyContext::new()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct Tag(&'static str);

    #[async_trait]
    impl InfoPoint for Tag {
        async fn context(&self, _ctx: &Context, _urn: &str) -> IamResult<PolicyContext> {
            Ok(PolicyContext::from([("source".to_string(), json!(self.0))]))
        }
    }

    #[tokio::test]
    async fn first_registered_match_wins() {
        let router = InfoPointRouter::new()
            .route(ResourceMatcher::prefix("urn:iam::user/"), Arc::new(Tag("prefix")))
            .route(
                ResourceMatcher::regex(Regex::new("^urn:iam::user/[0-9]+$").unwrap()),
                Arc::new(Tag("regex")),
            )
            .route(ResourceMatcher::func(|u| u.ends_with("/ops")), Arc::new(Tag("fn")));

        let ctx = Context::new();
        let got = router.context(&ctx, "urn:iam::user/7").await.unwrap();
        assert_eq!(got["source"], json!("prefix"));

        let got = router.context(&ctx, "urn:iam::group/ops").await.unwrap();
        assert_eq!(got["source"], json!("fn"));
    }

    #[tokio::test]
    async fn unmatched_urn_yields_empty_context() {
        let router = InfoPointRouter::new()
            .route(ResourceMatcher::prefix("urn:iam::user/"), Arc::new(Tag("user")));
        let got = router
            .context(&Context::new(), "urn:iam::policy/p")
            .await
            .unwrap();
        assert!(got.is_empty());
    }
}
