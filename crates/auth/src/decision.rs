//! Policy decision point.
//!
//! Evaluation rules:
//! - a policy applies when subject, action and resource each match one of its
//!   patterns and every condition holds
//! - any applicable `deny` wins over any number of `allow`s
//! - no applicable policy is a denial
//! - a malformed pattern or condition is an error, which the enforcer turns
//!   into a denial

use std::sync::Arc;

use async_trait::async_trait;

use iam_core::{Context, Effect, IamResult, Policy};

use crate::condition;
use crate::pattern::PatternMatcher;
use crate::scope::PolicyContext;

/// Fully gathered access request.
#[derive(Debug, Clone, PartialEq)]
pub struct AccessRequest {
    pub subject: String,
    pub action: String,
    pub resource: String,
    pub context: PolicyContext,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Deny(String),
}

impl Decision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Self::Allow)
    }
}

#[async_trait]
pub trait DecisionPoint: Send + Sync {
    async fn decide(&self, ctx: &Context, request: &AccessRequest) -> IamResult<Decision>;
}

/// Supplies the policies a decision is made against.
#[async_trait]
pub trait PolicySource: Send + Sync {
    async fn policies(&self, ctx: &Context) -> IamResult<Vec<Policy>>;
}

#[async_trait]
impl<S> PolicySource for Arc<S>
where
    S: PolicySource + ?Sized,
{
    async fn policies(&self, ctx: &Context) -> IamResult<Vec<Policy>> {
        (**self).policies(ctx).await
    }
}

/// Fixed policy set, handy for tests and bootstrapping.
#[derive(Debug, Clone, Default)]
pub struct StaticPolicies(pub Vec<Policy>);

#[async_trait]
impl PolicySource for StaticPolicies {
    async fn policies(&self, _ctx: &Context) -> IamResult<Vec<Policy>> {
        Ok(self.0.clone())
    }
}

/// Default decision point: deny-overrides over a [`PolicySource`].
pub struct PolicyEvaluator {
    source: Arc<dyn PolicySource>,
    matcher: PatternMatcher,
}

impl PolicyEvaluator {
    pub fn new(source: Arc<dyn PolicySource>) -> Self {
        Self {
            source,
            matcher: PatternMatcher::new(),
        }
    }

    /// Evaluate `request` against an explicit policy set.
    pub fn evaluate(&self, policies: &[Policy], request: &AccessRequest) -> IamResult<Decision> {
        let mut allowed = None;

        for policy in policies {
            if !self.applies(policy, request)? {
                continue;
            }
            match policy.effect {
                Effect::Deny => {
                    return Ok(Decision::Deny(format!(
                        "Request was denied by policy {}",
                        policy.id
                    )));
                }
                Effect::Allow => allowed = Some(policy.id.clone()),
            }
        }

        match allowed {
            Some(id) => {
                tracing::trace!(policy = %id, "request allowed");
                Ok(Decision::Allow)
            }
            None => Ok(Decision::Deny("Request was denied by default".to_string())),
        }
    }

    fn applies(&self, policy: &Policy, request: &AccessRequest) -> IamResult<bool> {
        if !self.matcher.matches_any(&policy.actions, &request.action)? {
            return Ok(false);
        }
        if !self.matcher.matches_any(&policy.subjects, &request.subject)? {
            return Ok(false);
        }
        if !self.matcher.matches_any(&policy.resources, &request.resource)? {
            return Ok(false);
        }

        for (key, cond) in &policy.conditions {
            if !condition::evaluate(cond, request.context.get(key), &request.subject)? {
                return Ok(false);
            }
        }

        Ok(true)
    }
}

#[async_trait]
impl DecisionPoint for PolicyEvaluator {
    async fn decide(&self, ctx: &Context, request: &AccessRequest) -> IamResult<Decision> {
        let policies = ctx.run(self.source.policies(ctx)).await?;
        self.evaluate(&policies, request)
    }
}
