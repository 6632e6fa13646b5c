//! Policy enforcement: gather context, decide, fail closed.

use std::sync::Arc;

use async_trait::async_trait;

use iam_core::{Context, IamError, IamResult};

use crate::decision::{AccessRequest, Decision, DecisionPoint};
use crate::info_point::InfoPoint;
use crate::scope::{PolicyContext, RequestScope};

/// Grants or refuses one request. `Ok(())` is the only grant.
#[async_trait]
pub trait Enforcer: Send + Sync {
    async fn enforce(&self, ctx: &Context, scope: &RequestScope) -> IamResult<()>;
}

#[async_trait]
impl<E> Enforcer for Arc<E>
where
    E: Enforcer + ?Sized,
{
    async fn enforce(&self, ctx: &Context, scope: &RequestScope) -> IamResult<()> {
        (**self).enforce(ctx, scope).await
    }
}

/// Allows everything. Only for bootstrapping a fresh deployment.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopEnforcer;

#[async_trait]
impl Enforcer for NoopEnforcer {
    async fn enforce(&self, _ctx: &Context, _scope: &RequestScope) -> IamResult<()> {
        Ok(())
    }
}

/// Merge `extra` into `into`; a key present on both sides is an error.
pub fn merge_context(into: &mut PolicyContext, extra: PolicyContext, origin: &str) -> IamResult<()> {
    for (key, value) in extra {
        if into.contains_key(&key) {
            return Err(IamError::invalid(format!(
                "{origin} context duplicates context key {key:?}"
            )));
        }
        into.insert(key, value);
    }
    Ok(())
}

/// Default enforcer: subject and resource info points feed the decision
/// point. Every failure along the way becomes
/// [`IamError::PermissionDenied`].
pub struct PolicyEnforcer {
    subject_info: Option<Arc<dyn InfoPoint>>,
    resource_info: Option<Arc<dyn InfoPoint>>,
    decision: Arc<dyn DecisionPoint>,
}

impl PolicyEnforcer {
    pub fn new(decision: Arc<dyn DecisionPoint>) -> Self {
        Self {
            subject_info: None,
            resource_info: None,
            decision,
        }
    }

    pub fn with_subject_info(mut self, point: Arc<dyn InfoPoint>) -> Self {
        self.subject_info = Some(point);
        self
    }

    pub fn with_resource_info(mut self, point: Arc<dyn InfoPoint>) -> Self {
        self.resource_info = Some(point);
        self
    }

    async fn gather(&self, ctx: &Context, scope: &RequestScope) -> IamResult<AccessRequest> {
        let (subject, action, resource) = required_fields(scope)?;

        let mut context = scope.context.clone();

        if let Some(point) = &self.subject_info {
            let extra = point.context(ctx, subject).await?;
            merge_context(&mut context, extra, "subject")?;
        }
        if let Some(point) = &self.resource_info {
            let extra = point.context(ctx, resource).await?;
            merge_context(&mut context, extra, "resource")?;
        }

        Ok(AccessRequest {
            subject: subject.to_string(),
            action: action.to_string(),
            resource: resource.to_string(),
            context,
        })
    }

    async fn evaluate(&self, ctx: &Context, scope: &RequestScope) -> IamResult<Decision> {
        let request = self.gather(ctx, scope).await?;
        self.decision.decide(ctx, &request).await
    }
}

#[async_trait]
impl Enforcer for PolicyEnforcer {
    async fn enforce(&self, ctx: &Context, scope: &RequestScope) -> IamResult<()> {
        match self.evaluate(ctx, scope).await {
            Ok(Decision::Allow) => Ok(()),
            Ok(Decision::Deny(reason)) => {
                tracing::info!(
                    subject = ?scope.subject,
                    action = ?scope.action,
                    resource = ?scope.resource,
                    %reason,
                    "access denied"
                );
                Err(IamError::denied(reason))
            }
            Err(err) => Err(fail_closed(scope, err)),
        }
    }
}

/// Outermost stage: rejects incomplete scopes with a named reason, then
/// delegates. Whatever the inner enforcer returns is collapsed to a denial.
#[derive(Clone)]
pub struct EnforcementPoint {
    inner: Arc<dyn Enforcer>,
}

impl EnforcementPoint {
    pub fn new(inner: Arc<dyn Enforcer>) -> Self {
        Self { inner }
    }

    pub async fn enforce(&self, ctx: &Context, scope: &RequestScope) -> IamResult<()> {
        required_fields(scope)?;

        match self.inner.enforce(ctx, scope).await {
            Ok(()) => Ok(()),
            Err(err @ IamError::PermissionDenied(_)) => Err(err),
            Err(err) => Err(fail_closed(scope, err)),
        }
    }
}

fn required_fields(scope: &RequestScope) -> IamResult<(&str, &str, &str)> {
    let action = present(&scope.action).ok_or_else(|| IamError::denied("No action defined"))?;
    let subject = present(&scope.subject).ok_or_else(|| IamError::denied("No subject defined"))?;
    let resource = present(&scope.resource).ok_or_else(|| IamError::denied("No resource defined"))?;
    Ok((subject, action, resource))
}

fn present(field: &Option<String>) -> Option<&str> {
    field.as_deref().filter(|s| !s.is_empty())
}

fn fail_closed(scope: &RequestScope, err: IamError) -> IamError {
    if let IamError::PermissionDenied(_) = err {
        return err;
    }
    tracing::warn!(
        subject = ?scope.subject,
        action = ?scope.action,
        resource = ?scope.resource,
        error = %err,
        "enforcement failed; denying"
    );
    IamError::denied("Request could not be evaluated")
}
