//! Policy service: CRUD over the stored policy set.

use std::sync::Arc;

use iam_core::{Context, IamError, IamResult, Policy, PolicyUrn};
use iam_infra::PolicyRepository;

use crate::gate::ServiceGate;

pub struct PolicyService {
    gate: ServiceGate,
    policies: Arc<PolicyRepository>,
}

fn require_valid(urn: &PolicyUrn) -> IamResult<()> {
    if urn.local_name().is_empty() {
        return Err(IamError::invalid(format!("invalid policy urn {:?}", urn.as_str())));
    }
    Ok(())
}

impl PolicyService {
    pub fn new(policies: Arc<PolicyRepository>) -> Self {
        Self {
            gate: ServiceGate::new(),
            policies,
        }
    }

    /// Store `policy` under `urn:iam::policy/<name>`. An existing policy of
    /// the same name is replaced.
    pub async fn create(&self, ctx: &Context, name: &str, mut policy: Policy) -> IamResult<PolicyUrn> {
        if name.is_empty() {
            return Err(IamError::invalid("policy name is required"));
        }
        let urn = PolicyUrn::from_name(name);
        if urn.local_name() != name {
            return Err(IamError::invalid(format!("invalid policy name {name:?}")));
        }
        let _guard = self.gate.enter(ctx).await?;

        policy.id = urn;
        self.policies.store(ctx, &policy).await?;

        tracing::debug!(policy = %policy.id, "policy stored");
        Ok(policy.id)
    }

    pub async fn delete(&self, ctx: &Context, urn: &PolicyUrn) -> IamResult<()> {
        require_valid(urn)?;
        let _guard = self.gate.enter(ctx).await?;

        self.policies.delete(ctx, urn).await?;
        tracing::debug!(policy = %urn, "policy deleted");
        Ok(())
    }

    pub async fn load(&self, ctx: &Context, urn: &PolicyUrn) -> IamResult<Policy> {
        require_valid(urn)?;
        let _guard = self.gate.enter(ctx).await?;
        self.policies.load(ctx, urn).await
    }

    /// Replace the body stored under `urn`; the id carried by `policy` is
    /// ignored.
    pub async fn update(&self, ctx: &Context, urn: &PolicyUrn, mut policy: Policy) -> IamResult<()> {
        require_valid(urn)?;
        let _guard = self.gate.enter(ctx).await?;

        policy.id = urn.clone();
        self.policies.store(ctx, &policy).await
    }

    pub async fn list(&self, ctx: &Context) -> IamResult<Vec<Policy>> {
        let _guard = self.gate.enter(ctx).await?;
        self.policies.get(ctx).await
    }

    /// Paged listing. Only the full listing (`0, 0`) is supported so far.
    pub async fn list_page(&self, ctx: &Context, limit: usize, offset: usize) -> IamResult<Vec<Policy>> {
        if limit != 0 || offset != 0 {
            return Err(IamError::not_implemented("paginated policy listing"));
        }
        self.list(ctx).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use iam_core::{Effect, ErrorKind};
    use iam_infra::InMemoryRepository;

    fn service() -> PolicyService {
        PolicyService::new(Arc::new(InMemoryRepository::<Policy>::new()))
    }

    #[tokio::test]
    async fn create_stamps_the_name() {
        let svc = service();
        let ctx = Context::new();

        let body = Policy::allow()
            .with_id(PolicyUrn::from_name("ignored"))
            .subject("urn:iam::user/<.*>")
            .action("iam:user:load");
        let urn = svc.create(&ctx, "readers", body).await.unwrap();
        assert_eq!(urn.as_str(), "urn:iam::policy/readers");

        let loaded = svc.load(&ctx, &urn).await.unwrap();
        assert_eq!(loaded.id, urn);
        assert_eq!(loaded.actions, vec!["iam:user:load"]);

        let err = svc.create(&ctx, "", Policy::allow()).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
    }

    #[tokio::test]
    async fn create_rejects_names_that_do_not_round_trip() {
        let svc = service();
        let ctx = Context::new();

        for name in ["a:b", "team/readers", "/"] {
            let err = svc.create(&ctx, name, Policy::allow()).await.unwrap_err();
            assert_eq!(err.kind(), ErrorKind::InvalidArgument, "{name}");
        }
        assert!(svc.list(&ctx).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn update_replaces_body_under_path_urn() {
        let svc = service();
        let ctx = Context::new();
        let urn = svc.create(&ctx, "p", Policy::allow()).await.unwrap();

        svc.update(&ctx, &urn, Policy::deny().with_id(PolicyUrn::from_name("other")))
            .await
            .unwrap();

        let listed = svc.list(&ctx).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, urn);
        assert_eq!(listed[0].effect, Effect::Deny);
    }

    #[tokio::test]
    async fn delete_and_missing() {
        let svc = service();
        let ctx = Context::new();
        let urn = svc.create(&ctx, "p", Policy::allow()).await.unwrap();

        svc.delete(&ctx, &urn).await.unwrap();
        assert_eq!(svc.load(&ctx, &urn).await.unwrap_err().kind(), ErrorKind::NotFound);
        assert_eq!(svc.delete(&ctx, &urn).await.unwrap_err().kind(), ErrorKind::NotFound);

        let err = svc.list_page(&ctx, 10, 0).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotImplemented);
        assert!(svc.list_page(&ctx, 0, 0).await.unwrap().is_empty());

        let bad = PolicyUrn::parse("urn:iam::policy");
        assert_eq!(svc.load(&ctx, &bad).await.unwrap_err().kind(), ErrorKind::InvalidArgument);
    }
}
