//! Service wiring: storage backend, account bridge, enforcement pipeline.

use std::sync::Arc;

use anyhow::Context as _;

use iam_auth::{
    Authenticator, EnforcementPoint, Enforcer, InfoPointRouter, NoopEnforcer, PolicyEnforcer,
    PolicyEvaluator, ResourceMatcher, SubjectExtractor,
};
use iam_core::{Group, Policy, ResourceKind, User, urn};
use iam_infra::{
    AccountBridge, AuthnClient, GroupRepository, InMemoryAccountBridge, InMemoryMembershipRepository,
    InMemoryRepository, KvMembershipRepository, KvRepository, KvStore, MembershipRepository,
    PolicyCatalog, PolicyRepository, UserRepository,
};
use iam_services::{GroupService, PolicyService, UserInfoPoint, UserService};

use crate::config::{AppConfig, Storage};

/// Issuer reported for the in-process account store.
pub const LOCAL_ISSUER: &str = "iam-local";

/// Where the repositories keep their records.
#[derive(Clone)]
pub enum Backend {
    InMemory,
    Embedded(Arc<KvStore>),
}

struct Repositories {
    users: Arc<UserRepository>,
    groups: Arc<GroupRepository>,
    policies: Arc<PolicyRepository>,
    members: Arc<dyn MembershipRepository>,
}

impl Repositories {
    fn new(backend: &Backend) -> Self {
        match backend {
            Backend::InMemory => Self {
                users: Arc::new(InMemoryRepository::<User>::new()),
                groups: Arc::new(InMemoryRepository::<Group>::new()),
                policies: Arc::new(InMemoryRepository::<Policy>::new()),
                members: Arc::new(InMemoryMembershipRepository::new()),
            },
            Backend::Embedded(store) => Self {
                users: Arc::new(KvRepository::users(store.clone())),
                groups: Arc::new(KvRepository::groups(store.clone())),
                policies: Arc::new(KvRepository::policies(store.clone())),
                members: Arc::new(KvMembershipRepository::new(store.clone())),
            },
        }
    }
}

pub struct AppServices {
    pub users: Arc<UserService>,
    pub groups: Arc<GroupService>,
    pub policies: Arc<PolicyService>,
    pub authenticator: Authenticator,
    pub enforcement: EnforcementPoint,
}

impl AppServices {
    pub async fn from_config(config: &AppConfig) -> anyhow::Result<Self> {
        let backend = match &config.storage {
            Storage::InMemory => Backend::InMemory,
            Storage::Embedded(path) => Backend::Embedded(Arc::new(
                KvStore::open(path)
                    .await
                    .with_context(|| format!("opening database {}", path.display()))?,
            )),
        };

        let (accounts, issuer): (Arc<dyn AccountBridge>, String) = match &config.authn {
            Some(authn) => (Arc::new(AuthnClient::new(authn.clone())), authn.issuer.clone()),
            None => (Arc::new(InMemoryAccountBridge::new()), LOCAL_ISSUER.to_string()),
        };

        Ok(Self::build(backend, accounts, issuer, !config.disable_authorization))
    }

    /// Wire the services over `backend`. With `authorize` false every
    /// authenticated request is allowed.
    pub fn build(
        backend: Backend,
        accounts: Arc<dyn AccountBridge>,
        issuer: impl Into<String>,
        authorize: bool,
    ) -> Self {
        let repos = Repositories::new(&backend);

        let users = Arc::new(UserService::new(repos.users, accounts.clone()));
        let groups = Arc::new(GroupService::new(
            repos.groups,
            repos.members.clone(),
            users.clone(),
        ));
        let policies = Arc::new(PolicyService::new(repos.policies.clone()));

        let extractor: Arc<dyn SubjectExtractor> = Arc::new(accounts);
        let authenticator = Authenticator::new(extractor, issuer);

        let enforcer: Arc<dyn Enforcer> = if authorize {
            let user_prefix = urn::build(ResourceKind::User, "");
            let info = |prefix: &str| {
                Arc::new(InfoPointRouter::new().route(
                    ResourceMatcher::prefix(user_prefix.clone()),
                    Arc::new(UserInfoPoint::new(prefix, users.clone(), repos.members.clone())),
                ))
            };
            let decision = Arc::new(PolicyEvaluator::new(Arc::new(PolicyCatalog::new(
                repos.policies.clone(),
            ))));
            Arc::new(
                PolicyEnforcer::new(decision)
                    .with_subject_info(info("subject"))
                    .with_resource_info(info("resource")),
            )
        } else {
            Arc::new(NoopEnforcer)
        };

        Self {
            users,
            groups,
            policies,
            authenticator,
            enforcement: EnforcementPoint::new(enforcer),
        }
    }
}
