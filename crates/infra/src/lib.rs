//! Infrastructure layer: storage backends, the remote account store, and
//! local or remote adapters feeding the enforcement pipeline.

pub mod account;
pub mod http_policy;
pub mod policy_source;
pub mod repository;

pub use account::{Account, AccountBridge, AuthnClient, AuthnConfig, InMemoryAccountBridge};
pub use http_policy::{HttpEnforcer, HttpInfoPoint};
pub use policy_source::PolicyCatalog;
pub use repository::{
    GroupRepository, InMemoryMembershipRepository, InMemoryRepository, KvMembershipRepository,
    KvRepository, KvStore, MembershipRepository, PolicyRepository, Repository, UserRepository,
};
