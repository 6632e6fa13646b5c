//! Behavioral contract every repository backend must satisfy.
//!
//! Each scenario is written once against the traits and instantiated for the
//! in-memory backend, the in-memory SQLite store and a file-backed store.

use std::sync::Arc;

use iam_core::{Context, ErrorKind, Group, GroupUrn, Policy, PolicyUrn, User, UserUrn};
use iam_infra::{
    InMemoryMembershipRepository, InMemoryRepository, KvMembershipRepository, KvRepository,
    KvStore, MembershipRepository, Repository,
};

struct Backend {
    users: Arc<dyn Repository<User>>,
    groups: Arc<dyn Repository<Group>>,
    policies: Arc<dyn Repository<Policy>>,
    members: Arc<dyn MembershipRepository>,
    _dir: Option<tempfile::TempDir>,
}

fn in_memory() -> Backend {
    Backend {
        users: Arc::new(InMemoryRepository::<User>::new()),
        groups: Arc::new(InMemoryRepository::<Group>::new()),
        policies: Arc::new(InMemoryRepository::<Policy>::new()),
        members: Arc::new(InMemoryMembershipRepository::new()),
        _dir: None,
    }
}

fn over_store(store: KvStore, dir: Option<tempfile::TempDir>) -> Backend {
    let store = Arc::new(store);
    Backend {
        users: Arc::new(KvRepository::users(store.clone())),
        groups: Arc::new(KvRepository::groups(store.clone())),
        policies: Arc::new(KvRepository::policies(store.clone())),
        members: Arc::new(KvMembershipRepository::new(store)),
        _dir: dir,
    }
}

async fn kv_memory() -> Backend {
    over_store(KvStore::in_memory().await.unwrap(), None)
}

async fn kv_file() -> Backend {
    let dir = tempfile::tempdir().unwrap();
    let store = KvStore::open(dir.path().join("iam.db")).await.unwrap();
    over_store(store, Some(dir))
}

fn user(n: i64) -> UserUrn {
    UserUrn::from_account_id(n)
}

fn group(name: &str) -> GroupUrn {
    GroupUrn::from_name(name)
}

async fn assert_bidirectional(b: &Backend, users: &[UserUrn], groups: &[GroupUrn]) {
    let ctx = Context::new();
    for u in users {
        for g in b.members.memberships(&ctx, u).await.unwrap() {
            assert!(
                b.members.members(&ctx, &g).await.unwrap().contains(u),
                "{u} lists {g} but {g} does not list {u}"
            );
        }
    }
    for g in groups {
        for u in b.members.members(&ctx, g).await.unwrap() {
            assert!(
                b.members.memberships(&ctx, &u).await.unwrap().contains(g),
                "{g} lists {u} but {u} does not list {g}"
            );
        }
    }
}

async fn entity_store_load_delete(b: Backend) {
    let ctx = Context::new();
    let ada = User::new(1, "ada", None);

    b.users.store(&ctx, &ada).await.unwrap();
    assert_eq!(b.users.load(&ctx, &ada.id).await.unwrap(), ada);

    let mut renamed = ada.clone();
    renamed.username = "ada2".into();
    b.users.store(&ctx, &renamed).await.unwrap();
    assert_eq!(b.users.load(&ctx, &ada.id).await.unwrap().username, "ada2");

    b.users.delete(&ctx, &ada.id).await.unwrap();
    let err = b.users.load(&ctx, &ada.id).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
    let err = b.users.delete(&ctx, &ada.id).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

async fn listing_returns_every_record(b: Backend) {
    let ctx = Context::new();
    for name in ["ops", "dev", "admins"] {
        b.groups.store(&ctx, &Group::new(name, None)).await.unwrap();
    }
    let names: Vec<String> = b
        .groups
        .get(&ctx)
        .await
        .unwrap()
        .into_iter()
        .map(|g| g.name)
        .collect();
    assert_eq!(names, vec!["admins", "dev", "ops"]);

    let p = Policy::allow().with_id(PolicyUrn::from_name("read"));
    b.policies.store(&ctx, &p).await.unwrap();
    let listed = b.policies.get(&ctx).await.unwrap();
    assert_eq!(listed, vec![p]);
}

async fn add_member_is_idempotent(b: Backend) {
    let ctx = Context::new();
    b.members.add_member(&ctx, &user(1), &group("ops")).await.unwrap();
    b.members.add_member(&ctx, &user(1), &group("ops")).await.unwrap();

    assert_eq!(b.members.members(&ctx, &group("ops")).await.unwrap(), vec![user(1)]);
    assert_eq!(b.members.memberships(&ctx, &user(1)).await.unwrap(), vec![group("ops")]);
}

async fn delete_member_of_absent_pair_is_not_found(b: Backend) {
    let ctx = Context::new();
    let err = b
        .members
        .delete_member(&ctx, &user(1), &group("ops"))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
    assert_eq!(err.to_string(), "Request user membership not found");

    b.members.add_member(&ctx, &user(1), &group("ops")).await.unwrap();
    b.members.delete_member(&ctx, &user(1), &group("ops")).await.unwrap();
    let err = b
        .members
        .delete_member(&ctx, &user(1), &group("ops"))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);

    assert!(b.members.members(&ctx, &group("ops")).await.unwrap().is_empty());
    assert!(b.members.memberships(&ctx, &user(1)).await.unwrap().is_empty());
}

async fn remove_group_retracts_both_sides(b: Backend) {
    let ctx = Context::new();
    for n in 1..=3 {
        b.members.add_member(&ctx, &user(n), &group("ops")).await.unwrap();
    }
    b.members.add_member(&ctx, &user(1), &group("dev")).await.unwrap();

    let removed = b.members.remove_group(&ctx, &group("ops")).await.unwrap();
    assert_eq!(removed.len(), 3);

    assert!(b.members.members(&ctx, &group("ops")).await.unwrap().is_empty());
    assert_eq!(b.members.memberships(&ctx, &user(1)).await.unwrap(), vec![group("dev")]);
    assert!(b.members.memberships(&ctx, &user(2)).await.unwrap().is_empty());

    assert!(b.members.remove_group(&ctx, &group("ops")).await.unwrap().is_empty());
}

async fn concurrent_mutations_keep_indexes_consistent(b: Backend) {
    let users: Vec<UserUrn> = (1..=8).map(user).collect();
    let groups: Vec<GroupUrn> = ["a", "b", "c"].iter().map(|g| group(g)).collect();

    let mut tasks = Vec::new();
    for (i, u) in users.iter().enumerate() {
        for (j, g) in groups.iter().enumerate() {
            let members = b.members.clone();
            let (u, g) = (u.clone(), g.clone());
            tasks.push(tokio::spawn(async move {
                let ctx = Context::new();
                members.add_member(&ctx, &u, &g).await.unwrap();
                if (i + j) % 2 == 0 {
                    members.delete_member(&ctx, &u, &g).await.unwrap();
                }
            }));
        }
    }
    for t in tasks {
        t.await.unwrap();
    }

    assert_bidirectional(&b, &users, &groups).await;

    let ctx = Context::new();
    for (i, u) in users.iter().enumerate() {
        let expected: Vec<GroupUrn> = groups
            .iter()
            .enumerate()
            .filter(|(j, _)| (i + j) % 2 == 1)
            .map(|(_, g)| g.clone())
            .collect();
        assert_eq!(b.members.memberships(&ctx, u).await.unwrap(), expected);
    }
}

macro_rules! contract_suite {
    ($module:ident, $backend:expr) => {
        mod $module {
            use super::*;

            #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
            async fn entity_store_load_delete() {
                super::entity_store_load_delete($backend).await;
            }

            #[tokio::test]
            async fn listing_returns_every_record() {
                super::listing_returns_every_record($backend).await;
            }

            #[tokio::test]
            async fn add_member_is_idempotent() {
                super::add_member_is_idempotent($backend).await;
            }

            #[tokio::test]
            async fn delete_member_of_absent_pair_is_not_found() {
                super::delete_member_of_absent_pair_is_not_found($backend).await;
            }

            #[tokio::test]
            async fn remove_group_retracts_both_sides() {
                super::remove_group_retracts_both_sides($backend).await;
            }

            #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
            async fn concurrent_mutations_keep_indexes_consistent() {
                super::concurrent_mutations_keep_indexes_consistent($backend).await;
            }
        }
    };
}

contract_suite!(in_memory_backend, in_memory());
contract_suite!(kv_memory_backend, kv_memory().await);
contract_suite!(kv_file_backend, kv_file().await);
