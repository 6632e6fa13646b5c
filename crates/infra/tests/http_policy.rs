//! Remote info point and enforcer against a fake policy service bound to an
//! ephemeral port.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{Value, json};

use iam_auth::{
    EnforcementPoint, Enforcer, InfoPoint, PolicyEnforcer, PolicyEvaluator, RequestScope, StaticPolicies,
};
use iam_core::{Condition, Context, ErrorKind, Policy, PolicyUrn};
use iam_infra::{HttpEnforcer, HttpInfoPoint};

#[derive(Default)]
struct FakePolicyService {
    last_request: Mutex<Option<Value>>,
}

type Shared = Arc<FakePolicyService>;

async fn owners(Query(params): Query<HashMap<String, String>>) -> Response {
    match params.get("resource").map(String::as_str) {
        Some("urn:iam::doc/1") => Json(json!({ "resource.owner": "urn:iam::user/1" })).into_response(),
        _ => StatusCode::NOT_FOUND.into_response(),
    }
}

async fn not_an_object() -> Response {
    Json(json!([1, 2, 3])).into_response()
}

async fn enforce(State(fake): State<Shared>, Json(body): Json<Value>) -> Response {
    let allowed = body["action"] == "read";
    *fake.last_request.lock().unwrap() = Some(body);
    if allowed {
        StatusCode::NO_CONTENT.into_response()
    } else {
        StatusCode::FORBIDDEN.into_response()
    }
}

struct TestServer {
    base_url: String,
    fake: Shared,
    handle: tokio::task::JoinHandle<()>,
}

impl TestServer {
    async fn spawn() -> Self {
        let fake = Shared::default();
        let app = Router::new()
            .route("/owners", get(owners))
            .route("/broken", get(not_an_object))
            .route("/enforce", post(enforce))
            .with_state(fake.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind ephemeral port");
        let base_url = format!("http://{}", listener.local_addr().unwrap());
        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self { base_url, fake, handle }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// A URL nothing listens on.
async fn closed_url() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{addr}/")
}

fn scope(action: &str) -> RequestScope {
    RequestScope::new()
        .subject("urn:iam::user/1")
        .action(action)
        .resource("urn:iam::doc/1")
        .with_context("source", json!("console"))
}

#[tokio::test]
async fn info_point_decodes_context_and_rejects_other_statuses() {
    let srv = TestServer::spawn().await;
    let ctx = Context::new();
    let pip = HttpInfoPoint::new(srv.url("/owners"));

    let got = pip.context(&ctx, "urn:iam::doc/1").await.unwrap();
    assert_eq!(got.get("resource.owner"), Some(&json!("urn:iam::user/1")));

    assert!(pip.context(&ctx, "urn:iam::doc/2").await.is_err());
    assert!(HttpInfoPoint::new(srv.url("/broken")).context(&ctx, "x").await.is_err());
    assert!(HttpInfoPoint::new(closed_url().await).context(&ctx, "x").await.is_err());
}

#[tokio::test]
async fn remote_context_feeds_conditions_and_failures_deny() {
    let srv = TestServer::spawn().await;
    let ctx = Context::new();

    let owners_read = Policy::allow()
        .with_id(PolicyUrn::from_name("owners-read"))
        .subject("urn:iam::user/<[0-9]+>")
        .action("read")
        .resource("urn:iam::doc/<[0-9]+>")
        .condition("resource.owner", Condition::EqualsSubjectCondition {});
    let pep = |pip: HttpInfoPoint| {
        EnforcementPoint::new(Arc::new(
            PolicyEnforcer::new(Arc::new(PolicyEvaluator::new(Arc::new(StaticPolicies(vec![
                owners_read.clone(),
            ])))))
            .with_resource_info(Arc::new(pip)),
        ))
    };

    pep(HttpInfoPoint::new(srv.url("/owners")))
        .enforce(&ctx, &scope("read"))
        .await
        .unwrap();

    let unknown = scope("read").resource("urn:iam::doc/2");
    let err = pep(HttpInfoPoint::new(srv.url("/owners")))
        .enforce(&ctx, &unknown)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::PermissionDenied);

    let err = pep(HttpInfoPoint::new(closed_url().await))
        .enforce(&ctx, &scope("read"))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::PermissionDenied);
}

#[tokio::test]
async fn enforcer_posts_request_and_grants_only_on_2xx() {
    let srv = TestServer::spawn().await;
    let ctx = Context::new();
    let remote = HttpEnforcer::new(srv.url("/enforce"));

    remote.enforce(&ctx, &scope("read")).await.unwrap();
    assert_eq!(
        srv.fake.last_request.lock().unwrap().clone(),
        Some(json!({
            "subject": "urn:iam::user/1",
            "action": "read",
            "resource": "urn:iam::doc/1",
            "context": { "source": "console" }
        }))
    );

    let err = remote.enforce(&ctx, &scope("write")).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::PermissionDenied);

    let err = HttpEnforcer::new(srv.url("/missing"))
        .enforce(&ctx, &scope("read"))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::PermissionDenied);

    let err = remote
        .enforce(&ctx, &RequestScope::new().subject("urn:iam::user/1").action("read"))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::PermissionDenied);
}

#[tokio::test]
async fn unreachable_enforcer_denies_through_the_enforcement_point() {
    let ctx = Context::new();
    let remote = HttpEnforcer::new(closed_url().await);
    assert!(remote.enforce(&ctx, &scope("read")).await.is_err());

    let pep = EnforcementPoint::new(Arc::new(remote));
    let err = pep.enforce(&ctx, &scope("read")).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::PermissionDenied);
}
