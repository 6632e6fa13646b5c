//! `AuthnClient` against a fake authn-server bound to an ephemeral port.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, patch, post};
use axum::{Form, Json, Router};
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use serde::Deserialize;
use serde_json::json;

use iam_auth::SubjectExtractor;
use iam_core::{Context, ErrorKind};
use iam_infra::{Account, AccountBridge, AuthnClient, AuthnConfig};

const JWKS: &str = include_str!("fixtures/authn_test_jwks.json");
const SIGNING_KEY: &[u8] = include_bytes!("fixtures/authn_test_key.pem");

#[derive(Default)]
struct FakeAuthn {
    accounts: Mutex<BTreeMap<i64, Account>>,
    jwks_fetches: AtomicUsize,
}

type Shared = Arc<FakeAuthn>;

#[derive(Deserialize)]
struct ImportForm {
    username: String,
    #[allow(dead_code)]
    password: String,
    locked: String,
}

fn authorized(headers: &HeaderMap) -> bool {
    headers
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.starts_with("Basic "))
}

async fn import(State(fake): State<Shared>, headers: HeaderMap, Form(form): Form<ImportForm>) -> Response {
    if !authorized(&headers) {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    let mut accounts = fake.accounts.lock().unwrap();
    if accounts.values().any(|a| a.username == form.username) {
        return (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(json!({ "errors": [{ "field": "username", "message": "TAKEN" }] })),
        )
            .into_response();
    }
    let id = accounts.len() as i64 + 1;
    accounts.insert(
        id,
        Account {
            id,
            username: form.username,
            locked: form.locked == "true",
            deleted: false,
        },
    );
    Json(json!({ "result": { "id": id } })).into_response()
}

async fn show(State(fake): State<Shared>, Path(id): Path<i64>) -> Response {
    match fake.accounts.lock().unwrap().get(&id) {
        Some(a) => Json(json!({ "result": a })).into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

fn mutate(fake: &FakeAuthn, id: i64, f: impl FnOnce(&mut Account)) -> Response {
    match fake.accounts.lock().unwrap().get_mut(&id) {
        Some(a) => {
            f(a);
            Json(json!({ "result": {} })).into_response()
        }
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

async fn lock(State(fake): State<Shared>, Path(id): Path<i64>) -> Response {
    mutate(&fake, id, |a| a.locked = true)
}

async fn unlock(State(fake): State<Shared>, Path(id): Path<i64>) -> Response {
    mutate(&fake, id, |a| a.locked = false)
}

async fn archive(State(fake): State<Shared>, Path(id): Path<i64>) -> Response {
    mutate(&fake, id, |a| a.deleted = true)
}

async fn jwks(State(fake): State<Shared>) -> Response {
    fake.jwks_fetches.fetch_add(1, Ordering::SeqCst);
    ([(axum::http::header::CONTENT_TYPE, "application/json")], JWKS).into_response()
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
            .route("/accounts/import", post(import))
            .route("/accounts/:id", get(show).delete(archive))
            .route("/accounts/:id/lock", patch(lock))
            .route("/accounts/:id/unlock", patch(unlock))
            .route("/jwks", get(jwks))
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

    fn client(&self, audiences: &[&str]) -> AuthnClient {
        AuthnClient::new(AuthnConfig {
            server: self.base_url.clone(),
            username: "iam".into(),
            password: "secret".into(),
            issuer: self.base_url.clone(),
            audiences: audiences.iter().map(|a| a.to_string()).collect(),
        })
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

fn mint(issuer: &str, audience: &str, sub: &str) -> String {
    mint_with_kid("test-key", issuer, audience, sub)
}

fn mint_with_kid(kid: &str, issuer: &str, audience: &str, sub: &str) -> String {
    let exp = SystemTime::now().duration_since(UNIX_EPOCH).unwrap().as_secs() + 600;
    let mut header = Header::new(Algorithm::RS256);
    header.kid = Some(kid.into());
    jsonwebtoken::encode(
        &header,
        &json!({ "sub": sub, "iss": issuer, "aud": audience, "exp": exp }),
        &EncodingKey::from_rsa_pem(SIGNING_KEY).expect("fixture key"),
    )
    .expect("failed to sign token")
}

#[tokio::test]
async fn account_lifecycle_over_private_api() {
    let srv = TestServer::spawn().await;
    let client = srv.client(&["iam"]);
    let ctx = Context::new();

    let id = client.import_account(&ctx, "ada", "pw", false).await.unwrap();
    let account = client.get_account(&ctx, id).await.unwrap();
    assert_eq!(account.username, "ada");
    assert!(!account.locked);

    client.lock_account(&ctx, id).await.unwrap();
    assert!(client.get_account(&ctx, id).await.unwrap().locked);
    client.unlock_account(&ctx, id).await.unwrap();
    assert!(!client.get_account(&ctx, id).await.unwrap().locked);

    client.archive_account(&ctx, id).await.unwrap();
    assert!(client.get_account(&ctx, id).await.unwrap().deleted);

    let err = client.import_account(&ctx, "ada", "pw", false).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Conflict);

    let err = client.get_account(&ctx, 404).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[tokio::test]
async fn verifies_signature_issuer_and_audience() {
    let srv = TestServer::spawn().await;
    let ctx = Context::new();
    let client = srv.client(&["iam", "console"]);

    let token = mint(&srv.base_url, "console", "17");
    assert_eq!(client.extract_subject(&ctx, &token).await.unwrap(), "17");

    let wrong_aud = mint(&srv.base_url, "billing", "17");
    let err = client.extract_subject(&ctx, &wrong_aud).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Unauthenticated);

    let wrong_iss = mint("https://elsewhere.test", "iam", "17");
    assert!(client.extract_subject(&ctx, &wrong_iss).await.is_err());

    let err = client.extract_subject(&ctx, "not-a-jwt").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Unauthenticated);
}

#[tokio::test]
async fn unknown_key_ids_do_not_refetch_within_interval() {
    let srv = TestServer::spawn().await;
    let ctx = Context::new();
    let client = srv.client(&["iam"]);

    let token = mint(&srv.base_url, "iam", "1");
    assert_eq!(client.extract_subject(&ctx, &token).await.unwrap(), "1");
    assert_eq!(srv.fake.jwks_fetches.load(Ordering::SeqCst), 1);

    for i in 0..5 {
        let forged = mint_with_kid(&format!("rotated-{i}"), &srv.base_url, "iam", "1");
        let err = client.extract_subject(&ctx, &forged).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Unauthenticated);
    }
    assert_eq!(srv.fake.jwks_fetches.load(Ordering::SeqCst), 1);

    // Known keys keep working from the cache.
    assert!(client.extract_subject(&ctx, &token).await.is_ok());
    assert_eq!(srv.fake.jwks_fetches.load(Ordering::SeqCst), 1);

    let eager = srv.client(&["iam"]).with_refresh_interval(Duration::ZERO);
    for i in 0..2 {
        let forged = mint_with_kid(&format!("rotated-{i}"), &srv.base_url, "iam", "1");
        assert!(eager.extract_subject(&ctx, &forged).await.is_err());
    }
    assert_eq!(srv.fake.jwks_fetches.load(Ordering::SeqCst), 3);
}
