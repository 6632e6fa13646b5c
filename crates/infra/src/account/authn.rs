//! HTTP client for an authn-server deployment.
//!
//! Account management goes through the server's private API (HTTP basic
//! auth). Access tokens are RS256 JWTs verified locally against the issuer's
//! published key set, which is fetched lazily and refreshed when a token
//! names an unknown key id, at most once per refresh interval.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use jsonwebtoken::jwk::JwkSet;
use jsonwebtoken::{Algorithm, DecodingKey, Validation};
use reqwest::{Method, RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tokio::sync::RwLock;

use iam_auth::SubjectExtractor;
use iam_core::{Context, IamError, IamResult};

use super::{Account, AccountBridge};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthnConfig {
    /// Base URL of the private API, e.g. `http://localhost:8090`.
    pub server: String,
    pub username: String,
    pub password: String,
    /// Expected `iss` claim; also the base URL of the key set.
    pub issuer: String,
    /// Accepted `aud` values. Empty disables the audience check.
    pub audiences: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    result: T,
}

#[derive(Debug, Deserialize)]
struct Imported {
    id: i64,
}

#[derive(Debug, Deserialize)]
struct Claims {
    sub: String,
}

#[derive(Debug, Deserialize, Default)]
struct ErrorBody {
    #[serde(default)]
    errors: Vec<FieldError>,
}

#[derive(Debug, Deserialize)]
struct FieldError {
    #[serde(default)]
    field: String,
    #[serde(default)]
    message: String,
}

/// Minimum time between key-set fetches caused by unknown key ids.
pub const DEFAULT_KEY_REFRESH_INTERVAL: Duration = Duration::from_secs(30);

#[derive(Default)]
struct KeyCache {
    set: Option<JwkSet>,
    fetched_at: Option<Instant>,
}

impl KeyCache {
    fn fresh(&self, interval: Duration) -> bool {
        self.fetched_at.is_some_and(|at| at.elapsed() < interval)
    }

    fn lookup(&self, kid: Option<&str>) -> IamResult<Option<DecodingKey>> {
        match self.set.as_ref() {
            Some(set) => select_key(set, kid),
            None => Ok(None),
        }
    }
}

pub struct AuthnClient {
    http: reqwest::Client,
    config: AuthnConfig,
    keys: RwLock<KeyCache>,
    refresh_interval: Duration,
}

impl AuthnClient {
    pub fn new(config: AuthnConfig) -> Self {
        Self::with_client(reqwest::Client::new(), config)
    }

    pub fn with_client(http: reqwest::Client, config: AuthnConfig) -> Self {
        Self {
            http,
            config,
            keys: RwLock::new(KeyCache::default()),
            refresh_interval: DEFAULT_KEY_REFRESH_INTERVAL,
        }
    }

    pub fn with_refresh_interval(mut self, interval: Duration) -> Self {
        self.refresh_interval = interval;
        self
    }

    pub fn config(&self) -> &AuthnConfig {
        &self.config
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}{}", self.config.server.trim_end_matches('/'), path);
        self.http
            .request(method, url)
            .basic_auth(&self.config.username, Some(&self.config.password))
    }

    async fn send(&self, req: RequestBuilder) -> IamResult<Response> {
        let res = req.send().await.map_err(|e| transport_error(&e))?;
        if res.status().is_success() {
            return Ok(res);
        }
        Err(status_error(res).await)
    }

    async fn send_json<T: DeserializeOwned>(&self, req: RequestBuilder) -> IamResult<T> {
        let res = self.send(req).await?;
        let body: Envelope<T> = res
            .json()
            .await
            .map_err(|e| IamError::internal(format!("authn response: {e}")))?;
        Ok(body.result)
    }

    async fn fetch_keys(&self) -> IamResult<JwkSet> {
        let url = format!("{}/jwks", self.config.issuer.trim_end_matches('/'));
        let res = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| transport_error(&e))?;
        if !res.status().is_success() {
            return Err(status_error(res).await);
        }
        res.json()
            .await
            .map_err(|e| IamError::internal(format!("authn key set: {e}")))
    }

    async fn decoding_key(&self, kid: Option<&str>) -> IamResult<DecodingKey> {
        let unknown = || IamError::unauthenticated("token signed with unknown key");
        {
            let cache = self.keys.read().await;
            if let Some(key) = cache.lookup(kid)? {
                return Ok(key);
            }
            if cache.fresh(self.refresh_interval) {
                return Err(unknown());
            }
        }

        // Concurrent misses queue on the write lock; only the first fetches.
        let mut cache = self.keys.write().await;
        if cache.fresh(self.refresh_interval) {
            return cache.lookup(kid)?.ok_or_else(unknown);
        }
        let set = self.fetch_keys().await?;
        let key = select_key(&set, kid)?;
        *cache = KeyCache {
            set: Some(set),
            fetched_at: Some(Instant::now()),
        };
        key.ok_or_else(unknown)
    }

    async fn verify(&self, token: &str) -> IamResult<String> {
        let header = jsonwebtoken::decode_header(token)
            .map_err(|e| IamError::unauthenticated(format!("malformed token: {e}")))?;
        if header.alg != Algorithm::RS256 {
            return Err(IamError::unauthenticated("unsupported token algorithm"));
        }

        let key = self.decoding_key(header.kid.as_deref()).await?;

        let mut validation = Validation::new(Algorithm::RS256);
        validation.set_issuer(&[self.config.issuer.as_str()]);
        if self.config.audiences.is_empty() {
            validation.validate_aud = false;
        } else {
            validation.set_audience(&self.config.audiences);
        }

        let data = jsonwebtoken::decode::<Claims>(token, &key, &validation)
            .map_err(|e| IamError::unauthenticated(format!("invalid token: {e}")))?;
        Ok(data.claims.sub)
    }
}

fn select_key(set: &JwkSet, kid: Option<&str>) -> IamResult<Option<DecodingKey>> {
    let jwk = match kid {
        Some(kid) => set.find(kid),
        None => set.keys.first(),
    };
    jwk.map(|jwk| {
        DecodingKey::from_jwk(jwk).map_err(|e| IamError::internal(format!("authn key: {e}")))
    })
    .transpose()
}

fn transport_error(err: &reqwest::Error) -> IamError {
    IamError::internal(format!("authn request failed: {err}"))
}

async fn status_error(res: Response) -> IamError {
    let status = res.status();
    let body: ErrorBody = res.json().await.unwrap_or_default();
    let detail = body
        .errors
        .iter()
        .map(|e| format!("{} {}", e.field, e.message))
        .collect::<Vec<_>>()
        .join(", ");

    match status {
        StatusCode::NOT_FOUND => IamError::not_found("account"),
        StatusCode::UNPROCESSABLE_ENTITY if body.errors.iter().any(|e| e.message == "TAKEN") => {
            IamError::conflict("account")
        }
        StatusCode::UNPROCESSABLE_ENTITY | StatusCode::BAD_REQUEST => IamError::invalid(detail),
        other => IamError::internal(format!("authn responded {other}: {detail}")),
    }
}

#[async_trait]
impl SubjectExtractor for AuthnClient {
    async fn extract_subject(&self, ctx: &Context, token: &str) -> IamResult<String> {
        ctx.run(self.verify(token)).await
    }
}

#[async_trait]
impl AccountBridge for AuthnClient {
    async fn import_account(
        &self,
        ctx: &Context,
        username: &str,
        password: &str,
        locked: bool,
    ) -> IamResult<i64> {
        let locked = if locked { "true" } else { "false" };
        let req = self.request(Method::POST, "/accounts/import").form(&[
            ("username", username),
            ("password", password),
            ("locked", locked),
        ]);
        let imported: Imported = ctx.run(self.send_json(req)).await?;
        tracing::debug!(account_id = imported.id, "imported remote account");
        Ok(imported.id)
    }

    async fn get_account(&self, ctx: &Context, id: i64) -> IamResult<Account> {
        let req = self.request(Method::GET, &format!("/accounts/{id}"));
        ctx.run(self.send_json(req)).await
    }

    async fn lock_account(&self, ctx: &Context, id: i64) -> IamResult<()> {
        let req = self.request(Method::PATCH, &format!("/accounts/{id}/lock"));
        ctx.run(self.send(req)).await.map(|_| ())
    }

    async fn unlock_account(&self, ctx: &Context, id: i64) -> IamResult<()> {
        let req = self.request(Method::PATCH, &format!("/accounts/{id}/unlock"));
        ctx.run(self.send(req)).await.map(|_| ())
    }

    async fn archive_account(&self, ctx: &Context, id: i64) -> IamResult<()> {
        let req = self.request(Method::DELETE, &format!("/accounts/{id}"));
        ctx.run(self.send(req)).await.map(|_| ())
    }
}
