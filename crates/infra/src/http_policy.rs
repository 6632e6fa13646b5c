//! Remote pipeline stages over HTTP: an info point that fetches context
//! from a URL and an enforcer that delegates the decision to another
//! service's enforcement endpoint.

use async_trait::async_trait;
use serde::Serialize;

use iam_auth::{Enforcer, InfoPoint, PolicyContext, RequestScope};
use iam_core::{Context, IamError, IamResult};

/// Fetches a context object with `GET <url>?resource=<urn>`.
///
/// Anything but `200 OK` with a JSON object body is an error.
pub struct HttpInfoPoint {
    http: reqwest::Client,
    url: String,
}

impl HttpInfoPoint {
    pub fn new(url: impl Into<String>) -> Self {
        Self::with_client(reqwest::Client::new(), url)
    }

    pub fn with_client(http: reqwest::Client, url: impl Into<String>) -> Self {
        Self { http, url: url.into() }
    }

    async fn fetch(&self, urn: &str) -> IamResult<PolicyContext> {
        let res = self
            .http
            .get(&self.url)
            .query(&[("resource", urn)])
            .send()
            .await
            .map_err(|e| IamError::internal(format!("info point {}: {e}", self.url)))?;

        if res.status() != reqwest::StatusCode::OK {
            return Err(IamError::internal(format!(
                "unexpected status {} from info point {}",
                res.status(),
                self.url
            )));
        }
        res.json()
            .await
            .map_err(|e| IamError::internal(format!("info point {}: {e}", self.url)))
    }
}

#[async_trait]
impl InfoPoint for HttpInfoPoint {
    async fn context(&self, ctx: &Context, urn: &str) -> IamResult<PolicyContext> {
        ctx.run(self.fetch(urn)).await
    }
}

#[derive(Serialize)]
struct EnforceRequest<'a> {
    subject: &'a str,
    action: &'a str,
    resource: &'a str,
    context: &'a PolicyContext,
}

/// Forwards each request as a JSON `POST` to a remote enforcement endpoint.
/// A 2xx response grants; any other status is a denial.
pub struct HttpEnforcer {
    http: reqwest::Client,
    url: String,
}

impl HttpEnforcer {
    pub fn new(url: impl Into<String>) -> Self {
        Self::with_client(reqwest::Client::new(), url)
    }

    pub fn with_client(http: reqwest::Client, url: impl Into<String>) -> Self {
        Self { http, url: url.into() }
    }

    async fn post(&self, scope: &RequestScope) -> IamResult<()> {
        let field = |value: &Option<String>, name: &str| {
            value
                .as_deref()
                .filter(|v| !v.is_empty())
                .ok_or_else(|| IamError::denied(format!("No {name} defined")))
                .map(str::to_owned)
        };
        let action = field(&scope.action, "action")?;
        let subject = field(&scope.subject, "subject")?;
        let resource = field(&scope.resource, "resource")?;

        let body = EnforceRequest {
            subject: &subject,
            action: &action,
            resource: &resource,
            context: &scope.context,
        };
        let res = self
            .http
            .post(&self.url)
            .json(&body)
            .send()
            .await
            .map_err(|e| IamError::internal(format!("remote enforcer {}: {e}", self.url)))?;

        let status = res.status();
        if status.is_success() {
            return Ok(());
        }
        tracing::debug!(url = %self.url, %status, "remote enforcer refused request");
        Err(IamError::denied(format!("Remote enforcer responded {status}")))
    }
}

#[async_trait]
impl Enforcer for HttpEnforcer {
    async fn enforce(&self, ctx: &Context, scope: &RequestScope) -> IamResult<()> {
        ctx.run(self.post(scope)).await
    }
}
