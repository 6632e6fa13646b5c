//! Process configuration read from environment variables.

use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{Context as _, bail};

use iam_infra::AuthnConfig;
use iam_observability::LogFormat;

pub const DEFAULT_LISTEN: &str = "0.0.0.0:8080";
pub const IN_MEMORY_DATABASE: &str = ":memory:";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Storage {
    InMemory,
    /// Embedded key/value database file.
    Embedded(PathBuf),
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub listen: SocketAddr,
    pub storage: Storage,
    pub log_format: LogFormat,
    /// `None` runs against an in-process account store (development only).
    pub authn: Option<AuthnConfig>,
    pub disable_authorization: bool,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the configuration from an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let listen = var("IAM_LISTEN")
            .unwrap_or_else(|| DEFAULT_LISTEN.to_string())
            .parse()
            .context("IAM_LISTEN must be a socket address")?;

        let storage = match var("IAM_DATABASE") {
            None => Storage::InMemory,
            Some(path) if path == IN_MEMORY_DATABASE => Storage::InMemory,
            Some(path) => Storage::Embedded(PathBuf::from(path)),
        };

        let log_format = match var("IAM_LOG_FORMAT") {
            Some(raw) => raw.parse::<LogFormat>().map_err(anyhow::Error::msg).context("IAM_LOG_FORMAT")?,
            None => LogFormat::default(),
        };

        let disable_authorization = match var("IAM_DISABLE_AUTHORIZATION") {
            Some(raw) => parse_bool(&raw).context("IAM_DISABLE_AUTHORIZATION")?,
            None => false,
        };

        let authn = match var("AUTHN_SERVER") {
            None => None,
            Some(server) => {
                let audiences: Vec<String> = var("AUTHN_AUDIENCE")
                    .context("AUTHN_AUDIENCE is required when AUTHN_SERVER is set")?
                    .split(',')
                    .map(str::trim)
                    .filter(|a| !a.is_empty())
                    .map(String::from)
                    .collect();
                if audiences.is_empty() {
                    bail!("AUTHN_AUDIENCE names no audience");
                }
                let issuer = match var("AUTHN_ISSUER") {
                    Some(issuer) => issuer,
                    None => origin(&server)?,
                };
                Some(AuthnConfig {
                    username: var("AUTHN_USER").context("AUTHN_USER is required when AUTHN_SERVER is set")?,
                    password: var("AUTHN_PASSWORD")
                        .context("AUTHN_PASSWORD is required when AUTHN_SERVER is set")?,
                    server,
                    issuer,
                    audiences,
                })
            }
        };

        Ok(Self {
            listen,
            storage,
            log_format,
            authn,
            disable_authorization,
        })
    }
}

fn parse_bool(raw: &str) -> anyhow::Result<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => bail!("expected a boolean, got {other:?}"),
    }
}

/// `scheme://host[:port]` of `url`.
fn origin(url: &str) -> anyhow::Result<String> {
    let (scheme, rest) = url
        .split_once("://")
        .with_context(|| format!("AUTHN_SERVER {url:?} is not an absolute URL"))?;
    let host = rest.split('/').next().unwrap_or_default();
    if host.is_empty() {
        bail!("AUTHN_SERVER {url:?} has no host");
    }
    Ok(format!("{scheme}://{host}"))
}
