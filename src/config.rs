use std::time::Duration;

use anyhow::Context;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
    pub ttl_minutes: i64,
}

/// Where grocery lists and catalog items live.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    Postgres,
    Memory,
}

/// Outbound AI workflow endpoint. URL and key stay optional at startup so list
/// CRUD keeps working; every generation attempt refuses to run without them.
#[derive(Debug, Clone, Deserialize)]
pub struct WebhookConfig {
    pub url: Option<String>,
    pub api_key: Option<String>,
    pub timeout: Duration,
    pub client_id: String,
}

pub const DEFAULT_WEBHOOK_TIMEOUT_MS: u64 = 60_000;

impl Default for WebhookConfig {
    fn default() -> Self {
        Self {
            url: None,
            api_key: None,
            timeout: Duration::from_millis(DEFAULT_WEBHOOK_TIMEOUT_MS),
            client_id: "grocerymind-server".into(),
        }
    }
}

impl WebhookConfig {
    /// Returns `(url, api_key)` or the name of the first missing setting.
    pub fn endpoint(&self) -> Result<(&str, &str), &'static str> {
        let url = self
            .url
            .as_deref()
            .filter(|u| !u.trim().is_empty())
            .ok_or("MEAL_PLAN_WEBHOOK_URL")?;
        let key = self
            .api_key
            .as_deref()
            .filter(|k| !k.trim().is_empty())
            .ok_or("MEAL_PLAN_WEBHOOK_API_KEY")?;
        Ok((url, key))
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub store: StoreBackend,
    pub database_url: Option<String>,
    pub jwt: JwtConfig,
    pub webhook: WebhookConfig,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub(crate) fn from_lookup(var: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let store = match var("STORE_BACKEND").as_deref() {
            None | Some("postgres") => StoreBackend::Postgres,
            Some("memory") => StoreBackend::Memory,
            Some(other) => anyhow::bail!("unknown STORE_BACKEND {other:?}"),
        };
        let database_url = var("DATABASE_URL");
        if store == StoreBackend::Postgres && database_url.is_none() {
            anyhow::bail!("DATABASE_URL is required when STORE_BACKEND=postgres");
        }

        let jwt = JwtConfig {
            secret: var("JWT_SECRET").context("JWT_SECRET is not set")?,
            issuer: var("JWT_ISSUER").unwrap_or_else(|| "grocerymind".into()),
            audience: var("JWT_AUDIENCE").unwrap_or_else(|| "grocerymind-users".into()),
            ttl_minutes: var("JWT_TTL_MINUTES")
                .and_then(|v| v.parse::<i64>().ok())
                .unwrap_or(60),
        };

        let defaults = WebhookConfig::default();
        let webhook = WebhookConfig {
            url: var("MEAL_PLAN_WEBHOOK_URL"),
            api_key: var("MEAL_PLAN_WEBHOOK_API_KEY"),
            timeout: var("MEAL_PLAN_WEBHOOK_TIMEOUT_MS")
                .and_then(|v| v.parse::<u64>().ok())
                .map(Duration::from_millis)
                .unwrap_or(defaults.timeout),
            client_id: var("MEAL_PLAN_CLIENT_ID").unwrap_or(defaults.client_id),
        };

        Ok(Self {
            store,
            database_url,
            jwt,
            webhook,
        })
    }
}
