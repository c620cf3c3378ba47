use anyhow::Context;
use async_trait::async_trait;
use reqwest::{header, Client};
use serde_json::Value;
use tracing::{debug, error, warn};

use super::{
    error::{GenerationError, RemoteCallError},
    types::GenerationRequest,
};
use crate::config::WebhookConfig;

pub const API_KEY_HEADER: &str = "x-api-key";
pub const CLIENT_ID_HEADER: &str = "x-client-id";

/// Upper bound on how much of a rejected response ends up in errors and logs.
const MAX_ERROR_BODY: usize = 512;

/// The remote AI workflow, seen as one fallible call. Implementations must not
/// retry; the orchestrator owns retry policy.
#[async_trait]
pub trait MealPlanWebhook: Send + Sync {
    /// Fails with `Configuration` when a call could never be made.
    fn ensure_configured(&self) -> Result<(), GenerationError> {
        Ok(())
    }

    async fn call(&self, request: &GenerationRequest) -> Result<Value, GenerationError>;
}

#[derive(Clone)]
pub struct HttpWebhookClient {
    client: Client,
    config: WebhookConfig,
}

impl HttpWebhookClient {
    pub fn new(config: WebhookConfig) -> anyhow::Result<Self> {
        let client = Client::builder()
            .use_rustls_tls()
            .build()
            .context("failed to build webhook HTTP client")?;
        Ok(Self { client, config })
    }
}

#[async_trait]
impl MealPlanWebhook for HttpWebhookClient {
    fn ensure_configured(&self) -> Result<(), GenerationError> {
        self.config
            .endpoint()
            .map(|_| ())
            .map_err(GenerationError::Configuration)
    }

    async fn call(&self, request: &GenerationRequest) -> Result<Value, GenerationError> {
        let (url, api_key) = self.config.endpoint().map_err(|missing| {
            error!(missing, "meal plan webhook not configured; skipping call");
            GenerationError::Configuration(missing)
        })?;

        debug!(
            list_id = %request.grocery_list_id,
            ingredients = request.ingredients.len(),
            timeout_ms = self.config.timeout.as_millis() as u64,
            "calling meal plan webhook"
        );

        let response = self
            .client
            .post(url)
            .timeout(self.config.timeout)
            .header(header::CONTENT_TYPE, "application/json")
            .header(API_KEY_HEADER, api_key)
            .header(CLIENT_ID_HEADER, &self.config.client_id)
            .json(request)
            .send()
            .await
            .map_err(RemoteCallError::from)?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .map(truncate_body)
                .unwrap_or_else(|_| "failed to read error body".to_string());
            warn!(list_id = %request.grocery_list_id, %status, "meal plan webhook rejected request");
            return Err(RemoteCallError::Status {
                status: status.as_u16(),
                body,
            }
            .into());
        }

        let body = response
            .json::<Value>()
            .await
            .map_err(|e| RemoteCallError::Decode(e.to_string()))?;
        Ok(body)
    }
}

fn truncate_body(mut body: String) -> String {
    if body.len() > MAX_ERROR_BODY {
        let mut end = MAX_ERROR_BODY;
        while !body.is_char_boundary(end) {
            end -= 1;
        }
        body.truncate(end);
        body.push_str("...");
    }
    body
}
