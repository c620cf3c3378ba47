use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use tracing::debug;
use uuid::Uuid;

use super::{ListSnapshot, ListSource, PollError};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Talks to the grocery list API as an authenticated user.
#[derive(Clone)]
pub struct HttpListSource {
    client: Client,
    base_url: String,
    token: String,
}

impl HttpListSource {
    pub fn new(base_url: impl Into<String>, token: impl Into<String>) -> anyhow::Result<Self> {
        let client = Client::builder()
            .use_rustls_tls()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .context("failed to build list API client")?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: token.into(),
        })
    }

    fn list_url(&self, list_id: Uuid) -> String {
        format!("{}/api/v1/grocery-lists/{list_id}", self.base_url)
    }
}

fn transport(e: reqwest::Error) -> PollError {
    PollError::Http(e.to_string())
}

#[async_trait]
impl ListSource for HttpListSource {
    async fn fetch(&self, list_id: Uuid) -> Result<ListSnapshot, PollError> {
        let response = self
            .client
            .get(self.list_url(list_id))
            .bearer_auth(&self.token)
            .send()
            .await
            .map_err(transport)?;

        match response.status() {
            StatusCode::NOT_FOUND => Err(PollError::NotFound),
            s if s.is_success() => response.json().await.map_err(transport),
            s => Err(PollError::Http(format!("unexpected status {s}"))),
        }
    }

    async fn request_generation(&self, list_id: Uuid) -> Result<(), PollError> {
        let response = self
            .client
            .post(format!("{}/generate-meal-plan", self.list_url(list_id)))
            .bearer_auth(&self.token)
            .send()
            .await
            .map_err(transport)?;

        let status = response.status();
        debug!(%list_id, %status, "meal plan generation requested");
        match status {
            s if s.is_success() => Ok(()),
            StatusCode::CONFLICT => Err(PollError::AlreadyRunning),
            StatusCode::TOO_MANY_REQUESTS => Err(PollError::RetriesExhausted),
            StatusCode::NOT_FOUND => Err(PollError::NotFound),
            StatusCode::BAD_REQUEST => Err(PollError::EmptyList),
            s => {
                let body = response.text().await.unwrap_or_default();
                Err(PollError::Http(format!("{s}: {body}")))
            }
        }
    }
}
