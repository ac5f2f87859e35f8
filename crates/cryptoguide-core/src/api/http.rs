use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::debug;

use super::types::{AnswerEnvelope, HealthStatus, QueryRequest, HEALTH_PATH};
use super::AnswerBackend;
use crate::error::BackendError;

/// Backend reached over HTTP with JSON bodies.
#[derive(Clone)]
pub struct HttpBackend {
    client: Client,
    base_url: String,
}

impl HttpBackend {
    pub fn new(base_url: &str) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn with_timeout(base_url: &str, timeout: Duration) -> anyhow::Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

#[async_trait]
impl AnswerBackend for HttpBackend {
    async fn ask(&self, request: &QueryRequest) -> Result<AnswerEnvelope, BackendError> {
        let url = self.url(request.path());
        debug!(%url, "posting question");

        let response = self
            .client
            .post(&url)
            .json(request)
            .send()
            .await
            .map_err(|e| BackendError::Transport {
                url: url.clone(),
                reason: e.to_string(),
            })?;

        decode(url, response).await
    }

    async fn health(&self) -> Result<HealthStatus, BackendError> {
        let url = self.url(HEALTH_PATH);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| BackendError::Transport {
                url: url.clone(),
                reason: e.to_string(),
            })?;

        decode(url, response).await
    }
}

/// Non-2xx is a failure whatever the body says; the body is only parsed
/// after the status check.
async fn decode<T: DeserializeOwned>(url: String, response: Response) -> Result<T, BackendError> {
    let status = response.status();
    if !status.is_success() {
        return Err(BackendError::Status {
            url,
            status: status.as_u16(),
        });
    }

    let body = response.bytes().await.map_err(|e| BackendError::Transport {
        url: url.clone(),
        reason: e.to_string(),
    })?;

    serde_json::from_slice(&body).map_err(|e| BackendError::Decode {
        url,
        reason: e.to_string(),
    })
}
