//! HTTP critic adapter
//!
//! POSTs the case as JSON and expects a [`CriticEvaluation`] body back.
//!
//! Failure classification:
//! - connect errors, request timeouts, 429 and 5xx are retryable
//! - other 4xx responses are `Rejected`
//! - bodies that do not parse are `Malformed`

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{Client as ReqwestClient, StatusCode};
use std::time::Duration;
use tracing::debug;

use crate::domain::models::Case;
use crate::domain::ports::{Critic, CriticError, CriticEvaluation};

/// Default per-request timeout when none is configured.
pub const DEFAULT_HTTP_TIMEOUT_MS: u64 = 30_000;

/// Critic backed by a remote HTTP endpoint
pub struct HttpCritic {
    name: String,
    endpoint: String,
    /// Reusable HTTP client with connection pooling
    http_client: ReqwestClient,
    api_key: Option<String>,
    timeout: Duration,
}

impl HttpCritic {
    pub fn new(name: impl Into<String>, endpoint: impl Into<String>, timeout: Duration) -> Result<Self> {
        let http_client = ReqwestClient::builder()
            .timeout(timeout)
            .pool_max_idle_per_host(10)
            .tcp_nodelay(true)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            name: name.into(),
            endpoint: endpoint.into(),
            http_client,
            api_key: None,
            timeout,
        })
    }

    /// Send the key as a bearer token on every request
    #[must_use]
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn classify_send_error(&self, err: &reqwest::Error) -> CriticError {
        if err.is_timeout() {
            CriticError::Timeout(self.timeout)
        } else {
            CriticError::Connection(err.to_string())
        }
    }
}

fn classify_status(status: StatusCode, body: String) -> CriticError {
    if status == StatusCode::TOO_MANY_REQUESTS {
        CriticError::RateLimited
    } else if status.is_server_error() {
        CriticError::Server {
            status: status.as_u16(),
            message: body,
        }
    } else {
        CriticError::Rejected(format!("HTTP {}: {body}", status.as_u16()))
    }
}

#[async_trait]
impl Critic for HttpCritic {
    fn name(&self) -> &str {
        &self.name
    }

    async fn evaluate(&self, case: &Case) -> Result<CriticEvaluation, CriticError> {
        let mut request = self.http_client.post(&self.endpoint).json(case);
        if let Some(ref key) = self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| self.classify_send_error(&e))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| self.classify_send_error(&e))?;

        if !status.is_success() {
            debug!(critic = %self.name, status = status.as_u16(), "Critic endpoint returned an error");
            return Err(classify_status(status, body));
        }

        serde_json::from_str::<CriticEvaluation>(&body)
            .map_err(|e| CriticError::Malformed(format!("{e} in response from {}", self.endpoint)))
    }
}
