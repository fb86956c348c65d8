use anyhow::{Context, Result};
use std::time::Duration;

use crate::http::{ChatRequest, ChatResponse, ErrorResponse};

/// Sends one turn to the relay and returns its aggregated reply.
#[async_trait::async_trait]
pub trait TurnTransport: Send + Sync {
    async fn send_turn(&self, request: &ChatRequest) -> Result<ChatResponse>;
}

/// HTTP client for `POST /api/chat`.
pub struct RelayClient {
    http: reqwest::Client,
    endpoint: String,
}

impl RelayClient {
    /// `base_url` is the relay origin, e.g. `http://127.0.0.1:3000`.
    pub fn new(base_url: &str) -> Result<Self> {
        let http = reqwest::Client::builder()
            // Comfortably above the relay's own turn timeout
            .timeout(Duration::from_secs(30))
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            http,
            endpoint: format!("{}/api/chat", base_url.trim_end_matches('/')),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait::async_trait]
impl TurnTransport for RelayClient {
    async fn send_turn(&self, request: &ChatRequest) -> Result<ChatResponse> {
        let response = self
            .http
            .post(&self.endpoint)
            .json(request)
            .send()
            .await
            .with_context(|| format!("Failed to reach relay at {}", self.endpoint))?;

        let status = response.status();
        if !status.is_success() {
            let message = match response.json::<ErrorResponse>().await {
                Ok(body) => body.error,
                Err(_) => format!("HTTP error! status: {}", status.as_u16()),
            };
            anyhow::bail!(message);
        }

        response
            .json::<ChatResponse>()
            .await
            .context("Relay returned a malformed response")
    }
}
