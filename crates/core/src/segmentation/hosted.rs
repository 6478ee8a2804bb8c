//! HTTP client for hosted inference endpoints
//!
//! Endpoints follow the `POST {base}/{model}` convention with the raw image
//! bytes as the body and a bearer token for auth.

use crate::error::StrategyError;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use tracing::debug;

/// Shared client for every hosted model
#[derive(Debug, Clone)]
pub struct InferenceClient {
    http: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

impl InferenceClient {
    pub fn new(base_url: impl Into<String>, token: Option<String>) -> Self {
        Self::with_client(reqwest::Client::new(), base_url, token)
    }

    /// Reuse an existing connection pool
    pub fn with_client(
        http: reqwest::Client,
        base_url: impl Into<String>,
        token: Option<String>,
    ) -> Self {
        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: token.filter(|t| !t.trim().is_empty()),
        }
    }

    /// Whether a token is present
    pub fn is_configured(&self) -> bool {
        self.token.is_some()
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Send image bytes to a model and return the parsed JSON body
    pub async fn infer(
        &self,
        model_id: &str,
        image: &[u8],
    ) -> Result<serde_json::Value, StrategyError> {
        let token = self
            .token
            .as_deref()
            .ok_or_else(|| StrategyError::NotConfigured("no inference token".to_string()))?;

        let url = format!("{}/{}", self.base_url, model_id);
        debug!("POST {} ({} bytes)", url, image.len());

        let response = self
            .http
            .post(&url)
            .header(AUTHORIZATION, format!("Bearer {token}"))
            .header(CONTENT_TYPE, "image/png")
            .body(image.to_vec())
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(StrategyError::Upstream {
                status: status.as_u16(),
            });
        }

        let body = response.bytes().await?;
        serde_json::from_slice(&body).map_err(|e| StrategyError::Malformed(e.to_string()))
    }
}
