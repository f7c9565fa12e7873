//! Core HTTP client for the sitesmith backend.

use anyhow::{Context, Result};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, error};
use url::Url;
use uuid::Uuid;

use super::http::send_with_retry;
use super::types::ApiError;

/// Default request timeout in seconds
pub(super) const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Default CLI version (from Cargo.toml)
const DEFAULT_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Build the User-Agent string
fn build_user_agent() -> String {
    let version =
        std::env::var("SITESMITH_VERSION").unwrap_or_else(|_| DEFAULT_VERSION.to_string());
    std::env::var("SITESMITH_USER_AGENT").unwrap_or_else(|_| format!("sitesmith.cli/{}", version))
}

/// HTTP client bound to one backend base URL.
///
/// Every session gets a fresh id which rides along on each request as
/// `x-request-session-id`, so backend logs can group the turns of one build.
pub struct BackendClient {
    client: Client,
    base_url: String,
    user_agent: String,
    session_id: String,
}

impl BackendClient {
    /// Create a new client for the given backend base URL.
    pub fn new(base_url: impl Into<String>) -> Self {
        let session_id = Uuid::new_v4().to_string();

        let client = Client::builder()
            .timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
            .build()
            .expect("Failed to build HTTP client");

        Self {
            client,
            base_url: base_url.into(),
            user_agent: build_user_agent(),
            session_id,
        }
    }

    fn build_url(&self, endpoint: &str) -> Result<Url> {
        let base = Url::parse(&self.base_url)
            .with_context(|| format!("Invalid backend URL: {}", self.base_url))?;
        base.join(endpoint)
            .with_context(|| format!("Failed to build URL for endpoint: {}", endpoint))
    }

    fn client_with_timeout(&self, timeout_secs: u64) -> Result<Client> {
        if timeout_secs == DEFAULT_TIMEOUT_SECS {
            return Ok(self.client.clone());
        }

        Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .context("Failed to build HTTP client")
    }

    /// POST a JSON body to an endpoint and decode the JSON response.
    ///
    /// Non-success statuses become an [`ApiError`] carrying whatever message
    /// the backend sent.
    pub(super) async fn post_json<T, R>(
        &self,
        endpoint: &str,
        body: &T,
        timeout_secs: u64,
    ) -> Result<R>
    where
        T: Serialize,
        R: for<'de> Deserialize<'de>,
    {
        let url = self.build_url(endpoint)?;
        let request_id = Uuid::new_v4().to_string();

        debug!("=== API Request ===");
        debug!("URL: {}", url);
        debug!("Timeout: {}s", timeout_secs);

        let client = self.client_with_timeout(timeout_secs)?;

        let response = send_with_retry(|| {
            client
                .post(url.clone())
                .header("Content-Type", "application/json")
                .header("User-Agent", &self.user_agent)
                .header("x-request-id", &request_id)
                .header("x-request-session-id", &self.session_id)
                .json(body)
        })
        .await
        .with_context(|| format!("Failed to send request to {}", url))?;

        let status = response.status();
        debug!("=== API Response ===");
        debug!("Status: {}", status);

        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            let api_error = ApiError::from_response(status.as_u16(), error_text);
            error!("{}", api_error.message);
            anyhow::bail!(api_error);
        }

        let response_text = response
            .text()
            .await
            .context("Failed to read response body")?;
        serde_json::from_str(&response_text).context("Failed to parse API response")
    }
}
