//! Template endpoint: classify the prompt and fetch the project scaffold.

use anyhow::Result;

use super::client::BackendClient;
use super::types::{TemplateRequest, TemplateResponse};

/// Timeout for template requests
const TEMPLATE_TIMEOUT_SECS: u64 = 30;

impl BackendClient {
    /// Call the `/template` endpoint with the opening prompt.
    ///
    /// The backend decides which scaffold fits the prompt and answers with
    /// `prompts` (to forward to the model) and `ui_prompts` (scaffold
    /// payloads the client ingests directly). A prompt the backend cannot
    /// map to a website build comes back as HTTP 403.
    pub async fn fetch_template(&self, prompt: &str) -> Result<TemplateResponse> {
        let request_body = TemplateRequest {
            prompt: prompt.trim().to_string(),
        };

        self.post_json("template", &request_body, TEMPLATE_TIMEOUT_SECS)
            .await
    }
}
