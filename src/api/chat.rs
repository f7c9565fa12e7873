//! Chat endpoint: run one model turn over the conversation so far.

use anyhow::Result;

use super::client::BackendClient;
use super::types::{ChatMessage, ChatRequest, ChatResponse};

/// Timeout for chat requests; a full project payload takes a while to
/// generate.
const CHAT_TIMEOUT_SECS: u64 = 120;

impl BackendClient {
    /// Call the `/chat` endpoint with the full message history, oldest
    /// first. The reply is the model's whole output for the turn.
    pub async fn chat(&self, messages: &[ChatMessage]) -> Result<ChatResponse> {
        let request_body = ChatRequest {
            messages: messages.to_vec(),
        };

        self.post_json("chat", &request_body, CHAT_TIMEOUT_SECS)
            .await
    }
}
