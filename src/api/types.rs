//! Request and response types for the sitesmith backend endpoints.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Chat roles understood by the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// One turn of the running conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Template request body
#[derive(Debug, Serialize)]
pub(super) struct TemplateRequest {
    pub prompt: String,
}

/// Template response: model-facing system prompts plus scaffold payloads
/// meant for the client to ingest directly.
#[derive(Debug, Clone, Deserialize)]
pub struct TemplateResponse {
    pub prompts: Vec<String>,
    #[serde(rename = "uiPrompts")]
    pub ui_prompts: Vec<String>,
}

/// Chat request body: the full message history, oldest first.
#[derive(Debug, Serialize)]
pub(super) struct ChatRequest {
    pub messages: Vec<ChatMessage>,
}

/// Chat response: the model's whole reply for one turn.
#[derive(Debug, Clone, Deserialize)]
pub struct ChatResponse {
    pub response: String,
}

/// Error payload shape the backend uses for rejections.
#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

/// Error returned when the backend answers with a non-success status.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct ApiError {
    /// HTTP status code
    pub status: u16,
    /// Message from the backend, or a canned description
    pub message: String,
}

impl ApiError {
    /// Build from an HTTP status and raw response body.
    ///
    /// The backend sends rejections as `{"message": "..."}`; anything else
    /// is kept verbatim.
    pub(super) fn from_response(status: u16, body: String) -> Self {
        let detail = serde_json::from_str::<ErrorBody>(&body)
            .map(|b| b.message)
            .unwrap_or(body);

        let message = match status {
            403 => {
                if detail.is_empty() {
                    format!("Backend declined the request (HTTP {})", status)
                } else {
                    format!("Backend declined the request (HTTP {}): {}", status, detail)
                }
            }
            429 => format!(
                "Rate limit exceeded (HTTP {}). Please wait and try again.",
                status
            ),
            _ => {
                if detail.is_empty() {
                    format!("API error (HTTP {})", status)
                } else {
                    format!("API error (HTTP {}): {}", status, detail)
                }
            }
        };

        Self { status, message }
    }
}
