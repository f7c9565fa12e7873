//! HTTP client for the sitesmith backend.
//!
//! The backend exposes two endpoints. `/template` classifies the opening
//! prompt and returns the scaffold for the matching project type; `/chat`
//! runs one model turn over the full message history and returns the reply
//! payload. Each endpoint lives in its own file as an `impl BackendClient`
//! block with its own timeout.

mod chat;
mod client;
mod http;
mod template;
mod types;

pub use client::BackendClient;
pub use types::{ApiError, ChatMessage};
