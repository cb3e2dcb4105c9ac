//! Component H: the AI provider streaming contract (§6 "AI provider
//! protocol"). The engine only ever sees [`AiProviderClient`]; the concrete
//! HTTP adapter lives in [`reqwest_client`] so the core stays testable
//! against a fake.

pub mod reqwest_client;

use futures_core::Stream;
use serde::{Deserialize, Serialize};
use std::pin::Pin;

use crate::error::ProviderError;

/// One message in the chat-completion request body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

/// Request body for `POST {baseURL}/chat/completions`, matching the wire
/// shape byte for byte (§6): `{ model, messages, temperature, max_tokens?,
/// top_p?, stream:true }`.
#[derive(Debug, Clone, Serialize)]
pub struct ChatCompletionRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f32>,
    pub stream: bool,
}

/// Per-provider connection details. `base_url` excludes the trailing
/// `/chat/completions` segment.
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    pub base_url: String,
    pub api_key: String,
    pub model: String,
}

/// One unit of the SSE stream: an incremental content delta, or the
/// terminal `data: [DONE]` marker (§6).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEvent {
    Delta(String),
    Done,
}

pub type ChatStream = Pin<Box<dyn Stream<Item = Result<StreamEvent, ProviderError>> + Send>>;

/// Narrow seam the engine streams chat completions through. Kept separate
/// from the `reqwest`-backed adapter so tests can substitute a fake stream
/// without a network.
pub trait AiProviderClient: Send + Sync {
    fn stream_chat(&self, config: &ProviderConfig, request: ChatCompletionRequest) -> ChatStream;
}
