// src/provider/mod.rs — Model provider layer

pub mod openai;
pub mod retry;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::infra::errors::QuickenError;

/// Core trait for model backends. One synchronous request/response exchange
/// per call; retry policy lives in the `retry` wrapper, not here.
#[async_trait]
pub trait ModelProvider: Send + Sync {
    fn id(&self) -> &str;

    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, QuickenError>;
}

#[derive(Debug, Clone, Default)]
pub struct CompletionRequest {
    pub model: String,
    pub prompt: String,
    pub max_tokens: u32,
    pub temperature: f32,
    /// Stop sequence forwarded to the backend. The backend may or may not
    /// honor it; `truncate_at_stop` enforces it client-side either way.
    pub stop: Option<String>,
}

#[derive(Debug, Clone)]
pub struct CompletionResponse {
    /// Candidate texts, primary first.
    pub candidates: Vec<String>,
    pub usage: TokenUsage,
}

impl CompletionResponse {
    /// Extract the primary candidate.
    pub fn first(&self) -> Option<&str> {
        self.candidates.first().map(|s| s.as_str())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TokenUsage {
    pub input_tokens: u32,
    pub output_tokens: u32,
}

impl TokenUsage {
    pub fn total(&self) -> u32 {
        self.input_tokens + self.output_tokens
    }
}

/// Cut `text` at the first occurrence of `stop` and trim surrounding
/// whitespace. Idempotent: re-applying to already-truncated text is a no-op.
pub fn truncate_at_stop<'a>(text: &'a str, stop: &str) -> &'a str {
    let cut = match text.find(stop) {
        Some(idx) => &text[..idx],
        None => text,
    };
    cut.trim()
}
