// src/provider/openai.rs — OpenAI-compatible Chat Completions provider

use async_trait::async_trait;

use super::{CompletionRequest, CompletionResponse, ModelProvider, TokenUsage};
use crate::infra::errors::QuickenError;

pub struct OpenAIProvider {
    api_key: String,
    client: reqwest::Client,
    base_url: String,
}

impl OpenAIProvider {
    pub fn new(api_key: String) -> Self {
        Self {
            api_key,
            client: reqwest::Client::new(),
            base_url: "https://api.openai.com/v1".into(),
        }
    }

    pub fn with_base_url(api_key: String, base_url: String) -> Self {
        Self {
            api_key,
            client: reqwest::Client::new(),
            base_url,
        }
    }

    /// Build a provider from the environment (`OPENAI_API_KEY`,
    /// optional base URL override from config).
    pub fn from_env(base_url: Option<&str>) -> Result<Self, QuickenError> {
        let api_key = std::env::var("OPENAI_API_KEY").map_err(|_| {
            QuickenError::Config("OPENAI_API_KEY is not set".into())
        })?;
        Ok(match base_url {
            Some(url) => Self::with_base_url(api_key, url.to_string()),
            None => Self::new(api_key),
        })
    }
}

#[async_trait]
impl ModelProvider for OpenAIProvider {
    fn id(&self) -> &str {
        "openai"
    }

    async fn complete(
        &self,
        request: CompletionRequest,
    ) -> Result<CompletionResponse, QuickenError> {
        let mut body = serde_json::json!({
            "model": request.model,
            "messages": [{
                "role": "user",
                "content": request.prompt,
            }],
            "max_tokens": request.max_tokens,
            "temperature": request.temperature,
        });
        if let Some(stop) = &request.stop {
            body["stop"] = serde_json::json!([stop]);
        }

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&body)
            .send()
            .await
            .map_err(|e| QuickenError::Provider {
                provider: "openai".into(),
                message: e.to_string(),
                retriable: e.is_timeout() || e.is_connect(),
            })?;

        let status = response.status();
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let retry_after_ms = response
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse::<u64>().ok())
                .map(|secs| secs * 1000)
                .unwrap_or(5000);
            return Err(QuickenError::RateLimited {
                provider: "openai".into(),
                retry_after_ms,
            });
        }

        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            return Err(QuickenError::Provider {
                provider: "openai".into(),
                message: format!("HTTP {}: {}", status, error_body),
                retriable: status.is_server_error(),
            });
        }

        let resp: serde_json::Value =
            response.json().await.map_err(|e| QuickenError::Provider {
                provider: "openai".into(),
                message: format!("Failed to parse response: {}", e),
                retriable: false,
            })?;

        let candidates: Vec<String> = resp["choices"]
            .as_array()
            .unwrap_or(&vec![])
            .iter()
            .filter_map(|c| c["message"]["content"].as_str())
            .map(|s| s.to_string())
            .collect();

        if candidates.is_empty() {
            return Err(QuickenError::EmptyCompletion {
                provider: "openai".into(),
            });
        }

        let usage = TokenUsage {
            input_tokens: resp["usage"]["prompt_tokens"].as_u64().unwrap_or(0) as u32,
            output_tokens: resp["usage"]["completion_tokens"].as_u64().unwrap_or(0) as u32,
        };

        Ok(CompletionResponse { candidates, usage })
    }
}
