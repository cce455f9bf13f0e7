//! OpenAI-compatible chat completion client.
//!
//! Works against any endpoint speaking the chat completions wire
//! format (OpenAI, OpenRouter, local inference servers).

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use serde::{Deserialize, Serialize};
use tracing::debug;

use folio_core::provider::{ProviderError, TextGenerator, TextRequest};

/// OpenAI-compatible client configuration.
#[derive(Debug, Clone)]
pub struct OpenAiClientConfig {
    /// Chat completions endpoint URL.
    pub endpoint: String,
    /// Bearer token; optional for unauthenticated local servers.
    pub api_key: Option<String>,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for OpenAiClientConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://api.openai.com/v1/chat/completions".to_string(),
            api_key: None,
            timeout_secs: 120,
        }
    }
}

/// Text generator backed by an OpenAI-compatible chat endpoint.
pub struct OpenAiTextClient {
    client: reqwest::Client,
    config: OpenAiClientConfig,
}

impl OpenAiTextClient {
    /// Create a new client.
    pub fn new(config: OpenAiClientConfig) -> Result<Self, ProviderError> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| ProviderError::Http(e.to_string()))?;
        Ok(Self { client, config })
    }
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessageResponse,
}

#[derive(Debug, Deserialize)]
struct ChatMessageResponse {
    content: String,
}

#[async_trait]
impl TextGenerator for OpenAiTextClient {
    async fn generate(&self, request: TextRequest) -> Result<String, ProviderError> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        if let Some(key) = &self.config.api_key {
            let value = format!("Bearer {}", key);
            headers.insert(
                AUTHORIZATION,
                HeaderValue::from_str(&value).map_err(|e| ProviderError::Http(e.to_string()))?,
            );
        }

        debug!(
            model = %request.model,
            prompt_chars = request.user.len(),
            "sending chat completion request"
        );

        let body = ChatRequest {
            model: request.model,
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: request.system,
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: request.user,
                },
            ],
            temperature: request.temperature,
        };

        let response = self
            .client
            .post(&self.config.endpoint)
            .headers(headers)
            .json(&body)
            .send()
            .await
            .map_err(|e| ProviderError::Http(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(ProviderError::Response(format!("HTTP {}: {}", status, text)));
        }

        let text = response
            .text()
            .await
            .map_err(|e| ProviderError::Http(e.to_string()))?;
        let parsed: ChatResponse =
            serde_json::from_str(&text).map_err(|e| ProviderError::Serialization(e.to_string()))?;

        let content = parsed
            .choices
            .first()
            .map(|c| c.message.content.clone())
            .ok_or_else(|| ProviderError::Response("Missing choices".to_string()))?;

        Ok(content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_targets_openai() {
        let config = OpenAiClientConfig::default();
        assert!(config.endpoint.contains("api.openai.com"));
        assert!(config.api_key.is_none());
    }

    #[tokio::test]
    #[ignore = "requires live OPENAI_API_KEY and network"]
    async fn test_live_completion_when_env_set() {
        let api_key = match std::env::var("OPENAI_API_KEY") {
            Ok(v) if !v.trim().is_empty() => v,
            _ => {
                eprintln!("skipped: OPENAI_API_KEY is not set");
                return;
            }
        };

        let client = OpenAiTextClient::new(OpenAiClientConfig {
            api_key: Some(api_key),
            ..Default::default()
        })
        .expect("client should initialize");
        let request = TextRequest {
            system: "You are a concise assistant.".to_string(),
            user: "Reply with exactly: OK".to_string(),
            model: "gpt-4o-mini".to_string(),
            temperature: 0.0,
        };

        let response = client
            .generate(request)
            .await
            .expect("live completion should succeed");
        assert!(!response.trim().is_empty());
    }
}
