//! Text generation over Google's Gemini `generateContent` endpoint.
//!
//! The wire shape differs from OpenAI-style chat: the system prompt
//! travels as a separate `systemInstruction` block and the model id
//! lives in the URL rather than the body.

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use serde::{Deserialize, Serialize};
use tracing::debug;

use folio_core::provider::{ProviderError, TextGenerator, TextRequest};

/// Gemini client configuration.
#[derive(Debug, Clone)]
pub struct GeminiClientConfig {
    /// Key appended to the request URL, per Gemini auth
    pub api_key: String,
    /// API base, without the `/models/...` suffix
    pub endpoint: String,
    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for GeminiClientConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            endpoint: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            timeout_secs: 120,
        }
    }
}

/// `TextGenerator` adapter for Gemini models.
pub struct GeminiTextClient {
    client: reqwest::Client,
    config: GeminiClientConfig,
}

impl GeminiTextClient {
    /// Create a new Gemini client.
    pub fn new(config: GeminiClientConfig) -> Result<Self, ProviderError> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| ProviderError::Http(e.to_string()))?;
        Ok(Self { client, config })
    }

    fn build_url(&self, model: &str) -> String {
        format!(
            "{}/models/{}:generateContent?key={}",
            self.config.endpoint, model, self.config.api_key
        )
    }
}

// generateContent wire format

#[derive(Debug, Serialize)]
struct GeminiRequest {
    contents: Vec<GeminiContent>,
    #[serde(rename = "systemInstruction", skip_serializing_if = "Option::is_none")]
    system_instruction: Option<GeminiSystemInstruction>,
    #[serde(rename = "generationConfig")]
    generation_config: GeminiGenerationConfig,
}

#[derive(Debug, Serialize)]
struct GeminiContent {
    role: String,
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Serialize)]
struct GeminiSystemInstruction {
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Serialize)]
struct GeminiPart {
    text: String,
}

#[derive(Debug, Serialize)]
struct GeminiGenerationConfig {
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct GeminiResponse {
    candidates: Option<Vec<GeminiCandidate>>,
    error: Option<GeminiErrorDetail>,
}

impl GeminiResponse {
    fn first_text(self) -> Option<String> {
        self.candidates?
            .into_iter()
            .next()?
            .content
            .parts
            .into_iter()
            .next()
            .map(|part| part.text)
    }
}

#[derive(Debug, Deserialize)]
struct GeminiCandidate {
    content: GeminiContentResponse,
}

#[derive(Debug, Deserialize)]
struct GeminiContentResponse {
    parts: Vec<GeminiPartResponse>,
}

#[derive(Debug, Deserialize)]
struct GeminiPartResponse {
    text: String,
}

#[derive(Debug, Deserialize)]
struct GeminiErrorDetail {
    message: String,
    #[allow(dead_code)]
    code: Option<i32>,
}

#[async_trait]
impl TextGenerator for GeminiTextClient {
    async fn generate(&self, request: TextRequest) -> Result<String, ProviderError> {
        let url = self.build_url(&request.model);
        debug!(
            model = %request.model,
            prompt_chars = request.user.len(),
            "sending Gemini generateContent request"
        );

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let body = GeminiRequest {
            contents: vec![GeminiContent {
                role: "user".to_string(),
                parts: vec![GeminiPart { text: request.user }],
            }],
            system_instruction: if request.system.is_empty() {
                None
            } else {
                Some(GeminiSystemInstruction {
                    parts: vec![GeminiPart {
                        text: request.system,
                    }],
                })
            },
            generation_config: GeminiGenerationConfig {
                temperature: request.temperature,
            },
        };

        let response = self
            .client
            .post(&url)
            .headers(headers)
            .json(&body)
            .send()
            .await
            .map_err(|e| ProviderError::Http(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(ProviderError::Response(format!(
                "gemini returned {}: {}",
                status, text
            )));
        }

        let text = response
            .text()
            .await
            .map_err(|e| ProviderError::Http(e.to_string()))?;

        let parsed: GeminiResponse =
            serde_json::from_str(&text).map_err(|e| ProviderError::Serialization(e.to_string()))?;

        if let Some(error) = parsed.error {
            return Err(ProviderError::Response(format!(
                "gemini rejected the request: {}",
                error.message
            )));
        }

        parsed.first_text().ok_or_else(|| {
            ProviderError::Response("gemini response had no candidate text".to_string())
        })
    }
}
