//! Cover image generation client.
//!
//! Speaks the OpenAI images wire format and returns the hosted asset
//! URL. A single call per cover; retry is the orchestrator's concern.

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use serde::{Deserialize, Serialize};

use folio_core::provider::{CoverSpec, ImageGenerator, ProviderError};
use folio_core::types::CoverStyle;

/// Image client configuration.
#[derive(Debug, Clone)]
pub struct ImageClientConfig {
    /// Image generation endpoint URL.
    pub endpoint: String,
    pub api_key: Option<String>,
    /// Model identifier for image generation.
    pub model: String,
    /// Generated image size.
    pub size: String,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for ImageClientConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://api.openai.com/v1/images/generations".to_string(),
            api_key: None,
            model: "dall-e-3".to_string(),
            size: "1024x1792".to_string(),
            timeout_secs: 120,
        }
    }
}

/// Cover generator backed by an OpenAI-style images endpoint.
pub struct OpenAiImageClient {
    client: reqwest::Client,
    config: ImageClientConfig,
}

impl OpenAiImageClient {
    /// Create a new image client.
    pub fn new(config: ImageClientConfig) -> Result<Self, ProviderError> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| ProviderError::Http(e.to_string()))?;
        Ok(Self { client, config })
    }
}

/// Render the image prompt for one side of the book.
pub fn build_cover_prompt(spec: &CoverSpec) -> String {
    match spec.style {
        CoverStyle::Front => format!(
            "Professional front book cover for \"{}\" by {}. Genre: {}. {} \
             Striking typography with the title and author name, no other text.",
            spec.title, spec.author, spec.genre, spec.description
        ),
        CoverStyle::Back => format!(
            "Back book cover matching the front cover of \"{}\" by {}. Genre: {}. \
             Muted continuation of the front artwork with space for a synopsis, no text.",
            spec.title, spec.author, spec.genre
        ),
    }
}

#[derive(Debug, Serialize)]
struct ImageRequest {
    model: String,
    prompt: String,
    n: u32,
    size: String,
}

#[derive(Debug, Deserialize)]
struct ImageResponse {
    data: Vec<ImageDatum>,
}

#[derive(Debug, Deserialize)]
struct ImageDatum {
    url: String,
}

#[async_trait]
impl ImageGenerator for OpenAiImageClient {
    async fn generate_cover(&self, spec: &CoverSpec) -> Result<String, ProviderError> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        if let Some(key) = &self.config.api_key {
            let value = format!("Bearer {}", key);
            headers.insert(
                AUTHORIZATION,
                HeaderValue::from_str(&value).map_err(|e| ProviderError::Http(e.to_string()))?,
            );
        }

        let body = ImageRequest {
            model: self.config.model.clone(),
            prompt: build_cover_prompt(spec),
            n: 1,
            size: self.config.size.clone(),
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
        let parsed: ImageResponse =
            serde_json::from_str(&text).map_err(|e| ProviderError::Serialization(e.to_string()))?;

        parsed
            .data
            .into_iter()
            .next()
            .map(|d| d.url)
            .ok_or_else(|| ProviderError::Response("No image in response".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec(style: CoverStyle) -> CoverSpec {
        CoverSpec {
            title: "The Silent Harbor".to_string(),
            author: "R. Calloway".to_string(),
            genre: "mystery".to_string(),
            description: "A harbor town keeps its secrets.".to_string(),
            style,
        }
    }

    #[test]
    fn test_front_prompt_mentions_title_and_author() {
        let prompt = build_cover_prompt(&spec(CoverStyle::Front));
        assert!(prompt.contains("The Silent Harbor"));
        assert!(prompt.contains("R. Calloway"));
        assert!(prompt.contains("front book cover"));
    }

    #[test]
    fn test_back_prompt_differs_from_front() {
        let front = build_cover_prompt(&spec(CoverStyle::Front));
        let back = build_cover_prompt(&spec(CoverStyle::Back));
        assert_ne!(front, back);
        assert!(back.contains("Back book cover"));
    }
}
