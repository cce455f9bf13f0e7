//! Provider factory for building clients from backend configuration.

use std::sync::Arc;

use thiserror::Error;

use folio_config::{BackendSpec, ProvidersConfig};
use folio_core::provider::{ImageGenerator, ModelRegistry, TextGenerator};

use crate::gemini::{GeminiClientConfig, GeminiTextClient};
use crate::image::{ImageClientConfig, OpenAiImageClient};
use crate::openai::{OpenAiClientConfig, OpenAiTextClient};

/// Errors that can occur when building provider clients.
#[derive(Debug, Error)]
pub enum ProviderBuildError {
    #[error("unknown backend kind: {0}")]
    UnknownKind(String),
    #[error("missing API key for backend '{0}'")]
    MissingApiKey(String),
    #[error("environment variable '{0}' not found")]
    EnvNotFound(String),
    #[error("backend '{0}' not found")]
    BackendNotFound(String),
    #[error("client init failed: {0}")]
    Init(String),
}

/// Build a model registry covering every configured backend.
///
/// Each model listed under a backend resolves to that backend's
/// adapter. The default backend's first model becomes the registry
/// default.
pub fn build_registry(config: &ProvidersConfig) -> Result<ModelRegistry, ProviderBuildError> {
    let mut registry = ModelRegistry::new();

    for backend in &config.backends {
        let client = build_text_client(backend)?;
        for model in &backend.models {
            registry.register(model.clone(), client.clone());
        }
    }

    if let Some(default_name) = &config.default_backend {
        let backend = config
            .get_backend(default_name)
            .ok_or_else(|| ProviderBuildError::BackendNotFound(default_name.clone()))?;
        if let Some(model) = backend.models.first() {
            registry.set_default(model.clone());
        }
    }

    Ok(registry)
}

/// Build a text client for one backend spec.
pub fn build_text_client(
    backend: &BackendSpec,
) -> Result<Arc<dyn TextGenerator>, ProviderBuildError> {
    match backend.kind.to_lowercase().as_str() {
        "openai" | "openrouter" | "local" => {
            let mut config = OpenAiClientConfig {
                timeout_secs: backend.timeout_secs,
                ..Default::default()
            };
            if let Some(endpoint) = &backend.endpoint {
                config.endpoint = endpoint.clone();
            }
            // Local inference servers run unauthenticated.
            if backend.kind.to_lowercase() != "local" {
                config.api_key = Some(resolve_api_key(backend)?);
            }
            let client = OpenAiTextClient::new(config)
                .map_err(|e| ProviderBuildError::Init(e.to_string()))?;
            Ok(Arc::new(client))
        }
        "gemini" => {
            let mut config = GeminiClientConfig {
                api_key: resolve_api_key(backend)?,
                timeout_secs: backend.timeout_secs,
                ..Default::default()
            };
            if let Some(endpoint) = &backend.endpoint {
                config.endpoint = endpoint.clone();
            }
            let client = GeminiTextClient::new(config)
                .map_err(|e| ProviderBuildError::Init(e.to_string()))?;
            Ok(Arc::new(client))
        }
        other => Err(ProviderBuildError::UnknownKind(other.to_string())),
    }
}

/// Build the cover image client from the configured image backend.
///
/// Returns `None` when no image backend is configured; the pipeline
/// then skips cover generation.
pub fn build_image_client(
    config: &ProvidersConfig,
) -> Result<Option<Arc<dyn ImageGenerator>>, ProviderBuildError> {
    let Some(name) = &config.image_backend else {
        return Ok(None);
    };
    let backend = config
        .get_backend(name)
        .ok_or_else(|| ProviderBuildError::BackendNotFound(name.clone()))?;

    match backend.kind.to_lowercase().as_str() {
        "openai" => {
            let mut image_config = ImageClientConfig {
                api_key: Some(resolve_api_key(backend)?),
                timeout_secs: backend.timeout_secs,
                ..Default::default()
            };
            if let Some(endpoint) = &backend.endpoint {
                image_config.endpoint = endpoint.clone();
            }
            if let Some(model) = backend.models.first() {
                image_config.model = model.clone();
            }
            let client = OpenAiImageClient::new(image_config)
                .map_err(|e| ProviderBuildError::Init(e.to_string()))?;
            Ok(Some(Arc::new(client)))
        }
        other => Err(ProviderBuildError::UnknownKind(other.to_string())),
    }
}

fn resolve_api_key(spec: &BackendSpec) -> Result<String, ProviderBuildError> {
    let env_name = spec
        .api_key_env
        .as_ref()
        .ok_or_else(|| ProviderBuildError::MissingApiKey(spec.name.clone()))?;
    std::env::var(env_name).map_err(|_| ProviderBuildError::EnvNotFound(env_name.clone()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_backend(kind: &str) -> BackendSpec {
        BackendSpec {
            name: "test".to_string(),
            kind: kind.to_string(),
            endpoint: None,
            api_key_env: Some("FOLIO_TEST_API_KEY".to_string()),
            models: vec!["test-model".to_string()],
            timeout_secs: 30,
        }
    }

    #[test]
    fn test_unknown_kind() {
        let backend = make_backend("not-a-real-backend-kind");
        std::env::set_var("FOLIO_TEST_API_KEY", "dummy");
        let result = build_text_client(&backend);
        std::env::remove_var("FOLIO_TEST_API_KEY");
        assert!(matches!(result, Err(ProviderBuildError::UnknownKind(_))));
    }

    #[test]
    fn test_missing_env_var() {
        let mut backend = make_backend("openai");
        backend.api_key_env = Some("FOLIO_DEFINITELY_UNSET_KEY".to_string());
        let result = build_text_client(&backend);
        assert!(matches!(result, Err(ProviderBuildError::EnvNotFound(_))));
    }

    #[test]
    fn test_local_backend_needs_no_key() {
        let mut backend = make_backend("local");
        backend.api_key_env = None;
        backend.endpoint = Some("http://localhost:8080/v1/chat/completions".to_string());
        assert!(build_text_client(&backend).is_ok());
    }

    #[test]
    fn test_registry_covers_all_backend_models() {
        let mut backend = make_backend("local");
        backend.api_key_env = None;
        backend.models = vec!["model-a".to_string(), "model-b".to_string()];
        let config = ProvidersConfig {
            backends: vec![backend],
            default_backend: Some("test".to_string()),
            image_backend: None,
        };

        let registry = build_registry(&config).unwrap();
        assert!(registry.resolve("model-a").is_ok());
        assert!(registry.resolve("model-b").is_ok());
        assert!(registry.resolve_default().is_ok());
    }

    #[test]
    fn test_no_image_backend_is_not_an_error() {
        let config = ProvidersConfig::default();
        assert!(build_image_client(&config).unwrap().is_none());
    }
}
