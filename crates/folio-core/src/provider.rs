//! Provider abstractions
//!
//! This module defines the capability traits the pipeline calls:
//! - TextGenerator: one prompt in, generated text out
//! - ImageGenerator: book metadata in, cover asset URL out
//! - ModelRegistry: model identifier -> concrete TextGenerator
//!
//! Adapters live in the folio-providers crate. Clients carry no retry
//! logic of their own; retry belongs to the orchestrator step.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use crate::types::CoverStyle;

/// Provider errors
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("http error: {0}")]
    Http(String),
    #[error("response error: {0}")]
    Response(String),
    #[error("serialization error: {0}")]
    Serialization(String),
    #[error("unknown model: {0}")]
    UnknownModel(String),
}

impl ProviderError {
    /// Whether the orchestrator step may retry after this error.
    ///
    /// An unknown model is a caller contract violation and retrying
    /// it can never succeed.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, ProviderError::UnknownModel(_))
    }
}

/// Text generation request payload
#[derive(Debug, Clone)]
pub struct TextRequest {
    pub system: String,
    pub user: String,
    pub model: String,
    pub temperature: f32,
}

/// Text generation capability
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, request: TextRequest) -> Result<String, ProviderError>;
}

#[async_trait]
impl TextGenerator for Arc<dyn TextGenerator> {
    async fn generate(&self, request: TextRequest) -> Result<String, ProviderError> {
        (**self).generate(request).await
    }
}

/// Input for a cover generation call
#[derive(Debug, Clone)]
pub struct CoverSpec {
    pub title: String,
    pub author: String,
    pub genre: String,
    pub description: String,
    pub style: CoverStyle,
}

/// Cover image generation capability
#[async_trait]
pub trait ImageGenerator: Send + Sync {
    /// Generate a cover asset and return its URL
    async fn generate_cover(&self, spec: &CoverSpec) -> Result<String, ProviderError>;
}

/// Registry mapping model identifiers to concrete provider adapters.
///
/// Adding a vendor means registering another adapter, not branching
/// pipeline logic.
#[derive(Default)]
pub struct ModelRegistry {
    generators: HashMap<String, Arc<dyn TextGenerator>>,
    default_model: Option<String>,
}

impl ModelRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a generator for a model identifier
    pub fn register(&mut self, model: impl Into<String>, generator: Arc<dyn TextGenerator>) {
        let model = model.into();
        if self.default_model.is_none() {
            self.default_model = Some(model.clone());
        }
        self.generators.insert(model, generator);
    }

    /// Set the fallback model used when resolution falls through
    pub fn set_default(&mut self, model: impl Into<String>) {
        self.default_model = Some(model.into());
    }

    /// Resolve a model identifier to its adapter
    pub fn resolve(&self, model: &str) -> Result<Arc<dyn TextGenerator>, ProviderError> {
        self.generators
            .get(model)
            .cloned()
            .ok_or_else(|| ProviderError::UnknownModel(model.to_string()))
    }

    /// Resolve the configured default model
    pub fn resolve_default(&self) -> Result<Arc<dyn TextGenerator>, ProviderError> {
        let model = self
            .default_model
            .as_deref()
            .ok_or_else(|| ProviderError::UnknownModel("<no default model>".to_string()))?;
        self.resolve(model)
    }

    /// Registered model identifiers
    pub fn models(&self) -> Vec<String> {
        self.generators.keys().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct StaticGenerator(String);

    #[async_trait]
    impl TextGenerator for StaticGenerator {
        async fn generate(&self, _request: TextRequest) -> Result<String, ProviderError> {
            Ok(self.0.clone())
        }
    }

    #[test]
    fn test_registry_resolves_registered_model() {
        let mut registry = ModelRegistry::new();
        registry.register("gpt-4o-mini", Arc::new(StaticGenerator("ok".to_string())));
        assert!(registry.resolve("gpt-4o-mini").is_ok());
    }

    #[test]
    fn test_registry_unknown_model_errors() {
        let registry = ModelRegistry::new();
        assert!(matches!(
            registry.resolve("missing"),
            Err(ProviderError::UnknownModel(_))
        ));
    }

    #[test]
    fn test_first_registration_becomes_default() {
        let mut registry = ModelRegistry::new();
        registry.register("first", Arc::new(StaticGenerator("a".to_string())));
        registry.register("second", Arc::new(StaticGenerator("b".to_string())));
        assert!(registry.resolve_default().is_ok());
        assert_eq!(registry.models().len(), 2);
    }

    #[test]
    fn test_unknown_model_is_not_retryable() {
        assert!(!ProviderError::UnknownModel("x".to_string()).is_retryable());
        assert!(ProviderError::Http("timeout".to_string()).is_retryable());
    }
}
