//! Configuration loading and validation.

use std::fs;
use std::path::Path;

use thiserror::Error;

use crate::{FolioConfig, ProvidersConfig};

/// Configuration loading errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("YAML parse error: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("Invalid config: {0}")]
    Invalid(String),
}

/// Load full Folio configuration from a YAML file.
pub fn load_config(path: &Path) -> Result<FolioConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    let config: FolioConfig = serde_yaml::from_str(&content)?;
    validate_config(&config)?;
    Ok(config)
}

fn validate_config(config: &FolioConfig) -> Result<(), ConfigError> {
    if config.version == 0 {
        return Err(ConfigError::Invalid(
            "version must be greater than 0".to_string(),
        ));
    }

    if config.app.name.trim().is_empty() {
        return Err(ConfigError::Invalid(
            "app.name must not be empty".to_string(),
        ));
    }

    if config.generation.batch_size == 0 {
        return Err(ConfigError::Invalid(
            "generation.batch_size must be > 0".to_string(),
        ));
    }

    if config.generation.context_excerpt_chars == 0 {
        return Err(ConfigError::Invalid(
            "generation.context_excerpt_chars must be > 0".to_string(),
        ));
    }

    if config.generation.retry_max_delay_ms < config.generation.retry_base_delay_ms {
        return Err(ConfigError::Invalid(
            "generation.retry_max_delay_ms must be >= retry_base_delay_ms".to_string(),
        ));
    }

    validate_providers(&config.providers)?;

    for (label, spec) in [
        ("stores.book", &config.stores.book),
        ("stores.progress", &config.stores.progress),
    ] {
        match spec.backend.as_str() {
            "in_memory" => {}
            "redis" => {
                if spec.connection_url.is_none() {
                    return Err(ConfigError::Invalid(format!(
                        "{}.connection_url required for redis backend",
                        label
                    )));
                }
            }
            other => {
                return Err(ConfigError::Invalid(format!(
                    "{}.backend '{}' is not supported",
                    label, other
                )));
            }
        }
    }

    Ok(())
}

fn validate_providers(config: &ProvidersConfig) -> Result<(), ConfigError> {
    for backend in &config.backends {
        if backend.name.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "providers.backends[].name must not be empty".to_string(),
            ));
        }
        if backend.kind.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "providers.backends[].kind must not be empty".to_string(),
            ));
        }
    }

    if let Some(default_backend) = &config.default_backend {
        if config.get_backend(default_backend).is_none() {
            return Err(ConfigError::Invalid(format!(
                "providers.default_backend '{}' not found",
                default_backend
            )));
        }
    }

    if let Some(image_backend) = &config.image_backend {
        if config.get_backend(image_backend).is_none() {
            return Err(ConfigError::Invalid(format!(
                "providers.image_backend '{}' not found",
                image_backend
            )));
        }
    }

    Ok(())
}
