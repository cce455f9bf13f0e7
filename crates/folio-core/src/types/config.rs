//! Generation run configuration
//!
//! Immutable per run, supplied with the trigger event and validated
//! there rather than at point of use.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Chapter batch execution mode.
///
/// Parallel trades cross-chapter coherence within a batch for
/// throughput; sequential feeds each chapter the one before it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionMode {
    Parallel,
    Sequential,
}

/// Citation style for bibliography generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum CitationStyle {
    #[default]
    Apa,
    Mla,
    Chicago,
    Harvard,
}

impl CitationStyle {
    /// Human-readable label used in prompts
    pub fn label(&self) -> &'static str {
        match self {
            CitationStyle::Apa => "APA",
            CitationStyle::Mla => "MLA",
            CitationStyle::Chicago => "Chicago",
            CitationStyle::Harvard => "Harvard",
        }
    }
}

/// Config validation errors
#[derive(Debug, Error, PartialEq)]
pub enum ConfigValidationError {
    #[error("model identifier must not be empty")]
    MissingModel,
    #[error("temperature {0} outside supported range 0.0..=2.0")]
    TemperatureOutOfRange(f32),
}

/// Per-run generation configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationConfig {
    /// Model identifier for chapter generation, resolved via the registry
    pub model: String,
    /// Batch execution mode
    pub mode: ExecutionMode,
    /// Whether to run the bibliography stage
    #[serde(default)]
    pub bibliography_enabled: bool,
    /// Citation style for the bibliography stage
    #[serde(default)]
    pub citation_style: CitationStyle,
    /// Sampling temperature for chapter calls
    #[serde(default = "default_temperature")]
    pub temperature: f32,
}

fn default_temperature() -> f32 {
    0.7
}

impl GenerationConfig {
    /// Create a config with defaults for the optional fields
    pub fn new(model: impl Into<String>, mode: ExecutionMode) -> Self {
        Self {
            model: model.into(),
            mode,
            bibliography_enabled: false,
            citation_style: CitationStyle::default(),
            temperature: default_temperature(),
        }
    }

    /// Enable the bibliography stage with the given citation style
    pub fn with_bibliography(mut self, style: CitationStyle) -> Self {
        self.bibliography_enabled = true;
        self.citation_style = style;
        self
    }

    /// Validate at trigger time
    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        if self.model.trim().is_empty() {
            return Err(ConfigValidationError::MissingModel);
        }
        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(ConfigValidationError::TemperatureOutOfRange(
                self.temperature,
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_accepts_defaults() {
        let config = GenerationConfig::new("gpt-4o-mini", ExecutionMode::Sequential);
        assert!(config.validate().is_ok());
        assert!(!config.bibliography_enabled);
    }

    #[test]
    fn test_validate_rejects_empty_model() {
        let config = GenerationConfig::new("  ", ExecutionMode::Parallel);
        assert_eq!(config.validate(), Err(ConfigValidationError::MissingModel));
    }

    #[test]
    fn test_validate_rejects_out_of_range_temperature() {
        let mut config = GenerationConfig::new("gpt-4o-mini", ExecutionMode::Parallel);
        config.temperature = 3.5;
        assert!(matches!(
            config.validate(),
            Err(ConfigValidationError::TemperatureOutOfRange(_))
        ));
    }

    #[test]
    fn test_mode_serializes_snake_case() {
        let json = serde_json::to_string(&ExecutionMode::Sequential).unwrap();
        assert_eq!(json, "\"sequential\"");
    }

    #[test]
    fn test_with_bibliography_enables_stage() {
        let config = GenerationConfig::new("gpt-4o-mini", ExecutionMode::Sequential)
            .with_bibliography(CitationStyle::Chicago);
        assert!(config.bibliography_enabled);
        assert_eq!(config.citation_style.label(), "Chicago");
    }
}
