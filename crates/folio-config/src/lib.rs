//! # Folio Config
//!
//! Unified single-file configuration management for Folio.
//! A single `folio.yaml` configures generation tunables, provider
//! backends, store backends, and observability settings.

mod loader;

pub use loader::{load_config, ConfigError};

use serde::Deserialize;

/// Top-level configuration schema for Folio.
#[derive(Debug, Clone, Deserialize)]
pub struct FolioConfig {
    /// Config schema version.
    #[serde(default = "default_version")]
    pub version: u32,
    #[serde(default)]
    pub app: AppConfig,
    #[serde(default)]
    pub generation: GenerationDefaults,
    #[serde(default)]
    pub providers: ProvidersConfig,
    #[serde(default)]
    pub stores: StoresConfig,
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

fn default_version() -> u32 {
    1
}

impl Default for FolioConfig {
    fn default() -> Self {
        Self {
            version: default_version(),
            app: AppConfig::default(),
            generation: GenerationDefaults::default(),
            providers: ProvidersConfig::default(),
            stores: StoresConfig::default(),
            observability: ObservabilityConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    #[serde(default = "default_app_name")]
    pub name: String,
    #[serde(default = "default_env")]
    pub environment: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            name: default_app_name(),
            environment: default_env(),
        }
    }
}

fn default_app_name() -> String {
    "folio".to_string()
}

fn default_env() -> String {
    "development".to_string()
}

/// Pipeline tunables. Batch size and context window are fixed per run,
/// not derived from input.
#[derive(Debug, Clone, Deserialize)]
pub struct GenerationDefaults {
    /// Chapters generated per workflow step
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    /// Trailing chapters folded into the continuity context
    #[serde(default = "default_context_chapters")]
    pub context_chapters: usize,
    /// Per-chapter excerpt budget in characters
    #[serde(default = "default_excerpt_chars")]
    pub context_excerpt_chars: usize,
    /// Retries per step after the initial attempt
    #[serde(default = "default_max_retry_attempts")]
    pub max_retry_attempts: u32,
    /// Base delay for exponential step-retry backoff
    #[serde(default = "default_retry_base_delay_ms")]
    pub retry_base_delay_ms: u64,
    /// Cap for step-retry backoff
    #[serde(default = "default_retry_max_delay_ms")]
    pub retry_max_delay_ms: u64,
}

impl Default for GenerationDefaults {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
            context_chapters: default_context_chapters(),
            context_excerpt_chars: default_excerpt_chars(),
            max_retry_attempts: default_max_retry_attempts(),
            retry_base_delay_ms: default_retry_base_delay_ms(),
            retry_max_delay_ms: default_retry_max_delay_ms(),
        }
    }
}

fn default_batch_size() -> usize {
    3
}

fn default_context_chapters() -> usize {
    2
}

fn default_excerpt_chars() -> usize {
    1_500
}

fn default_max_retry_attempts() -> u32 {
    3
}

fn default_retry_base_delay_ms() -> u64 {
    500
}

fn default_retry_max_delay_ms() -> u64 {
    10_000
}

/// Provider backend declarations.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct ProvidersConfig {
    #[serde(default)]
    pub backends: Vec<BackendSpec>,
    /// Backend used when a model id maps to no explicit backend
    #[serde(default)]
    pub default_backend: Option<String>,
    /// Backend used for cover image generation
    #[serde(default)]
    pub image_backend: Option<String>,
}

impl ProvidersConfig {
    pub fn get_backend(&self, name: &str) -> Option<&BackendSpec> {
        self.backends.iter().find(|b| b.name == name)
    }
}

/// One provider backend entry.
#[derive(Debug, Clone, Deserialize)]
pub struct BackendSpec {
    pub name: String,
    /// Adapter kind: "openai", "gemini", ...
    pub kind: String,
    #[serde(default)]
    pub endpoint: Option<String>,
    /// Environment variable holding the API key
    #[serde(default)]
    pub api_key_env: Option<String>,
    /// Model identifiers this backend serves
    #[serde(default)]
    pub models: Vec<String>,
    /// Request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_timeout_secs() -> u64 {
    120
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct StoresConfig {
    #[serde(default)]
    pub book: StoreSpec,
    #[serde(default)]
    pub progress: StoreSpec,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StoreSpec {
    #[serde(default = "default_store_backend")]
    pub backend: String,
    #[serde(default)]
    pub connection_url: Option<String>,
    /// Optional key prefix/namespace used by backend implementations.
    #[serde(default)]
    pub key_prefix: Option<String>,
}

impl Default for StoreSpec {
    fn default() -> Self {
        Self {
            backend: default_store_backend(),
            connection_url: None,
            key_prefix: None,
        }
    }
}

fn default_store_backend() -> String {
    "in_memory".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct ObservabilityConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default)]
    pub log_file: Option<String>,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_file: None,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}
