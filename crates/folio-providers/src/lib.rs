//! # Folio Providers
//!
//! Concrete adapters behind the provider traits in `folio-core`:
//! - OpenAI-compatible chat completions (`openai`)
//! - Google Gemini (`gemini`)
//! - OpenAI-style image generation for covers (`image`)
//! - config-driven factory wiring backends into a `ModelRegistry`
//! - in-memory mocks for tests (`mock`)

pub mod factory;
pub mod gemini;
pub mod image;
pub mod mock;
pub mod openai;

pub use factory::{
    build_image_client, build_registry, build_text_client, ProviderBuildError,
};
pub use gemini::{GeminiClientConfig, GeminiTextClient};
pub use image::{build_cover_prompt, ImageClientConfig, OpenAiImageClient};
pub use mock::{MockImageGenerator, MockTextGenerator};
pub use openai::{OpenAiClientConfig, OpenAiTextClient};
