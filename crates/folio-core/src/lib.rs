//! # Folio Core
//!
//! Core abstractions and deterministic logic for the Folio
//! book-generation pipeline.
//!
//! This crate contains:
//! - Outline / GenerationConfig / GeneratedChapter / RunProgress types
//! - TextGenerator / ImageGenerator provider traits and the model registry
//! - BookStore / ProgressStore persistence traits
//! - The continuity context builder
//!
//! This crate does NOT care about:
//! - Which vendor serves a model identifier
//! - Where books are persisted
//! - How runs are scheduled or cancelled

pub mod context;
pub mod events;
pub mod provider;
pub mod store;
pub mod types;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::context::ContextBuilder;
    pub use crate::events::{GenerationCancelled, GenerationCompleted, GenerationRequested};
    pub use crate::provider::{
        CoverSpec, ImageGenerator, ModelRegistry, ProviderError, TextGenerator, TextRequest,
    };
    pub use crate::store::{BookStatus, BookStore, BookUpdate, ProgressStore, StoreError};
    pub use crate::types::{
        BibliographyConfig, BibliographyReference, ChapterSpec, CitationStyle, CoverAssets,
        CoverStyle, ExecutionMode, GeneratedChapter, GenerationConfig, Outline, ReferenceKind,
        RunProgress, RunResult, Stage,
    };
}

// Re-export key types at crate root
pub use context::ContextBuilder;
pub use events::{GenerationCancelled, GenerationCompleted, GenerationRequested};
pub use provider::{
    CoverSpec, ImageGenerator, ModelRegistry, ProviderError, TextGenerator, TextRequest,
};
pub use store::{BookStatus, BookStore, BookUpdate, ProgressStore, StoreError};
pub use types::{
    BibliographyConfig, BibliographyReference, ChapterSpec, CitationStyle, CoverAssets, CoverStyle,
    ExecutionMode, GeneratedChapter, GenerationConfig, Outline, ReferenceKind, RunProgress,
    RunResult, Stage,
};
