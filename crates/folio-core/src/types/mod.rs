//! Domain types for the generation pipeline

mod bibliography;
mod chapter;
mod config;
mod cover;
mod outline;
mod progress;

pub use bibliography::{BibliographyConfig, BibliographyReference, ReferenceKind};
pub use chapter::{
    count_words, estimate_pages, sanitize_content, GeneratedChapter, WORDS_PER_PAGE,
};
pub use config::{CitationStyle, ConfigValidationError, ExecutionMode, GenerationConfig};
pub use cover::{CoverAssets, CoverStyle, RunResult};
pub use outline::{ChapterSpec, Outline, OutlineError};
pub use progress::{RunProgress, Stage};
