//! Store abstractions
//!
//! The pipeline persists through these traits; implementations are in
//! the folio-stores crate (in-memory for dev/tests, Redis for
//! production).

use async_trait::async_trait;
use thiserror::Error;

use crate::types::{
    BibliographyConfig, BibliographyReference, CoverAssets, GeneratedChapter, RunProgress,
};

/// Store error types
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("item not found: {0}")]
    NotFound(String),
    #[error("serialization error: {0}")]
    Serialization(String),
    #[error("connection error: {0}")]
    Connection(String),
    #[error("internal error: {0}")]
    Internal(String),
}

/// Lifecycle status persisted on the book record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BookStatus {
    Generating,
    Completed,
    Failed,
    Cancelled,
}

/// Partial update applied to a book record. `None` fields are left
/// untouched.
#[derive(Debug, Clone, Default)]
pub struct BookUpdate {
    pub status: Option<BookStatus>,
    pub word_count: Option<u64>,
    pub page_count: Option<u64>,
    pub chapter_count: Option<u32>,
    pub cover_url: Option<String>,
    pub back_cover_url: Option<String>,
    pub error_message: Option<String>,
}

impl BookUpdate {
    pub fn status(status: BookStatus) -> Self {
        Self {
            status: Some(status),
            ..Self::default()
        }
    }

    pub fn with_error(mut self, message: impl Into<String>) -> Self {
        self.error_message = Some(message.into());
        self
    }
}

/// Persistence gateway for books, chapters, and bibliography entries.
#[async_trait]
pub trait BookStore: Send + Sync {
    /// Persist a batch of chapters, upserting by chapter number so
    /// re-running a step is idempotent.
    async fn create_chapters(
        &self,
        book_id: &str,
        chapters: &[GeneratedChapter],
    ) -> Result<(), StoreError>;

    /// Fetch all persisted chapters for a book, ordered by number
    async fn get_chapters(&self, book_id: &str) -> Result<Vec<GeneratedChapter>, StoreError>;

    /// Apply a partial update to the book record
    async fn update_book(&self, book_id: &str, update: BookUpdate) -> Result<(), StoreError>;

    /// Read the cover URLs on the book record, empty when none exist.
    /// The run result reports covers from here so a resumed run stays
    /// truthful about assets an earlier execution produced.
    async fn get_cover_assets(&self, book_id: &str) -> Result<CoverAssets, StoreError>;

    /// Upsert the per-book bibliography settings
    async fn upsert_bibliography_config(
        &self,
        book_id: &str,
        config: &BibliographyConfig,
    ) -> Result<(), StoreError>;

    /// Persist a single bibliography reference
    async fn create_reference(
        &self,
        book_id: &str,
        reference: &BibliographyReference,
    ) -> Result<(), StoreError>;
}

/// Run progress persistence, polled by the UI layer by book id.
#[async_trait]
pub trait ProgressStore: Send + Sync {
    async fn save(&self, progress: &RunProgress) -> Result<(), StoreError>;
    async fn load(&self, book_id: &str) -> Result<Option<RunProgress>, StoreError>;
    async fn delete(&self, book_id: &str) -> Result<bool, StoreError>;
}
