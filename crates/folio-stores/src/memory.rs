//! In-memory store implementations for development and testing.

use std::collections::{BTreeMap, HashMap};
use std::sync::RwLock;

use async_trait::async_trait;

use folio_core::store::{BookStore, BookUpdate, ProgressStore, StoreError};
use folio_core::types::{
    BibliographyConfig, BibliographyReference, CoverAssets, GeneratedChapter, RunProgress,
};

use crate::BookRecord;

/// In-memory book store.
///
/// Chapters live in a per-book `BTreeMap` keyed by chapter number, so
/// re-persisting a batch overwrites rather than duplicates and reads
/// come back ordered.
pub struct InMemoryBookStore {
    books: RwLock<HashMap<String, BookRecord>>,
    chapters: RwLock<HashMap<String, BTreeMap<u32, GeneratedChapter>>>,
    bibliography_configs: RwLock<HashMap<String, BibliographyConfig>>,
    references: RwLock<HashMap<String, Vec<BibliographyReference>>>,
}

impl InMemoryBookStore {
    /// Create a new in-memory store
    pub fn new() -> Self {
        Self {
            books: RwLock::new(HashMap::new()),
            chapters: RwLock::new(HashMap::new()),
            bibliography_configs: RwLock::new(HashMap::new()),
            references: RwLock::new(HashMap::new()),
        }
    }

    /// Snapshot of the book record, for inspection in tests and UIs.
    pub fn get_book(&self, book_id: &str) -> Option<BookRecord> {
        self.books
            .read()
            .ok()
            .and_then(|books| books.get(book_id).cloned())
    }

    /// Snapshot of the persisted bibliography references.
    pub fn get_references(&self, book_id: &str) -> Vec<BibliographyReference> {
        self.references
            .read()
            .ok()
            .and_then(|refs| refs.get(book_id).cloned())
            .unwrap_or_default()
    }

    /// Snapshot of the persisted bibliography config.
    pub fn get_bibliography_config(&self, book_id: &str) -> Option<BibliographyConfig> {
        self.bibliography_configs
            .read()
            .ok()
            .and_then(|configs| configs.get(book_id).cloned())
    }
}

impl Default for InMemoryBookStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BookStore for InMemoryBookStore {
    async fn create_chapters(
        &self,
        book_id: &str,
        chapters: &[GeneratedChapter],
    ) -> Result<(), StoreError> {
        let mut map = self
            .chapters
            .write()
            .map_err(|e| StoreError::Internal(e.to_string()))?;
        let book_chapters = map.entry(book_id.to_string()).or_default();
        for chapter in chapters {
            book_chapters.insert(chapter.number, chapter.clone());
        }
        Ok(())
    }

    async fn get_chapters(&self, book_id: &str) -> Result<Vec<GeneratedChapter>, StoreError> {
        let map = self
            .chapters
            .read()
            .map_err(|e| StoreError::Internal(e.to_string()))?;
        Ok(map
            .get(book_id)
            .map(|chapters| chapters.values().cloned().collect())
            .unwrap_or_default())
    }

    async fn update_book(&self, book_id: &str, update: BookUpdate) -> Result<(), StoreError> {
        let mut books = self
            .books
            .write()
            .map_err(|e| StoreError::Internal(e.to_string()))?;
        let record = books.entry(book_id.to_string()).or_default();
        record.apply(update);
        Ok(())
    }

    async fn get_cover_assets(&self, book_id: &str) -> Result<CoverAssets, StoreError> {
        let books = self
            .books
            .read()
            .map_err(|e| StoreError::Internal(e.to_string()))?;
        Ok(books
            .get(book_id)
            .map(|record| CoverAssets {
                front_url: record.cover_url.clone(),
                back_url: record.back_cover_url.clone(),
            })
            .unwrap_or_default())
    }

    async fn upsert_bibliography_config(
        &self,
        book_id: &str,
        config: &BibliographyConfig,
    ) -> Result<(), StoreError> {
        let mut configs = self
            .bibliography_configs
            .write()
            .map_err(|e| StoreError::Internal(e.to_string()))?;
        configs.insert(book_id.to_string(), config.clone());
        Ok(())
    }

    async fn create_reference(
        &self,
        book_id: &str,
        reference: &BibliographyReference,
    ) -> Result<(), StoreError> {
        let mut refs = self
            .references
            .write()
            .map_err(|e| StoreError::Internal(e.to_string()))?;
        refs.entry(book_id.to_string())
            .or_default()
            .push(reference.clone());
        Ok(())
    }
}

/// In-memory progress store keyed by book id.
pub struct InMemoryProgressStore {
    runs: RwLock<HashMap<String, RunProgress>>,
}

impl InMemoryProgressStore {
    /// Create a new in-memory progress store
    pub fn new() -> Self {
        Self {
            runs: RwLock::new(HashMap::new()),
        }
    }
}

impl Default for InMemoryProgressStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ProgressStore for InMemoryProgressStore {
    async fn save(&self, progress: &RunProgress) -> Result<(), StoreError> {
        let mut runs = self
            .runs
            .write()
            .map_err(|e| StoreError::Internal(e.to_string()))?;
        runs.insert(progress.book_id.clone(), progress.clone());
        Ok(())
    }

    async fn load(&self, book_id: &str) -> Result<Option<RunProgress>, StoreError> {
        let runs = self
            .runs
            .read()
            .map_err(|e| StoreError::Internal(e.to_string()))?;
        Ok(runs.get(book_id).cloned())
    }

    async fn delete(&self, book_id: &str) -> Result<bool, StoreError> {
        let mut runs = self
            .runs
            .write()
            .map_err(|e| StoreError::Internal(e.to_string()))?;
        Ok(runs.remove(book_id).is_some())
    }
}
