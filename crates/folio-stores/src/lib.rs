//! # Folio Stores
//!
//! Implementations of the `BookStore` and `ProgressStore` traits from
//! `folio-core`: an in-memory pair for development and tests, and a
//! Redis pair for production.

pub mod memory;
pub mod redis;

pub use memory::{InMemoryBookStore, InMemoryProgressStore};
pub use redis::{RedisBookStore, RedisProgressStore};

use serde::{Deserialize, Serialize};

use folio_core::store::{BookStatus, BookUpdate};

/// Persisted book record, mutated through partial `BookUpdate`s.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BookRecord {
    pub status: Option<BookStatus>,
    pub word_count: Option<u64>,
    pub page_count: Option<u64>,
    pub chapter_count: Option<u32>,
    pub cover_url: Option<String>,
    pub back_cover_url: Option<String>,
    pub error_message: Option<String>,
}

impl BookRecord {
    /// Apply a partial update; `None` fields leave the record alone.
    pub fn apply(&mut self, update: BookUpdate) {
        if let Some(status) = update.status {
            self.status = Some(status);
        }
        if let Some(word_count) = update.word_count {
            self.word_count = Some(word_count);
        }
        if let Some(page_count) = update.page_count {
            self.page_count = Some(page_count);
        }
        if let Some(chapter_count) = update.chapter_count {
            self.chapter_count = Some(chapter_count);
        }
        if let Some(cover_url) = update.cover_url {
            self.cover_url = Some(cover_url);
        }
        if let Some(back_cover_url) = update.back_cover_url {
            self.back_cover_url = Some(back_cover_url);
        }
        if let Some(error_message) = update.error_message {
            self.error_message = Some(error_message);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_apply_leaves_unset_fields_alone() {
        let mut record = BookRecord::default();
        record.apply(BookUpdate::status(BookStatus::Generating));
        record.apply(BookUpdate {
            cover_url: Some("https://assets.example.com/cover.png".to_string()),
            ..BookUpdate::default()
        });

        assert_eq!(record.status, Some(BookStatus::Generating));
        assert!(record.cover_url.is_some());
        assert!(record.word_count.is_none());
    }
}
