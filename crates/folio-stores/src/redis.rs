//! Redis store implementations for production persistence.

use async_trait::async_trait;
use redis::AsyncCommands;

use folio_core::store::{BookStore, BookUpdate, ProgressStore, StoreError};
use folio_core::types::{
    BibliographyConfig, BibliographyReference, CoverAssets, GeneratedChapter, RunProgress,
};

use crate::BookRecord;

/// Redis-backed book store.
///
/// Chapters are stored in a per-book hash keyed by chapter number, so
/// re-persisting a batch overwrites the same fields.
pub struct RedisBookStore {
    client: redis::Client,
    key_prefix: String,
}

impl RedisBookStore {
    /// Create a new Redis book store from a connection URL.
    pub fn new(connection_url: &str, key_prefix: impl Into<String>) -> Result<Self, StoreError> {
        let client = redis::Client::open(connection_url)
            .map_err(|e| StoreError::Connection(e.to_string()))?;
        Ok(Self {
            client,
            key_prefix: key_prefix.into(),
        })
    }

    fn book_key(&self, book_id: &str) -> String {
        format!("{}:book:{}", self.key_prefix, book_id)
    }

    fn chapters_key(&self, book_id: &str) -> String {
        format!("{}:chapters:{}", self.key_prefix, book_id)
    }

    fn bibliography_config_key(&self, book_id: &str) -> String {
        format!("{}:bibcfg:{}", self.key_prefix, book_id)
    }

    fn references_key(&self, book_id: &str) -> String {
        format!("{}:refs:{}", self.key_prefix, book_id)
    }

    async fn connection(&self) -> Result<redis::aio::MultiplexedConnection, StoreError> {
        self.client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| StoreError::Connection(e.to_string()))
    }

    async fn load_record(&self, book_id: &str) -> Result<BookRecord, StoreError> {
        let mut conn = self.connection().await?;
        let payload: Option<String> = conn
            .get(self.book_key(book_id))
            .await
            .map_err(|e| StoreError::Connection(e.to_string()))?;
        payload
            .map(|s| serde_json::from_str(&s).map_err(|e| StoreError::Serialization(e.to_string())))
            .transpose()
            .map(Option::unwrap_or_default)
    }
}

#[async_trait]
impl BookStore for RedisBookStore {
    async fn create_chapters(
        &self,
        book_id: &str,
        chapters: &[GeneratedChapter],
    ) -> Result<(), StoreError> {
        let mut conn = self.connection().await?;
        let key = self.chapters_key(book_id);
        for chapter in chapters {
            let payload = serde_json::to_string(chapter)
                .map_err(|e| StoreError::Serialization(e.to_string()))?;
            conn.hset::<_, _, _, ()>(&key, chapter.number, payload)
                .await
                .map_err(|e| StoreError::Connection(e.to_string()))?;
        }
        Ok(())
    }

    async fn get_chapters(&self, book_id: &str) -> Result<Vec<GeneratedChapter>, StoreError> {
        let mut conn = self.connection().await?;
        let entries: Vec<(u32, String)> = conn
            .hgetall(self.chapters_key(book_id))
            .await
            .map_err(|e| StoreError::Connection(e.to_string()))?;

        let mut chapters = Vec::with_capacity(entries.len());
        for (_, payload) in entries {
            let chapter: GeneratedChapter = serde_json::from_str(&payload)
                .map_err(|e| StoreError::Serialization(e.to_string()))?;
            chapters.push(chapter);
        }
        chapters.sort_by_key(|c| c.number);
        Ok(chapters)
    }

    async fn update_book(&self, book_id: &str, update: BookUpdate) -> Result<(), StoreError> {
        let mut record = self.load_record(book_id).await?;
        record.apply(update);
        let payload =
            serde_json::to_string(&record).map_err(|e| StoreError::Serialization(e.to_string()))?;
        let mut conn = self.connection().await?;
        conn.set::<_, _, ()>(self.book_key(book_id), payload)
            .await
            .map_err(|e| StoreError::Connection(e.to_string()))
    }

    async fn get_cover_assets(&self, book_id: &str) -> Result<CoverAssets, StoreError> {
        let record = self.load_record(book_id).await?;
        Ok(CoverAssets {
            front_url: record.cover_url,
            back_url: record.back_cover_url,
        })
    }

    async fn upsert_bibliography_config(
        &self,
        book_id: &str,
        config: &BibliographyConfig,
    ) -> Result<(), StoreError> {
        let payload =
            serde_json::to_string(config).map_err(|e| StoreError::Serialization(e.to_string()))?;
        let mut conn = self.connection().await?;
        conn.set::<_, _, ()>(self.bibliography_config_key(book_id), payload)
            .await
            .map_err(|e| StoreError::Connection(e.to_string()))
    }

    async fn create_reference(
        &self,
        book_id: &str,
        reference: &BibliographyReference,
    ) -> Result<(), StoreError> {
        let payload = serde_json::to_string(reference)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;
        let mut conn = self.connection().await?;
        conn.rpush::<_, _, ()>(self.references_key(book_id), payload)
            .await
            .map_err(|e| StoreError::Connection(e.to_string()))
    }
}

/// Redis-backed progress store, one entry per book id.
pub struct RedisProgressStore {
    client: redis::Client,
    key_prefix: String,
}

impl RedisProgressStore {
    /// Create a new Redis progress store from a connection URL.
    pub fn new(connection_url: &str, key_prefix: impl Into<String>) -> Result<Self, StoreError> {
        let client = redis::Client::open(connection_url)
            .map_err(|e| StoreError::Connection(e.to_string()))?;
        Ok(Self {
            client,
            key_prefix: key_prefix.into(),
        })
    }

    fn progress_key(&self, book_id: &str) -> String {
        format!("{}:progress:{}", self.key_prefix, book_id)
    }

    async fn connection(&self) -> Result<redis::aio::MultiplexedConnection, StoreError> {
        self.client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| StoreError::Connection(e.to_string()))
    }
}

#[async_trait]
impl ProgressStore for RedisProgressStore {
    async fn save(&self, progress: &RunProgress) -> Result<(), StoreError> {
        let payload = serde_json::to_string(progress)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;
        let mut conn = self.connection().await?;
        conn.set::<_, _, ()>(self.progress_key(&progress.book_id), payload)
            .await
            .map_err(|e| StoreError::Connection(e.to_string()))
    }

    async fn load(&self, book_id: &str) -> Result<Option<RunProgress>, StoreError> {
        let mut conn = self.connection().await?;
        let payload: Option<String> = conn
            .get(self.progress_key(book_id))
            .await
            .map_err(|e| StoreError::Connection(e.to_string()))?;
        payload
            .map(|s| serde_json::from_str(&s).map_err(|e| StoreError::Serialization(e.to_string())))
            .transpose()
    }

    async fn delete(&self, book_id: &str) -> Result<bool, StoreError> {
        let mut conn = self.connection().await?;
        let deleted: u64 = conn
            .del(self.progress_key(book_id))
            .await
            .map_err(|e| StoreError::Connection(e.to_string()))?;
        Ok(deleted > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keys_are_namespaced() {
        let store = RedisBookStore::new("redis://127.0.0.1/", "folio").unwrap();
        assert_eq!(store.book_key("b1"), "folio:book:b1");
        assert_eq!(store.chapters_key("b1"), "folio:chapters:b1");
        assert_eq!(store.references_key("b1"), "folio:refs:b1");
    }

    #[tokio::test]
    #[ignore = "requires a running Redis instance"]
    async fn test_live_progress_round_trip() {
        let store = RedisProgressStore::new("redis://127.0.0.1/", "folio-test").unwrap();
        let progress = RunProgress::new("redis-book", 3);
        store.save(&progress).await.unwrap();

        let loaded = store.load("redis-book").await.unwrap().unwrap();
        assert_eq!(loaded.total_chapters, 3);
        assert!(store.delete("redis-book").await.unwrap());
    }
}
