//! Cancellation registry.
//!
//! One token per active run, keyed by book id. Cancellation is
//! cooperative: the orchestrator checks the token between durable
//! steps and never interrupts a step in flight.

use std::collections::HashMap;

use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;

/// Registry of cancellation tokens for active runs.
#[derive(Default)]
pub struct CancellationRegistry {
    tokens: RwLock<HashMap<String, CancellationToken>>,
}

impl CancellationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a token for a run, replacing any stale entry.
    pub async fn register(&self, book_id: &str) -> CancellationToken {
        let token = CancellationToken::new();
        let mut tokens = self.tokens.write().await;
        tokens.insert(book_id.to_string(), token.clone());
        token
    }

    /// Cancel the active run for a book. Returns false when no run is
    /// registered under that id.
    pub async fn cancel(&self, book_id: &str) -> bool {
        let tokens = self.tokens.read().await;
        match tokens.get(book_id) {
            Some(token) => {
                token.cancel();
                true
            }
            None => false,
        }
    }

    /// Drop the token once its run reaches a terminal stage.
    pub async fn remove(&self, book_id: &str) {
        let mut tokens = self.tokens.write().await;
        tokens.remove(book_id);
    }

    /// Whether a run is currently registered for this book.
    pub async fn is_active(&self, book_id: &str) -> bool {
        let tokens = self.tokens.read().await;
        tokens.contains_key(book_id)
    }
}
