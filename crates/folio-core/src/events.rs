//! Pipeline trigger and lifecycle events

use serde::{Deserialize, Serialize};

use crate::types::{GenerationConfig, Outline};

/// Trigger event consumed by the orchestrator to start a run.
///
/// The surface that emits this event has already checked that
/// `user_id` owns `book_id`; the pipeline carries the owner for log
/// correlation only and never re-checks it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationRequested {
    pub book_id: String,
    pub user_id: String,
    pub outline: Outline,
    pub config: GenerationConfig,
}

/// Informational event produced when a run reaches Complete.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationCompleted {
    pub book_id: String,
    pub total_chapters: u32,
    pub total_words: u64,
}

/// Cancellation event, matched against the active run's book id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationCancelled {
    pub book_id: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ChapterSpec, ExecutionMode};

    #[test]
    fn test_trigger_event_round_trips() {
        let event = GenerationRequested {
            book_id: "book-1".to_string(),
            user_id: "user-1".to_string(),
            outline: Outline {
                title: "The Silent Harbor".to_string(),
                author: "R. Calloway".to_string(),
                genre: "mystery".to_string(),
                description: "A harbor town keeps its secrets.".to_string(),
                chapters: vec![ChapterSpec::new(1, "Arrival", "The detective arrives.")],
                themes: vec!["isolation".to_string()],
                characters: Vec::new(),
            },
            config: GenerationConfig::new("gpt-4o-mini", ExecutionMode::Sequential),
        };

        let json = serde_json::to_string(&event).unwrap();
        let back: GenerationRequested = serde_json::from_str(&json).unwrap();
        assert_eq!(back.book_id, "book-1");
        assert_eq!(back.outline.chapters.len(), 1);
        assert_eq!(back.config.mode, ExecutionMode::Sequential);
    }
}
