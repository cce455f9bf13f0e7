//! Outline type definitions
//!
//! The Outline is the structured book plan a generation run consumes.
//! It is immutable once a run starts.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Plan for a single chapter within an outline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChapterSpec {
    /// 1-based chapter number, unique within the outline
    pub number: u32,
    /// Chapter title
    pub title: String,
    /// Short summary used to prompt generation
    pub summary: String,
    /// Target word count for the generated chapter
    #[serde(default = "default_target_words")]
    pub target_words: u32,
}

fn default_target_words() -> u32 {
    2_000
}

impl ChapterSpec {
    /// Create a new chapter spec
    pub fn new(number: u32, title: impl Into<String>, summary: impl Into<String>) -> Self {
        Self {
            number,
            title: title.into(),
            summary: summary.into(),
            target_words: default_target_words(),
        }
    }

    /// Set the target word count
    pub fn with_target_words(mut self, target_words: u32) -> Self {
        self.target_words = target_words;
        self
    }
}

/// Outline validation errors
#[derive(Debug, Error, PartialEq, Eq)]
pub enum OutlineError {
    #[error("outline has no chapters")]
    Empty,
    #[error("outline title must not be empty")]
    MissingTitle,
    #[error("chapter numbers must be contiguous from 1, found {found} at position {position}")]
    NonContiguous { position: usize, found: u32 },
}

/// The structured book plan used as generation input.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Outline {
    pub title: String,
    pub author: String,
    pub genre: String,
    pub description: String,
    /// Ordered chapter plans; numbers must be exactly 1..=len
    pub chapters: Vec<ChapterSpec>,
    #[serde(default)]
    pub themes: Vec<String>,
    #[serde(default)]
    pub characters: Vec<String>,
}

impl Outline {
    /// Total number of chapters in this outline
    pub fn total_chapters(&self) -> u32 {
        self.chapters.len() as u32
    }

    /// Look up a chapter spec by its 1-based number
    pub fn chapter(&self, number: u32) -> Option<&ChapterSpec> {
        self.chapters.iter().find(|c| c.number == number)
    }

    /// Validate structural invariants before a run starts.
    ///
    /// Chapter numbers must be exactly the contiguous set `1..=len`,
    /// in order. Anything else is a caller contract violation.
    pub fn validate(&self) -> Result<(), OutlineError> {
        if self.title.trim().is_empty() {
            return Err(OutlineError::MissingTitle);
        }
        if self.chapters.is_empty() {
            return Err(OutlineError::Empty);
        }
        for (idx, chapter) in self.chapters.iter().enumerate() {
            let expected = idx as u32 + 1;
            if chapter.number != expected {
                return Err(OutlineError::NonContiguous {
                    position: idx,
                    found: chapter.number,
                });
            }
        }
        Ok(())
    }
}
