//! Continuity context builder
//!
//! Folds already-generated chapters into a bounded prompt context so
//! later chapters stay coherent without unbounded prompt growth.
//! Deterministic given the same input list; no external calls.

use crate::types::GeneratedChapter;

/// Default number of most-recent chapters included in the context.
pub const DEFAULT_RECENT_CHAPTERS: usize = 2;
/// Default per-chapter excerpt budget in characters.
pub const DEFAULT_EXCERPT_CHARS: usize = 1_500;

/// Builds the bounded continuity summary fed into chapter prompts.
#[derive(Debug, Clone)]
pub struct ContextBuilder {
    /// How many trailing chapters to include
    pub recent_chapters: usize,
    /// Character budget per included chapter excerpt
    pub excerpt_chars: usize,
}

impl Default for ContextBuilder {
    fn default() -> Self {
        Self {
            recent_chapters: DEFAULT_RECENT_CHAPTERS,
            excerpt_chars: DEFAULT_EXCERPT_CHARS,
        }
    }
}

impl ContextBuilder {
    pub fn new(recent_chapters: usize, excerpt_chars: usize) -> Self {
        Self {
            recent_chapters,
            excerpt_chars,
        }
    }

    /// Build the context string from chapters generated so far.
    ///
    /// Returns an empty string for the first batch.
    pub fn build(&self, chapters: &[GeneratedChapter]) -> String {
        if chapters.is_empty() || self.recent_chapters == 0 {
            return String::new();
        }

        let start = chapters.len().saturating_sub(self.recent_chapters);
        let mut out = String::new();
        for chapter in &chapters[start..] {
            if !out.is_empty() {
                out.push_str("\n\n");
            }
            out.push_str(&format!(
                "Chapter {} — {}:\n{}",
                chapter.number,
                chapter.title,
                excerpt(&chapter.content, self.excerpt_chars)
            ));
        }
        out
    }
}

/// Take the trailing `max_chars` of the content, ellipsized, so the
/// excerpt ends where the narrative currently ends.
fn excerpt(content: &str, max_chars: usize) -> String {
    let chars: Vec<char> = content.chars().collect();
    if chars.len() <= max_chars {
        return content.to_string();
    }
    let tail: String = chars[chars.len() - max_chars..].iter().collect();
    format!("…{}", tail.trim_start())
}
