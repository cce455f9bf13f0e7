//! Generated chapter type
//!
//! Word counts are computed from sanitized content here, never trusted
//! from the provider.

use serde::{Deserialize, Serialize};

/// Words assumed per printed page for the page estimate.
pub const WORDS_PER_PAGE: u64 = 275;

/// A single generated chapter, immutable within a run once created.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratedChapter {
    /// 1-based chapter number matching an outline ChapterSpec
    pub number: u32,
    pub title: String,
    pub content: String,
    /// Computed from `content`
    pub word_count: u64,
}

impl GeneratedChapter {
    /// Build a chapter from raw provider output, sanitizing the text
    /// and computing the word count.
    pub fn from_raw(number: u32, title: impl Into<String>, raw: &str) -> Self {
        let title = title.into();
        let content = sanitize_content(raw, &title);
        let word_count = count_words(&content);
        Self {
            number,
            title,
            content,
            word_count,
        }
    }
}

/// Count whitespace-separated words.
pub fn count_words(text: &str) -> u64 {
    text.split_whitespace().count() as u64
}

/// Estimate printed pages from an aggregate word count.
pub fn estimate_pages(total_words: u64) -> u64 {
    total_words.div_ceil(WORDS_PER_PAGE).max(1)
}

/// Clean up raw provider output.
///
/// Providers tend to wrap chapters in markdown fences and echo the
/// chapter heading back; both are stripped. Runs of blank lines are
/// collapsed to one.
pub fn sanitize_content(raw: &str, title: &str) -> String {
    let mut lines: Vec<&str> = raw.trim().lines().collect();

    if lines.first().map(|l| l.trim().starts_with("```")) == Some(true) {
        lines.remove(0);
        if lines.last().map(|l| l.trim() == "```") == Some(true) {
            lines.pop();
        }
    }

    // Drop a leading heading that just repeats the title.
    if let Some(first) = lines.first() {
        let heading = first.trim_start_matches('#').trim();
        if !heading.is_empty()
            && (heading.eq_ignore_ascii_case(title)
                || heading
                    .to_ascii_lowercase()
                    .ends_with(&format!(": {}", title.to_ascii_lowercase())))
        {
            lines.remove(0);
        }
    }

    let mut out = String::new();
    let mut previous_blank = true;
    for line in lines {
        let blank = line.trim().is_empty();
        if blank && previous_blank {
            continue;
        }
        if !out.is_empty() {
            out.push('\n');
        }
        out.push_str(line.trim_end());
        previous_blank = blank;
    }
    out.trim().to_string()
}
