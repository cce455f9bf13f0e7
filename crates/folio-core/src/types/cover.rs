//! Cover asset types

use serde::{Deserialize, Serialize};

/// Which side of the book a cover call targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CoverStyle {
    Front,
    Back,
}

/// Cover asset URLs produced by the image stage.
///
/// Either side may be absent when its generation call failed; absence
/// is not fatal to the run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CoverAssets {
    pub front_url: Option<String>,
    pub back_url: Option<String>,
}

impl CoverAssets {
    pub fn has_front(&self) -> bool {
        self.front_url.is_some()
    }

    pub fn has_back(&self) -> bool {
        self.back_url.is_some()
    }
}

/// Final outcome of a generation run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunResult {
    pub success: bool,
    pub book_id: String,
    pub chapters_generated: u32,
    pub total_words: u64,
    pub has_cover: bool,
    pub has_back_cover: bool,
}
