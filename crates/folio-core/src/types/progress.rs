//! Run progress and stage machine
//!
//! One RunProgress row exists per generation run. The orchestrator is
//! its only writer; the UI layer polls it by book id.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Named phase of a generation run.
///
/// Stages move forward monotonically through the working list; any
/// stage may jump directly to Failed or Cancelled. Terminal stages
/// are final.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    GeneratingChapters,
    GeneratingCovers,
    GeneratingBibliography,
    Finalizing,
    Complete,
    Failed,
    Cancelled,
}

impl Stage {
    /// Check if the stage is terminal
    pub fn is_terminal(&self) -> bool {
        matches!(self, Stage::Complete | Stage::Failed | Stage::Cancelled)
    }

    /// Position in the forward stage order; terminal jump targets
    /// sort after every working stage.
    fn rank(&self) -> u8 {
        match self {
            Stage::GeneratingChapters => 0,
            Stage::GeneratingCovers => 1,
            Stage::GeneratingBibliography => 2,
            Stage::Finalizing => 3,
            Stage::Complete => 4,
            Stage::Failed | Stage::Cancelled => 5,
        }
    }

    /// Whether a transition to `next` is allowed
    pub fn can_transition(&self, next: Stage) -> bool {
        if self.is_terminal() {
            return false;
        }
        matches!(next, Stage::Failed | Stage::Cancelled) || next.rank() > self.rank()
    }
}

/// Progress of one generation run, mutated only by the orchestrator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunProgress {
    pub book_id: String,
    /// Unique id for this run
    pub run_id: String,
    pub total_chapters: u32,
    pub chapters_completed: u32,
    pub stage: Stage,
    /// Append-only log of completed step names, checked on resume so
    /// re-execution after a crash skips finished work.
    #[serde(default)]
    pub completed_steps: Vec<String>,
    /// Error message for the UI when the run failed
    #[serde(default)]
    pub error: Option<String>,
    pub updated_at: DateTime<Utc>,
}

impl RunProgress {
    /// Create progress for a fresh run
    pub fn new(book_id: impl Into<String>, total_chapters: u32) -> Self {
        Self {
            book_id: book_id.into(),
            run_id: uuid::Uuid::new_v4().to_string(),
            total_chapters,
            chapters_completed: 0,
            stage: Stage::GeneratingChapters,
            completed_steps: Vec::new(),
            error: None,
            updated_at: Utc::now(),
        }
    }

    /// Advance to the next stage. Backward or post-terminal moves are
    /// ignored, keeping the stage order monotonic.
    pub fn advance(&mut self, next: Stage) -> bool {
        if !self.stage.can_transition(next) {
            return false;
        }
        self.stage = next;
        self.updated_at = Utc::now();
        true
    }

    /// Record a completed step in the append-only log
    pub fn record_step(&mut self, step: impl Into<String>) {
        let step = step.into();
        if !self.completed_steps.iter().any(|s| s == &step) {
            self.completed_steps.push(step);
        }
        self.updated_at = Utc::now();
    }

    /// Check whether a step already completed in an earlier execution
    pub fn step_done(&self, step: &str) -> bool {
        self.completed_steps.iter().any(|s| s == step)
    }

    /// Update the completed chapter count
    pub fn set_chapters_completed(&mut self, completed: u32) {
        self.chapters_completed = completed;
        self.updated_at = Utc::now();
    }

    /// Transition to Failed with an error message for the UI
    pub fn fail(&mut self, error: impl Into<String>) {
        if self.advance(Stage::Failed) {
            self.error = Some(error.into());
        }
    }

    /// Transition to Cancelled
    pub fn cancel(&mut self) {
        self.advance(Stage::Cancelled);
    }
}
