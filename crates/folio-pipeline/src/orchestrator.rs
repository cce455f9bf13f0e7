//! Generation run orchestration.
//!
//! The orchestrator owns one run end to end:
//! - validates the trigger event, then registers a cancellation token
//! - walks the stage machine batch by batch, persisting chapters and
//!   progress after every durable step
//! - retries retryable provider failures with exponential backoff
//! - resumes an interrupted run by skipping steps already in the
//!   progress step log
//!
//! Chapter failure after retries fails the run; cover and bibliography
//! failures degrade it instead.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::time::sleep;
use tracing::{debug, error, info, warn};

use folio_config::GenerationDefaults;
use folio_core::context::ContextBuilder;
use folio_core::events::{GenerationCancelled, GenerationCompleted, GenerationRequested};
use folio_core::provider::{CoverSpec, ImageGenerator, ModelRegistry, ProviderError};
use folio_core::store::{BookStatus, BookStore, BookUpdate, ProgressStore, StoreError};
use folio_core::types::{
    estimate_pages, BibliographyConfig, ConfigValidationError, CoverStyle, OutlineError,
    RunProgress, RunResult, Stage,
};

use crate::batch::{BatchError, ChapterBatchGenerator};
use crate::bibliography::BibliographyGenerator;
use crate::cancel::CancellationRegistry;

/// Orchestrator errors
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("invalid outline: {0}")]
    Outline(#[from] OutlineError),
    #[error("invalid generation config: {0}")]
    InvalidConfig(#[from] ConfigValidationError),
    #[error("provider error: {0}")]
    Provider(#[from] ProviderError),
    #[error("store error: {0}")]
    Store(#[from] StoreError),
    #[error("contract violation: {0}")]
    Contract(String),
}

impl From<BatchError> for PipelineError {
    fn from(error: BatchError) -> Self {
        match error {
            BatchError::UnknownChapter(_) => PipelineError::Contract(error.to_string()),
            BatchError::Provider(e) => PipelineError::Provider(e),
        }
    }
}

/// Step errors that can say whether another attempt may succeed.
pub trait Retryable {
    fn is_retryable(&self) -> bool;
}

impl Retryable for ProviderError {
    fn is_retryable(&self) -> bool {
        ProviderError::is_retryable(self)
    }
}

impl Retryable for BatchError {
    fn is_retryable(&self) -> bool {
        BatchError::is_retryable(self)
    }
}

/// Pipeline tunables, fixed per orchestrator instance.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Chapters generated per durable step
    pub batch_size: usize,
    /// Retries per step after the initial attempt
    pub max_retry_attempts: u32,
    /// Base delay for exponential step-retry backoff
    pub retry_base_delay: Duration,
    /// Cap for step-retry backoff
    pub retry_max_delay: Duration,
    /// Trailing chapters folded into the continuity context
    pub context_chapters: usize,
    /// Per-chapter excerpt budget in characters
    pub context_excerpt_chars: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self::from_defaults(&GenerationDefaults::default())
    }
}

impl PipelineConfig {
    /// Build pipeline tunables from the loaded configuration.
    pub fn from_defaults(defaults: &GenerationDefaults) -> Self {
        Self {
            batch_size: defaults.batch_size,
            max_retry_attempts: defaults.max_retry_attempts,
            retry_base_delay: Duration::from_millis(defaults.retry_base_delay_ms),
            retry_max_delay: Duration::from_millis(defaults.retry_max_delay_ms),
            context_chapters: defaults.context_chapters,
            context_excerpt_chars: defaults.context_excerpt_chars,
        }
    }
}

/// Drives generation runs from trigger event to terminal stage.
pub struct GenerationPipeline {
    book_store: Arc<dyn BookStore>,
    progress_store: Arc<dyn ProgressStore>,
    image_client: Option<Arc<dyn ImageGenerator>>,
    cancellations: Arc<CancellationRegistry>,
    batches: ChapterBatchGenerator,
    bibliography: BibliographyGenerator,
    config: PipelineConfig,
}

impl GenerationPipeline {
    /// Wire an orchestrator from its stores and model registry.
    pub fn new(
        registry: Arc<ModelRegistry>,
        book_store: Arc<dyn BookStore>,
        progress_store: Arc<dyn ProgressStore>,
        config: PipelineConfig,
    ) -> Self {
        let context_builder =
            ContextBuilder::new(config.context_chapters, config.context_excerpt_chars);
        Self {
            book_store,
            progress_store,
            image_client: None,
            cancellations: Arc::new(CancellationRegistry::new()),
            batches: ChapterBatchGenerator::new(registry.clone(), context_builder),
            bibliography: BibliographyGenerator::new(registry),
            config,
        }
    }

    /// Attach the cover image client; without one the cover stage is
    /// skipped entirely.
    pub fn with_image_client(mut self, client: Arc<dyn ImageGenerator>) -> Self {
        self.image_client = Some(client);
        self
    }

    /// Shared cancellation registry; hand this to whatever surface
    /// receives cancel requests.
    pub fn cancellations(&self) -> Arc<CancellationRegistry> {
        self.cancellations.clone()
    }

    /// Cancel the active run for a book, if any.
    pub async fn handle_cancel(&self, event: &GenerationCancelled) -> bool {
        let cancelled = self.cancellations.cancel(&event.book_id).await;
        if cancelled {
            info!(book_id = %event.book_id, "cancellation requested");
        } else {
            warn!(book_id = %event.book_id, "cancellation for book with no active run");
        }
        cancelled
    }

    /// Execute one generation run to a terminal stage.
    ///
    /// Cancellation is not an error: a cancelled run returns
    /// `Ok(RunResult { success: false, .. })` with whatever chapters
    /// were persisted before the check.
    pub async fn run(&self, request: GenerationRequested) -> Result<RunResult, PipelineError> {
        request.outline.validate()?;
        request.config.validate()?;

        let book_id = request.book_id.clone();
        let total = request.outline.total_chapters();
        let token = self.cancellations.register(&book_id).await;

        // Resume an interrupted run when its progress row survives.
        let mut progress = match self.progress_store.load(&book_id).await? {
            Some(existing) if !existing.stage.is_terminal() => {
                info!(
                    book_id = %book_id,
                    run_id = %existing.run_id,
                    completed_steps = existing.completed_steps.len(),
                    "resuming interrupted run"
                );
                existing
            }
            _ => RunProgress::new(book_id.clone(), total),
        };
        self.progress_store.save(&progress).await?;
        self.book_store
            .update_book(&book_id, BookUpdate::status(BookStatus::Generating))
            .await?;

        info!(
            book_id = %book_id,
            user_id = %request.user_id,
            run_id = %progress.run_id,
            total_chapters = total,
            mode = ?request.config.mode,
            "generation run started"
        );

        // Stage 1: chapter batches.
        let numbers: Vec<u32> = (1..=total).collect();
        let batch_size = self.config.batch_size.max(1);
        for (index, chunk) in numbers.chunks(batch_size).enumerate() {
            let step = format!("chapters:batch:{}", index + 1);
            if progress.step_done(&step) {
                debug!(book_id = %book_id, step = %step, "step already done, skipping");
                continue;
            }
            if token.is_cancelled() {
                return self.finish_cancelled(&book_id, &mut progress).await;
            }

            let prior = self.book_store.get_chapters(&book_id).await?;
            let batch_result = self
                .run_step_with_retry(&book_id, &step, || {
                    self.batches
                        .generate_batch(&request.outline, &request.config, chunk, &prior)
                })
                .await;
            let chapters = match batch_result {
                Ok(chapters) => chapters,
                Err(e) => {
                    self.finish_failed(&book_id, &mut progress, &e.to_string())
                        .await;
                    return Err(e.into());
                }
            };

            self.book_store.create_chapters(&book_id, &chapters).await?;
            let persisted = self.book_store.get_chapters(&book_id).await?;
            let total_words: u64 = persisted.iter().map(|c| c.word_count).sum();
            self.book_store
                .update_book(
                    &book_id,
                    BookUpdate {
                        word_count: Some(total_words),
                        page_count: Some(estimate_pages(total_words)),
                        chapter_count: Some(persisted.len() as u32),
                        ..BookUpdate::default()
                    },
                )
                .await?;

            progress.record_step(&step);
            progress.set_chapters_completed(persisted.len() as u32);
            self.progress_store.save(&progress).await?;
            info!(
                book_id = %book_id,
                step = %step,
                batch_chapters = chapters.len(),
                total_words,
                "chapter batch persisted"
            );
        }

        // Stage 2: covers. Failures degrade the book, never the run.
        progress.advance(Stage::GeneratingCovers);
        self.progress_store.save(&progress).await?;
        if let Some(image_client) = &self.image_client {
            for (style, step) in [
                (CoverStyle::Front, "cover:front"),
                (CoverStyle::Back, "cover:back"),
            ] {
                if progress.step_done(step) {
                    continue;
                }
                if token.is_cancelled() {
                    return self.finish_cancelled(&book_id, &mut progress).await;
                }

                let spec = CoverSpec {
                    title: request.outline.title.clone(),
                    author: request.outline.author.clone(),
                    genre: request.outline.genre.clone(),
                    description: request.outline.description.clone(),
                    style,
                };
                match self
                    .run_step_with_retry(&book_id, step, || image_client.generate_cover(&spec))
                    .await
                {
                    Ok(url) => {
                        let update = match style {
                            CoverStyle::Front => BookUpdate {
                                cover_url: Some(url),
                                ..BookUpdate::default()
                            },
                            CoverStyle::Back => BookUpdate {
                                back_cover_url: Some(url),
                                ..BookUpdate::default()
                            },
                        };
                        self.book_store.update_book(&book_id, update).await?;
                    }
                    Err(e) => {
                        warn!(
                            book_id = %book_id,
                            step = %step,
                            error = %e,
                            "cover generation failed, continuing without asset"
                        );
                    }
                }
                progress.record_step(step);
                self.progress_store.save(&progress).await?;
            }
        }

        // Stage 3: bibliography, when the run asked for one.
        progress.advance(Stage::GeneratingBibliography);
        self.progress_store.save(&progress).await?;
        if request.config.bibliography_enabled && !progress.step_done("bibliography") {
            if token.is_cancelled() {
                return self.finish_cancelled(&book_id, &mut progress).await;
            }

            self.book_store
                .upsert_bibliography_config(
                    &book_id,
                    &BibliographyConfig {
                        enabled: true,
                        citation_style: request.config.citation_style,
                    },
                )
                .await?;

            let chapters = self.book_store.get_chapters(&book_id).await?;
            match self
                .run_step_with_retry(&book_id, "bibliography", || {
                    self.bibliography
                        .generate(&request.outline, &request.config, &chapters)
                })
                .await
            {
                Ok(references) => {
                    let mut persisted = 0usize;
                    let mut skipped = 0usize;
                    for reference in &references {
                        match self.book_store.create_reference(&book_id, reference).await {
                            Ok(()) => persisted += 1,
                            Err(e) => {
                                skipped += 1;
                                warn!(
                                    book_id = %book_id,
                                    title = %reference.title,
                                    error = %e,
                                    "failed to persist reference, skipping"
                                );
                            }
                        }
                    }
                    info!(book_id = %book_id, persisted, skipped, "bibliography persisted");
                }
                Err(e) => {
                    warn!(
                        book_id = %book_id,
                        error = %e,
                        "bibliography generation failed, continuing without references"
                    );
                }
            }
            progress.record_step("bibliography");
            self.progress_store.save(&progress).await?;
        }

        // Stage 4: finalize from what the store actually holds.
        if token.is_cancelled() {
            return self.finish_cancelled(&book_id, &mut progress).await;
        }
        progress.advance(Stage::Finalizing);
        self.progress_store.save(&progress).await?;

        let chapters = self.book_store.get_chapters(&book_id).await?;
        // Cover flags come from the record so a resumed run reports
        // assets produced by the execution that crashed.
        let covers = self.book_store.get_cover_assets(&book_id).await?;
        let total_words: u64 = chapters.iter().map(|c| c.word_count).sum();
        self.book_store
            .update_book(
                &book_id,
                BookUpdate {
                    status: Some(BookStatus::Completed),
                    word_count: Some(total_words),
                    page_count: Some(estimate_pages(total_words)),
                    chapter_count: Some(chapters.len() as u32),
                    ..BookUpdate::default()
                },
            )
            .await?;

        progress.set_chapters_completed(chapters.len() as u32);
        progress.advance(Stage::Complete);
        self.progress_store.save(&progress).await?;
        self.cancellations.remove(&book_id).await;

        let completed = GenerationCompleted {
            book_id: book_id.clone(),
            total_chapters: chapters.len() as u32,
            total_words,
        };
        info!(
            book_id = %completed.book_id,
            total_chapters = completed.total_chapters,
            total_words = completed.total_words,
            "generation run complete"
        );

        Ok(RunResult {
            success: true,
            book_id,
            chapters_generated: completed.total_chapters,
            total_words,
            has_cover: covers.has_front(),
            has_back_cover: covers.has_back(),
        })
    }

    async fn finish_cancelled(
        &self,
        book_id: &str,
        progress: &mut RunProgress,
    ) -> Result<RunResult, PipelineError> {
        info!(book_id = %book_id, "generation run cancelled");
        progress.cancel();
        self.progress_store.save(progress).await?;
        self.book_store
            .update_book(book_id, BookUpdate::status(BookStatus::Cancelled))
            .await?;
        self.cancellations.remove(book_id).await;

        let chapters = self.book_store.get_chapters(book_id).await?;
        let total_words = chapters.iter().map(|c| c.word_count).sum();
        Ok(RunResult {
            success: false,
            book_id: book_id.to_string(),
            chapters_generated: chapters.len() as u32,
            total_words,
            has_cover: false,
            has_back_cover: false,
        })
    }

    /// Best-effort terminal bookkeeping for a failed run; the original
    /// error is what the caller returns.
    async fn finish_failed(&self, book_id: &str, progress: &mut RunProgress, message: &str) {
        error!(book_id = %book_id, error = %message, "generation run failed");
        progress.fail(message);
        if let Err(e) = self.progress_store.save(progress).await {
            warn!(book_id = %book_id, error = %e, "failed to persist failed progress");
        }
        let update = BookUpdate::status(BookStatus::Failed).with_error(message);
        if let Err(e) = self.book_store.update_book(book_id, update).await {
            warn!(book_id = %book_id, error = %e, "failed to persist failed book status");
        }
        self.cancellations.remove(book_id).await;
    }

    async fn run_step_with_retry<T, E, F, Fut>(
        &self,
        book_id: &str,
        step: &str,
        mut op: F,
    ) -> Result<T, E>
    where
        E: Retryable + std::fmt::Display,
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let mut retries_used: u32 = 0;
        loop {
            match op().await {
                Ok(value) => return Ok(value),
                Err(error)
                    if error.is_retryable() && retries_used < self.config.max_retry_attempts =>
                {
                    let delay = compute_retry_backoff(
                        self.config.retry_base_delay,
                        self.config.retry_max_delay,
                        retries_used,
                    );
                    retries_used += 1;
                    warn!(
                        book_id = %book_id,
                        step = %step,
                        error = %error,
                        retry_attempt = retries_used,
                        retry_in_ms = delay.as_millis() as u64,
                        "retrying step after retryable error"
                    );
                    if !delay.is_zero() {
                        sleep(delay).await;
                    }
                }
                Err(error) => return Err(error),
            }
        }
    }
}

fn compute_retry_backoff(base: Duration, max: Duration, retries_used: u32) -> Duration {
    let base_ms = base.as_millis();
    if base_ms == 0 {
        return Duration::from_millis(0);
    }
    let max_ms = max.as_millis().max(base_ms);
    let shift = retries_used.min(20);
    let multiplier = 1u128 << shift;
    let backoff_ms = base_ms.saturating_mul(multiplier).min(max_ms);
    let millis = u64::try_from(backoff_ms).unwrap_or(u64::MAX);
    Duration::from_millis(millis)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backoff_doubles_and_caps() {
        let base = Duration::from_millis(500);
        let max = Duration::from_millis(3_000);
        assert_eq!(compute_retry_backoff(base, max, 0), Duration::from_millis(500));
        assert_eq!(compute_retry_backoff(base, max, 1), Duration::from_millis(1_000));
        assert_eq!(compute_retry_backoff(base, max, 2), Duration::from_millis(2_000));
        assert_eq!(compute_retry_backoff(base, max, 3), Duration::from_millis(3_000));
        assert_eq!(compute_retry_backoff(base, max, 10), Duration::from_millis(3_000));
    }

    #[test]
    fn test_zero_base_disables_backoff() {
        let backoff = compute_retry_backoff(Duration::ZERO, Duration::from_secs(5), 4);
        assert!(backoff.is_zero());
    }

    #[test]
    fn test_unknown_chapter_maps_to_contract_error() {
        let error: PipelineError = BatchError::UnknownChapter(7).into();
        assert!(matches!(error, PipelineError::Contract(_)));
    }

    #[test]
    fn test_config_from_defaults_carries_tunables() {
        let defaults = GenerationDefaults::default();
        let config = PipelineConfig::from_defaults(&defaults);
        assert_eq!(config.batch_size, defaults.batch_size);
        assert_eq!(
            config.retry_base_delay,
            Duration::from_millis(defaults.retry_base_delay_ms)
        );
    }
}
