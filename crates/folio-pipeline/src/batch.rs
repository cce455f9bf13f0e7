//! Chapter batch generation.
//!
//! One batch is the unit of durable progress: its chapters are
//! generated together, persisted together, and its step is recorded
//! once the whole batch lands. Parallel mode runs every chapter of the
//! batch against the same pre-batch context; sequential mode rebuilds
//! the context after each chapter so later chapters see earlier ones.

use std::sync::Arc;

use futures_util::stream::{FuturesUnordered, StreamExt};
use thiserror::Error;
use tracing::debug;

use folio_core::context::ContextBuilder;
use folio_core::provider::{ModelRegistry, ProviderError, TextGenerator, TextRequest};
use folio_core::types::{ChapterSpec, ExecutionMode, GeneratedChapter, GenerationConfig, Outline};

/// Batch generation errors
#[derive(Debug, Error)]
pub enum BatchError {
    /// The requested chapter number has no spec in the outline. This
    /// is a caller contract violation and fails before any provider
    /// call is made.
    #[error("chapter {0} is not in the outline")]
    UnknownChapter(u32),
    #[error(transparent)]
    Provider(#[from] ProviderError),
}

impl BatchError {
    /// Whether the orchestrator step may retry after this error.
    pub fn is_retryable(&self) -> bool {
        match self {
            BatchError::UnknownChapter(_) => false,
            BatchError::Provider(e) => e.is_retryable(),
        }
    }
}

/// Generates one batch of chapters through the model registry.
pub struct ChapterBatchGenerator {
    registry: Arc<ModelRegistry>,
    context_builder: ContextBuilder,
}

impl ChapterBatchGenerator {
    pub fn new(registry: Arc<ModelRegistry>, context_builder: ContextBuilder) -> Self {
        Self {
            registry,
            context_builder,
        }
    }

    /// Generate the chapters named by `numbers`, in outline order.
    ///
    /// `prior` is every chapter persisted before this batch; it seeds
    /// the continuity context. The returned chapters are sorted by
    /// number regardless of completion order.
    pub async fn generate_batch(
        &self,
        outline: &Outline,
        config: &GenerationConfig,
        numbers: &[u32],
        prior: &[GeneratedChapter],
    ) -> Result<Vec<GeneratedChapter>, BatchError> {
        let mut specs = Vec::with_capacity(numbers.len());
        for &number in numbers {
            let spec = outline
                .chapter(number)
                .ok_or(BatchError::UnknownChapter(number))?;
            specs.push(spec);
        }

        let generator = self.registry.resolve(&config.model)?;
        debug!(
            model = %config.model,
            batch = ?numbers,
            mode = ?config.mode,
            "generating chapter batch"
        );

        match config.mode {
            ExecutionMode::Parallel => {
                self.generate_parallel(outline, config, &specs, prior, generator)
                    .await
            }
            ExecutionMode::Sequential => {
                self.generate_sequential(outline, config, &specs, prior, generator)
                    .await
            }
        }
    }

    async fn generate_parallel(
        &self,
        outline: &Outline,
        config: &GenerationConfig,
        specs: &[&ChapterSpec],
        prior: &[GeneratedChapter],
        generator: Arc<dyn TextGenerator>,
    ) -> Result<Vec<GeneratedChapter>, BatchError> {
        // Every chapter of the batch sees the same pre-batch context.
        let context = self.context_builder.build(prior);

        let mut in_flight = FuturesUnordered::new();
        for spec in specs {
            let request = build_chapter_request(outline, spec, &context, config);
            let generator = generator.clone();
            let number = spec.number;
            let title = spec.title.clone();
            in_flight.push(async move {
                let raw = generator.generate(request).await?;
                Ok::<_, ProviderError>(GeneratedChapter::from_raw(number, title, &raw))
            });
        }

        let mut chapters = Vec::with_capacity(specs.len());
        while let Some(result) = in_flight.next().await {
            chapters.push(result?);
        }
        chapters.sort_by_key(|c| c.number);
        Ok(chapters)
    }

    async fn generate_sequential(
        &self,
        outline: &Outline,
        config: &GenerationConfig,
        specs: &[&ChapterSpec],
        prior: &[GeneratedChapter],
        generator: Arc<dyn TextGenerator>,
    ) -> Result<Vec<GeneratedChapter>, BatchError> {
        let mut working: Vec<GeneratedChapter> = prior.to_vec();
        let mut chapters = Vec::with_capacity(specs.len());

        for spec in specs {
            let context = self.context_builder.build(&working);
            let request = build_chapter_request(outline, spec, &context, config);
            let raw = generator.generate(request).await?;
            let chapter = GeneratedChapter::from_raw(spec.number, spec.title.clone(), &raw);
            working.push(chapter.clone());
            chapters.push(chapter);
        }
        Ok(chapters)
    }
}

/// Render the provider request for one chapter.
pub fn build_chapter_request(
    outline: &Outline,
    spec: &ChapterSpec,
    context: &str,
    config: &GenerationConfig,
) -> TextRequest {
    let mut system = format!(
        "You are a professional {} author writing the book \"{}\" by {}. \
         Write immersive, polished prose that stays consistent with the \
         book's description: {}",
        outline.genre, outline.title, outline.author, outline.description
    );
    if !outline.themes.is_empty() {
        system.push_str(&format!("\nThemes to weave in: {}.", outline.themes.join(", ")));
    }
    if !outline.characters.is_empty() {
        system.push_str(&format!("\nRecurring characters: {}.", outline.characters.join(", ")));
    }

    let mut user = format!(
        "Write chapter {} of {}: \"{}\".\n\nChapter summary: {}\n\nTarget length: about {} words.\n",
        spec.number,
        outline.total_chapters(),
        spec.title,
        spec.summary,
        spec.target_words
    );
    if !context.is_empty() {
        user.push_str(&format!("\nStory so far:\n{}\n", context));
    }
    user.push_str("\nReturn only the chapter text, with no title heading or commentary.");

    TextRequest {
        system,
        user,
        model: config.model.clone(),
        temperature: config.temperature,
    }
}
