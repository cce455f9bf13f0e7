//! End-to-end orchestrator tests against in-memory stores and mock
//! providers.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use folio_core::events::{GenerationCancelled, GenerationRequested};
use folio_core::provider::{ModelRegistry, ProviderError, TextGenerator, TextRequest};
use folio_core::store::{BookStatus, BookStore, BookUpdate, ProgressStore, StoreError};
use folio_core::types::{
    BibliographyConfig, BibliographyReference, ChapterSpec, CitationStyle, CoverAssets,
    ExecutionMode, GeneratedChapter, GenerationConfig, Outline, Stage,
};
use folio_pipeline::cancel::CancellationRegistry;
use folio_pipeline::orchestrator::{GenerationPipeline, PipelineConfig, PipelineError};
use folio_providers::mock::{MockImageGenerator, MockTextGenerator};
use folio_stores::memory::{InMemoryBookStore, InMemoryProgressStore};

const MODEL: &str = "mock-model";

fn outline(chapters: u32) -> Outline {
    Outline {
        title: "The Silent Harbor".to_string(),
        author: "R. Calloway".to_string(),
        genre: "mystery".to_string(),
        description: "A harbor town keeps its secrets.".to_string(),
        chapters: (1..=chapters)
            .map(|n| ChapterSpec::new(n, format!("Chapter {} Title", n), format!("Summary {}", n)))
            .collect(),
        themes: Vec::new(),
        characters: Vec::new(),
    }
}

fn request(book_id: &str, chapters: u32, config: GenerationConfig) -> GenerationRequested {
    GenerationRequested {
        book_id: book_id.to_string(),
        user_id: "user-1".to_string(),
        outline: outline(chapters),
        config,
    }
}

fn test_config(batch_size: usize, max_retry_attempts: u32) -> PipelineConfig {
    PipelineConfig {
        batch_size,
        max_retry_attempts,
        retry_base_delay: Duration::ZERO,
        retry_max_delay: Duration::ZERO,
        ..PipelineConfig::default()
    }
}

struct Harness {
    pipeline: GenerationPipeline,
    book_store: Arc<InMemoryBookStore>,
    progress_store: Arc<InMemoryProgressStore>,
}

fn harness(generator: Arc<dyn TextGenerator>, config: PipelineConfig) -> Harness {
    let mut registry = ModelRegistry::new();
    registry.register(MODEL, generator);

    let book_store = Arc::new(InMemoryBookStore::new());
    let progress_store = Arc::new(InMemoryProgressStore::new());
    let pipeline = GenerationPipeline::new(
        Arc::new(registry),
        book_store.clone(),
        progress_store.clone(),
        config,
    );
    Harness {
        pipeline,
        book_store,
        progress_store,
    }
}

#[tokio::test]
async fn test_full_run_persists_every_chapter_once_in_order() {
    let mock = Arc::new(MockTextGenerator::with_response(
        "one two three four five six",
    ));
    let h = harness(mock.clone(), test_config(2, 0));

    let config = GenerationConfig::new(MODEL, ExecutionMode::Sequential);
    let result = h.pipeline.run(request("book-1", 5, config)).await.unwrap();

    assert!(result.success);
    assert_eq!(result.chapters_generated, 5);
    assert_eq!(result.total_words, 30);
    assert_eq!(mock.call_count(), 5);

    let chapters = h.book_store.get_chapters("book-1").await.unwrap();
    let numbers: Vec<u32> = chapters.iter().map(|c| c.number).collect();
    assert_eq!(numbers, vec![1, 2, 3, 4, 5]);

    let record = h.book_store.get_book("book-1").unwrap();
    assert_eq!(record.status, Some(BookStatus::Completed));
    assert_eq!(record.word_count, Some(30));
    assert_eq!(record.page_count, Some(1));
    assert_eq!(record.chapter_count, Some(5));

    let progress = h
        .progress_store
        .load("book-1")
        .await
        .unwrap()
        .expect("progress row");
    assert_eq!(progress.stage, Stage::Complete);
    assert_eq!(progress.chapters_completed, 5);
    // 5 chapters at batch size 2 means three durable batch steps.
    assert!(progress.step_done("chapters:batch:1"));
    assert!(progress.step_done("chapters:batch:2"));
    assert!(progress.step_done("chapters:batch:3"));
}

#[tokio::test]
async fn test_parallel_mode_produces_same_chapter_set() {
    let mock = Arc::new(MockTextGenerator::with_response("parallel prose text"));
    let h = harness(mock.clone(), test_config(3, 0));

    let config = GenerationConfig::new(MODEL, ExecutionMode::Parallel);
    let result = h.pipeline.run(request("book-p", 6, config)).await.unwrap();

    assert!(result.success);
    let numbers: Vec<u32> = h
        .book_store
        .get_chapters("book-p")
        .await
        .unwrap()
        .iter()
        .map(|c| c.number)
        .collect();
    assert_eq!(numbers, vec![1, 2, 3, 4, 5, 6]);
    assert_eq!(mock.call_count(), 6);
}

#[tokio::test]
async fn test_cover_failure_degrades_run_instead_of_failing_it() {
    let mock = Arc::new(MockTextGenerator::with_response("chapter text"));
    let h = harness(mock, test_config(2, 0));
    let image = Arc::new(MockImageGenerator::failing(10));
    let pipeline = h.pipeline.with_image_client(image);

    let config = GenerationConfig::new(MODEL, ExecutionMode::Sequential);
    let result = pipeline.run(request("book-2", 2, config)).await.unwrap();

    assert!(result.success);
    assert!(!result.has_cover);
    assert!(!result.has_back_cover);

    let record = h.book_store.get_book("book-2").unwrap();
    assert_eq!(record.status, Some(BookStatus::Completed));
    assert!(record.cover_url.is_none());
}

#[tokio::test]
async fn test_successful_covers_are_recorded_on_the_book() {
    let mock = Arc::new(MockTextGenerator::with_response("chapter text"));
    let h = harness(mock, test_config(2, 0));
    let image = Arc::new(MockImageGenerator::new());
    let pipeline = h.pipeline.with_image_client(image.clone());

    let config = GenerationConfig::new(MODEL, ExecutionMode::Sequential);
    let result = pipeline.run(request("book-3", 1, config)).await.unwrap();

    assert!(result.has_cover);
    assert!(result.has_back_cover);
    assert_eq!(image.call_count(), 2);

    let record = h.book_store.get_book("book-3").unwrap();
    assert!(record.cover_url.is_some());
    assert!(record.back_cover_url.is_some());
}

/// Cancels its own run through the registry after a fixed number of
/// chapter calls, mimicking a cancel request landing mid-run.
struct CancellingGenerator {
    registry: Mutex<Option<Arc<CancellationRegistry>>>,
    book_id: String,
    cancel_after: usize,
    calls: AtomicUsize,
}

#[async_trait]
impl TextGenerator for CancellingGenerator {
    async fn generate(&self, _request: TextRequest) -> Result<String, ProviderError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if call == self.cancel_after {
            let registry = self
                .registry
                .lock()
                .unwrap()
                .clone()
                .expect("registry wired before run");
            registry.cancel(&self.book_id).await;
        }
        Ok("cancellable chapter text".to_string())
    }
}

#[tokio::test]
async fn test_cancellation_between_batches_keeps_persisted_work() {
    let generator = Arc::new(CancellingGenerator {
        registry: Mutex::new(None),
        book_id: "book-4".to_string(),
        cancel_after: 2,
        calls: AtomicUsize::new(0),
    });
    let h = harness(generator.clone(), test_config(2, 0));
    *generator.registry.lock().unwrap() = Some(h.pipeline.cancellations());

    let config = GenerationConfig::new(MODEL, ExecutionMode::Sequential);
    let result = h.pipeline.run(request("book-4", 6, config)).await.unwrap();

    assert!(!result.success);
    assert_eq!(result.chapters_generated, 2);
    // No chapter call after the cancellation check fired.
    assert_eq!(generator.calls.load(Ordering::SeqCst), 2);

    let chapters = h.book_store.get_chapters("book-4").await.unwrap();
    assert_eq!(chapters.len(), 2);

    let record = h.book_store.get_book("book-4").unwrap();
    assert_eq!(record.status, Some(BookStatus::Cancelled));

    let progress = h.progress_store.load("book-4").await.unwrap().unwrap();
    assert_eq!(progress.stage, Stage::Cancelled);
}

#[tokio::test]
async fn test_cancel_event_for_idle_book_is_rejected() {
    let mock = Arc::new(MockTextGenerator::default());
    let h = harness(mock, test_config(2, 0));

    let accepted = h
        .pipeline
        .handle_cancel(&GenerationCancelled {
            book_id: "never-started".to_string(),
        })
        .await;
    assert!(!accepted);
}

#[tokio::test]
async fn test_incomplete_reference_is_dropped_and_siblings_kept() {
    let mock = Arc::new(MockTextGenerator::with_response("fallback"));
    // Sequential order: two chapter calls, then the bibliography call.
    mock.push_result(Ok("chapter one text".to_string()));
    mock.push_result(Ok("chapter two text".to_string()));
    mock.push_result(Ok(r#"[
        {"type":"book","title":"Tides and Towns","authors":["M. Halloran"],"year":1998},
        {"type":"journal","title":"No Journal Named","authors":["A. Smith"]},
        {"type":"website","title":"Harbor records","authors":["Town clerk"],"url":"https://example.org"}
    ]"#
    .to_string()));
    let h = harness(mock, test_config(2, 0));

    let config = GenerationConfig::new(MODEL, ExecutionMode::Sequential)
        .with_bibliography(CitationStyle::Apa);
    let result = h.pipeline.run(request("book-5", 2, config)).await.unwrap();
    assert!(result.success);

    let references = h.book_store.get_references("book-5");
    assert_eq!(references.len(), 2);
    assert_eq!(references[0].title, "Tides and Towns");
    assert_eq!(references[1].title, "Harbor records");

    let bib_config = h
        .book_store
        .get_bibliography_config("book-5")
        .expect("bibliography config persisted");
    assert!(bib_config.enabled);
    assert_eq!(bib_config.citation_style, CitationStyle::Apa);
}

#[tokio::test]
async fn test_resume_skips_batches_already_in_the_step_log() {
    let mock = Arc::new(MockTextGenerator::with_response("resumed chapter text"));
    let h = harness(mock.clone(), test_config(2, 0));

    // Simulate a crash after batch 1 of a 4-chapter run.
    let mut progress = folio_core::types::RunProgress::new("book-6", 4);
    progress.record_step("chapters:batch:1");
    progress.set_chapters_completed(2);
    h.progress_store.save(&progress).await.unwrap();
    h.book_store
        .create_chapters(
            "book-6",
            &[
                folio_core::types::GeneratedChapter::from_raw(1, "Chapter 1 Title", "First."),
                folio_core::types::GeneratedChapter::from_raw(2, "Chapter 2 Title", "Second."),
            ],
        )
        .await
        .unwrap();

    let config = GenerationConfig::new(MODEL, ExecutionMode::Sequential);
    let result = h.pipeline.run(request("book-6", 4, config)).await.unwrap();

    assert!(result.success);
    assert_eq!(result.chapters_generated, 4);
    // Only batch 2 ran; batch 1 was skipped via the step log.
    assert_eq!(mock.call_count(), 2);
    let calls = mock.recorded_calls();
    assert!(calls[0].user.contains("Write chapter 3"));
    assert!(calls[1].user.contains("Write chapter 4"));

    let progress = h.progress_store.load("book-6").await.unwrap().unwrap();
    assert_eq!(progress.stage, Stage::Complete);
}

#[tokio::test]
async fn test_retry_recovers_from_transient_provider_failure() {
    let mock = Arc::new(MockTextGenerator::with_response("recovered chapter"));
    mock.fail_times(1);
    let h = harness(mock.clone(), test_config(1, 2));

    let config = GenerationConfig::new(MODEL, ExecutionMode::Sequential);
    let result = h.pipeline.run(request("book-7", 1, config)).await.unwrap();

    assert!(result.success);
    assert_eq!(mock.call_count(), 2);
}

#[tokio::test]
async fn test_chapter_failure_after_retries_fails_the_run() {
    let mock = Arc::new(MockTextGenerator::with_response("never reached"));
    mock.fail_times(5);
    let h = harness(mock, test_config(1, 1));

    let config = GenerationConfig::new(MODEL, ExecutionMode::Sequential);
    let error = h
        .pipeline
        .run(request("book-8", 1, config))
        .await
        .expect_err("run should fail");
    assert!(matches!(error, PipelineError::Provider(_)));

    let record = h.book_store.get_book("book-8").unwrap();
    assert_eq!(record.status, Some(BookStatus::Failed));
    assert!(record.error_message.is_some());

    let progress = h.progress_store.load("book-8").await.unwrap().unwrap();
    assert_eq!(progress.stage, Stage::Failed);
    assert!(progress.error.is_some());
}

#[tokio::test]
async fn test_invalid_outline_is_rejected_before_any_work() {
    let mock = Arc::new(MockTextGenerator::default());
    let h = harness(mock.clone(), test_config(2, 0));

    let mut bad = request("book-9", 3, GenerationConfig::new(MODEL, ExecutionMode::Sequential));
    bad.outline.chapters[1].number = 9;

    let error = h.pipeline.run(bad).await.expect_err("validation must fail");
    assert!(matches!(error, PipelineError::Outline(_)));
    assert_eq!(mock.call_count(), 0);
    assert!(h.progress_store.load("book-9").await.unwrap().is_none());
}

/// Delegates to the in-memory store and, on every update that carries
/// a word count, snapshots the claimed aggregate next to the actual
/// sum of persisted chapters at that moment.
struct AggregateCheckingStore {
    inner: Arc<InMemoryBookStore>,
    word_counts: Mutex<Vec<(u64, u64)>>,
}

#[async_trait]
impl BookStore for AggregateCheckingStore {
    async fn create_chapters(
        &self,
        book_id: &str,
        chapters: &[GeneratedChapter],
    ) -> Result<(), StoreError> {
        self.inner.create_chapters(book_id, chapters).await
    }

    async fn get_chapters(&self, book_id: &str) -> Result<Vec<GeneratedChapter>, StoreError> {
        self.inner.get_chapters(book_id).await
    }

    async fn update_book(&self, book_id: &str, update: BookUpdate) -> Result<(), StoreError> {
        let claimed = update.word_count;
        self.inner.update_book(book_id, update).await?;
        if let Some(claimed) = claimed {
            let sum = self
                .inner
                .get_chapters(book_id)
                .await?
                .iter()
                .map(|c| c.word_count)
                .sum();
            self.word_counts.lock().unwrap().push((claimed, sum));
        }
        Ok(())
    }

    async fn get_cover_assets(&self, book_id: &str) -> Result<CoverAssets, StoreError> {
        self.inner.get_cover_assets(book_id).await
    }

    async fn upsert_bibliography_config(
        &self,
        book_id: &str,
        config: &BibliographyConfig,
    ) -> Result<(), StoreError> {
        self.inner.upsert_bibliography_config(book_id, config).await
    }

    async fn create_reference(
        &self,
        book_id: &str,
        reference: &BibliographyReference,
    ) -> Result<(), StoreError> {
        self.inner.create_reference(book_id, reference).await
    }
}

#[tokio::test]
async fn test_persisted_word_count_matches_chapter_sum_after_every_batch() {
    let mock = Arc::new(MockTextGenerator::with_response(
        "one two three four five six",
    ));
    let mut registry = ModelRegistry::new();
    registry.register(MODEL, mock);

    let store = Arc::new(AggregateCheckingStore {
        inner: Arc::new(InMemoryBookStore::new()),
        word_counts: Mutex::new(Vec::new()),
    });
    let pipeline = GenerationPipeline::new(
        Arc::new(registry),
        store.clone(),
        Arc::new(InMemoryProgressStore::new()),
        test_config(2, 0),
    );

    let config = GenerationConfig::new(MODEL, ExecutionMode::Sequential);
    let result = pipeline.run(request("book-12", 5, config)).await.unwrap();
    assert!(result.success);

    let snapshots = store.word_counts.lock().unwrap().clone();
    // Three batch updates, then the finalize update.
    let claimed: Vec<u64> = snapshots.iter().map(|(claimed, _)| *claimed).collect();
    assert_eq!(claimed, vec![12, 24, 30, 30]);
    // The record never drifts from the chapters backing it.
    for (claimed, sum) in snapshots {
        assert_eq!(claimed, sum);
    }
}

#[tokio::test]
async fn test_resume_reports_covers_recorded_by_an_earlier_execution() {
    let mock = Arc::new(MockTextGenerator::with_response("resumed text"));
    let h = harness(mock, test_config(2, 0));
    let image = Arc::new(MockImageGenerator::new());
    let pipeline = h.pipeline.with_image_client(image.clone());

    // Crash landed after the covers were generated and logged.
    let mut progress = folio_core::types::RunProgress::new("book-13", 2);
    progress.record_step("chapters:batch:1");
    progress.set_chapters_completed(2);
    progress.record_step("cover:front");
    progress.record_step("cover:back");
    h.progress_store.save(&progress).await.unwrap();
    h.book_store
        .create_chapters(
            "book-13",
            &[
                GeneratedChapter::from_raw(1, "Chapter 1 Title", "First."),
                GeneratedChapter::from_raw(2, "Chapter 2 Title", "Second."),
            ],
        )
        .await
        .unwrap();
    h.book_store
        .update_book(
            "book-13",
            BookUpdate {
                cover_url: Some("https://assets.example.com/covers/front/prior.png".to_string()),
                back_cover_url: Some("https://assets.example.com/covers/back/prior.png".to_string()),
                ..BookUpdate::default()
            },
        )
        .await
        .unwrap();

    let config = GenerationConfig::new(MODEL, ExecutionMode::Sequential);
    let result = pipeline.run(request("book-13", 2, config)).await.unwrap();

    assert!(result.success);
    // Both cover steps were skipped via the step log, yet the result
    // reflects the URLs already on the record.
    assert_eq!(image.call_count(), 0);
    assert!(result.has_cover);
    assert!(result.has_back_cover);
}

#[tokio::test]
async fn test_unknown_model_fails_without_retry() {
    let mock = Arc::new(MockTextGenerator::default());
    let h = harness(mock, test_config(1, 3));

    let config = GenerationConfig::new("unregistered-model", ExecutionMode::Sequential);
    let error = h
        .pipeline
        .run(request("book-10", 1, config))
        .await
        .expect_err("unknown model must fail");
    assert!(matches!(
        error,
        PipelineError::Provider(ProviderError::UnknownModel(_))
    ));

    let record = h.book_store.get_book("book-10").unwrap();
    assert_eq!(record.status, Some(BookStatus::Failed));
}
