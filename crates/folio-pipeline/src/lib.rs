//! # Folio Pipeline
//!
//! Background book-generation orchestration:
//! - `batch`: chapter batch generation, parallel or sequential
//! - `bibliography`: structured reference generation
//! - `cancel`: cooperative cancellation registry
//! - `orchestrator`: the stage machine driving a run end to end

pub mod batch;
pub mod bibliography;
pub mod cancel;
pub mod orchestrator;

pub use batch::{build_chapter_request, BatchError, ChapterBatchGenerator};
pub use bibliography::{build_bibliography_request, parse_references, BibliographyGenerator};
pub use cancel::CancellationRegistry;
pub use orchestrator::{GenerationPipeline, PipelineConfig, PipelineError, Retryable};
