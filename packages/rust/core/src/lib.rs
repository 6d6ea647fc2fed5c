//! Batch pipeline for rulegraph.
//!
//! Ties the pattern registry, classifier, corpus store and graph builder
//! into one run over a [`DocumentSource`]:
//! - [`source`]: enumerating and fetching pre-extracted documents
//! - [`extract`]: the pluggable bytes-to-text seam
//! - [`retry`]: backoff for transient fetch failures
//! - [`pipeline`]: [`run_batch`] and its report

pub mod extract;
pub mod pipeline;
pub mod retry;
pub mod source;

pub use extract::{
    ExtractionError, ExtractionRequest, ExtractionResult, TextExtractor, Utf8Extractor,
    media_type_for_extension,
};
pub use pipeline::{
    BatchConfig, BatchReport, FailedDocument, ProgressReporter, SilentProgress, load_registry,
    process_document, run_batch,
};
pub use retry::RetryPolicy;
pub use source::{DirectorySource, DocumentRef, DocumentSource, SourceDocument};
