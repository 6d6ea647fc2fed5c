//! Document classifier and cross-reference resolver for rulegraph.
//!
//! [`analyze`] is a pure function of a [`RawDocument`] and a
//! [`PatternRegistry`]: the same inputs always give the same
//! [`Classification`] and cross-references, whatever thread runs it.
//! It never fails; input too short to classify yields the default
//! classification with `degraded` set.

pub mod complexity;
pub mod filing;
pub mod provisions;
pub mod references;
pub mod scoring;
mod text;

use rulegraph_patterns::PatternRegistry;
use rulegraph_shared::{Classification, ClassifierConfig, CrossReference, RawDocument};

pub use references::{normalize_identifier, resolve};

/// Classifier thresholds, usually built from `[classifier]` config.
#[derive(Debug, Clone)]
pub struct ClassifyOptions {
    /// Inputs shorter than this many chars are not classified.
    pub min_text_len: usize,
    /// Snippets must be longer than this many chars.
    pub min_snippet_len: usize,
    /// Snippets are truncated to this many chars.
    pub max_snippet_len: usize,
    /// Context kept around each cross-reference mention.
    pub snippet_context_chars: usize,
}

impl Default for ClassifyOptions {
    fn default() -> Self {
        Self::from(&ClassifierConfig::default())
    }
}

impl From<&ClassifierConfig> for ClassifyOptions {
    fn from(config: &ClassifierConfig) -> Self {
        Self {
            min_text_len: config.min_text_len,
            min_snippet_len: config.min_snippet_len,
            max_snippet_len: config.max_snippet_len,
            snippet_context_chars: config.snippet_context_chars,
        }
    }
}

/// Classification plus resolved cross-references for one document.
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentAnalysis {
    pub classification: Classification,
    pub cross_references: Vec<CrossReference>,
}

/// Classify a document and resolve its cross-references.
pub fn analyze(doc: &RawDocument, registry: &PatternRegistry, opts: &ClassifyOptions) -> DocumentAnalysis {
    let text = doc.source_text.as_str();
    if text.chars().count() < opts.min_text_len {
        tracing::debug!(identifier = %doc.identifier, len = text.len(), "text too short, degraded classification");
        return DocumentAnalysis {
            classification: Classification::degraded(),
            cross_references: Vec::new(),
        };
    }

    let lower = text.to_lowercase();
    let cross_references = references::resolve(&doc.identifier, text, registry, opts);

    let document_type = scoring::document_type(doc, registry);
    let filing_relevance_tier = scoring::filing_relevance(text, registry);
    let procedural_area = scoring::procedural_area(&lower, registry);
    let authoritative = scoring::is_authoritative(&doc.url, registry);
    let (complexity_score, complexity_level) =
        complexity::assess(text, registry, cross_references.len());

    let classification = Classification {
        document_type,
        filing_relevance_tier,
        procedural_area,
        urgency_level: scoring::urgency(text, registry),
        complexity_score,
        complexity_level,
        confidence_score: scoring::confidence(
            document_type,
            filing_relevance_tier,
            procedural_area,
            authoritative,
        ),
        filing_question_analysis: filing::analyze(text, &lower, registry, opts),
        obligations: provisions::obligations(text, registry, opts),
        rule_status: provisions::rule_status(text, &lower, registry),
        entities: provisions::entities(text, registry),
        degraded: false,
    };

    tracing::trace!(
        identifier = %doc.identifier,
        document_type = classification.document_type.as_str(),
        tier = classification.filing_relevance_tier.as_str(),
        references = cross_references.len(),
        "classified document"
    );

    DocumentAnalysis {
        classification,
        cross_references,
    }
}

/// Classification only.
pub fn classify(doc: &RawDocument, registry: &PatternRegistry, opts: &ClassifyOptions) -> Classification {
    analyze(doc, registry, opts).classification
}
