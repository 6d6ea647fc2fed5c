//! Error types for rulegraph.
//!
//! Library crates use [`RuleGraphError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.
//!
//! Steady-state batch outcomes (degraded classifications, duplicate
//! fingerprints, graph overflow) are report values, not errors.

use std::path::PathBuf;

/// Top-level error type for all rulegraph operations.
#[derive(Debug, thiserror::Error)]
pub enum RuleGraphError {
    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// A document could not be retrieved from its source.
    #[error("source fetch failed for {identifier}: {message}")]
    SourceFetch { identifier: String, message: String },

    /// Text extraction failed or the payload type is unsupported.
    #[error("extraction error for {identifier}: {message}")]
    Extraction { identifier: String, message: String },

    /// Persisted corpus could not be read back.
    #[error("corpus at {path:?} is corrupt: {message}")]
    CorpusCorruption { path: PathBuf, message: String },

    /// Pattern registry entry failed to compile or is malformed.
    #[error("pattern error in {category}: {message}")]
    Pattern { category: String, message: String },

    /// JSON encode/decode failure outside the corpus file.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Data validation error (bad identifier, invalid option value, etc.).
    #[error("validation error: {message}")]
    Validation { message: String },
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, RuleGraphError>;

impl RuleGraphError {
    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Create a source fetch error for one document.
    pub fn source_fetch(identifier: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::SourceFetch {
            identifier: identifier.into(),
            message: msg.into(),
        }
    }

    /// Create an extraction error for one document.
    pub fn extraction(identifier: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Extraction {
            identifier: identifier.into(),
            message: msg.into(),
        }
    }

    /// Create a corpus corruption error for the given file.
    pub fn corpus_corruption(path: impl Into<PathBuf>, msg: impl Into<String>) -> Self {
        Self::CorpusCorruption {
            path: path.into(),
            message: msg.into(),
        }
    }

    /// Create a pattern registry error for a category.
    pub fn pattern(category: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Pattern {
            category: category.into(),
            message: msg.into(),
        }
    }

    /// Create a validation error from any displayable message.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation {
            message: msg.into(),
        }
    }

    /// Wrap a `std::io::Error` with a path for context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Whether a retry could plausibly succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::SourceFetch { .. } | Self::Io { .. })
    }
}

impl From<serde_json::Error> for RuleGraphError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}
