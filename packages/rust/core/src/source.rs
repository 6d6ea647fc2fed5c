//! Document sources: where pre-extracted rule text comes from.

use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use rulegraph_shared::{Result, RuleGraphError};
use serde::Deserialize;
use tracing::{debug, instrument, warn};

use crate::extract::{ExtractionRequest, TextExtractor, Utf8Extractor, media_type_for_extension};

/// Handle to one document, as listed by [`DocumentSource::enumerate`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentRef {
    /// Canonical id, stable across runs.
    pub identifier: String,
    /// Source-specific location (file path, URL, ...).
    pub locator: String,
}

/// A fetched document with its extracted text.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceDocument {
    pub identifier: String,
    pub title: String,
    pub url: String,
    pub text: String,
}

/// A collection of documents the pipeline can list and fetch.
///
/// Fetch failures are reported as [`RuleGraphError::SourceFetch`] (retried)
/// or [`RuleGraphError::Extraction`] (not retried).
pub trait DocumentSource: Send + Sync {
    fn collection(&self) -> &str;

    fn enumerate(&self) -> impl Future<Output = Result<Vec<DocumentRef>>> + Send;

    fn fetch(&self, doc: &DocumentRef) -> impl Future<Output = Result<SourceDocument>> + Send;
}

// ---------------------------------------------------------------------------
// Directory source
// ---------------------------------------------------------------------------

/// Metadata fields of a `*.json` document file.
#[derive(Debug, Default, Deserialize)]
struct JsonDocument {
    #[serde(default)]
    identifier: Option<String>,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    url: Option<String>,
}

/// Reads a directory of pre-extracted documents.
///
/// - `*.json`: `{identifier, title, url, text}`; a missing identifier falls
///   back to the file stem.
/// - `*.txt` / `*.md`: identifier is the file stem, title the first
///   non-empty line, URL a `file://` URL of the path.
///
/// Other files are ignored.
pub struct DirectorySource {
    dir: PathBuf,
    collection: String,
    extractor: Arc<dyn TextExtractor>,
}

impl DirectorySource {
    pub fn new(dir: impl Into<PathBuf>, collection: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            collection: collection.into(),
            extractor: Arc::new(Utf8Extractor),
        }
    }

    /// Use a different extractor for file payloads.
    pub fn with_extractor(mut self, extractor: Arc<dyn TextExtractor>) -> Self {
        self.extractor = extractor;
        self
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

fn extension_of(path: &Path) -> Option<String> {
    path.extension().map(|e| e.to_string_lossy().to_ascii_lowercase())
}

fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}

impl DocumentSource for DirectorySource {
    fn collection(&self) -> &str {
        &self.collection
    }

    #[instrument(skip_all, fields(dir = %self.dir.display()))]
    async fn enumerate(&self) -> Result<Vec<DocumentRef>> {
        let mut read_dir = tokio::fs::read_dir(&self.dir)
            .await
            .map_err(|e| RuleGraphError::io(&self.dir, e))?;

        let mut refs = Vec::new();
        while let Some(item) = read_dir
            .next_entry()
            .await
            .map_err(|e| RuleGraphError::io(&self.dir, e))?
        {
            let path = item.path();
            let Some(ext) = extension_of(&path) else {
                continue;
            };
            if media_type_for_extension(&ext).is_none() || !path.is_file() {
                continue;
            }

            let mut identifier = file_stem(&path);
            if ext == "json" {
                match tokio::fs::read(&path).await {
                    Ok(bytes) => {
                        if let Ok(JsonDocument { identifier: Some(id), .. }) =
                            serde_json::from_slice::<JsonDocument>(&bytes)
                        {
                            identifier = id;
                        }
                    }
                    Err(e) => warn!(path = %path.display(), error = %e, "unreadable document file"),
                }
            }

            refs.push(DocumentRef {
                identifier,
                locator: path.to_string_lossy().into_owned(),
            });
        }

        refs.sort_by(|a, b| a.identifier.cmp(&b.identifier).then_with(|| a.locator.cmp(&b.locator)));
        refs.dedup_by(|later, earlier| {
            let dup = later.identifier == earlier.identifier;
            if dup {
                warn!(identifier = %later.identifier, skipped = %later.locator, "duplicate identifier in directory");
            }
            dup
        });
        debug!(count = refs.len(), "documents enumerated");
        Ok(refs)
    }

    async fn fetch(&self, doc: &DocumentRef) -> Result<SourceDocument> {
        let path = PathBuf::from(&doc.locator);
        let bytes = tokio::fs::read(&path)
            .await
            .map_err(|e| RuleGraphError::source_fetch(&doc.identifier, format!("{}: {e}", path.display())))?;

        let ext = extension_of(&path).unwrap_or_default();
        let media_type = media_type_for_extension(&ext).unwrap_or("application/octet-stream");

        let extracted = self
            .extractor
            .extract(&ExtractionRequest {
                identifier: doc.identifier.clone(),
                media_type: media_type.to_string(),
                bytes: bytes.clone(),
            })
            .map_err(|e| RuleGraphError::extraction(&doc.identifier, e.to_string()))?;
        for warning in &extracted.warnings {
            warn!(identifier = %doc.identifier, warning = %warning, "extraction warning");
        }

        let file_url = format!("file://{}", path.display());
        let (title, url) = if ext == "json" {
            let meta: JsonDocument = serde_json::from_slice(&bytes).unwrap_or_default();
            (meta.title, meta.url)
        } else {
            (None, None)
        };
        let title = title.unwrap_or_else(|| {
            extracted
                .text
                .lines()
                .map(str::trim)
                .find(|l| !l.is_empty())
                .unwrap_or(&doc.identifier)
                .to_string()
        });

        Ok(SourceDocument {
            identifier: doc.identifier.clone(),
            title,
            url: url.unwrap_or(file_url),
            text: extracted.text,
        })
    }
}
