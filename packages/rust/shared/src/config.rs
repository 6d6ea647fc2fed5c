//! Application configuration for rulegraph.
//!
//! User config lives at `~/.rulegraph/rulegraph.toml`.
//! CLI flags override config file values, which override defaults.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Result, RuleGraphError};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "rulegraph.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".rulegraph";

// ---------------------------------------------------------------------------
// Config structs (matching rulegraph.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Corpus persistence and staleness policy.
    #[serde(default)]
    pub corpus: CorpusConfig,

    /// Graph size limits and output formats.
    #[serde(default)]
    pub graph: GraphConfig,

    /// Document source fetching.
    #[serde(default)]
    pub fetch: FetchConfig,

    /// Classifier thresholds.
    #[serde(default)]
    pub classifier: ClassifierConfig,

    /// Pattern registry location.
    #[serde(default)]
    pub patterns: PatternsConfig,
}

/// Digest used for content fingerprints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FingerprintAlgorithm {
    #[default]
    Sha256,
    Sha512,
}

impl FingerprintAlgorithm {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sha256 => "sha256",
            Self::Sha512 => "sha512",
        }
    }
}

/// `[corpus]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorpusConfig {
    /// Directory holding one sub-directory per collection.
    #[serde(default = "default_data_dir")]
    pub data_dir: String,

    /// Hours after which a corpus is reprocessed in full.
    #[serde(default = "default_stale_threshold_hours")]
    pub stale_threshold_hours: f64,

    /// Leading characters of normalized text covered by the fingerprint.
    #[serde(default = "default_fingerprint_window")]
    pub fingerprint_window_chars: usize,

    /// Fingerprint digest.
    #[serde(default)]
    pub fingerprint_algorithm: FingerprintAlgorithm,
}

impl Default for CorpusConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            stale_threshold_hours: default_stale_threshold_hours(),
            fingerprint_window_chars: default_fingerprint_window(),
            fingerprint_algorithm: FingerprintAlgorithm::default(),
        }
    }
}

fn default_data_dir() -> String {
    "~/rulegraph-data".into()
}
fn default_stale_threshold_hours() -> f64 {
    24.0
}
fn default_fingerprint_window() -> usize {
    1000
}

/// Graph serialization format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GraphFormat {
    /// Attribute-graph JSON (`{nodes:[{data}], edges:[{data}]}`).
    Attribute,
    /// Force-layout JSON (`{nodes, links}`).
    Force,
    /// GraphML XML.
    Graphml,
}

impl GraphFormat {
    pub const ALL: [GraphFormat; 3] = [Self::Attribute, Self::Force, Self::Graphml];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Attribute => "attribute",
            Self::Force => "force",
            Self::Graphml => "graphml",
        }
    }
}

impl std::str::FromStr for GraphFormat {
    type Err = RuleGraphError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "attribute" | "cytoscape" => Ok(Self::Attribute),
            "force" | "d3" => Ok(Self::Force),
            "graphml" => Ok(Self::Graphml),
            other => Err(RuleGraphError::config(format!(
                "unknown graph format '{other}' (expected attribute, force, graphml)"
            ))),
        }
    }
}

/// `[graph]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphConfig {
    /// Node cap; lowest-relevance nodes are dropped beyond it.
    #[serde(default = "default_max_nodes")]
    pub max_nodes: usize,

    /// Edge cap; lowest-weight edges are dropped beyond it.
    #[serde(default = "default_max_edges")]
    pub max_edges: usize,

    /// Formats written by every run.
    #[serde(default = "default_output_formats")]
    pub output_formats: Vec<GraphFormat>,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            max_nodes: default_max_nodes(),
            max_edges: default_max_edges(),
            output_formats: default_output_formats(),
        }
    }
}

fn default_max_nodes() -> usize {
    1000
}
fn default_max_edges() -> usize {
    2000
}
fn default_output_formats() -> Vec<GraphFormat> {
    GraphFormat::ALL.to_vec()
}

/// `[fetch]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchConfig {
    /// Maximum in-flight source calls.
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,

    /// Fixed delay before each source call, in ms.
    #[serde(default = "default_delay_ms")]
    pub delay_ms: u64,

    /// Retries after the first failed attempt.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Initial backoff between retries, doubled each attempt.
    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            concurrency: default_concurrency(),
            delay_ms: default_delay_ms(),
            max_retries: default_max_retries(),
            retry_backoff_ms: default_retry_backoff_ms(),
        }
    }
}

fn default_concurrency() -> usize {
    3
}
fn default_delay_ms() -> u64 {
    2000
}
fn default_max_retries() -> u32 {
    3
}
fn default_retry_backoff_ms() -> u64 {
    500
}

/// `[classifier]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassifierConfig {
    /// Inputs shorter than this (in chars) get the default classification.
    #[serde(default = "default_min_text_len")]
    pub min_text_len: usize,

    /// Snippets must be longer than this many chars to be kept.
    #[serde(default = "default_min_snippet_len")]
    pub min_snippet_len: usize,

    /// Snippets are truncated to this many chars.
    #[serde(default = "default_max_snippet_len")]
    pub max_snippet_len: usize,

    /// Chars of context kept on each side of a cross-reference mention.
    #[serde(default = "default_snippet_context")]
    pub snippet_context_chars: usize,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            min_text_len: default_min_text_len(),
            min_snippet_len: default_min_snippet_len(),
            max_snippet_len: default_max_snippet_len(),
            snippet_context_chars: default_snippet_context(),
        }
    }
}

fn default_min_text_len() -> usize {
    50
}
fn default_min_snippet_len() -> usize {
    3
}
fn default_max_snippet_len() -> usize {
    250
}
fn default_snippet_context() -> usize {
    40
}

/// `[patterns]` section.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PatternsConfig {
    /// Replacement registry table; the built-in table is used when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub registry_path: Option<String>,
}

// ---------------------------------------------------------------------------
// Validation & path helpers
// ---------------------------------------------------------------------------

impl AppConfig {
    /// Reject values that would make a run meaningless.
    pub fn validate(&self) -> Result<()> {
        if self.graph.max_nodes == 0 || self.graph.max_edges == 0 {
            return Err(RuleGraphError::config(
                "graph.max_nodes and graph.max_edges must be positive",
            ));
        }
        if self.fetch.concurrency == 0 {
            return Err(RuleGraphError::config("fetch.concurrency must be positive"));
        }
        if !(self.corpus.stale_threshold_hours >= 0.0) {
            return Err(RuleGraphError::config(
                "corpus.stale_threshold_hours must be a non-negative number",
            ));
        }
        if self.corpus.fingerprint_window_chars == 0 {
            return Err(RuleGraphError::config(
                "corpus.fingerprint_window_chars must be positive",
            ));
        }
        if self.graph.output_formats.is_empty() {
            return Err(RuleGraphError::config("graph.output_formats is empty"));
        }
        Ok(())
    }

    /// Resolved corpus data directory.
    pub fn data_dir(&self) -> Result<PathBuf> {
        expand_home(&self.corpus.data_dir)
    }
}

/// Expand a leading `~/` to the user's home directory.
pub fn expand_home(path: &str) -> Result<PathBuf> {
    match path.strip_prefix("~/") {
        Some(rest) => {
            let home = dirs::home_dir()
                .ok_or_else(|| RuleGraphError::config("could not determine home directory"))?;
            Ok(home.join(rest))
        }
        None => Ok(PathBuf::from(path)),
    }
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.rulegraph/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| RuleGraphError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.rulegraph/rulegraph.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| RuleGraphError::io(path, e))?;

    let config: AppConfig = toml::from_str(&content).map_err(|e| {
        RuleGraphError::config(format!("failed to parse {}: {e}", path.display()))
    })?;
    config.validate()?;
    Ok(config)
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| RuleGraphError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| RuleGraphError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| RuleGraphError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_serializes() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize default config");
        assert!(toml_str.contains("stale_threshold_hours"));
        assert!(toml_str.contains("max_nodes"));
        assert!(toml_str.contains("\"graphml\""));
    }

    #[test]
    fn config_roundtrip() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize");
        let parsed: AppConfig = toml::from_str(&toml_str).expect("deserialize");
        assert_eq!(parsed.corpus.stale_threshold_hours, 24.0);
        assert_eq!(parsed.graph.max_nodes, 1000);
        assert_eq!(parsed.graph.max_edges, 2000);
        assert_eq!(parsed.fetch.max_retries, 3);
        assert_eq!(parsed.classifier.min_text_len, 50);
        assert_eq!(parsed.graph.output_formats, GraphFormat::ALL.to_vec());
    }

    #[test]
    fn partial_config_fills_defaults() {
        let toml_str = r#"
[corpus]
stale_threshold_hours = 6
fingerprint_algorithm = "sha512"

[graph]
output_formats = ["graphml"]
"#;
        let config: AppConfig = toml::from_str(toml_str).expect("parse");
        assert_eq!(config.corpus.stale_threshold_hours, 6.0);
        assert_eq!(
            config.corpus.fingerprint_algorithm,
            FingerprintAlgorithm::Sha512
        );
        assert_eq!(config.corpus.fingerprint_window_chars, 1000);
        assert_eq!(config.graph.output_formats, vec![GraphFormat::Graphml]);
        assert_eq!(config.graph.max_nodes, 1000);
        assert!(config.patterns.registry_path.is_none());
    }

    #[test]
    fn validation_rejects_zero_limits() {
        let mut config = AppConfig::default();
        assert!(config.validate().is_ok());
        config.graph.max_nodes = 0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("max_nodes"));
    }

    #[test]
    fn graph_format_parsing_accepts_aliases() {
        assert_eq!("d3".parse::<GraphFormat>().unwrap(), GraphFormat::Force);
        assert_eq!(
            "Cytoscape".parse::<GraphFormat>().unwrap(),
            GraphFormat::Attribute
        );
        assert!("svg".parse::<GraphFormat>().is_err());
    }

    #[test]
    fn expand_home_leaves_absolute_paths() {
        assert_eq!(
            expand_home("/var/lib/rulegraph").unwrap(),
            PathBuf::from("/var/lib/rulegraph")
        );
    }
}
