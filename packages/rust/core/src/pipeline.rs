//! Batch pipeline: source → classify → merge → graph.
//!
//! One run processes one collection. Eligible documents are fetched and
//! classified by a bounded pool of tokio tasks; results are buffered and
//! flushed to the corpus store with a single merge + save, then the graph
//! is rebuilt from the whole corpus.

use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::Semaphore;
use tracing::{debug, info, instrument, warn};

use rulegraph_classifier::{ClassifyOptions, analyze};
use rulegraph_graph::{GraphLimits, GraphOverflow, assemble, write_outputs};
use rulegraph_patterns::PatternRegistry;
use rulegraph_shared::{
    AppConfig, CorpusEntry, FingerprintAlgorithm, GraphFormat, PatternsConfig, RawDocument,
    Result, RuleGraphError, expand_home,
};
use rulegraph_storage::{CorpusState, CorpusStore, MergeReport, corpus_path, fingerprint};

use crate::retry::RetryPolicy;
use crate::source::{DocumentRef, DocumentSource, SourceDocument};

/// Sub-directory of a collection holding graph files.
const GRAPH_DIR_NAME: &str = "graph";

/// Runtime settings of one batch run.
#[derive(Debug, Clone)]
pub struct BatchConfig {
    pub corpus_path: PathBuf,
    pub output_dir: PathBuf,
    pub stale_threshold_hours: f64,
    pub fingerprint_window_chars: usize,
    pub fingerprint_algorithm: FingerprintAlgorithm,
    pub concurrency: usize,
    /// Sleep before each source call.
    pub delay: Duration,
    pub retry: RetryPolicy,
    pub classify: ClassifyOptions,
    pub limits: GraphLimits,
    pub formats: Vec<GraphFormat>,
}

impl BatchConfig {
    /// Settings for `collection` from the application config, with the
    /// corpus and graph files under `<data_dir>/<collection>/`.
    pub fn from_app_config(config: &AppConfig, collection: &str) -> Result<Self> {
        let data_dir = expand_home(&config.corpus.data_dir)?;
        Ok(Self {
            corpus_path: corpus_path(&data_dir, collection),
            output_dir: data_dir.join(collection).join(GRAPH_DIR_NAME),
            stale_threshold_hours: config.corpus.stale_threshold_hours,
            fingerprint_window_chars: config.corpus.fingerprint_window_chars,
            fingerprint_algorithm: config.corpus.fingerprint_algorithm,
            concurrency: config.fetch.concurrency.max(1),
            delay: Duration::from_millis(config.fetch.delay_ms),
            retry: RetryPolicy::from(&config.fetch),
            classify: ClassifyOptions::from(&config.classifier),
            limits: GraphLimits::from(&config.graph),
            formats: config.graph.output_formats.clone(),
        })
    }
}

/// Load the registry named by `[patterns]`, or the built-in table.
pub fn load_registry(config: &PatternsConfig) -> Result<PatternRegistry> {
    match &config.registry_path {
        Some(path) => PatternRegistry::load(&expand_home(path)?),
        None => PatternRegistry::builtin(),
    }
}

// ---------------------------------------------------------------------------
// Reports & progress
// ---------------------------------------------------------------------------

/// A document that could not be fetched or extracted.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FailedDocument {
    pub identifier: String,
    pub error: String,
}

/// Outcome of one batch run.
#[derive(Debug, Clone, Serialize)]
pub struct BatchReport {
    pub collection: String,
    pub started_at: DateTime<Utc>,
    /// The run reprocessed the whole collection.
    pub stale: bool,
    pub age_hours: Option<f64>,
    pub state_before: CorpusState,
    pub state_after: CorpusState,
    /// Load problem of the persisted corpus, if it was discarded.
    pub corpus_warning: Option<String>,
    pub eligible: usize,
    pub skipped: Vec<String>,
    /// Fully classified documents. `succeeded`, `degraded` and `failed`
    /// partition `eligible`; duplicates rejected by the merge are counted
    /// here too and listed in `merge.duplicates`.
    pub succeeded: usize,
    /// Fetched but too short to classify.
    pub degraded: usize,
    pub failed: Vec<FailedDocument>,
    pub merge: MergeReport,
    pub corpus_size: usize,
    pub graph_nodes: usize,
    pub graph_edges: usize,
    pub overflow: Option<GraphOverflow>,
    pub written: Vec<PathBuf>,
    pub elapsed_ms: u64,
}

/// Progress callback for reporting pipeline status.
pub trait ProgressReporter: Send + Sync {
    /// Called when entering a new phase.
    fn phase(&self, name: &str);
    /// Called as each eligible document finishes, successfully or not.
    fn document_done(&self, identifier: &str, current: usize, total: usize);
    /// Called when the run completes.
    fn done(&self, report: &BatchReport);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl ProgressReporter for SilentProgress {
    fn phase(&self, _name: &str) {}
    fn document_done(&self, _identifier: &str, _current: usize, _total: usize) {}
    fn done(&self, _report: &BatchReport) {}
}

// ---------------------------------------------------------------------------
// Document processing
// ---------------------------------------------------------------------------

/// Classify one fetched document into a corpus entry.
///
/// Pure apart from the timestamps passed in.
pub fn process_document(
    doc: SourceDocument,
    registry: &PatternRegistry,
    config: &BatchConfig,
    now: DateTime<Utc>,
) -> CorpusEntry {
    let content_fingerprint = fingerprint(
        &doc.text,
        config.fingerprint_window_chars,
        config.fingerprint_algorithm,
    );
    let raw = RawDocument {
        identifier: doc.identifier,
        title: doc.title,
        url: doc.url,
        source_text: doc.text,
        discovered_at: now,
    };
    let analysis = analyze(&raw, registry, &config.classify);

    CorpusEntry {
        canonical_id: raw.identifier.clone(),
        document: raw,
        classification: analysis.classification,
        cross_references: analysis.cross_references,
        content_fingerprint,
        processed_at: now,
    }
}

/// Fetch (with retries) and classify one document.
async fn fetch_and_process<S: DocumentSource>(
    source: &S,
    doc_ref: &DocumentRef,
    registry: &PatternRegistry,
    config: &BatchConfig,
    now: DateTime<Utc>,
) -> Result<CorpusEntry> {
    let doc = config
        .retry
        .retry(&format!("fetch {}", doc_ref.identifier), || source.fetch(doc_ref))
        .await?;
    if doc.identifier != doc_ref.identifier {
        return Err(RuleGraphError::validation(format!(
            "source returned '{}' for '{}'",
            doc.identifier, doc_ref.identifier
        )));
    }
    Ok(process_document(doc, registry, config, now))
}

// ---------------------------------------------------------------------------
// Batch run
// ---------------------------------------------------------------------------

/// Run the full pipeline over `source`.
///
/// Per-document failures are counted in the report and never abort the
/// batch. Errors are returned only for whole-run problems: the source
/// cannot be enumerated, or the corpus or graph files cannot be written.
#[instrument(skip_all, fields(collection = %source.collection()))]
pub async fn run_batch<S: DocumentSource + 'static>(
    source: Arc<S>,
    registry: Arc<PatternRegistry>,
    config: &BatchConfig,
    now: DateTime<Utc>,
    progress: &dyn ProgressReporter,
) -> Result<BatchReport> {
    let start = Instant::now();
    let collection = source.collection().to_string();

    // Phase 1: plan
    progress.phase("Planning");
    let refs = source.enumerate().await?;
    let source_ids: Vec<String> = refs.iter().map(|r| r.identifier.clone()).collect();

    let mut store = CorpusStore::open(&config.corpus_path, &collection);
    let corpus_warning = match store.load_outcome() {
        rulegraph_storage::LoadOutcome::Corrupt(e) => Some(e.to_string()),
        _ => None,
    };
    let state_before = store.state(&source_ids);
    let plan = store.plan(&source_ids, now, config.stale_threshold_hours);

    // Phase 2: fetch + classify
    progress.phase("Classifying");
    let eligible_ids: HashSet<&str> = plan.eligible.iter().map(String::as_str).collect();
    let eligible: Vec<DocumentRef> = refs
        .into_iter()
        .filter(|r| eligible_ids.contains(r.identifier.as_str()))
        .collect();
    let total = eligible.len();

    let semaphore = Arc::new(Semaphore::new(config.concurrency.max(1)));
    let shared_config = Arc::new(config.clone());
    let mut handles = Vec::with_capacity(total);

    for doc_ref in eligible {
        let source = source.clone();
        let registry = registry.clone();
        let sem = semaphore.clone();
        let task_config = shared_config.clone();

        let identifier = doc_ref.identifier.clone();
        handles.push((
            identifier,
            tokio::spawn(async move {
                let _permit = sem
                    .acquire()
                    .await
                    .map_err(|e| RuleGraphError::source_fetch(&doc_ref.identifier, e.to_string()))?;

                if !task_config.delay.is_zero() {
                    tokio::time::sleep(task_config.delay).await;
                }

                fetch_and_process(source.as_ref(), &doc_ref, &registry, &task_config, now).await
            }),
        ));
    }

    let mut entries = Vec::with_capacity(total);
    let mut failed = Vec::new();
    let mut degraded = 0;
    for (i, (identifier, handle)) in handles.into_iter().enumerate() {
        match handle.await {
            Ok(Ok(mut entry)) => {
                if let Some(previous) = store.get(&entry.canonical_id) {
                    entry.document.discovered_at = previous.document.discovered_at;
                }
                if entry.classification.degraded {
                    degraded += 1;
                }
                debug!(
                    identifier = %entry.canonical_id,
                    document_type = entry.classification.document_type.as_str(),
                    references = entry.cross_references.len(),
                    "document classified"
                );
                entries.push(entry);
            }
            Ok(Err(e)) => {
                warn!(identifier = %identifier, error = %e, "document failed");
                failed.push(FailedDocument {
                    identifier: identifier.clone(),
                    error: e.to_string(),
                });
            }
            Err(e) => {
                warn!(identifier = %identifier, error = %e, "document task aborted");
                failed.push(FailedDocument {
                    identifier: identifier.clone(),
                    error: format!("task failed: {e}"),
                });
            }
        }
        progress.document_done(&identifier, i + 1, total);
    }
    let succeeded = entries.len() - degraded;

    // Phase 3: single-writer flush
    progress.phase("Merging");
    let merge = store.merge(entries);
    if plan.stale {
        store.mark_full_refresh(now);
    }
    store.save()?;
    let state_after = store.state(&source_ids);

    // Phase 4: graph
    progress.phase("Building graph");
    let corpus: Vec<CorpusEntry> = store.entries().cloned().collect();
    let graph = assemble(&collection, &corpus, config.limits);
    let analysis = rulegraph_graph::analyze(&graph, now);
    let written = write_outputs(&graph, &analysis, &config.output_dir, &collection, &config.formats)?;

    let report = BatchReport {
        collection,
        started_at: now,
        stale: plan.stale,
        age_hours: plan.age_hours,
        state_before,
        state_after,
        corpus_warning,
        eligible: total,
        skipped: plan.skipped,
        succeeded,
        degraded,
        failed,
        merge,
        corpus_size: store.len(),
        graph_nodes: graph.node_count(),
        graph_edges: graph.edge_count(),
        overflow: graph.overflow.clone(),
        written,
        elapsed_ms: start.elapsed().as_millis() as u64,
    };

    info!(
        eligible = report.eligible,
        skipped = report.skipped.len(),
        succeeded = report.succeeded,
        degraded = report.degraded,
        failed = report.failed.len(),
        duplicates = report.merge.duplicates.len(),
        corpus_size = report.corpus_size,
        nodes = report.graph_nodes,
        edges = report.graph_edges,
        elapsed_ms = report.elapsed_ms,
        "batch complete"
    );

    progress.done(&report);
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::{BTreeMap, HashMap};
    use std::sync::Mutex;

    use rulegraph_graph::NodeType;

    /// In-memory source; ids in `broken` always fail, ids in `flaky` fail once.
    struct MemorySource {
        docs: BTreeMap<String, SourceDocument>,
        broken: Vec<String>,
        flaky: Mutex<HashMap<String, u32>>,
    }

    impl MemorySource {
        fn new(docs: &[(&str, &str)]) -> Self {
            Self {
                docs: docs
                    .iter()
                    .map(|(id, text)| {
                        (
                            id.to_string(),
                            SourceDocument {
                                identifier: id.to_string(),
                                title: format!("Rule {id}"),
                                url: format!("https://www.courts.ca.gov/rules/{id}"),
                                text: text.to_string(),
                            },
                        )
                    })
                    .collect(),
                broken: Vec::new(),
                flaky: Mutex::new(HashMap::new()),
            }
        }
    }

    impl DocumentSource for MemorySource {
        fn collection(&self) -> &str {
            "civil"
        }

        async fn enumerate(&self) -> Result<Vec<DocumentRef>> {
            Ok(self
                .docs
                .keys()
                .map(|id| DocumentRef {
                    identifier: id.clone(),
                    locator: format!("mem://{id}"),
                })
                .collect())
        }

        async fn fetch(&self, doc: &DocumentRef) -> Result<SourceDocument> {
            if self.broken.contains(&doc.identifier) {
                return Err(RuleGraphError::source_fetch(&doc.identifier, "connection refused"));
            }
            {
                let mut flaky = self.flaky.lock().unwrap();
                if let Some(remaining) = flaky.get_mut(&doc.identifier) {
                    if *remaining > 0 {
                        *remaining -= 1;
                        return Err(RuleGraphError::source_fetch(&doc.identifier, "timeout"));
                    }
                }
            }
            self.docs
                .get(&doc.identifier)
                .cloned()
                .ok_or_else(|| RuleGraphError::source_fetch(&doc.identifier, "not found"))
        }
    }

    fn test_config() -> (BatchConfig, PathBuf) {
        let root = std::env::temp_dir().join(format!("rulegraph_pipeline_{}", uuid::Uuid::now_v7()));
        let config = BatchConfig {
            corpus_path: corpus_path(&root, "civil"),
            output_dir: root.join("civil").join(GRAPH_DIR_NAME),
            stale_threshold_hours: 24.0,
            fingerprint_window_chars: 1000,
            fingerprint_algorithm: FingerprintAlgorithm::Sha256,
            concurrency: 2,
            delay: Duration::ZERO,
            retry: RetryPolicy::none(),
            classify: ClassifyOptions::default(),
            limits: GraphLimits::default(),
            formats: GraphFormat::ALL.to_vec(),
        };
        (config, root)
    }

    const MSJ: &str = "Motions for summary judgment must comply with CRC 3.1350. \
                       The separate statement format is set by the rule.";

    fn corpus_docs() -> Vec<(&'static str, String)> {
        vec![
            ("a", format!("{MSJ} Department 1 handles these.")),
            ("b", format!("{MSJ} Opposition papers are due 14 days before.")),
            ("c", format!("{MSJ} Reply papers are due 5 days before.")),
            ("d", "Unreachable document text that is long enough to classify.".into()),
        ]
    }

    #[tokio::test]
    async fn end_to_end_with_failing_document() {
        let (config, root) = test_config();
        let docs = corpus_docs();
        let docs_ref: Vec<(&str, &str)> = docs.iter().map(|(id, t)| (*id, t.as_str())).collect();
        let mut source = MemorySource::new(&docs_ref);
        source.broken.push("d".into());
        let source = Arc::new(source);
        let registry = Arc::new(PatternRegistry::builtin().unwrap());
        let now = Utc::now();

        let report = run_batch(source.clone(), registry.clone(), &config, now, &SilentProgress)
            .await
            .unwrap();

        assert!(report.stale);
        assert_eq!(report.state_before, CorpusState::Empty);
        assert_eq!(report.state_after, CorpusState::Partial);
        assert_eq!(report.eligible, 4);
        assert_eq!(report.succeeded, 3);
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].identifier, "d");
        assert_eq!(report.degraded, 0);
        assert_eq!(report.merge.added, vec!["a", "b", "c"]);
        assert_eq!(report.corpus_size, 3);
        assert_eq!(report.written.len(), 4);
        assert!(config.corpus_path.exists());

        // Three documents citing CRC 3.1350 share one reference node.
        let store = CorpusStore::open(&config.corpus_path, "civil");
        let corpus: Vec<CorpusEntry> = store.entries().cloned().collect();
        let graph = assemble("civil", &corpus, config.limits);
        assert_eq!(graph.nodes_of(NodeType::LegalReference).count(), 1);
        assert_eq!(graph.inbound("ref_court_rule_3_1350").count(), 3);

        // An hour later only the missing document is retried.
        let later = now + chrono::Duration::hours(1);
        let report = run_batch(source.clone(), registry.clone(), &config, later, &SilentProgress)
            .await
            .unwrap();
        assert!(!report.stale);
        assert_eq!(report.eligible, 1);
        assert_eq!(report.skipped, vec!["a", "b", "c"]);
        assert_eq!(report.failed.len(), 1);
        // The staleness clock still runs from the first full run.
        assert_eq!(
            CorpusStore::open(&config.corpus_path, "civil").processed_at(),
            Some(now)
        );

        // Past the threshold everything is reprocessed.
        let much_later = now + chrono::Duration::hours(25);
        let report = run_batch(source, registry, &config, much_later, &SilentProgress)
            .await
            .unwrap();
        assert!(report.stale);
        assert_eq!(report.eligible, 4);
        assert_eq!(report.merge.replaced, vec!["a", "b", "c"]);

        std::fs::remove_dir_all(&root).ok();
    }

    #[tokio::test]
    async fn graph_files_identical_across_reruns() {
        let (config, root) = test_config();
        let docs = corpus_docs();
        let docs_ref: Vec<(&str, &str)> = docs.iter().map(|(id, t)| (*id, t.as_str())).collect();
        let source = Arc::new(MemorySource::new(&docs_ref[..3]));
        let registry = Arc::new(PatternRegistry::builtin().unwrap());
        let now = Utc::now();

        let first = run_batch(source.clone(), registry.clone(), &config, now, &SilentProgress)
            .await
            .unwrap();
        let graphml_path = first
            .written
            .iter()
            .find(|p| p.extension().is_some_and(|e| e == "graphml"))
            .unwrap()
            .clone();
        let before = std::fs::read_to_string(&graphml_path).unwrap();

        let rerun_at = now + chrono::Duration::hours(30);
        run_batch(source, registry, &config, rerun_at, &SilentProgress)
            .await
            .unwrap();
        let after = std::fs::read_to_string(&graphml_path).unwrap();
        assert_eq!(before, after);

        std::fs::remove_dir_all(&root).ok();
    }

    #[tokio::test]
    async fn transient_failures_are_retried() {
        let (mut config, root) = test_config();
        config.retry = RetryPolicy::new(2, 0);
        let source = MemorySource::new(&[("a", MSJ)]);
        source.flaky.lock().unwrap().insert("a".into(), 2);
        let report = run_batch(
            Arc::new(source),
            Arc::new(PatternRegistry::builtin().unwrap()),
            &config,
            Utc::now(),
            &SilentProgress,
        )
        .await
        .unwrap();
        assert_eq!(report.succeeded, 1);
        assert!(report.failed.is_empty());

        std::fs::remove_dir_all(&root).ok();
    }

    #[tokio::test]
    async fn duplicates_and_degraded_documents_are_counted() {
        let (config, root) = test_config();
        let source = MemorySource::new(&[("a", MSJ), ("b", MSJ), ("short", "Too short.")]);
        let report = run_batch(
            Arc::new(source),
            Arc::new(PatternRegistry::builtin().unwrap()),
            &config,
            Utc::now(),
            &SilentProgress,
        )
        .await
        .unwrap();
        assert_eq!(report.succeeded, 2);
        assert_eq!(report.degraded, 1);
        assert_eq!(report.succeeded + report.degraded + report.failed.len(), report.eligible);
        assert_eq!(report.merge.duplicates.len(), 1);
        assert_eq!(report.merge.duplicates[0].rejected_id, "b");
        assert_eq!(report.corpus_size, 2);

        std::fs::remove_dir_all(&root).ok();
    }

    #[tokio::test]
    async fn corrupt_corpus_is_rebuilt() {
        let (config, root) = test_config();
        std::fs::create_dir_all(config.corpus_path.parent().unwrap()).unwrap();
        std::fs::write(&config.corpus_path, "garbage").unwrap();

        let report = run_batch(
            Arc::new(MemorySource::new(&[("a", MSJ)])),
            Arc::new(PatternRegistry::builtin().unwrap()),
            &config,
            Utc::now(),
            &SilentProgress,
        )
        .await
        .unwrap();
        assert!(report.corpus_warning.is_some());
        assert_eq!(report.state_before, CorpusState::Empty);
        assert_eq!(report.corpus_size, 1);
        assert!(!CorpusStore::open(&config.corpus_path, "civil").load_outcome().is_corrupt());

        std::fs::remove_dir_all(&root).ok();
    }

    #[test]
    fn config_paths_follow_collection() {
        let mut app = AppConfig::default();
        app.corpus.data_dir = "/srv/rulegraph".into();
        let config = BatchConfig::from_app_config(&app, "la_civil").unwrap();
        assert_eq!(config.corpus_path, PathBuf::from("/srv/rulegraph/la_civil/corpus.json"));
        assert_eq!(config.output_dir, PathBuf::from("/srv/rulegraph/la_civil/graph"));
        assert_eq!(config.delay, Duration::from_millis(2000));
        assert_eq!(config.formats.len(), 3);
    }
}
