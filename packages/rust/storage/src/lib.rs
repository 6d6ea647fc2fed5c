//! JSON corpus store for rulegraph.
//!
//! One [`CorpusStore`] per collection, persisted as a single JSON file
//! (`<data_dir>/<collection>/corpus.json`). The store decides which
//! documents a run must process ([`CorpusStore::plan`]), merges freshly
//! classified entries ([`CorpusStore::merge`]) and writes the result back
//! atomically ([`CorpusStore::save`]).
//!
//! **Access rules:** the batch pipeline is the only writer. It buffers all
//! results of a run and flushes them with one `merge` + `save`.

pub mod fingerprint;

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use rulegraph_shared::{CorpusEntry, Result, RuleGraphError};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

pub use fingerprint::{fingerprint, normalized_window};

/// Version written into every corpus file.
pub const SCHEMA_VERSION: u32 = 1;

/// File name of a collection's corpus inside its directory.
pub const CORPUS_FILE_NAME: &str = "corpus.json";

/// Corpus file location for `collection` under `data_dir`.
pub fn corpus_path(data_dir: &Path, collection: &str) -> PathBuf {
    data_dir.join(collection).join(CORPUS_FILE_NAME)
}

// ---------------------------------------------------------------------------
// Persisted format and reports
// ---------------------------------------------------------------------------

/// On-disk shape of a corpus.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorpusFile {
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    pub collection: String,
    /// Time of the last full (stale or first) processing run.
    #[serde(default)]
    pub processed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub entries: Vec<CorpusEntry>,
}

fn default_schema_version() -> u32 {
    SCHEMA_VERSION
}

/// What [`CorpusStore::open`] found on disk.
#[derive(Debug)]
pub enum LoadOutcome {
    /// No corpus file yet.
    Missing,
    /// File parsed; this many entries were loaded.
    Loaded { entries: usize },
    /// File was unreadable or unparsable and has been treated as empty.
    Corrupt(RuleGraphError),
}

impl LoadOutcome {
    pub fn is_corrupt(&self) -> bool {
        matches!(self, Self::Corrupt(_))
    }
}

/// Coverage of a collection relative to the ids a source currently lists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CorpusState {
    Empty,
    Partial,
    Complete,
}

/// Which source ids a run must process.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunPlan {
    /// Whole corpus must be refreshed.
    pub stale: bool,
    /// Hours since the last full run; `None` when there never was one.
    pub age_hours: Option<f64>,
    pub eligible: Vec<String>,
    pub skipped: Vec<String>,
}

/// An incoming entry rejected because its text matches another entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DuplicateFingerprint {
    pub rejected_id: String,
    pub existing_id: String,
    pub fingerprint: String,
}

/// Outcome of one [`CorpusStore::merge`].
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MergeReport {
    pub added: Vec<String>,
    pub replaced: Vec<String>,
    pub duplicates: Vec<DuplicateFingerprint>,
}

// ---------------------------------------------------------------------------
// Store
// ---------------------------------------------------------------------------

/// In-memory corpus of one collection, backed by a JSON file.
#[derive(Debug)]
pub struct CorpusStore {
    path: PathBuf,
    collection: String,
    processed_at: Option<DateTime<Utc>>,
    entries: BTreeMap<String, CorpusEntry>,
    /// fingerprint -> canonical ids carrying it
    fingerprints: HashMap<String, BTreeSet<String>>,
    outcome: LoadOutcome,
}

impl CorpusStore {
    /// Load the corpus at `path`, or start empty.
    ///
    /// Never fails: a corrupt file is reported through
    /// [`load_outcome`](Self::load_outcome) and the store starts empty.
    pub fn open(path: &Path, collection: &str) -> Self {
        let mut store = Self {
            path: path.to_path_buf(),
            collection: collection.to_string(),
            processed_at: None,
            entries: BTreeMap::new(),
            fingerprints: HashMap::new(),
            outcome: LoadOutcome::Missing,
        };

        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "no corpus file, starting empty");
                return store;
            }
            Err(e) => {
                store.mark_corrupt(format!("unreadable: {e}"));
                return store;
            }
        };

        let file: CorpusFile = match serde_json::from_str(&content) {
            Ok(file) => file,
            Err(e) => {
                store.mark_corrupt(format!("invalid JSON: {e}"));
                return store;
            }
        };
        if file.collection != collection {
            store.mark_corrupt(format!(
                "holds collection '{}', expected '{collection}'",
                file.collection
            ));
            return store;
        }

        store.processed_at = file.processed_at;
        for entry in file.entries {
            store.insert(entry);
        }
        store.outcome = LoadOutcome::Loaded {
            entries: store.entries.len(),
        };
        info!(
            collection,
            entries = store.entries.len(),
            processed_at = ?store.processed_at,
            "corpus loaded"
        );
        store
    }

    fn mark_corrupt(&mut self, message: String) {
        let err = RuleGraphError::corpus_corruption(&self.path, message);
        warn!(error = %err, "treating corpus as empty");
        self.outcome = LoadOutcome::Corrupt(err);
    }

    pub fn load_outcome(&self) -> &LoadOutcome {
        &self.outcome
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    pub fn processed_at(&self) -> Option<DateTime<Utc>> {
        self.processed_at
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, canonical_id: &str) -> Option<&CorpusEntry> {
        self.entries.get(canonical_id)
    }

    pub fn contains(&self, canonical_id: &str) -> bool {
        self.entries.contains_key(canonical_id)
    }

    /// Entries in canonical id order.
    pub fn entries(&self) -> impl Iterator<Item = &CorpusEntry> {
        self.entries.values()
    }

    /// Hours elapsed since the last full run.
    pub fn age_hours(&self, now: DateTime<Utc>) -> Option<f64> {
        self.processed_at
            .map(|at| (now - at).num_milliseconds() as f64 / 3_600_000.0)
    }

    /// Whether the next run must reprocess everything.
    pub fn is_stale(&self, now: DateTime<Utc>, threshold_hours: f64) -> bool {
        self.age_hours(now).is_none_or(|age| age > threshold_hours)
    }

    /// Coverage of `source_ids` by the stored entries.
    pub fn state(&self, source_ids: &[String]) -> CorpusState {
        if self.entries.is_empty() {
            CorpusState::Empty
        } else if source_ids.iter().all(|id| self.entries.contains_key(id)) {
            CorpusState::Complete
        } else {
            CorpusState::Partial
        }
    }

    /// Decide which of `source_ids` this run must process.
    ///
    /// A stale (or never fully processed) corpus makes every id eligible;
    /// otherwise only ids not yet stored are.
    pub fn plan(&self, source_ids: &[String], now: DateTime<Utc>, threshold_hours: f64) -> RunPlan {
        let age_hours = self.age_hours(now);
        let stale = self.is_stale(now, threshold_hours);

        let (eligible, skipped): (Vec<String>, Vec<String>) = if stale {
            (source_ids.to_vec(), Vec::new())
        } else {
            source_ids
                .iter()
                .cloned()
                .partition(|id| !self.entries.contains_key(id))
        };

        info!(
            collection = %self.collection,
            stale,
            age_hours = ?age_hours,
            eligible = eligible.len(),
            skipped = skipped.len(),
            "run planned"
        );

        RunPlan {
            stale,
            age_hours,
            eligible,
            skipped,
        }
    }

    /// Merge freshly processed entries.
    ///
    /// Incoming entries are applied in canonical id order, so the result
    /// does not depend on the order they were produced in. An entry whose
    /// fingerprint already belongs to a different canonical id is rejected
    /// and reported; the stored entry stays.
    pub fn merge(&mut self, mut incoming: Vec<CorpusEntry>) -> MergeReport {
        incoming.sort_by(|a, b| a.canonical_id.cmp(&b.canonical_id));
        let mut report = MergeReport::default();

        for entry in incoming {
            if let Some(existing_id) = self.fingerprint_owner(&entry) {
                info!(
                    rejected = %entry.canonical_id,
                    existing = %existing_id,
                    fingerprint = %entry.content_fingerprint,
                    "duplicate fingerprint, entry rejected"
                );
                report.duplicates.push(DuplicateFingerprint {
                    rejected_id: entry.canonical_id,
                    existing_id,
                    fingerprint: entry.content_fingerprint,
                });
                continue;
            }

            let id = entry.canonical_id.clone();
            if self.insert(entry) {
                report.replaced.push(id);
            } else {
                report.added.push(id);
            }
        }

        info!(
            collection = %self.collection,
            added = report.added.len(),
            replaced = report.replaced.len(),
            duplicates = report.duplicates.len(),
            total = self.entries.len(),
            "corpus merged"
        );
        report
    }

    /// Another canonical id already holding this entry's fingerprint.
    fn fingerprint_owner(&self, entry: &CorpusEntry) -> Option<String> {
        self.fingerprints
            .get(&entry.content_fingerprint)?
            .iter()
            .find(|id| **id != entry.canonical_id)
            .cloned()
    }

    /// Insert or replace; returns true when an entry was replaced.
    fn insert(&mut self, entry: CorpusEntry) -> bool {
        self.fingerprints
            .entry(entry.content_fingerprint.clone())
            .or_default()
            .insert(entry.canonical_id.clone());

        let Some(previous) = self.entries.insert(entry.canonical_id.clone(), entry) else {
            return false;
        };
        let current = &self.entries[&previous.canonical_id].content_fingerprint;
        if *current != previous.content_fingerprint {
            if let Some(ids) = self.fingerprints.get_mut(&previous.content_fingerprint) {
                ids.remove(&previous.canonical_id);
                if ids.is_empty() {
                    self.fingerprints.remove(&previous.content_fingerprint);
                }
            }
        }
        true
    }

    /// Record a full refresh; the staleness clock restarts at `at`.
    pub fn mark_full_refresh(&mut self, at: DateTime<Utc>) {
        self.processed_at = Some(at);
    }

    /// Write the corpus to the path it was opened from.
    pub fn save(&self) -> Result<()> {
        self.save_to(&self.path)
    }

    /// Write the corpus to `path` atomically (temp file, then rename).
    pub fn save_to(&self, path: &Path) -> Result<()> {
        let file = CorpusFile {
            schema_version: SCHEMA_VERSION,
            collection: self.collection.clone(),
            processed_at: self.processed_at,
            entries: self.entries.values().cloned().collect(),
        };
        let json = serde_json::to_string_pretty(&file)?;

        let parent = path.parent().unwrap_or_else(|| Path::new("."));
        std::fs::create_dir_all(parent).map_err(|e| RuleGraphError::io(parent, e))?;

        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| CORPUS_FILE_NAME.to_string());
        let temp = parent.join(format!(".{file_name}.tmp"));
        std::fs::write(&temp, json).map_err(|e| RuleGraphError::io(&temp, e))?;
        std::fs::rename(&temp, path).map_err(|e| RuleGraphError::io(path, e))?;

        debug!(path = %path.display(), entries = file.entries.len(), "corpus saved");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use rulegraph_shared::{Classification, FingerprintAlgorithm, RawDocument};

    fn temp_path() -> PathBuf {
        std::env::temp_dir()
            .join(format!("rulegraph_corpus_{}", uuid::Uuid::now_v7()))
            .join("civil")
            .join(CORPUS_FILE_NAME)
    }

    fn entry(id: &str, text: &str) -> CorpusEntry {
        let now = Utc::now();
        CorpusEntry {
            canonical_id: id.into(),
            document: RawDocument {
                identifier: id.into(),
                title: id.into(),
                url: format!("https://courts.test/{id}"),
                source_text: text.into(),
                discovered_at: now,
            },
            classification: Classification::default(),
            cross_references: Vec::new(),
            content_fingerprint: fingerprint(text, 1000, FingerprintAlgorithm::Sha256),
            processed_at: now,
        }
    }

    fn ids(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn missing_file_is_empty() {
        let store = CorpusStore::open(&temp_path(), "civil");
        assert!(matches!(store.load_outcome(), LoadOutcome::Missing));
        assert!(store.is_empty());
        assert_eq!(store.state(&ids(&["a"])), CorpusState::Empty);
    }

    #[test]
    fn corrupt_file_degrades_to_empty() {
        let path = temp_path();
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, "{ not json").unwrap();

        let store = CorpusStore::open(&path, "civil");
        assert!(store.load_outcome().is_corrupt());
        assert!(store.is_empty());
        match store.load_outcome() {
            LoadOutcome::Corrupt(RuleGraphError::CorpusCorruption { path: p, .. }) => {
                assert_eq!(p, &path)
            }
            other => panic!("unexpected outcome: {other:?}"),
        }

        std::fs::remove_dir_all(path.parent().unwrap().parent().unwrap()).ok();
    }

    #[test]
    fn save_and_reload() {
        let path = temp_path();
        let mut store = CorpusStore::open(&path, "civil");
        store.merge(vec![entry("b", "beta text"), entry("a", "alpha text")]);
        let at = Utc::now();
        store.mark_full_refresh(at);
        store.save().unwrap();

        let reloaded = CorpusStore::open(&path, "civil");
        assert!(matches!(reloaded.load_outcome(), LoadOutcome::Loaded { entries: 2 }));
        assert_eq!(reloaded.processed_at(), Some(at));
        let order: Vec<&str> = reloaded.entries().map(|e| e.canonical_id.as_str()).collect();
        assert_eq!(order, vec!["a", "b"]);

        let raw: CorpusFile =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(raw.schema_version, SCHEMA_VERSION);
        assert_eq!(raw.entries[0].canonical_id, "a");
        assert!(!path.with_file_name(".corpus.json.tmp").exists());

        std::fs::remove_dir_all(path.parent().unwrap().parent().unwrap()).ok();
    }

    #[test]
    fn other_collection_is_corrupt() {
        let path = temp_path();
        let store = CorpusStore::open(&path, "criminal");
        store.save().unwrap();

        let store = CorpusStore::open(&path, "civil");
        assert!(store.load_outcome().is_corrupt());

        std::fs::remove_dir_all(path.parent().unwrap().parent().unwrap()).ok();
    }

    #[test]
    fn staleness_gate() {
        let now = Utc::now();
        let mut store = CorpusStore::open(&temp_path(), "civil");
        store.merge(vec![entry("a", "alpha"), entry("b", "beta")]);
        let sources = ids(&["a", "b", "c"]);

        let plan = store.plan(&sources, now, 24.0);
        assert!(plan.stale, "never fully processed");
        assert_eq!(plan.age_hours, None);
        assert_eq!(plan.eligible, sources);

        store.mark_full_refresh(now - Duration::hours(25));
        let plan = store.plan(&sources, now, 24.0);
        assert!(plan.stale);
        assert_eq!(plan.eligible.len(), 3);
        assert!(plan.skipped.is_empty());

        store.mark_full_refresh(now - Duration::hours(1));
        let plan = store.plan(&sources, now, 24.0);
        assert!(!plan.stale);
        assert!((plan.age_hours.unwrap() - 1.0).abs() < 1e-6);
        assert_eq!(plan.eligible, ids(&["c"]));
        assert_eq!(plan.skipped, ids(&["a", "b"]));
    }

    #[test]
    fn coverage_states() {
        let mut store = CorpusStore::open(&temp_path(), "civil");
        store.merge(vec![entry("a", "alpha")]);
        assert_eq!(store.state(&ids(&["a", "b"])), CorpusState::Partial);
        assert_eq!(store.state(&ids(&["a"])), CorpusState::Complete);
    }

    #[test]
    fn merge_adds_and_replaces_without_dropping() {
        let mut store = CorpusStore::open(&temp_path(), "civil");
        store.merge(vec![entry("a", "alpha"), entry("b", "beta")]);

        let report = store.merge(vec![entry("b", "beta revised"), entry("c", "gamma")]);
        assert_eq!(report.added, ids(&["c"]));
        assert_eq!(report.replaced, ids(&["b"]));
        assert!(report.duplicates.is_empty());
        assert_eq!(store.len(), 3);
        assert_eq!(store.get("b").unwrap().document.source_text, "beta revised");
        assert!(store.contains("a"));
    }

    #[test]
    fn identical_text_under_two_ids_is_rejected() {
        let mut store = CorpusStore::open(&temp_path(), "civil");
        let report = store.merge(vec![
            entry("rule-2", "Service by mail extends time."),
            entry("rule-1", "Service  by MAIL extends time."),
        ]);
        assert_eq!(store.len(), 1);
        assert!(store.contains("rule-1"));
        assert_eq!(report.duplicates.len(), 1);
        assert_eq!(report.duplicates[0].rejected_id, "rule-2");
        assert_eq!(report.duplicates[0].existing_id, "rule-1");

        // Stored entry wins over a later incoming duplicate.
        let report = store.merge(vec![entry("rule-0", "service by mail extends time.")]);
        assert_eq!(report.duplicates[0].rejected_id, "rule-0");
        assert_eq!(report.duplicates[0].existing_id, "rule-1");
        assert!(!store.contains("rule-0"));
    }

    #[test]
    fn replacing_an_entry_releases_its_old_fingerprint() {
        let mut store = CorpusStore::open(&temp_path(), "civil");
        store.merge(vec![entry("a", "first text")]);
        store.merge(vec![entry("a", "second text")]);

        let report = store.merge(vec![entry("b", "first text")]);
        assert_eq!(report.added, ids(&["b"]));
        assert!(report.duplicates.is_empty());
    }

    #[test]
    fn merge_is_order_independent() {
        let batch = vec![
            entry("c", "gamma"),
            entry("a", "alpha"),
            entry("d", "alpha"),
            entry("b", "beta"),
        ];
        let mut reversed = batch.clone();
        reversed.reverse();

        let mut one = CorpusStore::open(&temp_path(), "civil");
        let mut two = CorpusStore::open(&temp_path(), "civil");
        let r1 = one.merge(batch);
        let r2 = two.merge(reversed);

        assert_eq!(r1, r2);
        let a: Vec<_> = one.entries().cloned().collect();
        let b: Vec<_> = two.entries().cloned().collect();
        assert_eq!(a, b);
    }
}
