//! Shared types, error model, and configuration for rulegraph.
//!
//! This crate is the foundation depended on by all other rulegraph crates.
//! It provides:
//! - [`RuleGraphError`], the unified error type
//! - Domain types ([`RawDocument`], [`Classification`], [`CrossReference`], [`CorpusEntry`])
//! - Configuration ([`AppConfig`], config loading)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, ClassifierConfig, CorpusConfig, FetchConfig, FingerprintAlgorithm, GraphConfig,
    GraphFormat, PatternsConfig, config_dir, config_file_path, expand_home, init_config,
    load_config, load_config_from,
};
pub use error::{Result, RuleGraphError};
pub use types::{
    AuthorityType, Classification, ComplexityLevel, CorpusEntry, CrossReference, DocumentType,
    EntityKind, FilingQuestionAnalysis, FilingQuestionAnswer, FilingRelevanceTier, NamedEntities,
    Obligations, ProceduralArea, RawDocument, RelationshipType, RuleStatus, RuleStatusInfo,
    UrgencyLevel,
};
