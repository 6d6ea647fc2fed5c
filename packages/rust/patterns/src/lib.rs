//! Pattern registry for rulegraph.
//!
//! Every keyword list and regex the classifier and cross-reference resolver
//! use lives in one declarative TOML table:
//! - [`RegistryDefinition`] is the raw table (built-in or user supplied)
//! - [`PatternRegistry`] is the compiled, immutable value shared by workers
//!
//! Adding a category entry or a pattern is a table edit; the classifier
//! iterates whatever the registry holds.

pub mod definition;
pub mod registry;

pub use definition::{
    DocumentTypeDef, EntityDef, FilingQuestionDef, Normalization, ObligationsDef, PatternDef,
    ProceduralAreaDef, ReferenceFamilyDef, RegistryDefinition, RelationshipCueDef,
    RelevanceTierDef, RuleStatusDef, UrgencyDef,
};
pub use registry::{
    AreaKeywords, CompiledPattern, DocumentTypeScoring, EntityPattern, FilingQuestion,
    KeywordTable, ObligationMarkers, PatternKind, PatternRegistry, PatternRule, ReferenceFamily,
    RelationshipCue, RuleStatusPatterns,
};
