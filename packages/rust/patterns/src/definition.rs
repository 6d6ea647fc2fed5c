//! Declarative registry tables, as read from TOML.
//!
//! These structs carry raw pattern source only. [`crate::PatternRegistry`]
//! compiles them once and is what the classifier actually uses.

use rulegraph_shared::{
    AuthorityType, DocumentType, EntityKind, FilingRelevanceTier, ProceduralArea,
    RelationshipType, UrgencyLevel,
};
use serde::{Deserialize, Serialize};

/// One regex with its scoring weight.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatternDef {
    /// Regex source.
    pub pattern: String,
    /// Multiplier applied where the category scores matches.
    #[serde(default = "default_weight")]
    pub weight: u32,
    /// Compile without the case-insensitive flag.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub case_sensitive: bool,
}

fn default_weight() -> u32 {
    1
}

/// `[[filing_questions]]` row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilingQuestionDef {
    /// Output key, e.g. `when_timing`.
    pub key: String,
    /// Any of these present (case-insensitive substring) opens the gate.
    pub gate_keywords: Vec<String>,
    /// Snippet extractors run only when the gate is open.
    #[serde(default)]
    pub patterns: Vec<PatternDef>,
}

/// `[[document_types]]` row. Row order is the tie-break order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentTypeDef {
    pub kind: DocumentType,
    /// +20 per substring hit in the lower-cased URL.
    #[serde(default)]
    pub url_patterns: Vec<String>,
    /// +10 × weight per regex match over `"url title text"`.
    #[serde(default)]
    pub content_patterns: Vec<PatternDef>,
    /// +5 per phrase present.
    #[serde(default)]
    pub typical_phrases: Vec<String>,
}

/// `[[filing_relevance]]` row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelevanceTierDef {
    pub tier: FilingRelevanceTier,
    /// Whole-word keywords; every occurrence counts.
    pub keywords: Vec<String>,
}

/// `[[procedural_areas]]` row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProceduralAreaDef {
    pub area: ProceduralArea,
    /// Substring keywords; each present keyword counts once.
    pub keywords: Vec<String>,
}

/// `[[urgency]]` row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UrgencyDef {
    pub level: UrgencyLevel,
    /// Whole-word keywords; every occurrence counts.
    pub keywords: Vec<String>,
}

/// How a captured reference id becomes a target identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Normalization {
    /// The `id` capture verbatim, whitespace collapsed.
    #[default]
    Identifier,
    /// The `id` capture lower-cased, whitespace collapsed.
    Citation,
}

/// `[[reference_families]]` row. Earlier families claim spans first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReferenceFamilyDef {
    pub name: String,
    pub authority_type: AuthorityType,
    /// Relationship used when no cue precedes the mention.
    pub relationship: RelationshipType,
    #[serde(default)]
    pub normalize: Normalization,
    /// Lower-case authority word prefixed to the id (`"evidence code"`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub qualifier: Option<String>,
    /// Must define a named `id` group.
    pub pattern: String,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub case_sensitive: bool,
}

/// `[[relationship_cues]]` row, matched against text just before a mention.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelationshipCueDef {
    pub relationship: RelationshipType,
    pub pattern: String,
}

/// `[obligations]` table.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ObligationsDef {
    /// Single-word check used for the filing-question `mandatory` flag.
    #[serde(default)]
    pub marker: String,
    #[serde(default)]
    pub mandatory: Vec<PatternDef>,
    #[serde(default)]
    pub permissive: Vec<PatternDef>,
    #[serde(default)]
    pub directory: Vec<PatternDef>,
}

/// `[[entities]]` row. Must define a named `name` group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityDef {
    pub kind: EntityKind,
    pub pattern: String,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub case_sensitive: bool,
}

/// `[rule_status]` table.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RuleStatusDef {
    #[serde(default)]
    pub repealed: Vec<String>,
    #[serde(default)]
    pub superseded: Vec<String>,
    #[serde(default)]
    pub amended: Vec<String>,
    /// Must define a named `date` group.
    #[serde(default)]
    pub effective_date: String,
    /// Must define a named `date` group.
    #[serde(default)]
    pub amendment_date: String,
}

/// Whole registry table.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RegistryDefinition {
    #[serde(default)]
    pub filing_questions: Vec<FilingQuestionDef>,
    #[serde(default)]
    pub document_types: Vec<DocumentTypeDef>,
    #[serde(default)]
    pub filing_relevance: Vec<RelevanceTierDef>,
    #[serde(default)]
    pub procedural_areas: Vec<ProceduralAreaDef>,
    #[serde(default)]
    pub urgency: Vec<UrgencyDef>,
    #[serde(default)]
    pub legal_terms: Vec<String>,
    #[serde(default)]
    pub reference_families: Vec<ReferenceFamilyDef>,
    #[serde(default)]
    pub relationship_cues: Vec<RelationshipCueDef>,
    #[serde(default)]
    pub obligations: ObligationsDef,
    #[serde(default)]
    pub entities: Vec<EntityDef>,
    #[serde(default)]
    pub rule_status: RuleStatusDef,
    #[serde(default)]
    pub authoritative_domains: Vec<String>,
}
