//! Core domain types for rulegraph corpora.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// RawDocument
// ---------------------------------------------------------------------------

/// A pre-extracted document as delivered by a document source.
///
/// Immutable once ingested.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawDocument {
    /// Canonical identifier, stable across runs (e.g. `"1013"`, `"LR-3.2"`).
    pub identifier: String,
    /// Document title as published.
    pub title: String,
    /// Source URL the text was extracted from.
    pub url: String,
    /// Extracted UTF-8 text.
    pub source_text: String,
    /// When the source first yielded this document.
    pub discovered_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Classification enums
// ---------------------------------------------------------------------------

/// Kind of legal document, scored from an ordered table in the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DocumentType {
    LocalRule,
    StandingOrder,
    CaseManagementOrder,
    JudicialDirective,
    PracticeGuide,
    Form,
    Notice,
    EmergencyOrder,
    Statute,
    CourtRule,
    #[default]
    Unknown,
}

impl DocumentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::LocalRule => "LOCAL_RULE",
            Self::StandingOrder => "STANDING_ORDER",
            Self::CaseManagementOrder => "CASE_MANAGEMENT_ORDER",
            Self::JudicialDirective => "JUDICIAL_DIRECTIVE",
            Self::PracticeGuide => "PRACTICE_GUIDE",
            Self::Form => "FORM",
            Self::Notice => "NOTICE",
            Self::EmergencyOrder => "EMERGENCY_ORDER",
            Self::Statute => "STATUTE",
            Self::CourtRule => "COURT_RULE",
            Self::Unknown => "UNKNOWN",
        }
    }
}

/// Ordinal rating of how directly a document matters to filing practice.
///
/// Variant order is the rank order, so `Ord` compares by relevance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FilingRelevanceTier {
    #[default]
    None,
    Low,
    Medium,
    High,
    VeryHigh,
}

impl FilingRelevanceTier {
    /// Numeric relevance used for graph ranking.
    pub fn score(&self) -> u32 {
        match self {
            Self::VeryHigh => 90,
            Self::High => 70,
            Self::Medium => 50,
            Self::Low => 30,
            Self::None => 0,
        }
    }

    /// Points this tier contributes to the confidence score.
    pub fn confidence_bonus(&self) -> u32 {
        match self {
            Self::VeryHigh => 30,
            Self::High => 20,
            Self::Medium => 10,
            Self::Low => 5,
            Self::None => 0,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::VeryHigh => "VERY_HIGH",
            Self::High => "HIGH",
            Self::Medium => "MEDIUM",
            Self::Low => "LOW",
            Self::None => "NONE",
        }
    }
}

/// Area of procedure a document primarily governs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProceduralArea {
    CivilProcedure,
    CaseManagement,
    ElectronicFiling,
    MotionPractice,
    Discovery,
    TrialProcedure,
    #[default]
    Administrative,
}

impl ProceduralArea {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CivilProcedure => "CIVIL_PROCEDURE",
            Self::CaseManagement => "CASE_MANAGEMENT",
            Self::ElectronicFiling => "ELECTRONIC_FILING",
            Self::MotionPractice => "MOTION_PRACTICE",
            Self::Discovery => "DISCOVERY",
            Self::TrialProcedure => "TRIAL_PROCEDURE",
            Self::Administrative => "ADMINISTRATIVE",
        }
    }
}

/// How urgently a practitioner should read the document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UrgencyLevel {
    Critical,
    High,
    Medium,
    #[default]
    Low,
}

impl UrgencyLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Critical => "CRITICAL",
            Self::High => "HIGH",
            Self::Medium => "MEDIUM",
            Self::Low => "LOW",
        }
    }
}

/// Bucketed complexity score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ComplexityLevel {
    #[default]
    Low,
    Medium,
    High,
    VeryHigh,
}

impl ComplexityLevel {
    /// Threshold a `[0, 100]` complexity score into a level.
    pub fn from_score(score: u32) -> Self {
        match score {
            s if s >= 60 => Self::VeryHigh,
            s if s >= 40 => Self::High,
            s if s >= 25 => Self::Medium,
            _ => Self::Low,
        }
    }
}

/// Lifecycle status of a rule as stated in its own text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RuleStatus {
    #[default]
    Active,
    Repealed,
    Superseded,
    Amended,
}

// ---------------------------------------------------------------------------
// Classification
// ---------------------------------------------------------------------------

/// Result of the filing-question pass for one question category.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilingQuestionAnswer {
    /// The category's gate keywords were present.
    pub answers_question: bool,
    /// Extracted snippets, in text order, de-duplicated.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub snippets: Vec<String>,
    /// The text carries a mandatory marker ("shall", "must", ...).
    #[serde(default)]
    pub mandatory: bool,
}

/// Filing-question results keyed by question key (`when_timing`, ...).
pub type FilingQuestionAnalysis = BTreeMap<String, FilingQuestionAnswer>;

/// Mandatory / permissive / directory language found in the text.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Obligations {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub mandatory: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub permissive: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub directory: Vec<String>,
}

/// Status, effective date and amendment history of a rule.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleStatusInfo {
    pub status: RuleStatus,
    /// First effective date stated in the text, verbatim.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub effective_date: Option<String>,
    /// Amendment dates in text order, verbatim.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub amendment_dates: Vec<String>,
}

/// Kind of named entity extracted from a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Judge,
    Department,
    Organization,
}

impl EntityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Judge => "judge",
            Self::Department => "department",
            Self::Organization => "organization",
        }
    }
}

/// Named entities mentioned in a document, first-seen order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamedEntities {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub judges: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub departments: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub organizations: Vec<String>,
}

impl NamedEntities {
    /// Mutable list for an entity kind.
    pub fn list_mut(&mut self, kind: EntityKind) -> &mut Vec<String> {
        match kind {
            EntityKind::Judge => &mut self.judges,
            EntityKind::Department => &mut self.departments,
            EntityKind::Organization => &mut self.organizations,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.judges.is_empty() && self.departments.is_empty() && self.organizations.is_empty()
    }
}

/// Everything the classifier derives from one document.
///
/// Fully recomputed on every run; never edited in place.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Classification {
    pub document_type: DocumentType,
    pub filing_relevance_tier: FilingRelevanceTier,
    pub procedural_area: ProceduralArea,
    pub urgency_level: UrgencyLevel,
    /// Complexity in `[0, 100]`.
    pub complexity_score: u32,
    pub complexity_level: ComplexityLevel,
    /// Confidence in `[0, 100]`.
    pub confidence_score: u32,
    #[serde(default)]
    pub filing_question_analysis: FilingQuestionAnalysis,
    #[serde(default)]
    pub obligations: Obligations,
    #[serde(default)]
    pub rule_status: RuleStatusInfo,
    #[serde(default)]
    pub entities: NamedEntities,
    /// Input was too short to classify; all fields are defaults.
    #[serde(default)]
    pub degraded: bool,
}

impl Classification {
    /// The all-default classification returned for unusable input.
    pub fn degraded() -> Self {
        Self {
            degraded: true,
            ..Self::default()
        }
    }
}

// ---------------------------------------------------------------------------
// Cross references
// ---------------------------------------------------------------------------

/// Family of legal authority a reference points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuthorityType {
    Statute,
    CourtRule,
    LocalRule,
    Case,
}

impl AuthorityType {
    /// Lower-case tag used in node identifiers.
    pub fn slug(&self) -> &'static str {
        match self {
            Self::Statute => "statute",
            Self::CourtRule => "court_rule",
            Self::LocalRule => "local_rule",
            Self::Case => "case",
        }
    }
}

/// How a document relates to the authority it mentions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RelationshipType {
    ReferencedProcedure,
    DependsOn,
    Enables,
    Supersedes,
    ModifiedBy,
    AlternativeTo,
    PrerequisiteFor,
    ExceptionTo,
    Cites,
}

impl RelationshipType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ReferencedProcedure => "REFERENCED_PROCEDURE",
            Self::DependsOn => "DEPENDS_ON",
            Self::Enables => "ENABLES",
            Self::Supersedes => "SUPERSEDES",
            Self::ModifiedBy => "MODIFIED_BY",
            Self::AlternativeTo => "ALTERNATIVE_TO",
            Self::PrerequisiteFor => "PREREQUISITE_FOR",
            Self::ExceptionTo => "EXCEPTION_TO",
            Self::Cites => "CITES",
        }
    }
}

/// A resolved mention of another authority, one per distinct target per document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrossReference {
    /// Canonical id of the mentioning document.
    pub source_document_id: String,
    /// Normalized identifier of the target (e.g. `"1013"`, `"3.1350"`).
    pub target_identifier: String,
    pub authority_type: AuthorityType,
    pub relationship_type: RelationshipType,
    /// Registry family that produced the match.
    pub family: String,
    /// Context windows of every mention, text order, de-duplicated.
    #[serde(default)]
    pub snippets: Vec<String>,
}

// ---------------------------------------------------------------------------
// CorpusEntry
// ---------------------------------------------------------------------------

/// One processed document as persisted in the corpus.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorpusEntry {
    /// Key of the entry; unique within a corpus.
    pub canonical_id: String,
    pub document: RawDocument,
    pub classification: Classification,
    #[serde(default)]
    pub cross_references: Vec<CrossReference>,
    /// `"<algorithm>:<hex>"` digest of the normalized text window.
    pub content_fingerprint: String,
    /// When this entry was produced.
    pub processed_at: DateTime<Utc>,
}
