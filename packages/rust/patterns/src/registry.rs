//! Compiled, immutable pattern registry.

use std::collections::HashSet;
use std::path::Path;

use regex::{Regex, RegexBuilder};
use rulegraph_shared::{
    AuthorityType, DocumentType, EntityKind, FilingRelevanceTier, ProceduralArea,
    RelationshipType, Result, RuleGraphError, UrgencyLevel,
};
use serde::Serialize;

use crate::definition::{Normalization, PatternDef, RegistryDefinition};

/// Built-in registry table, embedded at compile time.
const BUILTIN_TOML: &str = include_str!("../builtin.toml");

// ---------------------------------------------------------------------------
// Compiled entries
// ---------------------------------------------------------------------------

/// A compiled regex with its weight.
#[derive(Debug, Clone)]
pub struct CompiledPattern {
    pub regex: Regex,
    pub weight: u32,
}

/// A filing-question category: gate keywords plus snippet extractors.
#[derive(Debug, Clone)]
pub struct FilingQuestion {
    pub key: String,
    /// Lower-cased gate keywords.
    pub gate_keywords: Vec<String>,
    pub patterns: Vec<CompiledPattern>,
}

impl FilingQuestion {
    /// Cheap pre-check; `lower_text` must already be lower-cased.
    pub fn gate_open(&self, lower_text: &str) -> bool {
        self.gate_keywords.iter().any(|k| lower_text.contains(k.as_str()))
    }
}

/// One row of the document-type scoring table.
#[derive(Debug, Clone)]
pub struct DocumentTypeScoring {
    pub kind: DocumentType,
    /// Lower-cased URL substrings.
    pub url_patterns: Vec<String>,
    pub content_patterns: Vec<CompiledPattern>,
    /// Lower-cased phrases.
    pub typical_phrases: Vec<String>,
}

/// A label scored by counting whole-word keyword occurrences.
#[derive(Debug, Clone)]
pub struct KeywordTable<T> {
    pub label: T,
    /// `\bkeyword\b`, case-insensitive.
    pub keywords: Vec<Regex>,
}

impl<T> KeywordTable<T> {
    /// Total occurrences of every keyword in `text`.
    pub fn count(&self, text: &str) -> usize {
        self.keywords.iter().map(|re| re.find_iter(text).count()).sum()
    }
}

/// A procedural area scored by keyword presence.
#[derive(Debug, Clone)]
pub struct AreaKeywords {
    pub area: ProceduralArea,
    /// Lower-cased substrings.
    pub keywords: Vec<String>,
}

/// A family of authority citations.
#[derive(Debug, Clone)]
pub struct ReferenceFamily {
    pub name: String,
    pub authority_type: AuthorityType,
    pub relationship: RelationshipType,
    pub normalize: Normalization,
    pub qualifier: Option<String>,
    /// Has a named `id` group.
    pub regex: Regex,
}

/// A phrase that, just before a mention, overrides the family relationship.
#[derive(Debug, Clone)]
pub struct RelationshipCue {
    pub relationship: RelationshipType,
    pub regex: Regex,
}

/// Mandatory / permissive / directory language detectors.
#[derive(Debug, Clone, Default)]
pub struct ObligationMarkers {
    pub marker: Option<Regex>,
    pub mandatory: Vec<CompiledPattern>,
    pub permissive: Vec<CompiledPattern>,
    pub directory: Vec<CompiledPattern>,
}

/// A named-entity extractor with a `name` group.
#[derive(Debug, Clone)]
pub struct EntityPattern {
    pub kind: EntityKind,
    pub regex: Regex,
}

/// Rule-status keywords and date extractors.
#[derive(Debug, Clone, Default)]
pub struct RuleStatusPatterns {
    pub repealed: Vec<String>,
    pub superseded: Vec<String>,
    pub amended: Vec<String>,
    /// Has a named `date` group.
    pub effective_date: Option<Regex>,
    /// Has a named `date` group.
    pub amendment_date: Option<Regex>,
}

/// Flattened view of a registry entry, for inspection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PatternRule {
    pub category: String,
    pub kind: PatternKind,
    pub pattern: String,
    pub weight: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PatternKind {
    Keyword,
    Regex,
}

// ---------------------------------------------------------------------------
// PatternRegistry
// ---------------------------------------------------------------------------

/// Every pattern the classifier and resolver use, compiled once.
///
/// Immutable after construction; share it with `Arc` across workers.
#[derive(Debug, Clone)]
pub struct PatternRegistry {
    definition: RegistryDefinition,
    filing_questions: Vec<FilingQuestion>,
    document_types: Vec<DocumentTypeScoring>,
    relevance_tiers: Vec<KeywordTable<FilingRelevanceTier>>,
    procedural_areas: Vec<AreaKeywords>,
    urgency: Vec<KeywordTable<UrgencyLevel>>,
    legal_terms: Vec<Regex>,
    reference_families: Vec<ReferenceFamily>,
    relationship_cues: Vec<RelationshipCue>,
    obligations: ObligationMarkers,
    entities: Vec<EntityPattern>,
    rule_status: RuleStatusPatterns,
    authoritative_domains: Vec<String>,
}

impl PatternRegistry {
    /// The embedded California civil-procedure table.
    pub fn builtin() -> Result<Self> {
        Self::from_toml_str(BUILTIN_TOML)
    }

    /// Parse and compile a registry table from TOML.
    pub fn from_toml_str(source: &str) -> Result<Self> {
        let definition: RegistryDefinition = toml::from_str(source)
            .map_err(|e| RuleGraphError::config(format!("invalid pattern registry: {e}")))?;
        Self::compile(definition)
    }

    /// Load a registry table from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| RuleGraphError::io(path, e))?;
        let registry = Self::from_toml_str(&content)?;
        tracing::debug!(path = %path.display(), rules = registry.rules().len(), "loaded pattern registry");
        Ok(registry)
    }

    /// Compile a definition, failing on the first bad entry.
    pub fn compile(definition: RegistryDefinition) -> Result<Self> {
        let mut seen = HashSet::new();
        let mut filing_questions = Vec::with_capacity(definition.filing_questions.len());
        for fq in &definition.filing_questions {
            let category = format!("filing_questions.{}", fq.key);
            if fq.key.trim().is_empty() || !seen.insert(fq.key.clone()) {
                return Err(RuleGraphError::pattern(
                    "filing_questions",
                    format!("missing or duplicate key '{}'", fq.key),
                ));
            }
            filing_questions.push(FilingQuestion {
                key: fq.key.clone(),
                gate_keywords: lower_all(&fq.gate_keywords),
                patterns: compile_defs(&category, &fq.patterns)?,
            });
        }

        let mut seen = HashSet::new();
        let mut document_types = Vec::with_capacity(definition.document_types.len());
        for row in &definition.document_types {
            if row.kind == DocumentType::Unknown || !seen.insert(row.kind) {
                return Err(RuleGraphError::pattern(
                    "document_types",
                    format!("{} cannot be scored or appears twice", row.kind.as_str()),
                ));
            }
            document_types.push(DocumentTypeScoring {
                kind: row.kind,
                url_patterns: lower_all(&row.url_patterns),
                content_patterns: compile_defs(
                    &format!("document_types.{}", row.kind.as_str()),
                    &row.content_patterns,
                )?,
                typical_phrases: lower_all(&row.typical_phrases),
            });
        }

        let relevance_tiers = definition
            .filing_relevance
            .iter()
            .map(|row| {
                if row.tier == FilingRelevanceTier::None {
                    return Err(RuleGraphError::pattern(
                        "filing_relevance",
                        "NONE is the fallback tier and takes no keywords",
                    ));
                }
                Ok(KeywordTable {
                    label: row.tier,
                    keywords: compile_words("filing_relevance", &row.keywords)?,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let procedural_areas = definition
            .procedural_areas
            .iter()
            .map(|row| AreaKeywords {
                area: row.area,
                keywords: lower_all(&row.keywords),
            })
            .collect();

        let urgency = definition
            .urgency
            .iter()
            .map(|row| {
                Ok(KeywordTable {
                    label: row.level,
                    keywords: compile_words("urgency", &row.keywords)?,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let legal_terms = compile_words("legal_terms", &definition.legal_terms)?;

        let reference_families = definition
            .reference_families
            .iter()
            .map(|row| {
                let category = format!("reference_families.{}", row.name);
                let regex = compile(&category, &row.pattern, row.case_sensitive)?;
                require_group(&category, &regex, "id")?;
                Ok(ReferenceFamily {
                    name: row.name.clone(),
                    authority_type: row.authority_type,
                    relationship: row.relationship,
                    normalize: row.normalize,
                    qualifier: row.qualifier.as_ref().map(|q| q.trim().to_lowercase()),
                    regex,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let relationship_cues = definition
            .relationship_cues
            .iter()
            .map(|row| {
                Ok(RelationshipCue {
                    relationship: row.relationship,
                    regex: compile("relationship_cues", &row.pattern, false)?,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let ob = &definition.obligations;
        let obligations = ObligationMarkers {
            marker: compile_optional("obligations.marker", &ob.marker)?,
            mandatory: compile_defs("obligations.mandatory", &ob.mandatory)?,
            permissive: compile_defs("obligations.permissive", &ob.permissive)?,
            directory: compile_defs("obligations.directory", &ob.directory)?,
        };

        let entities = definition
            .entities
            .iter()
            .map(|row| {
                let regex = compile("entities", &row.pattern, row.case_sensitive)?;
                require_group("entities", &regex, "name")?;
                Ok(EntityPattern {
                    kind: row.kind,
                    regex,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let rs = &definition.rule_status;
        let effective_date = compile_optional("rule_status.effective_date", &rs.effective_date)?;
        let amendment_date = compile_optional("rule_status.amendment_date", &rs.amendment_date)?;
        for (category, re) in [
            ("rule_status.effective_date", &effective_date),
            ("rule_status.amendment_date", &amendment_date),
        ] {
            if let Some(re) = re {
                require_group(category, re, "date")?;
            }
        }
        let rule_status = RuleStatusPatterns {
            repealed: lower_all(&rs.repealed),
            superseded: lower_all(&rs.superseded),
            amended: lower_all(&rs.amended),
            effective_date,
            amendment_date,
        };

        let authoritative_domains = lower_all(&definition.authoritative_domains);

        Ok(Self {
            definition,
            filing_questions,
            document_types,
            relevance_tiers,
            procedural_areas,
            urgency,
            legal_terms,
            reference_families,
            relationship_cues,
            obligations,
            entities,
            rule_status,
            authoritative_domains,
        })
    }

    /// The source table this registry was compiled from.
    pub fn definition(&self) -> &RegistryDefinition {
        &self.definition
    }

    pub fn filing_questions(&self) -> &[FilingQuestion] {
        &self.filing_questions
    }

    /// Scoring rows in declaration (tie-break) order.
    pub fn document_types(&self) -> &[DocumentTypeScoring] {
        &self.document_types
    }

    pub fn relevance_tiers(&self) -> &[KeywordTable<FilingRelevanceTier>] {
        &self.relevance_tiers
    }

    pub fn procedural_areas(&self) -> &[AreaKeywords] {
        &self.procedural_areas
    }

    pub fn urgency(&self) -> &[KeywordTable<UrgencyLevel>] {
        &self.urgency
    }

    pub fn legal_terms(&self) -> &[Regex] {
        &self.legal_terms
    }

    pub fn reference_families(&self) -> &[ReferenceFamily] {
        &self.reference_families
    }

    pub fn relationship_cues(&self) -> &[RelationshipCue] {
        &self.relationship_cues
    }

    pub fn obligations(&self) -> &ObligationMarkers {
        &self.obligations
    }

    pub fn entities(&self) -> &[EntityPattern] {
        &self.entities
    }

    pub fn rule_status(&self) -> &RuleStatusPatterns {
        &self.rule_status
    }

    /// Lower-cased host fragments that mark an authoritative source.
    pub fn authoritative_domains(&self) -> &[String] {
        &self.authoritative_domains
    }

    /// Every keyword and regex in the registry, flattened.
    pub fn rules(&self) -> Vec<PatternRule> {
        let d = &self.definition;
        let mut rules = Vec::new();

        for fq in &d.filing_questions {
            let category = format!("filing_questions.{}", fq.key);
            rules.extend(fq.gate_keywords.iter().map(|k| keyword_rule(&category, k)));
            rules.extend(fq.patterns.iter().map(|p| regex_rule(&category, p)));
        }
        for row in &d.document_types {
            let category = format!("document_types.{}", row.kind.as_str());
            rules.extend(row.url_patterns.iter().map(|k| keyword_rule(&category, k)));
            rules.extend(row.content_patterns.iter().map(|p| regex_rule(&category, p)));
            rules.extend(row.typical_phrases.iter().map(|k| keyword_rule(&category, k)));
        }
        for row in &d.filing_relevance {
            let category = format!("filing_relevance.{}", row.tier.as_str());
            rules.extend(row.keywords.iter().map(|k| keyword_rule(&category, k)));
        }
        for row in &d.procedural_areas {
            let category = format!("procedural_areas.{}", row.area.as_str());
            rules.extend(row.keywords.iter().map(|k| keyword_rule(&category, k)));
        }
        for row in &d.urgency {
            let category = format!("urgency.{}", row.level.as_str());
            rules.extend(row.keywords.iter().map(|k| keyword_rule(&category, k)));
        }
        rules.extend(d.legal_terms.iter().map(|k| keyword_rule("legal_terms", k)));
        for row in &d.reference_families {
            rules.push(PatternRule {
                category: format!("reference_families.{}", row.name),
                kind: PatternKind::Regex,
                pattern: row.pattern.clone(),
                weight: 1,
            });
        }
        for row in &d.relationship_cues {
            rules.push(PatternRule {
                category: format!("relationship_cues.{}", row.relationship.as_str()),
                kind: PatternKind::Regex,
                pattern: row.pattern.clone(),
                weight: 1,
            });
        }
        if !d.obligations.marker.trim().is_empty() {
            rules.push(PatternRule {
                category: "obligations.marker".into(),
                kind: PatternKind::Regex,
                pattern: d.obligations.marker.clone(),
                weight: 1,
            });
        }
        for (category, defs) in [
            ("obligations.mandatory", &d.obligations.mandatory),
            ("obligations.permissive", &d.obligations.permissive),
            ("obligations.directory", &d.obligations.directory),
        ] {
            rules.extend(defs.iter().map(|p| regex_rule(category, p)));
        }
        for row in &d.entities {
            rules.push(PatternRule {
                category: format!("entities.{}", row.kind.as_str()),
                kind: PatternKind::Regex,
                pattern: row.pattern.clone(),
                weight: 1,
            });
        }
        for (category, words) in [
            ("rule_status.repealed", &d.rule_status.repealed),
            ("rule_status.superseded", &d.rule_status.superseded),
            ("rule_status.amended", &d.rule_status.amended),
        ] {
            rules.extend(words.iter().map(|k| keyword_rule(category, k)));
        }
        for (category, source) in [
            ("rule_status.effective_date", &d.rule_status.effective_date),
            ("rule_status.amendment_date", &d.rule_status.amendment_date),
        ] {
            if !source.trim().is_empty() {
                rules.push(PatternRule {
                    category: category.into(),
                    kind: PatternKind::Regex,
                    pattern: source.clone(),
                    weight: 1,
                });
            }
        }
        rules.extend(
            d.authoritative_domains
                .iter()
                .map(|k| keyword_rule("authoritative_domains", k)),
        );

        rules
    }
}

// ---------------------------------------------------------------------------
// Compile helpers
// ---------------------------------------------------------------------------

fn keyword_rule(category: &str, word: &str) -> PatternRule {
    PatternRule {
        category: category.to_string(),
        kind: PatternKind::Keyword,
        pattern: word.to_string(),
        weight: 1,
    }
}

fn regex_rule(category: &str, def: &PatternDef) -> PatternRule {
    PatternRule {
        category: category.to_string(),
        kind: PatternKind::Regex,
        pattern: def.pattern.clone(),
        weight: def.weight,
    }
}

fn compile(category: &str, source: &str, case_sensitive: bool) -> Result<Regex> {
    RegexBuilder::new(source)
        .case_insensitive(!case_sensitive)
        .build()
        .map_err(|e| RuleGraphError::pattern(category, format!("'{source}': {e}")))
}

fn compile_optional(category: &str, source: &str) -> Result<Option<Regex>> {
    if source.trim().is_empty() {
        return Ok(None);
    }
    compile(category, source, false).map(Some)
}

fn compile_defs(category: &str, defs: &[PatternDef]) -> Result<Vec<CompiledPattern>> {
    defs.iter()
        .map(|d| {
            Ok(CompiledPattern {
                regex: compile(category, &d.pattern, d.case_sensitive)?,
                weight: d.weight,
            })
        })
        .collect()
}

/// Compile keywords into whole-word, case-insensitive matchers.
fn compile_words(category: &str, words: &[String]) -> Result<Vec<Regex>> {
    words
        .iter()
        .map(|w| compile(category, &format!(r"\b{}\b", regex::escape(w.trim())), false))
        .collect()
}

fn require_group(category: &str, regex: &Regex, group: &str) -> Result<()> {
    if regex.capture_names().flatten().any(|n| n == group) {
        Ok(())
    } else {
        Err(RuleGraphError::pattern(
            category,
            format!("pattern must define a named '{group}' group"),
        ))
    }
}

fn lower_all(items: &[String]) -> Vec<String> {
    items.iter().map(|s| s.to_lowercase()).collect()
}
