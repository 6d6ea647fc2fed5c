//! Ordered-table scoring: document type, filing relevance, procedural area,
//! urgency, and the confidence score built from them.
//!
//! Every table is walked in declaration order and a candidate only replaces
//! the current best on a strictly higher score, so ties go to the row that
//! was declared first.

use rulegraph_patterns::{DocumentTypeScoring, PatternRegistry};
use rulegraph_shared::{
    DocumentType, FilingRelevanceTier, ProceduralArea, RawDocument, UrgencyLevel,
};

/// Highest-scoring label, first-declared on ties, `fallback` when all score 0.
fn pick_best<T: Copy>(scores: impl IntoIterator<Item = (T, usize)>, fallback: T) -> T {
    let mut best = fallback;
    let mut best_score = 0;
    for (label, score) in scores {
        if score > best_score {
            best = label;
            best_score = score;
        }
    }
    best
}

/// Score of one document-type row.
///
/// `url_lower` is the lower-cased URL; `combined_lower` is
/// `"url title text"` lower-cased.
pub fn document_type_score(row: &DocumentTypeScoring, url_lower: &str, combined_lower: &str) -> usize {
    let url_hits = row
        .url_patterns
        .iter()
        .filter(|p| url_lower.contains(p.as_str()))
        .count();
    let content: usize = row
        .content_patterns
        .iter()
        .map(|p| p.regex.find_iter(combined_lower).count() * p.weight as usize)
        .sum();
    let phrases = row
        .typical_phrases
        .iter()
        .filter(|p| combined_lower.contains(p.as_str()))
        .count();

    url_hits * 20 + content * 10 + phrases * 5
}

pub fn document_type(doc: &RawDocument, registry: &PatternRegistry) -> DocumentType {
    let url_lower = doc.url.to_lowercase();
    let combined = format!("{} {} {}", doc.url, doc.title, doc.source_text).to_lowercase();

    pick_best(
        registry
            .document_types()
            .iter()
            .map(|row| (row.kind, document_type_score(row, &url_lower, &combined))),
        DocumentType::Unknown,
    )
}

pub fn filing_relevance(text: &str, registry: &PatternRegistry) -> FilingRelevanceTier {
    pick_best(
        registry
            .relevance_tiers()
            .iter()
            .map(|table| (table.label, table.count(text))),
        FilingRelevanceTier::None,
    )
}

/// Each keyword present counts once.
pub fn procedural_area(lower_text: &str, registry: &PatternRegistry) -> ProceduralArea {
    pick_best(
        registry.procedural_areas().iter().map(|row| {
            let hits = row
                .keywords
                .iter()
                .filter(|k| lower_text.contains(k.as_str()))
                .count();
            (row.area, hits)
        }),
        ProceduralArea::Administrative,
    )
}

pub fn urgency(text: &str, registry: &PatternRegistry) -> UrgencyLevel {
    pick_best(
        registry
            .urgency()
            .iter()
            .map(|table| (table.label, table.count(text))),
        UrgencyLevel::Low,
    )
}

/// Whether the document URL is on an authoritative host.
///
/// Unparsable URLs fall back to a substring check on the raw value.
pub fn is_authoritative(url: &str, registry: &PatternRegistry) -> bool {
    let haystack = match url::Url::parse(url) {
        Ok(parsed) => parsed.host_str().unwrap_or_default().to_lowercase(),
        Err(_) => url.to_lowercase(),
    };
    registry
        .authoritative_domains()
        .iter()
        .any(|d| haystack.contains(d.as_str()))
}

/// Confidence in `[0, 100]`.
pub fn confidence(
    doc_type: DocumentType,
    tier: FilingRelevanceTier,
    area: ProceduralArea,
    authoritative: bool,
) -> u32 {
    let mut score = 0;
    if doc_type != DocumentType::Unknown {
        score += 40;
    }
    score += tier.confidence_bonus();
    if area != ProceduralArea::Administrative {
        score += 15;
    }
    if authoritative {
        score += 15;
    }
    score.min(100)
}
