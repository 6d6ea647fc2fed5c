//! Cross-reference resolution.
//!
//! Finds citations to other authorities, normalizes their identifiers and
//! collapses repeated mentions into one [`CrossReference`] per target.

use std::collections::BTreeMap;

use rulegraph_patterns::{Normalization, PatternRegistry, ReferenceFamily};
use rulegraph_shared::{AuthorityType, CrossReference, RelationshipType};

use crate::ClassifyOptions;
use crate::text::{collapse_whitespace, overlaps, widen};

/// One raw citation before collapsing.
struct Mention<'r> {
    start: usize,
    family: &'r ReferenceFamily,
    identifier: String,
    cue: Option<RelationshipType>,
    snippet: String,
}

/// Normalize a captured id according to the family's rules.
///
/// Numeric and lettered suffixes are kept verbatim (`437c`, `12a`).
pub fn normalize_identifier(family: &ReferenceFamily, raw_id: &str) -> String {
    let id = collapse_whitespace(raw_id);
    let id = match family.normalize {
        Normalization::Identifier => id,
        Normalization::Citation => id.to_lowercase(),
    };
    match &family.qualifier {
        Some(q) if !id.is_empty() => format!("{q} {id}"),
        _ => id,
    }
}

/// Relationship implied by a cue phrase in the text just before a mention.
///
/// Only the current clause is considered: the window is cut after the last
/// `;` or sentence-ending `. `.
fn cue_before(text: &str, start: usize, registry: &PatternRegistry, window_chars: usize) -> Option<RelationshipType> {
    let (from, _) = widen(text, start, start, window_chars);
    let mut window = &text[from..start];
    if let Some(cut) = window.rfind(". ").map(|i| i + 2).max(window.rfind(';').map(|i| i + 1)) {
        window = &window[cut..];
    }
    registry
        .relationship_cues()
        .iter()
        .find(|cue| cue.regex.is_match(window))
        .map(|cue| cue.relationship)
}

/// Resolve every cross-reference in `text`.
///
/// Families are tried in registry order and a span claimed by an earlier
/// family is skipped by later ones. Output is sorted by authority type,
/// then case-folded identifier.
pub fn resolve(
    document_id: &str,
    text: &str,
    registry: &PatternRegistry,
    opts: &ClassifyOptions,
) -> Vec<CrossReference> {
    let mut claimed: Vec<(usize, usize)> = Vec::new();
    let mut mentions: Vec<Mention<'_>> = Vec::new();

    for family in registry.reference_families() {
        for caps in family.regex.captures_iter(text) {
            let (Some(whole), Some(id)) = (caps.get(0), caps.name("id")) else {
                continue;
            };
            if overlaps(&claimed, whole.start(), whole.end()) {
                continue;
            }
            let identifier = normalize_identifier(family, id.as_str());
            if identifier.is_empty() {
                continue;
            }
            claimed.push((whole.start(), whole.end()));

            let (from, to) = widen(text, whole.start(), whole.end(), opts.snippet_context_chars);
            mentions.push(Mention {
                start: whole.start(),
                family,
                identifier,
                cue: cue_before(text, whole.start(), registry, opts.snippet_context_chars),
                snippet: collapse_whitespace(&text[from..to]),
            });
        }
    }

    mentions.sort_by_key(|m| m.start);

    // Collapse by (authority, case-folded id); the first mention fixes spelling.
    let mut merged: BTreeMap<(AuthorityType, String), (CrossReference, Option<RelationshipType>)> =
        BTreeMap::new();
    for m in mentions {
        let key = (m.family.authority_type, m.identifier.to_lowercase());
        let (reference, cue) = merged.entry(key).or_insert_with(|| {
            (
                CrossReference {
                    source_document_id: document_id.to_string(),
                    target_identifier: m.identifier.clone(),
                    authority_type: m.family.authority_type,
                    relationship_type: m.family.relationship,
                    family: m.family.name.clone(),
                    snippets: Vec::new(),
                },
                None,
            )
        });
        if cue.is_none() {
            *cue = m.cue;
        }
        if !reference.snippets.contains(&m.snippet) {
            reference.snippets.push(m.snippet);
        }
    }

    merged
        .into_values()
        .map(|(mut reference, cue)| {
            if let Some(rel) = cue {
                reference.relationship_type = rel;
            }
            reference
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(text: &str) -> Vec<CrossReference> {
        let registry = PatternRegistry::builtin().unwrap();
        resolve("doc-1", text, &registry, &ClassifyOptions::default())
    }

    fn targets(refs: &[CrossReference]) -> Vec<(AuthorityType, &str)> {
        refs.iter()
            .map(|r| (r.authority_type, r.target_identifier.as_str()))
            .collect()
    }

    #[test]
    fn statute_section() {
        let refs = run("Section 1013 requires service by mail within 5 days");
        assert_eq!(targets(&refs), vec![(AuthorityType::Statute, "1013")]);
        assert_eq!(refs[0].relationship_type, RelationshipType::ReferencedProcedure);
        assert_eq!(refs[0].source_document_id, "doc-1");
        assert_eq!(refs[0].family, "statute");
    }

    #[test]
    fn repeated_mentions_collapse_with_merged_snippets() {
        let refs = run(
            "Service is governed by Section 1013. Extensions under Section 1013 apply. \
             See also section 1013 for mail.",
        );
        assert_eq!(refs.len(), 1);
        assert_eq!(refs[0].target_identifier, "1013");
        assert_eq!(refs[0].snippets.len(), 3);
    }

    #[test]
    fn crc_spellings_resolve_to_one_target() {
        let refs = run(
            "Motions must comply with CRC 3.1350. California Rules of Court, rule 3.1350 \
             also governs separate statements. Rule 3.1350(d) sets the format.",
        );
        assert_eq!(targets(&refs), vec![(AuthorityType::CourtRule, "3.1350")]);
    }

    #[test]
    fn local_rule_is_not_a_court_rule() {
        let refs = run("Local Rule 3.2 modifies the schedule set by rule 3.110.");
        assert_eq!(
            targets(&refs),
            vec![
                (AuthorityType::CourtRule, "3.110"),
                (AuthorityType::LocalRule, "3.2"),
            ]
        );
        let local = refs
            .iter()
            .find(|r| r.authority_type == AuthorityType::LocalRule)
            .unwrap();
        assert_eq!(local.relationship_type, RelationshipType::ModifiedBy);
    }

    #[test]
    fn qualified_families_prefix_authority() {
        let refs = run(
            "Evidence Code section 1101 applies, as does Federal Rule 12b and section 1101.",
        );
        assert_eq!(
            targets(&refs),
            vec![
                (AuthorityType::Statute, "1101"),
                (AuthorityType::Statute, "evidence code 1101"),
                (AuthorityType::CourtRule, "federal rule 12b"),
            ]
        );
    }

    #[test]
    fn suffixes_preserved_and_case_folded_for_dedup() {
        let refs = run("Under section 437c the motion is heard. Section 437C(a) sets timing.");
        assert_eq!(refs.len(), 1);
        assert_eq!(refs[0].target_identifier, "437c");
    }

    #[test]
    fn relationship_cue_overrides_default() {
        let refs = run("Notice shall be given as provided in Section 1005. Section 1013 also applies.");
        let by_id = |id: &str| refs.iter().find(|r| r.target_identifier == id).unwrap();
        assert_eq!(by_id("1005").relationship_type, RelationshipType::DependsOn);
        assert_eq!(
            by_id("1013").relationship_type,
            RelationshipType::ReferencedProcedure
        );

        let refs = run("Notwithstanding Section 1013, personal service is required here.");
        assert_eq!(refs[0].relationship_type, RelationshipType::ExceptionTo);
    }

    #[test]
    fn cue_does_not_cross_sentences() {
        let refs = run("This applies pursuant to statute. Section 1013 follows here.");
        assert_eq!(
            refs[0].relationship_type,
            RelationshipType::ReferencedProcedure
        );
    }

    #[test]
    fn case_citations_lowercased() {
        let refs = run("As held in Smith v. Jones (2001), and again in Smith v. Jones, notice matters.");
        assert_eq!(targets(&refs), vec![(AuthorityType::Case, "smith v. jones")]);
        assert_eq!(refs[0].relationship_type, RelationshipType::Cites);
    }

    #[test]
    fn resolution_is_idempotent() {
        let text = "Per CRC 3.1350 and Section 1013, see Local Rule 7 and Doe v. Roe.";
        assert_eq!(run(text), run(text));
    }
}
