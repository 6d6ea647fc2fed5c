//! Filing-question pass: gate check, then snippet extraction.

use rulegraph_patterns::PatternRegistry;
use rulegraph_shared::{FilingQuestionAnalysis, FilingQuestionAnswer};

use crate::ClassifyOptions;
use crate::text::extract_snippets;

/// Answer every registry filing question for one document.
///
/// `lower_text` must be `text` lower-cased. A closed gate yields a default
/// answer without running any regex.
pub fn analyze(
    text: &str,
    lower_text: &str,
    registry: &PatternRegistry,
    opts: &ClassifyOptions,
) -> FilingQuestionAnalysis {
    let mandatory_marker = registry
        .obligations()
        .marker
        .as_ref()
        .is_some_and(|re| re.is_match(text));

    registry
        .filing_questions()
        .iter()
        .map(|fq| {
            let answer = if fq.gate_open(lower_text) {
                FilingQuestionAnswer {
                    answers_question: true,
                    snippets: extract_snippets(&fq.patterns, text, opts),
                    mandatory: mandatory_marker,
                }
            } else {
                FilingQuestionAnswer::default()
            };
            (fq.key.clone(), answer)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(text: &str) -> FilingQuestionAnalysis {
        let registry = PatternRegistry::builtin().unwrap();
        analyze(text, &text.to_lowercase(), &registry, &ClassifyOptions::default())
    }

    #[test]
    fn service_by_mail_answers_when() {
        let analysis = run("Section 1013 requires service by mail within 5 days");
        let when = &analysis["when_timing"];
        assert!(when.answers_question);
        assert_eq!(when.snippets, vec!["within 5 days"]);
        assert!(!when.mandatory);
    }

    #[test]
    fn every_registry_key_is_present() {
        let analysis = run("x");
        assert_eq!(analysis.len(), 6);
        assert!(analysis.values().all(|a| !a.answers_question));
    }

    #[test]
    fn gate_without_pattern_match_still_answers() {
        let analysis = run("The county clerk keeps a list of locations.");
        let venue = &analysis["where_venue"];
        assert!(venue.answers_question);
        assert!(venue.snippets.is_empty());
    }

    #[test]
    fn mandatory_marker_sets_flag() {
        let analysis = run(
            "The notice of motion shall be served and filed at least 16 court days before the hearing.",
        );
        let when = &analysis["when_timing"];
        assert!(when.answers_question);
        assert!(when.mandatory);
        assert_eq!(when.snippets, vec!["16 court days before"]);

        let how = &analysis["how_procedure"];
        assert!(how.snippets[0].starts_with("shall be served"));
    }
}
