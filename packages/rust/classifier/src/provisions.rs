//! Obligation language, rule status, and named entities.

use rulegraph_patterns::PatternRegistry;
use rulegraph_shared::{NamedEntities, Obligations, RuleStatus, RuleStatusInfo};

use crate::ClassifyOptions;
use crate::text::{collapse_whitespace, extract_snippets};

/// Cap per entity kind.
const MAX_ENTITIES_PER_KIND: usize = 5;

pub fn obligations(text: &str, registry: &PatternRegistry, opts: &ClassifyOptions) -> Obligations {
    let markers = registry.obligations();
    Obligations {
        mandatory: extract_snippets(&markers.mandatory, text, opts),
        permissive: extract_snippets(&markers.permissive, text, opts),
        directory: extract_snippets(&markers.directory, text, opts),
    }
}

/// Status precedence: repealed, superseded, amended, active.
pub fn rule_status(text: &str, lower_text: &str, registry: &PatternRegistry) -> RuleStatusInfo {
    let patterns = registry.rule_status();
    let any = |words: &[String]| words.iter().any(|w| lower_text.contains(w.as_str()));

    let status = if any(&patterns.repealed) {
        RuleStatus::Repealed
    } else if any(&patterns.superseded) {
        RuleStatus::Superseded
    } else if any(&patterns.amended) {
        RuleStatus::Amended
    } else {
        RuleStatus::Active
    };

    let effective_date = patterns
        .effective_date
        .as_ref()
        .and_then(|re| re.captures(text))
        .and_then(|caps| caps.name("date"))
        .map(|m| collapse_whitespace(m.as_str()));

    let mut amendment_dates: Vec<String> = Vec::new();
    if let Some(re) = &patterns.amendment_date {
        for caps in re.captures_iter(text) {
            if let Some(date) = caps.name("date") {
                let date = collapse_whitespace(date.as_str());
                if !amendment_dates.contains(&date) {
                    amendment_dates.push(date);
                }
            }
        }
    }

    RuleStatusInfo {
        status,
        effective_date,
        amendment_dates,
    }
}

/// Distinct entity names per kind, first-seen order, capped.
pub fn entities(text: &str, registry: &PatternRegistry) -> NamedEntities {
    let mut found = NamedEntities::default();
    for pattern in registry.entities() {
        for caps in pattern.regex.captures_iter(text) {
            let Some(name) = caps.name("name") else {
                continue;
            };
            let name = collapse_whitespace(name.as_str());
            let list = found.list_mut(pattern.kind);
            if list.len() < MAX_ENTITIES_PER_KIND && !name.is_empty() && !list.contains(&name) {
                list.push(name);
            }
        }
    }
    found
}
