//! Small text utilities shared by the classifier passes.

use std::collections::HashSet;

use rulegraph_patterns::CompiledPattern;

use crate::ClassifyOptions;

/// Collapse every whitespace run to a single space and trim.
pub(crate) fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// First `max` chars of `s`, never splitting a code point.
pub(crate) fn truncate_chars(s: &str, max: usize) -> String {
    s.chars().take(max).collect()
}

/// Whether `[start, end)` intersects any claimed span.
pub(crate) fn overlaps(claimed: &[(usize, usize)], start: usize, end: usize) -> bool {
    claimed.iter().any(|&(s, e)| start < e && s < end)
}

/// Byte range covering `chars` characters on either side of `[start, end)`.
pub(crate) fn widen(text: &str, start: usize, end: usize, chars: usize) -> (usize, usize) {
    let from = text[..start]
        .char_indices()
        .rev()
        .take(chars)
        .last()
        .map(|(i, _)| i)
        .unwrap_or(start);
    let to = text[end..]
        .char_indices()
        .nth(chars)
        .map(|(i, _)| end + i)
        .unwrap_or(text.len());
    (from, to)
}

/// Run `patterns` over `text` and return kept snippets in text order.
///
/// Earlier patterns claim spans first; a later match overlapping a claimed
/// span is ignored. Snippets at or below `min_snippet_len` chars are
/// dropped, longer ones truncated to `max_snippet_len`, duplicates removed.
pub(crate) fn extract_snippets(
    patterns: &[CompiledPattern],
    text: &str,
    opts: &ClassifyOptions,
) -> Vec<String> {
    let mut claimed: Vec<(usize, usize)> = Vec::new();
    let mut found: Vec<(usize, String)> = Vec::new();

    for pattern in patterns {
        for m in pattern.regex.find_iter(text) {
            if overlaps(&claimed, m.start(), m.end()) {
                continue;
            }
            let snippet = collapse_whitespace(m.as_str());
            if snippet.chars().count() <= opts.min_snippet_len {
                continue;
            }
            claimed.push((m.start(), m.end()));
            found.push((m.start(), truncate_chars(&snippet, opts.max_snippet_len)));
        }
    }

    found.sort_by_key(|(start, _)| *start);
    let mut seen = HashSet::new();
    found
        .into_iter()
        .filter_map(|(_, s)| seen.insert(s.clone()).then_some(s))
        .collect()
}
