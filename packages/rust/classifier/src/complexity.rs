//! Complexity score from four independent text factors.

use rulegraph_patterns::PatternRegistry;
use rulegraph_shared::ComplexityLevel;

/// Raw measurements behind a complexity score.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ComplexityFactors {
    pub word_count: usize,
    /// Legal terms per 1000 words.
    pub legal_term_density: f64,
    pub reference_count: usize,
    /// Mean words per sentence.
    pub avg_sentence_length: f64,
}

impl ComplexityFactors {
    pub fn measure(text: &str, registry: &PatternRegistry, reference_count: usize) -> Self {
        let word_count = text.split_whitespace().count();
        let legal_terms: usize = registry
            .legal_terms()
            .iter()
            .map(|re| re.find_iter(text).count())
            .sum();
        let sentences = text
            .split(['.', '!', '?'])
            .filter(|s| !s.trim().is_empty())
            .count();

        let (legal_term_density, avg_sentence_length) = if word_count == 0 {
            (0.0, 0.0)
        } else {
            (
                legal_terms as f64 / word_count as f64 * 1000.0,
                word_count as f64 / sentences.max(1) as f64,
            )
        };

        Self {
            word_count,
            legal_term_density,
            reference_count,
            avg_sentence_length,
        }
    }

    /// Sum of the factor points, capped at 100.
    pub fn score(&self) -> u32 {
        let length = match self.word_count {
            n if n > 5000 => 20,
            n if n > 2000 => 15,
            n if n > 1000 => 10,
            n if n > 500 => 5,
            _ => 0,
        };
        let density = match self.legal_term_density {
            d if d > 20.0 => 25,
            d if d > 10.0 => 15,
            d if d > 5.0 => 10,
            _ => 0,
        };
        let references = match self.reference_count {
            n if n > 20 => 20,
            n if n > 10 => 15,
            n if n > 5 => 10,
            _ => 0,
        };
        let sentences = match self.avg_sentence_length {
            l if l > 30.0 => 15,
            l if l > 20.0 => 10,
            l if l > 15.0 => 5,
            _ => 0,
        };
        (length + density + references + sentences).min(100)
    }
}

/// Complexity score and its level.
pub fn assess(text: &str, registry: &PatternRegistry, reference_count: usize) -> (u32, ComplexityLevel) {
    let score = ComplexityFactors::measure(text, registry, reference_count).score();
    (score, ComplexityLevel::from_score(score))
}
