//! Readability category: classic grade-level formulas.
//!
//! Words are lexical word tokens, characters are their alphanumeric characters. Every formula
//! yields `NaN` for text without words or sentences.

use crate::features::extractor::{FeatureCategory, FeatureExtractor};
use crate::features::tokenize;

#[derive(Debug, Clone, Copy, PartialEq)]
struct TextCounts {
    words: f64,
    sentences: f64,
    syllables: f64,
    characters: f64,
}

impl TextCounts {
    fn of(text: &str) -> Self {
        let words = tokenize::lexical_words(text);
        Self {
            words: words.len() as f64,
            sentences: tokenize::sentences(text).len() as f64,
            syllables: words.iter().map(|w| tokenize::syllables(w)).sum::<usize>() as f64,
            characters: words
                .iter()
                .map(|w| w.chars().filter(|c| c.is_alphanumeric()).count())
                .sum::<usize>() as f64,
        }
    }

    fn is_measurable(&self) -> bool {
        self.words > 0.0 && self.sentences > 0.0
    }

    fn words_per_sentence(&self) -> f64 {
        self.words / self.sentences
    }

    fn syllables_per_word(&self) -> f64 {
        self.syllables / self.words
    }

    fn characters_per_word(&self) -> f64 {
        self.characters / self.words
    }
}

pub struct SyllableCount;

impl FeatureExtractor for SyllableCount {
    fn name(&self) -> &str {
        "syllable_count"
    }

    fn category(&self) -> FeatureCategory {
        FeatureCategory::Readability
    }

    fn compute(&self, text: &str) -> f64 {
        TextCounts::of(text).syllables
    }
}

/// A readability score over word, sentence, syllable and character counts.
pub struct ReadabilityFormula {
    name: &'static str,
    formula: fn(&TextCounts) -> f64,
}

impl ReadabilityFormula {
    pub fn flesch_reading_ease() -> Self {
        Self {
            name: "flesch_reading_ease",
            formula: |c| 206.835 - 1.015 * c.words_per_sentence() - 84.6 * c.syllables_per_word(),
        }
    }

    pub fn flesch_kincaid_grade() -> Self {
        Self {
            name: "flesch_kincaid_grade",
            formula: |c| 0.39 * c.words_per_sentence() + 11.8 * c.syllables_per_word() - 15.59,
        }
    }

    pub fn automated_readability_index() -> Self {
        Self {
            name: "automated_readability_index",
            formula: |c| 4.71 * c.characters_per_word() + 0.5 * c.words_per_sentence() - 21.43,
        }
    }

    pub fn coleman_liau_index() -> Self {
        Self {
            name: "coleman_liau_index",
            formula: |c| {
                let letters_per_100 = c.characters_per_word() * 100.0;
                let sentences_per_100 = c.sentences / c.words * 100.0;
                0.0588 * letters_per_100 - 0.296 * sentences_per_100 - 15.8
            },
        }
    }
}

impl FeatureExtractor for ReadabilityFormula {
    fn name(&self) -> &str {
        self.name
    }

    fn category(&self) -> FeatureCategory {
        FeatureCategory::Readability
    }

    fn compute(&self, text: &str) -> f64 {
        let counts = TextCounts::of(text);
        if !counts.is_measurable() {
            return f64::NAN;
        }
        (self.formula)(&counts)
    }
}
