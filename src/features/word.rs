//! Word category: function-word usage.

use std::collections::HashSet;
use std::sync::LazyLock;

use crate::features::extractor::{FeatureCategory, FeatureExtractor};
use crate::features::tokenize;

static STOP_WORDS: LazyLock<HashSet<&'static str>> = LazyLock::new(|| {
    [
        "i", "me", "my", "myself", "we", "our", "ours", "ourselves", "you", "your", "yours",
        "yourself", "yourselves", "he", "him", "his", "himself", "she", "her", "hers", "herself",
        "it", "its", "itself", "they", "them", "their", "theirs", "themselves", "what", "which",
        "who", "whom", "this", "that", "these", "those", "am", "is", "are", "was", "were", "be",
        "been", "being", "have", "has", "had", "having", "do", "does", "did", "doing", "a", "an",
        "the", "and", "but", "if", "or", "because", "as", "until", "while", "of", "at", "by",
        "for", "with", "about", "against", "between", "into", "through", "during", "before",
        "after", "above", "below", "to", "from", "up", "down", "in", "out", "on", "off", "over",
        "under", "again", "further", "then", "once", "here", "there", "when", "where", "why",
        "how", "all", "any", "both", "each", "few", "more", "most", "other", "some", "such", "no",
        "nor", "not", "only", "own", "same", "so", "than", "too", "very", "can", "will", "just",
        "don't", "should", "now",
    ]
    .into_iter()
    .collect()
});

const MODALS: &[&str] = &[
    "can", "could", "may", "might", "must", "shall", "should", "will", "would", "ought",
];

fn lowercase_words(text: &str) -> Vec<String> {
    tokenize::lexical_words(text)
        .into_iter()
        .map(str::to_lowercase)
        .collect()
}

pub fn is_stop_word(word: &str) -> bool {
    STOP_WORDS.contains(word.to_lowercase().as_str())
}

pub struct StopWordCount;

impl FeatureExtractor for StopWordCount {
    fn name(&self) -> &str {
        "stop_word_count"
    }

    fn category(&self) -> FeatureCategory {
        FeatureCategory::Word
    }

    fn compute(&self, text: &str) -> f64 {
        tokenize::lexical_words(text)
            .into_iter()
            .filter(|w| is_stop_word(w))
            .count() as f64
    }
}

/// Share of words that are stop words, `NaN` without words.
pub struct StopWordRatio;

impl FeatureExtractor for StopWordRatio {
    fn name(&self) -> &str {
        "stop_word_ratio"
    }

    fn category(&self) -> FeatureCategory {
        FeatureCategory::Word
    }

    fn compute(&self, text: &str) -> f64 {
        let words = tokenize::lexical_words(text);
        if words.is_empty() {
            return f64::NAN;
        }
        let stops = words.iter().filter(|w| is_stop_word(w)).count();
        stops as f64 / words.len() as f64
    }
}

pub struct ModalCount;

impl FeatureExtractor for ModalCount {
    fn name(&self) -> &str {
        "modal_count"
    }

    fn category(&self) -> FeatureCategory {
        FeatureCategory::Word
    }

    fn compute(&self, text: &str) -> f64 {
        lowercase_words(text)
            .iter()
            .filter(|w| MODALS.contains(&w.as_str()))
            .count() as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stop_words() {
        let text = "The face on Mars is a natural landform.";
        // the, on, is, a
        assert_eq!(StopWordCount.compute(text), 4.0);
        assert_eq!(StopWordRatio.compute(text), 0.5);
        assert!(is_stop_word("THE"));
        assert!(!is_stop_word("landform"));
    }

    #[test]
    fn test_empty_text() {
        assert_eq!(StopWordCount.compute(""), 0.0);
        assert!(StopWordRatio.compute(" ... ").is_nan());
    }

    #[test]
    fn test_modal_count() {
        assert_eq!(ModalCount.compute("We should go. You Must stay, or we could wait."), 3.0);
    }
}
