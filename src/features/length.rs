//! Length category: character, token and sentence counts.

use regex::Regex;
use std::collections::HashSet;
use std::sync::LazyLock;

use crate::features::extractor::{FeatureCategory, FeatureExtractor};
use crate::features::stats;
use crate::features::tokenize;

/// A named table of literal symbols, each compiled to an escaped regex.
pub struct SymbolTable {
    entries: Vec<(&'static str, Regex)>,
}

impl SymbolTable {
    fn new(symbols: &[(&'static str, &'static str)]) -> Self {
        let entries = symbols
            .iter()
            .map(|&(name, literal)| (name, Regex::new(&regex::escape(literal)).unwrap()))
            .collect();
        Self { entries }
    }

    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.entries.iter().map(|(name, _)| *name)
    }

    pub fn count(&self, text: &str) -> usize {
        self.entries.iter().map(|(_, re)| re.find_iter(text).count()).sum()
    }

    pub fn count_symbol(&self, name: &str, text: &str) -> usize {
        self.entries
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, re)| re.find_iter(text).count())
            .unwrap_or(0)
    }

    /// Per-symbol totals over many texts, most frequent first. Ties keep table order.
    pub fn breakdown<S: AsRef<str>>(&self, texts: &[S]) -> Vec<(&'static str, usize)> {
        let mut counts: Vec<(&'static str, usize)> = self
            .entries
            .iter()
            .map(|(name, re)| {
                let total = texts.iter().map(|t| re.find_iter(t.as_ref()).count()).sum();
                (*name, total)
            })
            .collect();
        counts.sort_by(|a, b| b.1.cmp(&a.1));
        counts
    }
}

pub static SPECIALS: LazyLock<SymbolTable> = LazyLock::new(|| {
    SymbolTable::new(&[
        ("tilde", "~"),
        ("accent_grave", "`"),
        ("ampersat", "@"),
        ("hash", "#"),
        ("dollar", "$"),
        ("percent", "%"),
        ("caret", "^"),
        ("ampersand", "&"),
        ("asterisk", "*"),
        ("underscore", "_"),
        ("plus", "+"),
        ("equal", "="),
        ("pipe", "|"),
        ("backslash", "\\"),
        ("less_than", "<"),
        ("greater_than", ">"),
        ("forward_slash", "/"),
    ])
});

pub static PUNCTUATION: LazyLock<SymbolTable> = LazyLock::new(|| {
    SymbolTable::new(&[
        ("exclamation point", "!"),
        ("question mark", "?"),
        ("period", "."),
        ("comma", ","),
        ("semicolon", ";"),
        ("colon", ":"),
        ("hyphen", "-"),
        ("open parenthesis", "("),
        ("close parenthesis", ")"),
        ("open brace", "{"),
        ("close brace", "}"),
        ("open bracket", "["),
        ("close bracket", "]"),
        ("quotation mark", "\""),
        ("apostrophe", "'"),
        ("ellipsis", "..."),
    ])
});

pub struct AlphabeticCharacterCount;

impl FeatureExtractor for AlphabeticCharacterCount {
    fn name(&self) -> &str {
        "alphabetic_character_count"
    }

    fn category(&self) -> FeatureCategory {
        FeatureCategory::Length
    }

    fn compute(&self, text: &str) -> f64 {
        text.chars().filter(|c| c.is_alphabetic()).count() as f64
    }
}

/// Whitespace tokens made only of digits.
pub struct NumberCharacterCount;

impl FeatureExtractor for NumberCharacterCount {
    fn name(&self) -> &str {
        "number_character_count"
    }

    fn category(&self) -> FeatureCategory {
        FeatureCategory::Length
    }

    fn compute(&self, text: &str) -> f64 {
        tokenize::whitespace_tokens(text)
            .filter(|t| t.chars().all(char::is_numeric))
            .count() as f64
    }
}

/// Sum of matches over a symbol table.
pub struct SymbolCount {
    name: &'static str,
    table: &'static LazyLock<SymbolTable>,
}

impl SymbolCount {
    pub fn special_characters() -> Self {
        Self {
            name: "special_character_count",
            table: &SPECIALS,
        }
    }

    pub fn punctuation() -> Self {
        Self {
            name: "punctuation_count",
            table: &PUNCTUATION,
        }
    }

    pub fn breakdown<S: AsRef<str>>(&self, texts: &[S]) -> Vec<(&'static str, usize)> {
        self.table.breakdown(texts)
    }
}

impl FeatureExtractor for SymbolCount {
    fn name(&self) -> &str {
        self.name
    }

    fn category(&self) -> FeatureCategory {
        FeatureCategory::Length
    }

    fn compute(&self, text: &str) -> f64 {
        self.table.count(text) as f64
    }
}

/// Matches of a single punctuation symbol.
pub struct PunctuationMarkCount {
    name: &'static str,
    symbol: &'static str,
}

impl PunctuationMarkCount {
    pub fn commas() -> Self {
        Self {
            name: "commas_count",
            symbol: "comma",
        }
    }

    pub fn question_marks() -> Self {
        Self {
            name: "question_mark_count",
            symbol: "question mark",
        }
    }

    pub fn exclamation_marks() -> Self {
        Self {
            name: "exclamation_mark_count",
            symbol: "exclamation point",
        }
    }
}

impl FeatureExtractor for PunctuationMarkCount {
    fn name(&self) -> &str {
        self.name
    }

    fn category(&self) -> FeatureCategory {
        FeatureCategory::Length
    }

    fn compute(&self, text: &str) -> f64 {
        PUNCTUATION.count_symbol(self.symbol, text) as f64
    }
}

/// Whitespace tokens longer than `min_length` characters.
pub struct WordCount {
    name: String,
    min_length: usize,
}

impl WordCount {
    pub fn new() -> Self {
        Self {
            name: "word_count".to_string(),
            min_length: 0,
        }
    }

    pub fn longer_than(min_length: usize) -> Self {
        Self {
            name: format!("word_count_gt_{}", min_length),
            min_length,
        }
    }
}

impl Default for WordCount {
    fn default() -> Self {
        Self::new()
    }
}

impl FeatureExtractor for WordCount {
    fn name(&self) -> &str {
        &self.name
    }

    fn category(&self) -> FeatureCategory {
        FeatureCategory::Length
    }

    fn compute(&self, text: &str) -> f64 {
        tokenize::whitespace_tokens(text)
            .filter(|t| t.chars().count() > self.min_length)
            .count() as f64
    }
}

fn word_lengths(text: &str) -> Vec<f64> {
    tokenize::whitespace_tokens(text)
        .map(|t| t.chars().count() as f64)
        .collect()
}

pub struct AvgWordLength;

impl FeatureExtractor for AvgWordLength {
    fn name(&self) -> &str {
        "avg_word_length"
    }

    fn category(&self) -> FeatureCategory {
        FeatureCategory::Length
    }

    fn compute(&self, text: &str) -> f64 {
        stats::mean(&word_lengths(text))
    }
}

pub struct StdWordLength;

impl FeatureExtractor for StdWordLength {
    fn name(&self) -> &str {
        "std_word_length"
    }

    fn category(&self) -> FeatureCategory {
        FeatureCategory::Length
    }

    fn compute(&self, text: &str) -> f64 {
        stats::population_std(&word_lengths(text))
    }
}

/// Distinct whitespace tokens, case-sensitive.
pub struct VocabularySize;

impl FeatureExtractor for VocabularySize {
    fn name(&self) -> &str {
        "vocabulary_size"
    }

    fn category(&self) -> FeatureCategory {
        FeatureCategory::Length
    }

    fn compute(&self, text: &str) -> f64 {
        tokenize::whitespace_tokens(text).collect::<HashSet<_>>().len() as f64
    }
}

pub struct SentenceCount;

impl FeatureExtractor for SentenceCount {
    fn name(&self) -> &str {
        "sentence_count"
    }

    fn category(&self) -> FeatureCategory {
        FeatureCategory::Length
    }

    fn compute(&self, text: &str) -> f64 {
        tokenize::sentences(text).len() as f64
    }
}

/// Word-token count of each sentence.
fn sentence_lengths(text: &str) -> Vec<f64> {
    tokenize::sentences(text)
        .into_iter()
        .map(|s| tokenize::word_tokens(s).len() as f64)
        .collect()
}

pub struct AvgSentenceLength;

impl FeatureExtractor for AvgSentenceLength {
    fn name(&self) -> &str {
        "avg_sentence_length"
    }

    fn category(&self) -> FeatureCategory {
        FeatureCategory::Length
    }

    /// `0.0` when the text has no sentences.
    fn compute(&self, text: &str) -> f64 {
        let lengths = sentence_lengths(text);
        if lengths.is_empty() {
            return 0.0;
        }
        stats::mean(&lengths)
    }
}

pub struct StdSentenceLength;

impl FeatureExtractor for StdSentenceLength {
    fn name(&self) -> &str {
        "std_sentence_length"
    }

    fn category(&self) -> FeatureCategory {
        FeatureCategory::Length
    }

    /// Sample deviation; `0.0` with fewer than two sentences.
    fn compute(&self, text: &str) -> f64 {
        let lengths = sentence_lengths(text);
        if lengths.len() < 2 {
            return 0.0;
        }
        stats::sample_std(&lengths)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ROW: &str = "Hello world. Another sentence!";

    #[test]
    fn test_scenario_row() {
        assert_eq!(SentenceCount.compute(ROW), 2.0);
        assert_eq!(WordCount::new().compute(ROW), 4.0);
        assert_eq!(PunctuationMarkCount::question_marks().compute(ROW), 0.0);
        assert_eq!(PunctuationMarkCount::exclamation_marks().compute(ROW), 1.0);
        assert_eq!(AlphabeticCharacterCount.compute(ROW), 25.0);
        // "Hello world ." and "Another sentence !" are three tokens each
        assert_eq!(AvgSentenceLength.compute(ROW), 3.0);
        assert_eq!(StdSentenceLength.compute(ROW), 0.0);
    }

    #[test]
    fn test_word_count_matches_whitespace_tokens() {
        let texts = ["", "one", "  spaced   out\ttabs\nand lines ", "a b c d e f"];
        for text in texts {
            let expected = text.split_whitespace().count() as f64;
            assert_eq!(WordCount::new().compute(text), expected);
        }
        assert_eq!(WordCount::longer_than(5).compute("short tiny enormous elephant"), 2.0);
        assert_eq!(WordCount::longer_than(5).name(), "word_count_gt_5");
    }

    #[test]
    fn test_alphabetic_bounded_by_length() {
        for text in ["", "abc123", "Ünïcödé text!", "12 34"] {
            assert!(AlphabeticCharacterCount.compute(text) <= text.chars().count() as f64);
        }
    }

    #[test]
    fn test_number_tokens() {
        assert_eq!(NumberCharacterCount.compute("I have 2 cats and 10 dogs, 3rd"), 2.0);
    }

    #[test]
    fn test_symbol_counts() {
        assert_eq!(SymbolCount::special_characters().compute("a+b=c @home #1 ^_^"), 7.0);
        // "..." counts three periods plus one ellipsis
        assert_eq!(SymbolCount::punctuation().compute("Wait..."), 4.0);
        assert_eq!(PunctuationMarkCount::commas().compute("a, b, c"), 2.0);
    }

    #[test]
    fn test_breakdown_sorted_by_count() {
        let texts = vec!["50% off!".to_string(), "$5 + $6 = $11".to_string()];
        let breakdown = SymbolCount::special_characters().breakdown(&texts);

        assert_eq!(breakdown[0], ("dollar", 3));
        assert_eq!(breakdown.len(), SPECIALS.names().count());
        assert!(breakdown.windows(2).all(|w| w[0].1 >= w[1].1));
    }

    #[test]
    fn test_word_length_statistics() {
        assert_eq!(AvgWordLength.compute("ab abcd"), 3.0);
        assert_eq!(StdWordLength.compute("ab abcd"), 1.0);
        assert!(AvgWordLength.compute("").is_nan());
        assert!(StdWordLength.compute("   ").is_nan());
    }

    #[test]
    fn test_sentence_statistics_sentinels() {
        assert_eq!(AvgSentenceLength.compute(""), 0.0);
        assert_eq!(StdSentenceLength.compute(""), 0.0);
        assert_eq!(AvgSentenceLength.compute("Just one sentence here."), 5.0);
        assert_eq!(StdSentenceLength.compute("Just one sentence here."), 0.0);
        // token counts 3 and 7
        assert_eq!(
            StdSentenceLength.compute("One two. One two three four five six."),
            8f64.sqrt()
        );
    }

    #[test]
    fn test_vocabulary_size() {
        assert_eq!(VocabularySize.compute("the cat and the hat"), 4.0);
        assert_eq!(VocabularySize.compute(""), 0.0);
    }
}
