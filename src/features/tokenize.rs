//! Tokenizers shared by the extractors.
//!
//! Three notions of "word" are used:
//! - whitespace tokens: `str::split_whitespace`, punctuation stays attached ("world.")
//! - word tokens: treebank-style, punctuation split off ("world", ".")
//! - lexical words: word tokens containing at least one alphanumeric character

use regex::Regex;
use std::sync::LazyLock;

static WORD_TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\w+(?:['\u{2019}-]\w+)*|\.\.\.|[^\w\s]").unwrap());

const ABBREVIATIONS: &[&str] = &[
    "mr", "mrs", "ms", "dr", "prof", "sr", "jr", "st", "vs", "e.g", "i.e", "u.s",
];

/// Abbreviations only when a number follows, as in "No. 5".
const NUMBERED_ABBREVIATIONS: &[&str] = &["no", "fig"];

pub fn whitespace_tokens(text: &str) -> impl Iterator<Item = &str> {
    text.split_whitespace()
}

pub fn word_tokens(text: &str) -> Vec<&str> {
    WORD_TOKEN.find_iter(text).map(|m| m.as_str()).collect()
}

pub fn lexical_words(text: &str) -> Vec<&str> {
    WORD_TOKEN
        .find_iter(text)
        .map(|m| m.as_str())
        .filter(|t| t.chars().any(char::is_alphanumeric))
        .collect()
}

fn is_terminal(c: char) -> bool {
    matches!(c, '.' | '!' | '?')
}

fn is_closing(c: char) -> bool {
    matches!(c, '"' | '\'' | ')' | ']' | '\u{201D}' | '\u{2019}')
}

fn starts_sentence(rest: &str) -> bool {
    rest.chars()
        .next()
        .map(|c| c.is_uppercase() || c.is_numeric() || matches!(c, '"' | '\'' | '(' | '[' | '\u{201C}'))
        .unwrap_or(false)
}

fn ends_with_abbreviation(segment: &str, rest: &str) -> bool {
    segment
        .split_whitespace()
        .last()
        .map(|word| {
            let word = word.trim_start_matches(|c: char| !c.is_alphanumeric()).to_lowercase();
            ABBREVIATIONS.contains(&word.as_str())
                || (NUMBERED_ABBREVIATIONS.contains(&word.as_str())
                    && rest.trim_start().starts_with(|c: char| c.is_ascii_digit()))
        })
        .unwrap_or(false)
}

/// Splits text into sentences.
///
/// A boundary is a run of `.`, `!` or `?` (plus closing quotes/brackets) followed by the end of
/// text, or by whitespace and a character that can start a sentence. A period after a known
/// abbreviation is not a boundary, nor is one after "No" or "Fig" when a number follows.
/// Whitespace-only text has no sentences.
pub fn sentences(text: &str) -> Vec<&str> {
    let chars: Vec<(usize, char)> = text.char_indices().collect();
    let mut out = Vec::new();
    let mut start = 0;
    let mut i = 0;

    while i < chars.len() {
        let (pos, c) = chars[i];
        if !is_terminal(c) {
            i += 1;
            continue;
        }

        let mut j = i + 1;
        while j < chars.len() && (is_terminal(chars[j].1) || is_closing(chars[j].1)) {
            j += 1;
        }
        let end = chars.get(j).map(|&(p, _)| p).unwrap_or(text.len());
        let rest = &text[end..];

        let at_end = rest.trim().is_empty();
        let next_starts = rest.starts_with(char::is_whitespace) && starts_sentence(rest.trim_start());
        let abbreviation = c == '.' && j == i + 1 && ends_with_abbreviation(&text[start..pos], rest);

        if (at_end || next_starts) && !abbreviation {
            push_trimmed(&mut out, &text[start..end]);
            start = end;
        }
        i = j;
    }

    push_trimmed(&mut out, &text[start..]);
    out
}

fn push_trimmed<'a>(out: &mut Vec<&'a str>, segment: &'a str) {
    let trimmed = segment.trim();
    if !trimmed.is_empty() {
        out.push(trimmed);
    }
}

/// Heuristic English syllable count: vowel groups, minus a silent final `e`, at least one for
/// any word with letters.
pub fn syllables(word: &str) -> usize {
    let letters: Vec<char> = word
        .chars()
        .filter(|c| c.is_alphabetic())
        .flat_map(|c| c.to_lowercase())
        .collect();
    if letters.is_empty() {
        return 0;
    }

    let is_vowel = |c: char| matches!(c, 'a' | 'e' | 'i' | 'o' | 'u' | 'y');
    let mut count = 0;
    let mut previous_vowel = false;
    for &c in &letters {
        let vowel = is_vowel(c);
        if vowel && !previous_vowel {
            count += 1;
        }
        previous_vowel = vowel;
    }

    let n = letters.len();
    if count > 1 && letters[n - 1] == 'e' && !(n >= 2 && letters[n - 2] == 'l') {
        count -= 1;
    }

    count.max(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_word_tokens_split_punctuation() {
        assert_eq!(word_tokens("Hello world."), vec!["Hello", "world", "."]);
        assert_eq!(
            word_tokens("I don't know... well-known?"),
            vec!["I", "don't", "know", "...", "well-known", "?"]
        );
        assert_eq!(lexical_words("Wait , what ?!"), vec!["Wait", "what"]);
    }

    #[test]
    fn test_sentences() {
        assert_eq!(
            sentences("Hello world. Another sentence!"),
            vec!["Hello world.", "Another sentence!"]
        );
        assert_eq!(sentences("No terminal punctuation"), vec!["No terminal punctuation"]);
        assert_eq!(sentences("   "), Vec::<&str>::new());
        assert_eq!(sentences(""), Vec::<&str>::new());
    }

    #[test]
    fn test_sentences_keep_abbreviations_and_decimals() {
        assert_eq!(
            sentences("Mr. Smith paid 3.50 dollars. He left."),
            vec!["Mr. Smith paid 3.50 dollars.", "He left."]
        );
        assert_eq!(
            sentences("\"Is it real?\" she asked. Yes!!"),
            vec!["\"Is it real?\" she asked.", "Yes!!"]
        );
    }

    #[test]
    fn test_sentences_numbered_abbreviations() {
        assert_eq!(sentences("I said no. Then I left."), vec!["I said no.", "Then I left."]);
        assert_eq!(sentences("See No. 5 here. Fig. 2 too."), vec!["See No. 5 here.", "Fig. 2 too."]);
    }

    #[test]
    fn test_syllables() {
        assert_eq!(syllables("cat"), 1);
        assert_eq!(syllables("table"), 2);
        assert_eq!(syllables("make"), 1);
        assert_eq!(syllables("beautiful"), 3);
        assert_eq!(syllables("the"), 1);
        assert_eq!(syllables("42"), 0);
    }
}
