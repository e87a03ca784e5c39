//! Syntactic category.

use std::collections::HashSet;

use crate::features::extractor::{FeatureCategory, FeatureExtractor};
use crate::features::tokenize;

/// Distinct lowercased words over total words, `NaN` without words.
pub struct TypeTokenRatio;

impl FeatureExtractor for TypeTokenRatio {
    fn name(&self) -> &str {
        "type_token_ratio"
    }

    fn category(&self) -> FeatureCategory {
        FeatureCategory::Syntactic
    }

    fn compute(&self, text: &str) -> f64 {
        let words: Vec<String> = tokenize::lexical_words(text)
            .into_iter()
            .map(str::to_lowercase)
            .collect();
        if words.is_empty() {
            return f64::NAN;
        }
        let types: HashSet<&str> = words.iter().map(String::as_str).collect();
        types.len() as f64 / words.len() as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_token_ratio() {
        assert_eq!(TypeTokenRatio.compute("The cat saw the dog."), 0.8);
        assert_eq!(TypeTokenRatio.compute("unique"), 1.0);
        assert!(TypeTokenRatio.compute("?!").is_nan());
    }
}
