use std::collections::HashMap;
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::features::extractor::{FeatureCategory, FeatureExtractor};
use crate::features::length::{
    AlphabeticCharacterCount, AvgSentenceLength, AvgWordLength, NumberCharacterCount,
    PunctuationMarkCount, SentenceCount, StdSentenceLength, StdWordLength, SymbolCount,
    VocabularySize, WordCount,
};
use crate::features::readability::{ReadabilityFormula, SyllableCount};
use crate::features::syntactic::TypeTokenRatio;
use crate::features::word::{ModalCount, StopWordCount, StopWordRatio};

/// Extractors indexed by canonical name, in registration order.
pub struct ExtractorRegistry {
    extractors: Vec<Arc<dyn FeatureExtractor>>,
    index: HashMap<String, usize>,
}

impl ExtractorRegistry {
    pub fn empty() -> Self {
        Self {
            extractors: Vec::new(),
            index: HashMap::new(),
        }
    }

    /// Every built-in extractor, category by category.
    pub fn builtin() -> Result<Self> {
        let mut registry = Self::empty();

        registry.init_length()?;
        registry.init_word()?;
        registry.init_syntactic()?;
        registry.init_readability()?;

        tracing::debug!("Registered {} feature extractors", registry.extractors.len());
        Ok(registry)
    }

    fn init_length(&mut self) -> Result<()> {
        let extractors: Vec<Arc<dyn FeatureExtractor>> = vec![
            Arc::new(AlphabeticCharacterCount),
            Arc::new(NumberCharacterCount),
            Arc::new(SymbolCount::special_characters()),
            Arc::new(SymbolCount::punctuation()),
            Arc::new(PunctuationMarkCount::commas()),
            Arc::new(PunctuationMarkCount::question_marks()),
            Arc::new(PunctuationMarkCount::exclamation_marks()),
            Arc::new(WordCount::new()),
            Arc::new(WordCount::longer_than(5)),
            Arc::new(WordCount::longer_than(6)),
            Arc::new(WordCount::longer_than(7)),
            Arc::new(WordCount::longer_than(8)),
            Arc::new(AvgWordLength),
            Arc::new(StdWordLength),
            Arc::new(VocabularySize),
            Arc::new(SentenceCount),
            Arc::new(AvgSentenceLength),
            Arc::new(StdSentenceLength),
        ];

        for extractor in extractors {
            self.register(extractor)?;
        }
        Ok(())
    }

    fn init_word(&mut self) -> Result<()> {
        let extractors: Vec<Arc<dyn FeatureExtractor>> = vec![
            Arc::new(StopWordCount),
            Arc::new(StopWordRatio),
            Arc::new(ModalCount),
        ];

        for extractor in extractors {
            self.register(extractor)?;
        }
        Ok(())
    }

    fn init_syntactic(&mut self) -> Result<()> {
        self.register(Arc::new(TypeTokenRatio))
    }

    fn init_readability(&mut self) -> Result<()> {
        let extractors: Vec<Arc<dyn FeatureExtractor>> = vec![
            Arc::new(SyllableCount),
            Arc::new(ReadabilityFormula::flesch_reading_ease()),
            Arc::new(ReadabilityFormula::flesch_kincaid_grade()),
            Arc::new(ReadabilityFormula::automated_readability_index()),
            Arc::new(ReadabilityFormula::coleman_liau_index()),
        ];

        for extractor in extractors {
            self.register(extractor)?;
        }
        Ok(())
    }

    pub fn register(&mut self, extractor: Arc<dyn FeatureExtractor>) -> Result<()> {
        let name = extractor.name().to_string();
        if self.index.contains_key(&name) {
            tracing::error!("Feature extractor {} is already registered", name);
            return Err(Error::DuplicateExtractor(name));
        }
        self.index.insert(name, self.extractors.len());
        self.extractors.push(extractor);
        Ok(())
    }

    pub fn list_extractors(&self) -> Vec<&str> {
        self.extractors.iter().map(|e| e.name()).collect()
    }

    pub fn list_category(&self, category: FeatureCategory) -> Vec<&str> {
        self.extractors
            .iter()
            .filter(|e| e.category() == category)
            .map(|e| e.name())
            .collect()
    }

    pub fn categories(&self) -> &'static [FeatureCategory] {
        &FeatureCategory::ALL
    }

    pub fn len(&self) -> usize {
        self.extractors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.extractors.is_empty()
    }

    pub fn create_extractor(&self, name: &str) -> Result<Arc<dyn FeatureExtractor>> {
        match self.index.get(name) {
            Some(&i) => Ok(Arc::clone(&self.extractors[i])),
            None => {
                tracing::error!(
                    "No feature extractor named {}. Check list_extractors() for valid names.",
                    name
                );
                Err(Error::ExtractorNotFound(name.to_string()))
            }
        }
    }

    pub fn extractors_in(&self, category: FeatureCategory) -> Vec<Arc<dyn FeatureExtractor>> {
        self.extractors
            .iter()
            .filter(|e| e.category() == category)
            .cloned()
            .collect()
    }
}
