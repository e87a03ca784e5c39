use indicatif::{ProgressBar, ProgressStyle};
use std::sync::Arc;

use crate::config::ColumnConfig;
use crate::error::{Error, Result};
use crate::features::extractor::{FeatureCategory, FeatureColumn, FeatureExtractor};
use crate::features::registry::ExtractorRegistry;
use crate::features::stats::{self, Bin, Describe};
use crate::models::{Column, Table};

/// An extracted feature held by a [`FeatureSet`].
pub type Feature = FeatureColumn;

impl FeatureColumn {
    pub fn describe(&self) -> Describe {
        Describe::of(&self.values)
    }

    pub fn histogram(&self, bins: usize) -> Vec<Bin> {
        stats::histogram(&self.values, bins)
    }

    fn to_column(&self) -> Column {
        Column::numeric(self.name.clone(), self.values.clone())
    }
}

/// Features extracted from one base table, joined to it row by row through the id column.
pub struct FeatureSet {
    base: Table,
    columns: ColumnConfig,
    ids: Vec<String>,
    features: Vec<Feature>,
}

impl FeatureSet {
    pub fn new(base: Table, columns: ColumnConfig) -> Result<Self> {
        let ids = base.column_as_strings(&columns.idvar)?;
        Ok(Self {
            base,
            columns,
            ids,
            features: Vec::new(),
        })
    }

    pub fn base(&self) -> &Table {
        &self.base
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    /// Adds a feature unless a feature or base column with the same name exists. Returns
    /// whether it was added.
    pub fn add_feature(&mut self, feature: Feature) -> Result<bool> {
        if self.features.iter().any(|f| f.name == feature.name) {
            tracing::warn!("Feature {} already exists in the feature set", feature.name);
            return Ok(false);
        }
        if self.base.has_column(&feature.name) {
            tracing::warn!("Feature {} already exists as a base table column", feature.name);
            return Ok(false);
        }
        if feature.ids != self.ids {
            return Err(Error::DataShape(format!(
                "feature {} rows do not match the base table ids",
                feature.name
            )));
        }
        self.features.push(feature);
        Ok(true)
    }

    pub fn remove_feature(&mut self, name: &str) -> Result<Feature> {
        let index = self
            .features
            .iter()
            .position(|f| f.name == name)
            .ok_or_else(|| {
                tracing::error!("Feature {} does not exist in the feature set", name);
                Error::FeatureNotFound(name.to_string())
            })?;
        Ok(self.features.remove(index))
    }

    pub fn get_feature(&self, name: &str) -> Result<&Feature> {
        self.features
            .iter()
            .find(|f| f.name == name)
            .ok_or_else(|| {
                tracing::error!("Feature {} does not exist in the feature set", name);
                Error::FeatureNotFound(name.to_string())
            })
    }

    pub fn list_features(&self) -> Vec<&str> {
        self.features.iter().map(|f| f.name.as_str()).collect()
    }

    /// Base table plus the features of one category.
    pub fn get_features(&self, category: &str) -> Result<Table> {
        let category: FeatureCategory = category.parse()?;
        let mut table = self.base.clone();
        for feature in self.features.iter().filter(|f| f.category == category) {
            table.add_column(feature.to_column())?;
        }
        Ok(table)
    }

    /// Base table plus every feature, in insertion order.
    pub fn to_table(&self) -> Result<Table> {
        let mut table = self.base.clone();
        for feature in &self.features {
            table.add_column(feature.to_column())?;
        }
        Ok(table)
    }

    pub fn extract_category(
        &mut self,
        registry: &ExtractorRegistry,
        category: FeatureCategory,
    ) -> Result<usize> {
        let extractors = registry.extractors_in(category);
        tracing::info!("Extracting {} {} features", extractors.len(), category);
        self.extract_all(extractors)
    }

    pub fn extract_named(&mut self, registry: &ExtractorRegistry, names: &[&str]) -> Result<usize> {
        let extractors = names
            .iter()
            .map(|name| registry.create_extractor(name))
            .collect::<Result<Vec<_>>>()?;
        tracing::info!("Extracting {} named features", extractors.len());
        self.extract_all(extractors)
    }

    /// Runs the extractors against the base table. Returns how many features were added.
    fn extract_all(&mut self, extractors: Vec<Arc<dyn FeatureExtractor>>) -> Result<usize> {
        let pb = ProgressBar::new(extractors.len() as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} features {msg}")
                .unwrap()
                .progress_chars("#>-"),
        );

        let mut added = 0;
        for extractor in extractors {
            pb.set_message(extractor.name().to_string());
            let feature = extractor.extract(&self.base, &self.columns)?;
            if self.add_feature(feature)? {
                added += 1;
            }
            pb.inc(1);
        }

        pb.finish_with_message("done");
        Ok(added)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> Table {
        Table::from_columns(vec![
            Column::text("discourse_id", vec!["d1".into(), "d2".into()]),
            Column::text(
                "discourse_text",
                vec!["Hello world. Another sentence!".into(), "Why? Because.".into()],
            ),
            Column::text("discourse_type", vec!["Lead".into(), "Claim".into()]),
        ])
        .unwrap()
    }

    fn feature_set() -> FeatureSet {
        FeatureSet::new(base(), ColumnConfig::default()).unwrap()
    }

    #[test]
    fn test_extract_category_and_join() {
        let registry = ExtractorRegistry::builtin().unwrap();
        let mut set = feature_set();

        let added = set.extract_category(&registry, FeatureCategory::Length).unwrap();
        assert_eq!(added, registry.list_category(FeatureCategory::Length).len());

        let table = set.get_features("length").unwrap();
        assert_eq!(table.n_rows(), 2);
        assert!(table.has_column("discourse_type"));
        assert_eq!(table.numeric_column("word_count").unwrap(), &[4.0, 2.0]);
        assert_eq!(table.numeric_column("question_mark_count").unwrap(), &[0.0, 1.0]);

        let readability = set.get_features("readability").unwrap();
        assert_eq!(readability.n_columns(), 3);
    }

    #[test]
    fn test_duplicate_feature_is_noop() {
        let registry = ExtractorRegistry::builtin().unwrap();
        let mut set = feature_set();

        assert_eq!(set.extract_named(&registry, &["word_count"]).unwrap(), 1);
        assert_eq!(set.extract_named(&registry, &["word_count"]).unwrap(), 0);
        assert_eq!(set.list_features(), vec!["word_count"]);
    }

    #[test]
    fn test_feature_already_in_base_is_noop() {
        let registry = ExtractorRegistry::builtin().unwrap();
        let mut first = feature_set();
        first.extract_named(&registry, &["word_count"]).unwrap();
        let extracted = first.to_table().unwrap();

        let mut set = FeatureSet::new(extracted, ColumnConfig::default()).unwrap();
        assert_eq!(set.extract_named(&registry, &["word_count", "sentence_count"]).unwrap(), 1);
        assert_eq!(set.list_features(), vec!["sentence_count"]);

        let table = set.to_table().unwrap();
        assert_eq!(table.n_columns(), 5);
        assert_eq!(table.numeric_column("word_count").unwrap(), &[4.0, 2.0]);
        assert_eq!(set.get_features("length").unwrap().n_columns(), 5);
    }

    #[test]
    fn test_misaligned_feature_rejected() {
        let mut set = feature_set();
        let feature = Feature {
            name: "word_count".into(),
            category: FeatureCategory::Length,
            ids: vec!["d2".into(), "d1".into()],
            values: vec![1.0, 2.0],
        };
        assert!(matches!(set.add_feature(feature), Err(Error::DataShape(_))));
    }

    #[test]
    fn test_lookup_errors() {
        let mut set = feature_set();
        assert!(matches!(set.get_feature("nope"), Err(Error::FeatureNotFound(_))));
        assert!(matches!(set.remove_feature("nope"), Err(Error::FeatureNotFound(_))));
        assert!(matches!(set.get_features("phonetic"), Err(Error::UnknownCategory(_))));

        let registry = ExtractorRegistry::builtin().unwrap();
        assert!(matches!(
            set.extract_named(&registry, &["word_count", "nope"]),
            Err(Error::ExtractorNotFound(_))
        ));
        assert!(set.is_empty());
    }

    #[test]
    fn test_remove_and_describe() {
        let registry = ExtractorRegistry::builtin().unwrap();
        let mut set = feature_set();
        set.extract_named(&registry, &["sentence_count", "word_count"]).unwrap();

        let describe = set.get_feature("word_count").unwrap().describe();
        assert_eq!(describe.count, 2);
        assert_eq!(describe.mean, 3.0);
        assert_eq!(set.get_feature("word_count").unwrap().histogram(2).len(), 2);

        let removed = set.remove_feature("sentence_count").unwrap();
        assert_eq!(removed.values, vec![2.0, 2.0]);
        assert_eq!(set.to_table().unwrap().n_columns(), 4);
    }

    #[test]
    fn test_base_requires_id_column() {
        let table = Table::from_columns(vec![Column::text("text", vec!["x".into()])]).unwrap();
        assert!(matches!(
            FeatureSet::new(table, ColumnConfig::default()),
            Err(Error::MissingColumn(_))
        ));
    }
}
