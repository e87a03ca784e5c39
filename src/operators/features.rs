use async_trait::async_trait;
use serde::Deserialize;

use crate::error::{Error, Result};
use crate::features::{ExtractorRegistry, FeatureCategory, FeatureSet};
use crate::models::Table;
use crate::pipeline::{Operator, PipelineContext};

/// Extracts features from the carried table.
///
/// Output is the id column plus one column per feature, or the whole input plus the features
/// when `keep_columns` is set.
#[derive(Debug, Clone, Deserialize)]
pub struct ExtractFeatures {
    #[serde(default)]
    pub category: Option<FeatureCategory>,
    #[serde(default)]
    pub features: Vec<String>,
    #[serde(default)]
    pub keep_columns: bool,
}

#[async_trait]
impl Operator for ExtractFeatures {
    fn kind(&self) -> &'static str {
        "ExtractFeatures"
    }

    async fn execute(
        &self,
        data: Option<&Table>,
        context: &mut PipelineContext,
    ) -> Result<Option<Table>> {
        let table = data.ok_or_else(|| Error::DataShape("no table to extract features from".to_string()))?;
        if self.category.is_none() && self.features.is_empty() {
            return Err(Error::Config(
                "ExtractFeatures needs a category or a list of features".to_string(),
            ));
        }

        let registry = ExtractorRegistry::builtin()?;
        let base = if self.keep_columns {
            table.clone()
        } else {
            table.select(&[context.columns.idvar.as_str(), context.columns.text.as_str()])?
        };
        let mut set = FeatureSet::new(base, context.columns.clone())?;

        if let Some(category) = self.category {
            set.extract_category(&registry, category)?;
        }
        let names: Vec<&str> = self.features.iter().map(String::as_str).collect();
        set.extract_named(&registry, &names)?;

        context.record_metric("features_extracted", set.len() as f64);

        let mut output = set.to_table()?;
        if !self.keep_columns {
            output.drop_column(&context.columns.text)?;
        }
        Ok(Some(output))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ColumnConfig;
    use crate::models::Column;

    fn discourses() -> Table {
        Table::from_columns(vec![
            Column::text("discourse_id", vec!["d1".into(), "d2".into()]),
            Column::text("discourse_text", vec!["Hello world. Another sentence!".into(), "Yes?".into()]),
            Column::text("discourse_type", vec!["Lead".into(), "Claim".into()]),
        ])
        .unwrap()
    }

    #[tokio::test]
    async fn test_feature_table_is_joinable_by_id() {
        let operator = ExtractFeatures {
            category: None,
            features: vec!["word_count".into(), "question_mark_count".into()],
            keep_columns: false,
        };
        let mut ctx = PipelineContext::new(ColumnConfig::default(), "data");

        let out = operator.execute(Some(&discourses()), &mut ctx).await.unwrap().unwrap();
        assert_eq!(out.column_names(), vec!["discourse_id", "word_count", "question_mark_count"]);
        assert_eq!(out.numeric_column("word_count").unwrap(), &[4.0, 1.0]);
        assert_eq!(ctx.metrics["features_extracted"], 2.0);
    }

    #[tokio::test]
    async fn test_keep_columns_and_category() {
        let operator: ExtractFeatures =
            toml::from_str("category = \"syntactic\"\nkeep_columns = true").unwrap();
        let mut ctx = PipelineContext::new(ColumnConfig::default(), "data");

        let out = operator.execute(Some(&discourses()), &mut ctx).await.unwrap().unwrap();
        assert!(out.has_column("discourse_type"));
        assert!(out.has_column("type_token_ratio"));
    }

    #[tokio::test]
    async fn test_requires_selection() {
        let operator = ExtractFeatures {
            category: None,
            features: Vec::new(),
            keep_columns: false,
        };
        let mut ctx = PipelineContext::default();
        let err = operator.execute(Some(&discourses()), &mut ctx).await.unwrap_err();
        assert!(err.is_config_error());
    }
}
