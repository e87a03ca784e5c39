use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::config::ColumnConfig;
use crate::error::{Error, Result};
use crate::models::Table;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeatureCategory {
    Length,
    Word,
    Syntactic,
    Semantic,
    Readability,
}

impl FeatureCategory {
    pub const ALL: [FeatureCategory; 5] = [
        FeatureCategory::Length,
        FeatureCategory::Word,
        FeatureCategory::Syntactic,
        FeatureCategory::Semantic,
        FeatureCategory::Readability,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            FeatureCategory::Length => "length",
            FeatureCategory::Word => "word",
            FeatureCategory::Syntactic => "syntactic",
            FeatureCategory::Semantic => "semantic",
            FeatureCategory::Readability => "readability",
        }
    }
}

impl fmt::Display for FeatureCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FeatureCategory {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let wanted = s.trim().to_lowercase();
        Self::ALL
            .into_iter()
            .find(|c| c.as_str() == wanted)
            .ok_or_else(|| {
                tracing::error!("Feature category {} is not recognized", s);
                Error::UnknownCategory(s.to_string())
            })
    }
}

/// One extracted feature: the id column of the source table and one value per row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureColumn {
    pub name: String,
    pub category: FeatureCategory,
    pub ids: Vec<String>,
    pub values: Vec<f64>,
}

impl FeatureColumn {
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// A stateless per-row text statistic.
///
/// Implementors only provide `compute`; `extract` applies it to the configured text column and
/// pairs each value with the row id. `compute` must be total: empty text yields a documented
/// sentinel (`0`, `0.0` or `NaN`), never a panic.
pub trait FeatureExtractor: Send + Sync {
    fn name(&self) -> &str;

    fn category(&self) -> FeatureCategory;

    fn compute(&self, text: &str) -> f64;

    fn extract(&self, table: &Table, columns: &ColumnConfig) -> Result<FeatureColumn> {
        let ids = table.column_as_strings(&columns.idvar)?;
        let texts = table.text_column(&columns.text)?;

        Ok(FeatureColumn {
            name: self.name().to_string(),
            category: self.category(),
            ids,
            values: texts.iter().map(|t| self.compute(t)).collect(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_parse() {
        assert_eq!("Length".parse::<FeatureCategory>().unwrap(), FeatureCategory::Length);
        assert_eq!(" readability ".parse::<FeatureCategory>().unwrap(), FeatureCategory::Readability);

        let err = "phonetic".parse::<FeatureCategory>().unwrap_err();
        assert!(matches!(err, Error::UnknownCategory(_)));
    }
}
