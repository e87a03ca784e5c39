use async_trait::async_trait;
use serde::Deserialize;

use crate::error::{Error, Result};
use crate::models::{validate_discourses, Table};
use crate::pipeline::{Operator, PipelineContext};

/// Fails the run when ids repeat or a text cell is empty. Passes the table through.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ValidateDiscourses {}

#[async_trait]
impl Operator for ValidateDiscourses {
    fn kind(&self) -> &'static str {
        "ValidateDiscourses"
    }

    async fn execute(
        &self,
        data: Option<&Table>,
        context: &mut PipelineContext,
    ) -> Result<Option<Table>> {
        let table = data.ok_or_else(|| Error::DataShape("no table to validate".to_string()))?;
        validate_discourses(table, &context.columns.idvar, &context.columns.text)?;

        tracing::info!("Validated {} discourses", table.n_rows());
        context.record_metric("rows_validated", table.n_rows() as f64);
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Column;

    #[tokio::test]
    async fn test_rejects_duplicate_ids() {
        let table = Table::from_columns(vec![
            Column::text("discourse_id", vec!["a".into(), "a".into()]),
            Column::text("discourse_text", vec!["x".into(), "y".into()]),
        ])
        .unwrap();
        let mut ctx = PipelineContext::default();

        let err = ValidateDiscourses::default()
            .execute(Some(&table), &mut ctx)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidDiscourse(_)));

        let ok = table.take_rows(&[0]).unwrap();
        assert!(ValidateDiscourses::default().execute(Some(&ok), &mut ctx).await.unwrap().is_none());
        assert_eq!(ctx.metrics["rows_validated"], 1.0);
    }
}
