use async_trait::async_trait;
use serde::Deserialize;
use std::path::PathBuf;

use crate::error::{Error, Result};
use crate::io::{io_for_path, CsvIo, DecodePolicy, TableIo};
use crate::models::Table;
use crate::pipeline::{Operator, PipelineContext};

fn default_true() -> bool {
    true
}

/// Reads a table by file extension. Relative paths are taken from the data directory.
#[derive(Debug, Clone, Deserialize)]
pub struct LoadTable {
    pub path: PathBuf,
    /// Retry a CSV that is not valid UTF-8 once with lossy decoding.
    #[serde(default = "default_true")]
    pub retry_lossy: bool,
}

#[async_trait]
impl Operator for LoadTable {
    fn kind(&self) -> &'static str {
        "LoadTable"
    }

    async fn execute(
        &self,
        _data: Option<&Table>,
        context: &mut PipelineContext,
    ) -> Result<Option<Table>> {
        let path = context.resolve(&self.path);
        let io = io_for_path(&path)?;
        let csv = |decode| {
            CsvIo::with_decode(decode)
                .with_text_columns([&context.columns.idvar, &context.columns.text])
        };

        let read = if io.format() == "csv" {
            csv(DecodePolicy::Strict).read(&path)
        } else {
            io.read(&path)
        };
        let table = match read {
            Err(Error::Decode(reason)) if self.retry_lossy && io.format() == "csv" => {
                tracing::warn!("Decoding failed ({}). Retrying with lossy decoding.", reason);
                csv(DecodePolicy::Lossy).read(&path)?
            }
            Err(Error::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::error!("File {} not found.", path.display());
                return Err(Error::Io(e));
            }
            other => other?,
        };

        tracing::info!(
            "Loaded {} rows x {} columns from {}",
            table.n_rows(),
            table.n_columns(),
            path.display()
        );
        context.record_metric("rows_loaded", table.n_rows() as f64);
        Ok(Some(table))
    }
}

/// Writes the carried table by file extension.
#[derive(Debug, Clone, Deserialize)]
pub struct SaveTable {
    pub path: PathBuf,
    /// Artifact name recorded in the context, defaults to the file name.
    #[serde(default)]
    pub artifact: Option<String>,
}

#[async_trait]
impl Operator for SaveTable {
    fn kind(&self) -> &'static str {
        "SaveTable"
    }

    async fn execute(
        &self,
        data: Option<&Table>,
        context: &mut PipelineContext,
    ) -> Result<Option<Table>> {
        let table = data.ok_or_else(|| Error::DataShape("no table to save".to_string()))?;
        let path = context.resolve(&self.path);

        io_for_path(&path)?.write(table, &path)?;
        tracing::info!("Saved {} rows to {}", table.n_rows(), path.display());

        let name = self.artifact.clone().unwrap_or_else(|| {
            path.file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| path.display().to_string())
        });
        context.record_artifact(name, path);
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ColumnConfig;
    use crate::models::Column;
    use crate::operators::ExtractFeatures;

    fn context(dir: &std::path::Path) -> PipelineContext {
        PipelineContext::new(ColumnConfig::default(), dir)
    }

    #[tokio::test]
    async fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let mut ctx = context(dir.path());
        let table = Table::from_columns(vec![Column::text("discourse_id", vec!["a".into()])]).unwrap();

        let save = SaveTable {
            path: "interim/out.json".into(),
            artifact: None,
        };
        assert!(save.execute(Some(&table), &mut ctx).await.unwrap().is_none());
        assert_eq!(ctx.artifacts["out.json"], dir.path().join("interim/out.json"));

        let load = LoadTable {
            path: "interim/out.json".into(),
            retry_lossy: true,
        };
        let loaded = load.execute(None, &mut ctx).await.unwrap().unwrap();
        assert_eq!(loaded, table);
        assert_eq!(ctx.metrics["rows_loaded"], 1.0);
    }

    #[tokio::test]
    async fn test_lossy_retry() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("bad.csv"), b"discourse_id,discourse_text\n1,na\xefve\n").unwrap();
        let mut ctx = context(dir.path());

        let strict = LoadTable {
            path: "bad.csv".into(),
            retry_lossy: false,
        };
        assert!(matches!(strict.execute(None, &mut ctx).await, Err(Error::Decode(_))));

        let retrying = LoadTable {
            path: "bad.csv".into(),
            retry_lossy: true,
        };
        let table = retrying.execute(None, &mut ctx).await.unwrap().unwrap();
        assert_eq!(table.text_column("discourse_text").unwrap()[0], "na\u{FFFD}ve");
    }

    #[tokio::test]
    async fn test_numeric_texts_load_as_text() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("essays.csv"), "id,body\na,42\nb,7\n").unwrap();
        let mut ctx = PipelineContext::new(
            ColumnConfig {
                idvar: "id".into(),
                text: "body".into(),
            },
            dir.path(),
        );

        let load = LoadTable {
            path: "essays.csv".into(),
            retry_lossy: true,
        };
        let table = load.execute(None, &mut ctx).await.unwrap().unwrap();
        assert_eq!(table.text_column("body").unwrap(), &["42", "7"]);

        let extract = ExtractFeatures {
            category: None,
            features: vec!["word_count".into()],
            keep_columns: false,
        };
        let features = extract.execute(Some(&table), &mut ctx).await.unwrap().unwrap();
        assert_eq!(features.numeric_column("word_count").unwrap(), &[1.0, 1.0]);
    }

    #[tokio::test]
    async fn test_save_requires_data() {
        let dir = tempfile::tempdir().unwrap();
        let save = SaveTable {
            path: "x.csv".into(),
            artifact: None,
        };
        let err = save.execute(None, &mut context(dir.path())).await.unwrap_err();
        assert!(matches!(err, Error::DataShape(_)));
    }

    #[tokio::test]
    async fn test_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let load = LoadTable {
            path: "nope.csv".into(),
            retry_lossy: true,
        };
        assert!(matches!(
            load.execute(None, &mut context(dir.path())).await,
            Err(Error::Io(_))
        ));
    }
}
