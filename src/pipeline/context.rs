use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::config::{ColumnConfig, PipelineConfig};

/// State shared by every step of one pipeline run.
#[derive(Debug, Clone, Default)]
pub struct PipelineContext {
    pub pipeline: String,
    /// Tracking run id, set when the run starts.
    pub run_id: Option<String>,
    pub columns: ColumnConfig,
    pub data_dir: PathBuf,
    /// Files produced by steps, by name.
    pub artifacts: BTreeMap<String, PathBuf>,
    /// Numbers reported by steps, logged to the tracker when the run ends.
    pub metrics: BTreeMap<String, f64>,
}

impl PipelineContext {
    pub fn new(columns: ColumnConfig, data_dir: impl Into<PathBuf>) -> Self {
        Self {
            columns,
            data_dir: data_dir.into(),
            ..Self::default()
        }
    }

    pub fn record_artifact(&mut self, name: impl Into<String>, path: impl Into<PathBuf>) {
        let (name, path) = (name.into(), path.into());
        tracing::debug!("Artifact {} at {}", name, path.display());
        self.artifacts.insert(name, path);
    }

    pub fn record_metric(&mut self, key: impl Into<String>, value: f64) {
        self.metrics.insert(key.into(), value);
    }

    /// Relative paths are taken from the data directory.
    pub fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.data_dir.join(path)
        }
    }
}

impl From<&PipelineConfig> for PipelineContext {
    fn from(config: &PipelineConfig) -> Self {
        Self::new(config.columns.clone(), config.data_dir.clone())
    }
}
