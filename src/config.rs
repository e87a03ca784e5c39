use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// Environment variable naming the application config file.
pub const CONFIG_ENV_VAR: &str = "ESSAYSCORE_CONFIG";

const DEFAULT_CONFIG_PATH: &str = "config/essayscore.toml";

/// Names of the identifier and text columns in the discourse data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnConfig {
    pub idvar: String,
    pub text: String,
}

impl Default for ColumnConfig {
    fn default() -> Self {
        Self {
            idvar: "discourse_id".to_string(),
            text: "discourse_text".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackingConfig {
    #[serde(default = "default_database_path")]
    pub database_path: String,
}

impl Default for TrackingConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
        }
    }
}

fn default_database_path() -> String {
    "essayscore.db".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineSection {
    #[serde(default = "default_pipeline_path")]
    pub config_path: String,
    #[serde(default = "default_data_dir")]
    pub data_dir: String,
}

impl Default for PipelineSection {
    fn default() -> Self {
        Self {
            config_path: default_pipeline_path(),
            data_dir: default_data_dir(),
        }
    }
}

fn default_pipeline_path() -> String {
    "config/pipeline.toml".to_string()
}

fn default_data_dir() -> String {
    "data".to_string()
}

#[derive(Debug, Clone)]
pub struct Config {
    pub columns: ColumnConfig,
    pub tracking: TrackingConfig,
    pub pipeline: PipelineSection,
}

#[derive(Debug, Deserialize)]
struct RawConfig {
    columns: Option<RawColumns>,
    #[serde(default)]
    tracking: TrackingConfig,
    #[serde(default)]
    pipeline: PipelineSection,
}

#[derive(Debug, Deserialize)]
struct RawColumns {
    idvar: Option<String>,
    text: Option<String>,
}

impl Config {
    /// Loads `.env`, resolves the config path from `ESSAYSCORE_CONFIG` and parses it.
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let path = env::var(CONFIG_ENV_VAR).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
        Self::from_path(&path)
    }

    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            tracing::error!("Unable to read configuration file {}: {}", path.display(), e);
            Error::Config(format!("failed to read {}: {}", path.display(), e))
        })?;

        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let raw: RawConfig = toml::from_str(content)?;

        let columns = raw
            .columns
            .ok_or_else(|| missing_key("columns"))?;
        let idvar = columns.idvar.ok_or_else(|| missing_key("columns.idvar"))?;
        let text = columns.text.ok_or_else(|| missing_key("columns.text"))?;

        Ok(Self {
            columns: ColumnConfig { idvar, text },
            tracking: raw.tracking,
            pipeline: raw.pipeline,
        })
    }
}

fn missing_key(key: &str) -> Error {
    tracing::error!("Configuration is missing required key {}", key);
    Error::MissingConfigKey(key.to_string())
}

/// Settings handed to a pipeline run.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub columns: ColumnConfig,
    pub data_dir: PathBuf,
    pub config_path: PathBuf,
}

impl From<&Config> for PipelineConfig {
    fn from(config: &Config) -> Self {
        Self {
            columns: config.columns.clone(),
            data_dir: PathBuf::from(&config.pipeline.data_dir),
            config_path: PathBuf::from(&config.pipeline.config_path),
        }
    }
}
