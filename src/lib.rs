pub mod config;
pub mod error;
pub mod features;
pub mod io;
pub mod models;
pub mod operators;
pub mod pipeline;
pub mod tracking;

pub use config::{ColumnConfig, Config, PipelineConfig};
pub use error::{Error, Result};
pub use features::{ExtractorRegistry, FeatureCategory, FeatureSet};
pub use models::{Dataset, Table};
pub use operators::OperatorRegistry;
pub use pipeline::{Pipeline, PipelineBuilder, PipelineContext, RunWindow};
pub use tracking::{MemoryTracker, RunStatus, SqliteTracker, Tracker};
