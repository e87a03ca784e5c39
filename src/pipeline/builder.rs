use serde::Deserialize;
use std::path::Path;

use crate::error::{Error, Result};
use crate::operators::OperatorRegistry;
use crate::pipeline::engine::Pipeline;
use crate::pipeline::operator::Step;

/// Top level of a pipeline file. Steps keep their file order.
#[derive(Debug, Clone, Deserialize)]
pub struct PipelineDefinition {
    pub name: Option<String>,
    pub version: Option<String>,
    #[serde(default)]
    pub steps: toml::Table,
}

impl PipelineDefinition {
    pub fn from_toml_str(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }
}

/// Builds pipelines from TOML definitions through an [`OperatorRegistry`].
pub struct PipelineBuilder {
    registry: OperatorRegistry,
}

impl Default for PipelineBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl PipelineBuilder {
    pub fn new() -> Self {
        Self::with_registry(OperatorRegistry::builtin())
    }

    pub fn with_registry(registry: OperatorRegistry) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &OperatorRegistry {
        &self.registry
    }

    /// Builds the pipeline in a TOML file with the built-in operators.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Pipeline> {
        Self::new().build_file(path)
    }

    pub fn build_file<P: AsRef<Path>>(&self, path: P) -> Result<Pipeline> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            tracing::error!("Unable to read pipeline file {}: {}", path.display(), e);
            Error::Config(format!("failed to read {}: {}", path.display(), e))
        })?;
        self.build_str(&content)
    }

    pub fn build_str(&self, content: &str) -> Result<Pipeline> {
        self.build(PipelineDefinition::from_toml_str(content)?)
    }

    pub fn build(&self, definition: PipelineDefinition) -> Result<Pipeline> {
        let name = definition.name.ok_or_else(|| missing_key("name"))?;
        let version = definition.version.unwrap_or_else(|| "0.1.0".to_string());
        let mut pipeline = Pipeline::new(name, version);

        for (key, value) in definition.steps {
            let step = self.build_step(&key, value)?;
            pipeline.add_step(step);
        }

        tracing::info!("Built pipeline {} with {} steps", pipeline.name(), pipeline.len());
        Ok(pipeline)
    }

    fn build_step(&self, key: &str, value: toml::Value) -> Result<Step> {
        let toml::Value::Table(mut config) = value else {
            return Err(Error::Config(format!("steps.{} must be a table", key)));
        };

        let module = take_string(&mut config, key, "module")?;
        let operator = take_string(&mut config, key, "operator")?;
        let name = take_string(&mut config, key, "name")?;
        let params = match config.remove("params") {
            Some(toml::Value::Table(params)) => params,
            Some(_) => return Err(Error::Config(format!("steps.{}.params must be a table", key))),
            None => return Err(missing_key(&format!("steps.{}.params", key))),
        };

        let operator = self.registry.create(&module, &operator, params)?;
        Ok(Step::boxed(name, operator))
    }
}

fn missing_key(key: &str) -> Error {
    tracing::error!("Pipeline configuration is missing operator configuration key {}", key);
    Error::MissingConfigKey(key.to_string())
}

fn take_string(config: &mut toml::Table, step: &str, field: &str) -> Result<String> {
    match config.remove(field) {
        Some(toml::Value::String(value)) => Ok(value),
        Some(other) => Err(Error::Config(format!(
            "steps.{}.{} must be a string, found {}",
            step,
            field,
            other.type_str()
        ))),
        None => Err(missing_key(&format!("steps.{}.{}", step, field))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PIPELINE: &str = r#"
name = "fp2022"
version = "0.2.0"

[steps.load]
module = "io"
operator = "LoadTable"
name = "load_raw"
params = { path = "raw/train.csv" }

[steps.validate]
module = "data"
operator = "ValidateDiscourses"
name = "validate"
params = {}

[steps.extract]
module = "features"
operator = "ExtractFeatures"
name = "length_features"
params = { category = "length" }

[steps.save]
module = "io"
operator = "SaveTable"
name = "save_features"
params = { path = "features/length.csv" }
"#;

    #[test]
    fn test_build_keeps_file_order() {
        let pipeline = PipelineBuilder::new().build_str(PIPELINE).unwrap();

        assert_eq!(pipeline.name(), "fp2022");
        assert_eq!(pipeline.version(), "0.2.0");
        let names: Vec<&str> = pipeline.steps().iter().map(|s| s.name()).collect();
        assert_eq!(names, vec!["load_raw", "validate", "length_features", "save_features"]);
        assert_eq!(pipeline.get_step("save_features").unwrap().ordinal(), 4);
        assert_eq!(pipeline.get_step("load_raw").unwrap().kind(), "LoadTable");
    }

    #[test]
    fn test_missing_operator_key() {
        let err = PipelineBuilder::new()
            .build_str("name = \"p\"\n[steps.a]\nmodule = \"io\"\nname = \"a\"\nparams = {}\n")
            .err()
            .unwrap();
        assert!(matches!(err, Error::MissingConfigKey(ref k) if k == "steps.a.operator"));
    }

    #[test]
    fn test_missing_params_key() {
        let err = PipelineBuilder::new()
            .build_str("name = \"p\"\n[steps.a]\nmodule = \"data\"\noperator = \"ValidateDiscourses\"\nname = \"a\"\n")
            .err()
            .unwrap();
        assert!(matches!(err, Error::MissingConfigKey(ref k) if k == "steps.a.params"));
    }

    #[test]
    fn test_unknown_operator() {
        let err = PipelineBuilder::new()
            .build_str(
                "name = \"p\"\n[steps.a]\nmodule = \"nlp\"\noperator = \"Spacy\"\nname = \"a\"\nparams = {}\n",
            )
            .err()
            .unwrap();
        assert!(matches!(err, Error::UnknownOperator { ref module, .. } if module == "nlp"));
    }

    #[test]
    fn test_sample_pipeline_builds() {
        let pipeline = PipelineBuilder::new()
            .build_str(include_str!("../../config/pipeline.toml"))
            .unwrap();
        assert_eq!(pipeline.len(), 7);
        assert_eq!(pipeline.steps()[0].kind(), "DownloadFile");
    }

    #[test]
    fn test_from_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pipeline.toml");
        std::fs::write(&path, PIPELINE).unwrap();

        assert_eq!(PipelineBuilder::from_path(&path).unwrap().len(), 4);
        assert!(PipelineBuilder::from_path(dir.path().join("nope.toml")).is_err());
    }
}
