pub mod acquisition;
pub mod data;
pub mod features;
pub mod io;

use serde::de::DeserializeOwned;
use std::collections::HashMap;

use crate::error::{Error, Result};
use crate::pipeline::Operator;

pub use acquisition::{DownloadFile, ExtractArchive, ShellCommand};
pub use data::ValidateDiscourses;
pub use features::ExtractFeatures;
pub use io::{LoadTable, SaveTable};

/// Builds an operator from its `params` table.
pub type OperatorConstructor = fn(toml::Table) -> Result<Box<dyn Operator>>;

/// Deserializes an operator directly from its params.
pub fn from_params<O>(params: toml::Table) -> Result<Box<dyn Operator>>
where
    O: Operator + DeserializeOwned + 'static,
{
    let operator: O = toml::Value::Table(params)
        .try_into()
        .map_err(|e: toml::de::Error| {
            let kind = std::any::type_name::<O>().rsplit("::").next().unwrap_or_default();
            Error::Config(format!("invalid params for {}: {}", kind, e))
        })?;
    Ok(Box::new(operator))
}

/// Operator constructors keyed by `(module, operator)`.
pub struct OperatorRegistry {
    constructors: HashMap<(String, String), OperatorConstructor>,
}

impl OperatorRegistry {
    pub fn empty() -> Self {
        Self {
            constructors: HashMap::new(),
        }
    }

    pub fn builtin() -> Self {
        let mut registry = Self::empty();

        registry.init_acquisition();
        registry.init_io();
        registry.init_features();
        registry.init_data();

        registry
    }

    fn init_acquisition(&mut self) {
        let operators: Vec<(&str, OperatorConstructor)> = vec![
            ("DownloadFile", from_params::<DownloadFile> as OperatorConstructor),
            ("ShellCommand", from_params::<ShellCommand> as OperatorConstructor),
            ("ExtractArchive", from_params::<ExtractArchive> as OperatorConstructor),
        ];

        for (name, constructor) in operators {
            self.register("acquisition", name, constructor);
        }
    }

    fn init_io(&mut self) {
        let operators: Vec<(&str, OperatorConstructor)> = vec![
            ("LoadTable", from_params::<LoadTable> as OperatorConstructor),
            ("SaveTable", from_params::<SaveTable> as OperatorConstructor),
        ];

        for (name, constructor) in operators {
            self.register("io", name, constructor);
        }
    }

    fn init_features(&mut self) {
        self.register("features", "ExtractFeatures", from_params::<ExtractFeatures>);
    }

    fn init_data(&mut self) {
        self.register("data", "ValidateDiscourses", from_params::<ValidateDiscourses>);
    }

    /// Adds or replaces a constructor.
    pub fn register(&mut self, module: &str, operator: &str, constructor: OperatorConstructor) {
        self.constructors
            .insert((module.to_string(), operator.to_string()), constructor);
    }

    pub fn contains(&self, module: &str, operator: &str) -> bool {
        self.constructors
            .contains_key(&(module.to_string(), operator.to_string()))
    }

    /// Registered `(module, operator)` pairs, sorted.
    pub fn list(&self) -> Vec<(&str, &str)> {
        let mut keys: Vec<(&str, &str)> = self
            .constructors
            .keys()
            .map(|(m, o)| (m.as_str(), o.as_str()))
            .collect();
        keys.sort();
        keys
    }

    pub fn create(&self, module: &str, operator: &str, params: toml::Table) -> Result<Box<dyn Operator>> {
        let constructor = self
            .constructors
            .get(&(module.to_string(), operator.to_string()))
            .ok_or_else(|| {
                tracing::error!("No operator {} in module {}", operator, module);
                Error::UnknownOperator {
                    module: module.to_string(),
                    operator: operator.to_string(),
                }
            })?;
        constructor(params)
    }
}

impl Default for OperatorRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}
