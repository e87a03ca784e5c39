use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::PathBuf;

use crate::error::{Error, Result};
use crate::io::io_for_path;
use crate::models::Table;

pub const DISCOURSE_ID: &str = "discourse_id";
pub const ESSAY_ID: &str = "essay_id";
pub const DISCOURSE_TEXT: &str = "discourse_text";
pub const DISCOURSE_TYPE: &str = "discourse_type";
pub const DISCOURSE_EFFECTIVENESS: &str = "discourse_effectiveness";

/// Column layout of the discourse data.
pub const DISCOURSE_COLUMNS: [&str; 5] = [
    DISCOURSE_ID,
    ESSAY_ID,
    DISCOURSE_TEXT,
    DISCOURSE_TYPE,
    DISCOURSE_EFFECTIVENESS,
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DiscourseType {
    Lead,
    Position,
    Claim,
    Counterclaim,
    Rebuttal,
    Evidence,
    #[serde(rename = "Concluding Statement")]
    ConcludingStatement,
}

impl std::str::FromStr for DiscourseType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            "Lead" => Ok(DiscourseType::Lead),
            "Position" => Ok(DiscourseType::Position),
            "Claim" => Ok(DiscourseType::Claim),
            "Counterclaim" => Ok(DiscourseType::Counterclaim),
            "Rebuttal" => Ok(DiscourseType::Rebuttal),
            "Evidence" => Ok(DiscourseType::Evidence),
            "Concluding Statement" => Ok(DiscourseType::ConcludingStatement),
            other => Err(Error::InvalidDiscourse(format!(
                "unknown discourse type {:?}",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Effectiveness {
    Ineffective,
    Adequate,
    Effective,
}

impl std::str::FromStr for Effectiveness {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            "Ineffective" => Ok(Effectiveness::Ineffective),
            "Adequate" => Ok(Effectiveness::Adequate),
            "Effective" => Ok(Effectiveness::Effective),
            other => Err(Error::InvalidDiscourse(format!(
                "unknown effectiveness label {:?}",
                other
            ))),
        }
    }
}

/// Dataset metadata plus lazily loaded data.
#[derive(Debug, Clone)]
pub struct Dataset {
    pub id: String,
    pub name: String,
    pub description: String,
    /// Stage of processing, e.g. `raw` or `interim`.
    pub stage: String,
    pub filepath: PathBuf,
    pub version: u32,
    data: Option<Table>,
}

impl Dataset {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        description: impl Into<String>,
        stage: impl Into<String>,
        filepath: impl Into<PathBuf>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: description.into(),
            stage: stage.into(),
            filepath: filepath.into(),
            version: 1,
            data: None,
        }
    }

    pub fn with_version(mut self, version: u32) -> Self {
        self.version = version;
        self
    }

    pub fn fileformat(&self) -> Option<&str> {
        self.filepath.extension().and_then(|e| e.to_str())
    }

    pub fn primary_key(&self) -> &'static str {
        DISCOURSE_ID
    }

    pub fn target_var(&self) -> &'static str {
        DISCOURSE_EFFECTIVENESS
    }

    pub fn text_var(&self) -> &'static str {
        DISCOURSE_TEXT
    }

    pub fn is_loaded(&self) -> bool {
        self.data.is_some()
    }

    /// Reads the file unless data is already loaded. `force` rereads it.
    pub fn load(&mut self, force: bool) -> Result<&Table> {
        if self.data.is_none() || force {
            let io = io_for_path(&self.filepath)?;
            self.data = Some(io.read(&self.filepath)?);
            tracing::info!("Loaded dataset {} from {}", self.name, self.filepath.display());
        } else {
            tracing::info!("Data already loaded. Set force to reload.");
        }
        self.data()
    }

    pub fn data(&self) -> Result<&Table> {
        self.data
            .as_ref()
            .ok_or_else(|| Error::DataShape(format!("dataset {} is not loaded", self.name)))
    }

    pub fn set_data(&mut self, data: Table) {
        self.data = Some(data);
    }

    /// Writes the data unless the file exists. `force` overwrites it. Returns whether it wrote.
    pub fn save(&self, force: bool) -> Result<bool> {
        if self.filepath.exists() && !force {
            tracing::info!("Data already exists. Set force to overwrite.");
            return Ok(false);
        }
        let io = io_for_path(&self.filepath)?;
        io.write(self.data()?, &self.filepath)?;
        Ok(true)
    }

    /// The primary key and text columns, or only the text column.
    pub fn get_texts(&mut self, with_id: bool) -> Result<Table> {
        let (id, text) = (self.primary_key(), self.text_var());
        let data = self.load(false)?;
        if with_id {
            data.select(&[id, text])
        } else {
            data.select(&[text])
        }
    }

    pub fn validate(&mut self) -> Result<()> {
        let (id, text) = (self.primary_key(), self.text_var());
        validate_discourses(self.load(false)?, id, text)
    }
}

/// Checks that ids are unique and every text cell is non-empty.
pub fn validate_discourses(table: &Table, idvar: &str, text: &str) -> Result<()> {
    let ids = table.column_as_strings(idvar)?;
    let texts = table.text_column(text)?;

    let mut seen = HashSet::with_capacity(ids.len());
    for (row, id) in ids.iter().enumerate() {
        if !seen.insert(id.as_str()) {
            return Err(Error::InvalidDiscourse(format!(
                "duplicate id {} at row {}",
                id,
                row + 1
            )));
        }
    }

    if let Some(row) = texts.iter().position(|t| t.trim().is_empty()) {
        return Err(Error::InvalidDiscourse(format!(
            "empty text for id {} at row {}",
            ids[row],
            row + 1
        )));
    }

    Ok(())
}
