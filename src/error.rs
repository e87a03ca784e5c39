use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Missing configuration key: {0}")]
    MissingConfigKey(String),

    #[error("Unknown operator {operator} in module {module}")]
    UnknownOperator { module: String, operator: String },

    #[error("Feature extractor registered twice: {0}")]
    DuplicateExtractor(String),

    #[error("Unsupported file format: {0}")]
    UnsupportedFormat(String),

    #[error("Column not found: {0}")]
    MissingColumn(String),

    #[error("Data shape error: {0}")]
    DataShape(String),

    #[error("Failed to decode {0}")]
    Decode(String),

    #[error("Invalid discourse data: {0}")]
    InvalidDiscourse(String),

    #[error("Feature extractor not found: {0}")]
    ExtractorNotFound(String),

    #[error("Feature not found in feature set: {0}")]
    FeatureNotFound(String),

    #[error("Pipeline step not found: {0}")]
    StepNotFound(String),

    #[error("Unknown feature category: {0}")]
    UnknownCategory(String),

    #[error("Acquisition failed: {0}")]
    Acquisition(String),

    #[error("Timed out after {seconds} seconds: {what}")]
    Timeout { what: String, seconds: u64 },

    #[error("Tracking error: {0}")]
    Tracking(String),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Missing keys, unresolvable operators and similar setup mistakes. Fatal to a run.
    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            Error::Config(_)
                | Error::MissingConfigKey(_)
                | Error::UnknownOperator { .. }
                | Error::DuplicateExtractor(_)
                | Error::UnsupportedFormat(_)
                | Error::TomlParse(_)
        )
    }

    pub fn is_lookup_error(&self) -> bool {
        matches!(
            self,
            Error::ExtractorNotFound(_)
                | Error::FeatureNotFound(_)
                | Error::StepNotFound(_)
                | Error::UnknownCategory(_)
        )
    }

    pub fn is_data_error(&self) -> bool {
        matches!(
            self,
            Error::MissingColumn(_)
                | Error::DataShape(_)
                | Error::Decode(_)
                | Error::InvalidDiscourse(_)
                | Error::Csv(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_taxonomy() {
        assert!(Error::MissingConfigKey("columns.idvar".into()).is_config_error());
        assert!(Error::ExtractorNotFound("nope".into()).is_lookup_error());
        assert!(Error::MissingColumn("discourse_text".into()).is_data_error());
        assert!(!Error::Acquisition("boom".into()).is_config_error());
    }
}
