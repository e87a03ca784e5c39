pub mod csv;
pub mod json;
pub mod sqlite;

use std::path::Path;

use crate::error::{Error, Result};
use crate::models::Table;

pub use self::csv::{CsvIo, DecodePolicy};
pub use self::json::JsonIo;
pub use self::sqlite::SqliteIo;

/// Reads and writes whole tables in one file format.
pub trait TableIo: Send + Sync {
    fn format(&self) -> &'static str;

    fn read(&self, path: &Path) -> Result<Table>;

    fn write(&self, table: &Table, path: &Path) -> Result<()>;
}

/// Selects an adapter from the file extension.
pub fn io_for_path(path: &Path) -> Result<Box<dyn TableIo>> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or_default();
    io_for_format(extension)
}

pub fn io_for_format(format: &str) -> Result<Box<dyn TableIo>> {
    match format.to_lowercase().as_str() {
        "csv" => Ok(Box::new(CsvIo::default())),
        "json" => Ok(Box::new(JsonIo)),
        "db" | "sqlite" | "sqlite3" => Ok(Box::new(SqliteIo::default())),
        other => {
            tracing::error!("Format {:?} is not supported", other);
            Err(Error::UnsupportedFormat(other.to_string()))
        }
    }
}

pub(crate) fn ensure_parent_dir(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}
