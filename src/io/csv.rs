use std::path::Path;

use crate::error::{Error, Result};
use crate::io::{ensure_parent_dir, TableIo};
use crate::models::dataset::DISCOURSE_COLUMNS;
use crate::models::Table;

/// How bytes that are not valid UTF-8 are handled on read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DecodePolicy {
    #[default]
    Strict,
    /// Invalid sequences are replaced with U+FFFD.
    Lossy,
}

#[derive(Debug, Clone)]
pub struct CsvIo {
    pub delimiter: u8,
    pub decode: DecodePolicy,
    /// Columns always read as text, whatever their cells look like.
    pub text_columns: Vec<String>,
}

impl Default for CsvIo {
    fn default() -> Self {
        Self {
            delimiter: b',',
            decode: DecodePolicy::Strict,
            text_columns: DISCOURSE_COLUMNS.iter().map(|c| c.to_string()).collect(),
        }
    }
}

impl CsvIo {
    pub fn with_decode(decode: DecodePolicy) -> Self {
        Self {
            decode,
            ..Self::default()
        }
    }

    /// Adds columns to read as text.
    pub fn with_text_columns<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for column in columns {
            let column = column.into();
            if !self.text_columns.contains(&column) {
                self.text_columns.push(column);
            }
        }
        self
    }

    fn decode(&self, bytes: Vec<u8>, path: &Path) -> Result<String> {
        match self.decode {
            DecodePolicy::Strict => String::from_utf8(bytes)
                .map_err(|e| Error::Decode(format!("{}: {}", path.display(), e))),
            DecodePolicy::Lossy => Ok(String::from_utf8_lossy(&bytes).into_owned()),
        }
    }
}

impl TableIo for CsvIo {
    fn format(&self) -> &'static str {
        "csv"
    }

    fn read(&self, path: &Path) -> Result<Table> {
        let bytes = std::fs::read(path).map_err(|e| {
            tracing::error!("File {} could not be read: {}", path.display(), e);
            e
        })?;
        let text = self.decode(bytes, path)?;

        let mut reader = ::csv::ReaderBuilder::new()
            .delimiter(self.delimiter)
            .from_reader(text.as_bytes());

        let headers: Vec<String> = reader.headers()?.iter().map(String::from).collect();
        let rows = reader
            .records()
            .map(|record| record.map(|r| r.iter().map(String::from).collect::<Vec<_>>()))
            .collect::<std::result::Result<Vec<_>, ::csv::Error>>()?;

        tracing::debug!("Read {} rows from {}", rows.len(), path.display());
        let text_columns: Vec<&str> = self.text_columns.iter().map(String::as_str).collect();
        Table::from_records(headers, rows, &text_columns)
    }

    fn write(&self, table: &Table, path: &Path) -> Result<()> {
        ensure_parent_dir(path)?;

        let mut writer = ::csv::WriterBuilder::new()
            .delimiter(self.delimiter)
            .from_path(path)?;

        writer.write_record(table.column_names())?;
        for i in 0..table.n_rows() {
            writer.write_record(table.row_strings(i))?;
        }
        writer.flush()?;

        tracing::debug!("Wrote {} rows to {}", table.n_rows(), path.display());
        Ok(())
    }
}
