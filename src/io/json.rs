use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use crate::error::Result;
use crate::io::{ensure_parent_dir, TableIo};
use crate::models::Table;

/// Tables as a JSON array of `{name, data: {type, values}}` columns.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonIo;

impl TableIo for JsonIo {
    fn format(&self) -> &'static str {
        "json"
    }

    fn read(&self, path: &Path) -> Result<Table> {
        let reader = BufReader::new(File::open(path)?);
        Ok(serde_json::from_reader(reader)?)
    }

    fn write(&self, table: &Table, path: &Path) -> Result<()> {
        ensure_parent_dir(path)?;
        let mut writer = BufWriter::new(File::create(path)?);
        serde_json::to_writer_pretty(&mut writer, table)?;
        writer.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ragged_json_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.json");
        std::fs::write(
            &path,
            r#"[
                {"name": "a", "data": {"type": "text", "values": ["x", "y"]}},
                {"name": "b", "data": {"type": "numeric", "values": [1.0]}}
            ]"#,
        )
        .unwrap();

        assert!(JsonIo.read(&path).is_err());
    }
}
