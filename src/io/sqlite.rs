use rusqlite::types::Value;
use rusqlite::{params_from_iter, Connection};
use std::path::Path;

use crate::error::{Error, Result};
use crate::io::{ensure_parent_dir, TableIo};
use crate::models::{Column, ColumnData, Table};

/// Stores a table in a SQLite file. Numeric columns are `REAL`, text columns `TEXT`.
#[derive(Debug, Clone)]
pub struct SqliteIo {
    pub table_name: String,
}

impl Default for SqliteIo {
    fn default() -> Self {
        Self {
            table_name: "data".to_string(),
        }
    }
}

fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

impl TableIo for SqliteIo {
    fn format(&self) -> &'static str {
        "sqlite"
    }

    fn read(&self, path: &Path) -> Result<Table> {
        if !path.exists() {
            return Err(Error::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("{} does not exist", path.display()),
            )));
        }
        let conn = Connection::open(path)?;
        let table = quote_ident(&self.table_name);

        let mut info = conn.prepare(&format!("PRAGMA table_info({})", table))?;
        let schema: Vec<(String, String)> = info
            .query_map([], |row| Ok((row.get::<_, String>(1)?, row.get::<_, String>(2)?)))?
            .collect::<std::result::Result<_, _>>()?;

        if schema.is_empty() {
            return Err(Error::DataShape(format!(
                "{} has no table named {}",
                path.display(),
                self.table_name
            )));
        }

        let select = format!(
            "SELECT {} FROM {} ORDER BY rowid",
            schema
                .iter()
                .map(|(name, _)| quote_ident(name))
                .collect::<Vec<_>>()
                .join(", "),
            table
        );

        let mut data: Vec<ColumnData> = schema
            .iter()
            .map(|(_, kind)| {
                if kind.eq_ignore_ascii_case("REAL") {
                    ColumnData::Numeric(Vec::new())
                } else {
                    ColumnData::Text(Vec::new())
                }
            })
            .collect();

        let mut stmt = conn.prepare(&select)?;
        let mut rows = stmt.query([])?;
        while let Some(row) = rows.next()? {
            for (i, column) in data.iter_mut().enumerate() {
                match column {
                    ColumnData::Numeric(values) => {
                        values.push(row.get::<_, Option<f64>>(i)?.unwrap_or(f64::NAN))
                    }
                    ColumnData::Text(values) => {
                        values.push(row.get::<_, Option<String>>(i)?.unwrap_or_default())
                    }
                }
            }
        }

        let columns = schema
            .into_iter()
            .zip(data)
            .map(|((name, _), data)| Column { name, data })
            .collect();
        Table::from_columns(columns)
    }

    fn write(&self, table: &Table, path: &Path) -> Result<()> {
        ensure_parent_dir(path)?;
        let mut conn = Connection::open(path)?;
        let name = quote_ident(&self.table_name);

        let definitions = table
            .columns()
            .iter()
            .map(|c| {
                let kind = if c.data.is_numeric() { "REAL" } else { "TEXT" };
                format!("{} {}", quote_ident(&c.name), kind)
            })
            .collect::<Vec<_>>()
            .join(", ");

        let tx = conn.transaction()?;
        tx.execute_batch(&format!(
            "DROP TABLE IF EXISTS {name}; CREATE TABLE {name} ({definitions});"
        ))?;

        {
            let placeholders = vec!["?"; table.n_columns()].join(", ");
            let mut insert =
                tx.prepare(&format!("INSERT INTO {} VALUES ({})", name, placeholders))?;

            for i in 0..table.n_rows() {
                let values = table.columns().iter().map(|c| match &c.data {
                    ColumnData::Text(values) => Value::Text(values[i].clone()),
                    ColumnData::Numeric(values) if values[i].is_nan() => Value::Null,
                    ColumnData::Numeric(values) => Value::Real(values[i]),
                });
                insert.execute(params_from_iter(values))?;
            }
        }

        tx.commit()?;
        Ok(())
    }
}
