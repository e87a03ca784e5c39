use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::error::{Error, Result};

/// Values of one column. Numeric cells that are undefined are stored as `NaN`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "values", rename_all = "lowercase")]
pub enum ColumnData {
    Text(Vec<String>),
    Numeric(Vec<f64>),
}

impl ColumnData {
    pub fn len(&self) -> usize {
        match self {
            ColumnData::Text(values) => values.len(),
            ColumnData::Numeric(values) => values.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, ColumnData::Numeric(_))
    }

    /// Renders one cell as it is written to delimited text. `NaN` becomes an empty cell.
    pub fn render(&self, index: usize) -> String {
        match self {
            ColumnData::Text(values) => values[index].clone(),
            ColumnData::Numeric(values) => format_number(values[index]),
        }
    }

    fn select_rows(&self, indices: &[usize]) -> ColumnData {
        match self {
            ColumnData::Text(values) => {
                ColumnData::Text(indices.iter().map(|&i| values[i].clone()).collect())
            }
            ColumnData::Numeric(values) => {
                ColumnData::Numeric(indices.iter().map(|&i| values[i]).collect())
            }
        }
    }
}

pub fn format_number(value: f64) -> String {
    if value.is_nan() {
        String::new()
    } else {
        value.to_string()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
    pub data: ColumnData,
}

impl Column {
    pub fn text(name: impl Into<String>, values: Vec<String>) -> Self {
        Self {
            name: name.into(),
            data: ColumnData::Text(values),
        }
    }

    pub fn numeric(name: impl Into<String>, values: Vec<f64>) -> Self {
        Self {
            name: name.into(),
            data: ColumnData::Numeric(values),
        }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// Column-oriented in-memory table. All columns have the same length and unique names.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Column>", into = "Vec<Column>")]
pub struct Table {
    columns: Vec<Column>,
}

impl TryFrom<Vec<Column>> for Table {
    type Error = Error;

    fn try_from(columns: Vec<Column>) -> Result<Self> {
        Table::from_columns(columns)
    }
}

impl From<Table> for Vec<Column> {
    fn from(table: Table) -> Self {
        table.columns
    }
}

impl Table {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_columns(columns: Vec<Column>) -> Result<Self> {
        let mut table = Self::new();
        for column in columns {
            table.add_column(column)?;
        }
        Ok(table)
    }

    /// Builds a table from header names and string rows, inferring numeric columns.
    ///
    /// A column is numeric when it is not listed in `text_columns`, has at least one non-empty
    /// cell, and every non-empty cell is a plain decimal: optional minus sign, no leading zeros,
    /// no exponent. Empty cells in numeric columns become `NaN`.
    pub fn from_records(
        headers: Vec<String>,
        rows: Vec<Vec<String>>,
        text_columns: &[&str],
    ) -> Result<Self> {
        if let Some(name) = first_duplicate(headers.iter().map(String::as_str)) {
            tracing::error!("Header {} appears more than once", name);
            return Err(Error::DataShape(format!("duplicate header {}", name)));
        }

        let width = headers.len();
        let mut cells: Vec<Vec<String>> = vec![Vec::with_capacity(rows.len()); width];

        for (line, row) in rows.into_iter().enumerate() {
            if row.len() != width {
                return Err(Error::DataShape(format!(
                    "row {} has {} fields, expected {}",
                    line + 1,
                    row.len(),
                    width
                )));
            }
            for (i, cell) in row.into_iter().enumerate() {
                cells[i].push(cell);
            }
        }

        let columns = headers
            .into_iter()
            .zip(cells)
            .map(|(name, values)| {
                if text_columns.contains(&name.as_str()) {
                    return Column::text(name, values);
                }
                match infer_numeric(&values) {
                    Some(numbers) => Column::numeric(name, numbers),
                    None => Column::text(name, values),
                }
            })
            .collect();

        Self::from_columns(columns)
    }

    pub fn n_rows(&self) -> usize {
        self.columns.first().map(|c| c.len()).unwrap_or(0)
    }

    pub fn n_columns(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.n_rows() == 0
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c.name == name)
    }

    pub fn column(&self, name: &str) -> Result<&Column> {
        self.columns
            .iter()
            .find(|c| c.name == name)
            .ok_or_else(|| Error::MissingColumn(name.to_string()))
    }

    pub fn text_column(&self, name: &str) -> Result<&[String]> {
        match &self.column(name)?.data {
            ColumnData::Text(values) => Ok(values),
            ColumnData::Numeric(_) => Err(Error::DataShape(format!(
                "column {} is numeric, expected text",
                name
            ))),
        }
    }

    pub fn numeric_column(&self, name: &str) -> Result<&[f64]> {
        match &self.column(name)?.data {
            ColumnData::Numeric(values) => Ok(values),
            ColumnData::Text(_) => Err(Error::DataShape(format!(
                "column {} is text, expected numeric",
                name
            ))),
        }
    }

    /// Every cell of a column rendered as text. Used for identifier columns, which may have been
    /// inferred as numeric when read from disk.
    pub fn column_as_strings(&self, name: &str) -> Result<Vec<String>> {
        let column = self.column(name)?;
        Ok((0..column.len()).map(|i| column.data.render(i)).collect())
    }

    pub fn add_column(&mut self, column: Column) -> Result<()> {
        if self.has_column(&column.name) {
            return Err(Error::DataShape(format!(
                "column {} already exists",
                column.name
            )));
        }
        if !self.columns.is_empty() && column.len() != self.n_rows() {
            return Err(Error::DataShape(format!(
                "column {} has {} rows, table has {}",
                column.name,
                column.len(),
                self.n_rows()
            )));
        }
        self.columns.push(column);
        Ok(())
    }

    pub fn drop_column(&mut self, name: &str) -> Result<Column> {
        let index = self
            .columns
            .iter()
            .position(|c| c.name == name)
            .ok_or_else(|| Error::MissingColumn(name.to_string()))?;
        Ok(self.columns.remove(index))
    }

    /// New table with only the named columns, in the given order.
    pub fn select(&self, names: &[&str]) -> Result<Table> {
        let columns = names
            .iter()
            .map(|name| self.column(name).cloned())
            .collect::<Result<Vec<_>>>()?;
        Table::from_columns(columns)
    }

    /// New table with the rows at `indices`, in that order.
    pub fn take_rows(&self, indices: &[usize]) -> Result<Table> {
        if let Some(&bad) = indices.iter().find(|&&i| i >= self.n_rows()) {
            return Err(Error::DataShape(format!(
                "row index {} out of bounds for {} rows",
                bad,
                self.n_rows()
            )));
        }
        let columns = self
            .columns
            .iter()
            .map(|c| Column {
                name: c.name.clone(),
                data: c.data.select_rows(indices),
            })
            .collect();
        Table::from_columns(columns)
    }

    pub fn head(&self, n: usize) -> Table {
        let indices: Vec<usize> = (0..n.min(self.n_rows())).collect();
        // Indices are in bounds by construction.
        self.take_rows(&indices).unwrap_or_default()
    }

    /// One row rendered as strings, in column order.
    pub fn row_strings(&self, index: usize) -> Vec<String> {
        self.columns.iter().map(|c| c.data.render(index)).collect()
    }
}

fn is_plain_decimal(value: &str) -> bool {
    let unsigned = value.strip_prefix('-').unwrap_or(value);
    let (whole, fraction) = match unsigned.split_once('.') {
        Some((whole, fraction)) => (whole, Some(fraction)),
        None => (unsigned, None),
    };
    let digits = |s: &str| !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit());

    digits(whole)
        && (whole == "0" || !whole.starts_with('0'))
        && fraction.map_or(true, digits)
}

fn infer_numeric(values: &[String]) -> Option<Vec<f64>> {
    let mut saw_value = false;
    let mut numbers = Vec::with_capacity(values.len());

    for value in values {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            numbers.push(f64::NAN);
            continue;
        }
        match trimmed.parse::<f64>() {
            Ok(n) if n.is_finite() && is_plain_decimal(trimmed) => {
                saw_value = true;
                numbers.push(n);
            }
            _ => return None,
        }
    }

    saw_value.then_some(numbers)
}

/// Checks that `names` are unique. Returns the first duplicate.
pub fn first_duplicate<'a, I>(names: I) -> Option<&'a str>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut seen = HashSet::new();
    names.into_iter().find(|name| !seen.insert(*name))
}
