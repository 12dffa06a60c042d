//! Columnar incident dataset.
//!
//! Rows are stored as [`serde_json`] objects keyed by column name, the same
//! shape the CSV and JSON sources produce, while the column order is kept
//! separately so exports are stable. Every transform returns a new table;
//! the receiver is never mutated.

use std::collections::BTreeSet;
use std::io::{Read, Write};

use serde_json::Value;
use thiserror::Error;

use crate::IncidentRecord;

/// A single row, keyed by column name.
pub type Row = serde_json::Map<String, Value>;

/// Errors raised by table construction and column access.
#[derive(Debug, Error)]
pub enum TableError {
    /// One or more required columns are absent from the table.
    #[error("Required column(s) not found: {}", .columns.join(", "))]
    ColumnNotFound {
        /// Every missing column name, in the order requested.
        columns: Vec<String>,
    },

    /// A column was appended with the wrong number of values.
    #[error("Column '{column}' has {actual} values but the table has {expected} rows")]
    LengthMismatch {
        /// Name of the column being appended.
        column: String,
        /// Number of rows in the table.
        expected: usize,
        /// Number of values supplied.
        actual: usize,
    },

    /// CSV reading or writing failed.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Record serialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// An ordered set of columns plus the rows that populate them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IncidentTable {
    columns: Vec<String>,
    rows: Vec<Row>,
}

impl IncidentTable {
    /// Creates an empty table with the given columns.
    #[must_use]
    pub const fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    /// Creates a table from pre-built rows.
    ///
    /// Keys present in a row but missing from `columns` are kept in the row
    /// but not exported.
    #[must_use]
    pub const fn from_rows(columns: Vec<String>, rows: Vec<Row>) -> Self {
        Self { columns, rows }
    }

    /// Builds a table from typed incident records.
    ///
    /// Columns are the record's fixed fields followed by every attribute key
    /// seen across all records, sorted.
    ///
    /// # Errors
    ///
    /// Returns [`TableError::Json`] if a record fails to serialize.
    pub fn from_records(records: &[IncidentRecord]) -> Result<Self, TableError> {
        let mut columns: Vec<String> = IncidentRecord::FIXED_COLUMNS
            .iter()
            .map(|c| (*c).to_string())
            .collect();

        let attribute_keys: BTreeSet<&String> =
            records.iter().flat_map(|r| r.attributes.keys()).collect();
        columns.extend(
            attribute_keys
                .into_iter()
                .filter(|k| !IncidentRecord::FIXED_COLUMNS.contains(&k.as_str()))
                .cloned(),
        );

        let mut rows = Vec::with_capacity(records.len());
        for record in records {
            match serde_json::to_value(record)? {
                Value::Object(row) => rows.push(row),
                other => rows.push(Row::from_iter([("value".to_string(), other)])),
            }
        }

        Ok(Self { columns, rows })
    }

    /// Parses a CSV stream with a header row. Every cell is kept as a
    /// string; empty cells become `null`.
    ///
    /// # Errors
    ///
    /// Returns [`TableError::Csv`] if the stream is not valid CSV.
    pub fn from_csv_reader<R: Read>(reader: R) -> Result<Self, TableError> {
        let mut reader = csv::ReaderBuilder::new().flexible(true).from_reader(reader);

        let columns: Vec<String> = reader
            .headers()?
            .iter()
            .map(|h| h.trim().to_owned())
            .collect();

        let mut rows = Vec::new();
        for result in reader.records() {
            let record = result?;

            let mut row = Row::new();
            for (i, column) in columns.iter().enumerate() {
                let value = record.get(i).unwrap_or("").trim();
                let value = if value.is_empty() {
                    Value::Null
                } else {
                    Value::String(value.to_owned())
                };
                row.insert(column.clone(), value);
            }
            rows.push(row);
        }

        log::debug!("Parsed {} rows with {} columns", rows.len(), columns.len());

        Ok(Self { columns, rows })
    }

    /// Writes the table as CSV, header first, in column order.
    ///
    /// # Errors
    ///
    /// Returns [`TableError::Csv`] if writing fails.
    pub fn to_csv_writer<W: Write>(&self, writer: W) -> Result<(), TableError> {
        let mut writer = csv::Writer::from_writer(writer);
        writer.write_record(&self.columns)?;

        for row in &self.rows {
            let record: Vec<String> = self
                .columns
                .iter()
                .map(|c| row.get(c).map_or_else(String::new, cell_to_string))
                .collect();
            writer.write_record(&record)?;
        }

        writer.flush().map_err(csv::Error::from)?;
        Ok(())
    }

    /// Column names in export order.
    #[must_use]
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// All rows.
    #[must_use]
    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    /// Number of rows.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether the table has no rows.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Whether the table declares the given column.
    #[must_use]
    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c == name)
    }

    /// Fails with every missing column named if any of `names` is absent.
    ///
    /// # Errors
    ///
    /// Returns [`TableError::ColumnNotFound`] listing the missing columns.
    pub fn require_columns(&self, names: &[&str]) -> Result<(), TableError> {
        let missing: Vec<String> = names
            .iter()
            .filter(|name| !self.has_column(name))
            .map(|name| (*name).to_string())
            .collect();

        if missing.is_empty() {
            Ok(())
        } else {
            Err(TableError::ColumnNotFound { columns: missing })
        }
    }

    /// Raw cell value, if the row and column exist.
    #[must_use]
    pub fn value(&self, row: usize, column: &str) -> Option<&Value> {
        self.rows.get(row).and_then(|r| r.get(column))
    }

    /// Cell value coerced to a number. See [`value_as_f64`].
    #[must_use]
    pub fn f64_at(&self, row: usize, column: &str) -> Option<f64> {
        self.value(row, column).and_then(value_as_f64)
    }

    /// Every value of `column` coerced to a number.
    ///
    /// # Errors
    ///
    /// Returns [`TableError::ColumnNotFound`] if the column is absent.
    pub fn column_f64(&self, column: &str) -> Result<Vec<Option<f64>>, TableError> {
        self.require_columns(&[column])?;
        Ok(self
            .rows
            .iter()
            .map(|r| r.get(column).and_then(value_as_f64))
            .collect())
    }

    /// Returns a new table holding the rows for which `keep` returns `true`.
    #[must_use]
    pub fn filter_rows<F>(&self, mut keep: F) -> Self
    where
        F: FnMut(usize, &Row) -> bool,
    {
        Self {
            columns: self.columns.clone(),
            rows: self
                .rows
                .iter()
                .enumerate()
                .filter(|(i, row)| keep(*i, row))
                .map(|(_, row)| row.clone())
                .collect(),
        }
    }

    /// Returns a new table with rows reordered by `order` (indices into this
    /// table). Indices out of range are skipped.
    #[must_use]
    pub fn reorder(&self, order: &[usize]) -> Self {
        Self {
            columns: self.columns.clone(),
            rows: order
                .iter()
                .filter_map(|&i| self.rows.get(i).cloned())
                .collect(),
        }
    }

    /// Returns a new table with `name` set to `values` on every row. An
    /// existing column of the same name is overwritten in place.
    ///
    /// # Errors
    ///
    /// Returns [`TableError::LengthMismatch`] if `values` does not have one
    /// entry per row.
    pub fn with_column(&self, name: &str, values: Vec<Value>) -> Result<Self, TableError> {
        if values.len() != self.rows.len() {
            return Err(TableError::LengthMismatch {
                column: name.to_string(),
                expected: self.rows.len(),
                actual: values.len(),
            });
        }

        let mut columns = self.columns.clone();
        if !columns.iter().any(|c| c == name) {
            columns.push(name.to_string());
        }

        let rows = self
            .rows
            .iter()
            .zip(values)
            .map(|(row, value)| {
                let mut row = row.clone();
                row.insert(name.to_string(), value);
                row
            })
            .collect();

        Ok(Self { columns, rows })
    }

    /// Returns a new table without `name`.
    #[must_use]
    pub fn without_column(&self, name: &str) -> Self {
        Self {
            columns: self
                .columns
                .iter()
                .filter(|c| *c != name)
                .cloned()
                .collect(),
            rows: self
                .rows
                .iter()
                .map(|row| {
                    let mut row = row.clone();
                    row.remove(name);
                    row
                })
                .collect(),
        }
    }
}

/// Coerces a JSON cell to a number.
///
/// Accepts JSON numbers and numeric strings. `null`, non-numeric strings,
/// and `NaN` yield `None`; infinities are returned as-is so range checks can
/// reject them.
#[must_use]
pub fn value_as_f64(value: &Value) -> Option<f64> {
    let number = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }?;

    if number.is_nan() { None } else { Some(number) }
}

fn cell_to_string(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        other => other.to_string(),
    }
}
