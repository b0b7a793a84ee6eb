//! Tabular datasets and the file adapters that load them.
//!
//! A [`Dataset`] is an ordered list of typed columns plus rows of scalar
//! values, immutable once loaded. Loading dispatches on the file extension:
//!
//! - `.csv` / `.tsv`: delimited text, read with the Arrow CSV reader
//! - `.xls` / `.xlsx`: spreadsheets, first worksheet, read with calamine
//!
//! Any other extension fails with [`SourceError::UnsupportedFormat`] before
//! anything else is touched.

pub mod delimited;
pub mod spreadsheet;

use std::collections::HashMap;
use std::path::Path;

use thiserror::Error;
use tm_common::{Value, ValueKind};
use tracing::info;

/// Errors raised while loading a dataset.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("unsupported input format: {extension:?}")]
    UnsupportedFormat { extension: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("delimited text error: {0}")]
    Delimited(#[from] arrow::error::ArrowError),

    #[error("spreadsheet error: {0}")]
    Spreadsheet(#[from] calamine::Error),

    #[error("workbook has no worksheets")]
    NoWorksheet,

    #[error("dataset has no header row")]
    MissingHeader,

    #[error("duplicate column name '{0}'")]
    DuplicateColumn(String),

    #[error("row {row} has {actual} cells, expected {expected}")]
    RaggedRow {
        row: usize,
        expected: usize,
        actual: usize,
    },
}

impl From<SourceError> for tm_common::Error {
    fn from(err: SourceError) -> Self {
        match err {
            SourceError::UnsupportedFormat { extension } => {
                tm_common::Error::UnsupportedFormat { extension }
            }
            SourceError::Io(e) => tm_common::Error::Io(e),
            other => tm_common::Error::Dataset(other.to_string()),
        }
    }
}

/// Recognised input formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceFormat {
    Delimited { delimiter: u8 },
    Spreadsheet,
}

impl SourceFormat {
    /// Pick the format from a path's extension (case-insensitive).
    pub fn from_path(path: &Path) -> Result<Self, SourceError> {
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .unwrap_or_default();

        match extension.as_str() {
            "csv" => Ok(SourceFormat::Delimited { delimiter: b',' }),
            "tsv" => Ok(SourceFormat::Delimited { delimiter: b'\t' }),
            "xls" | "xlsx" => Ok(SourceFormat::Spreadsheet),
            _ => Err(SourceError::UnsupportedFormat { extension }),
        }
    }
}

/// Load a dataset from disk.
pub fn load_dataset(path: &Path) -> Result<Dataset, SourceError> {
    let format = SourceFormat::from_path(path)?;
    let dataset = match format {
        SourceFormat::Delimited { delimiter } => delimited::read_delimited(path, delimiter)?,
        SourceFormat::Spreadsheet => spreadsheet::read_spreadsheet(path)?,
    };
    info!(
        path = %path.display(),
        columns = dataset.columns().len(),
        rows = dataset.len(),
        "dataset loaded"
    );
    Ok(dataset)
}

/// Name used for a blank header cell at position `index`.
pub(crate) fn header_name(raw: &str, index: usize) -> String {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        format!("Unnamed: {}", index)
    } else {
        trimmed.to_string()
    }
}

/// Narrowest kind holding every non-null value; all-null columns are numeric.
pub fn infer_kind<'a>(values: impl IntoIterator<Item = &'a Value>) -> ValueKind {
    values
        .into_iter()
        .filter_map(Value::kind)
        .reduce(ValueKind::unify)
        .unwrap_or(ValueKind::Float)
}

/// A named, typed dataset column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Column {
    pub name: String,
    pub kind: ValueKind,
}

impl Column {
    pub fn new(name: impl Into<String>, kind: ValueKind) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }
}

/// An immutable, in-memory table.
#[derive(Debug, Clone)]
pub struct Dataset {
    columns: Vec<Column>,
    index: HashMap<String, usize>,
    rows: Vec<Vec<Value>>,
}

impl Dataset {
    /// Build a dataset, rejecting duplicate column names and ragged rows.
    /// Cell values are coerced to their column's kind.
    pub fn new(columns: Vec<Column>, rows: Vec<Vec<Value>>) -> Result<Self, SourceError> {
        let mut index = HashMap::with_capacity(columns.len());
        for (i, column) in columns.iter().enumerate() {
            if index.insert(column.name.clone(), i).is_some() {
                return Err(SourceError::DuplicateColumn(column.name.clone()));
            }
        }

        let mut coerced = Vec::with_capacity(rows.len());
        for (row_index, row) in rows.into_iter().enumerate() {
            if row.len() != columns.len() {
                return Err(SourceError::RaggedRow {
                    row: row_index,
                    expected: columns.len(),
                    actual: row.len(),
                });
            }
            coerced.push(
                row.into_iter()
                    .zip(&columns)
                    .map(|(value, column)| value.coerce(column.kind))
                    .collect(),
            );
        }

        Ok(Self {
            columns,
            index,
            rows: coerced,
        })
    }

    /// Build a dataset from untyped rows, inferring each column's kind.
    pub fn from_rows(names: &[&str], rows: Vec<Vec<Value>>) -> Result<Self, SourceError> {
        let columns = names
            .iter()
            .enumerate()
            .map(|(i, name)| {
                let kind = infer_kind(rows.iter().filter_map(|row| row.get(i)));
                Column::new(*name, kind)
            })
            .collect();
        Self::new(columns, rows)
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|c| c.name.as_str())
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.column_index(name).map(|i| &self.columns[i])
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn row(&self, index: usize) -> Option<Row<'_>> {
        self.rows.get(index).map(|values| Row {
            dataset: self,
            index,
            values,
        })
    }

    pub fn rows(&self) -> impl Iterator<Item = Row<'_>> {
        (0..self.rows.len()).filter_map(move |i| self.row(i))
    }
}

/// A borrowed view of one dataset row.
#[derive(Debug, Clone, Copy)]
pub struct Row<'a> {
    dataset: &'a Dataset,
    index: usize,
    values: &'a [Value],
}

impl<'a> Row<'a> {
    /// Position of this row in the dataset.
    pub fn index(&self) -> usize {
        self.index
    }

    /// Value of the named column.
    pub fn get(&self, column: &str) -> Option<&'a Value> {
        self.dataset
            .column_index(column)
            .and_then(|i| self.values.get(i))
    }

    /// Value at a column position.
    pub fn value_at(&self, column: usize) -> Option<&'a Value> {
        self.values.get(column)
    }

    pub fn values(&self) -> &'a [Value] {
        self.values
    }
}
