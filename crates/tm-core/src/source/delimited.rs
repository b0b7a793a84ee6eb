//! Delimited text (CSV/TSV) loading via the Arrow CSV reader.
//!
//! Column types come from Arrow's schema inference over the whole file;
//! cells that Arrow types as anything other than bool/int64/float64/utf8
//! (dates, timestamps) are carried as their display text.

use std::fs::File;
use std::io::{BufReader, Seek, SeekFrom};
use std::path::Path;
use std::sync::Arc;

use arrow::array::{Array, ArrayRef, AsArray};
use arrow::csv::reader::Format;
use arrow::csv::ReaderBuilder;
use arrow::datatypes::{DataType, Float64Type, Int64Type};
use arrow::error::ArrowError;
use arrow::util::display::{ArrayFormatter, FormatOptions};
use tm_common::{Value, ValueKind};
use tracing::debug;

use super::{header_name, Column, Dataset, SourceError};

/// Read a delimited text file with a header row.
pub fn read_delimited(path: &Path, delimiter: u8) -> Result<Dataset, SourceError> {
    let mut file = File::open(path)?;
    let format = Format::default()
        .with_header(true)
        .with_delimiter(delimiter);

    let (schema, records) = format.infer_schema(&mut file, None)?;
    debug!(records, fields = schema.fields().len(), "inferred delimited schema");
    if schema.fields().is_empty() {
        return Err(SourceError::MissingHeader);
    }
    file.seek(SeekFrom::Start(0))?;

    let columns: Vec<Column> = schema
        .fields()
        .iter()
        .enumerate()
        .map(|(i, field)| Column::new(header_name(field.name(), i), kind_of(field.data_type())))
        .collect();

    let reader = ReaderBuilder::new(Arc::new(schema))
        .with_format(format)
        .build(BufReader::new(file))?;

    let mut rows = Vec::new();
    for batch in reader {
        let batch = batch?;
        for row in 0..batch.num_rows() {
            let values = batch
                .columns()
                .iter()
                .map(|array| cell(array, row))
                .collect::<Result<Vec<_>, _>>()?;
            rows.push(values);
        }
    }

    Dataset::new(columns, rows)
}

fn kind_of(data_type: &DataType) -> ValueKind {
    match data_type {
        DataType::Boolean => ValueKind::Bool,
        DataType::Int64 => ValueKind::Int,
        DataType::Float64 | DataType::Null => ValueKind::Float,
        _ => ValueKind::Text,
    }
}

fn cell(array: &ArrayRef, row: usize) -> Result<Value, ArrowError> {
    if matches!(array.data_type(), DataType::Null) || array.is_null(row) {
        return Ok(Value::Null);
    }
    let value = match array.data_type() {
        DataType::Boolean => Value::Bool(array.as_boolean().value(row)),
        DataType::Int64 => Value::Int(array.as_primitive::<Int64Type>().value(row)),
        DataType::Float64 => Value::Float(array.as_primitive::<Float64Type>().value(row)),
        DataType::Utf8 => Value::Text(array.as_string::<i32>().value(row).to_string()),
        _ => {
            let formatter = ArrayFormatter::try_new(array.as_ref(), &FormatOptions::default())?;
            Value::Text(formatter.value(row).to_string())
        }
    };
    Ok(value)
}
