//! Spreadsheet (.xls/.xlsx) loading via calamine.
//!
//! Only the first worksheet is read. Its first row is the header; every
//! following row in the used range becomes a dataset row.

use std::path::Path;

use calamine::{open_workbook_auto, Data, Reader};
use tm_common::Value;

use super::{header_name, infer_kind, Column, Dataset, SourceError};

/// Read the first worksheet of a workbook.
pub fn read_spreadsheet(path: &Path) -> Result<Dataset, SourceError> {
    let mut workbook = open_workbook_auto(path)?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or(SourceError::NoWorksheet)??;

    let mut rows = range.rows();
    let header = rows.next().ok_or(SourceError::MissingHeader)?;
    let names: Vec<String> = header
        .iter()
        .enumerate()
        .map(|(i, cell)| header_name(&cell.to_string(), i))
        .collect();

    let body: Vec<Vec<Value>> = rows
        .map(|row| row.iter().map(cell_value).collect())
        .collect();

    let columns = names
        .into_iter()
        .enumerate()
        .map(|(i, name)| {
            let kind = infer_kind(body.iter().filter_map(|row| row.get(i)));
            Column::new(name, kind)
        })
        .collect();

    Dataset::new(columns, body)
}

pub(crate) fn cell_value(cell: &Data) -> Value {
    match cell {
        Data::Int(i) => Value::Int(*i),
        Data::Float(x) => Value::Float(*x),
        Data::Bool(b) => Value::Bool(*b),
        Data::String(s) if s.trim().is_empty() => Value::Null,
        Data::String(s) => Value::Text(s.clone()),
        Data::Empty | Data::Error(_) => Value::Null,
        other => Value::Text(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::Builder;

    #[test]
    fn maps_cells_to_values() {
        assert_eq!(cell_value(&Data::Float(1.5)), Value::Float(1.5));
        assert_eq!(cell_value(&Data::Int(7)), Value::Int(7));
        assert_eq!(cell_value(&Data::Bool(true)), Value::Bool(true));
        assert_eq!(cell_value(&Data::String("ok".into())), Value::Text("ok".into()));
        assert_eq!(cell_value(&Data::String("  ".into())), Value::Null);
        assert_eq!(cell_value(&Data::Empty), Value::Null);
    }

    #[test]
    fn corrupt_workbook_is_an_error() {
        let file = Builder::new().suffix(".xlsx").tempfile().unwrap();
        std::fs::write(file.path(), b"not a zip archive").unwrap();
        assert!(read_spreadsheet(file.path()).is_err());
    }
}
