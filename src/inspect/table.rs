//! Readers for the game's `csv_logic` configuration tables.

use crate::error::{CensusError, Result};
use csv::{ReaderBuilder, StringRecord};
use std::fs::File;
use std::path::Path;

fn open(path: &Path, has_headers: bool) -> Result<csv::Reader<File>> {
    if !path.is_file() {
        return Err(CensusError::Table {
            path: path.display().to_string(),
            message: "file not found".to_string(),
        });
    }

    ReaderBuilder::new()
        .has_headers(has_headers)
        .flexible(true)
        .from_path(path)
        .map_err(|e| table_error(path, e))
}

fn table_error(path: &Path, error: csv::Error) -> CensusError {
    CensusError::Table {
        path: path.display().to_string(),
        message: error.to_string(),
    }
}

/// First-column values of the rows whose `column` equals `value`.
///
/// The first row names the columns. A table without `column` yields nothing.
pub fn first_column_where(path: &Path, column: &str, value: &str) -> Result<Vec<String>> {
    let mut reader = open(path, true)?;
    let headers = reader.headers().map_err(|e| table_error(path, e))?.clone();

    let Some(column_index) = headers.iter().position(|name| name == column) else {
        return Ok(Vec::new());
    };

    let mut result = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|e| table_error(path, e))?;
        if record.get(column_index) == Some(value) {
            result.push(first_field(&record));
        }
    }

    Ok(result)
}

/// First-column value of every row, header row included.
pub fn first_column(path: &Path) -> Result<Vec<String>> {
    let mut reader = open(path, false)?;

    let mut result = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|e| table_error(path, e))?;
        if record.is_empty() {
            continue;
        }
        result.push(first_field(&record));
    }

    Ok(result)
}

fn first_field(record: &StringRecord) -> String {
    record.get(0).unwrap_or_default().to_string()
}
