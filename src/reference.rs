//! Static Carnegie data: the public institution table (`name` → `basic2021`)
//! and the table of classification values with their labels.

use std::fs::File;
use std::path::Path;

use csv::{Reader, ReaderBuilder, StringRecord};
use log::{debug, info};
use rustc_hash::FxHashMap;

use crate::error::{TableError, TableResult};

pub(crate) fn open_table(path: &Path) -> TableResult<Reader<File>> {
    if !path.exists() {
        return Err(TableError::FileNotFound(path.to_path_buf()));
    }
    let reader = ReaderBuilder::new()
        .has_headers(true)
        .comment(Some(b'#'))
        .flexible(true)
        .from_path(path)?;
    Ok(reader)
}

pub(crate) fn optional_column_index(headers: &StringRecord, column: &str) -> Option<usize> {
    headers
        .iter()
        .position(|h| h.trim().trim_start_matches('\u{feff}') == column)
}

pub(crate) fn column_index(headers: &StringRecord, column: &str, path: &Path) -> TableResult<usize> {
    optional_column_index(headers, column).ok_or_else(|| TableError::MissingColumn {
        column: column.to_string(),
        path: path.to_path_buf(),
    })
}

/// Parses a classification code. Integral floats such as `15.0` are accepted
/// since spreadsheet exports of the Carnegie tables often carry them.
pub(crate) fn parse_code(raw: &str, line: u64, path: &Path) -> TableResult<i32> {
    let trimmed = raw.trim();
    if let Ok(code) = trimmed.parse::<i32>() {
        return Ok(code);
    }
    match trimmed.parse::<f64>() {
        Ok(value)
            if value.fract() == 0.0
                && (f64::from(i32::MIN)..=f64::from(i32::MAX)).contains(&value) =>
        {
            Ok(value as i32)
        }
        _ => Err(TableError::InvalidCode {
            value: raw.to_string(),
            line,
            path: path.to_path_buf(),
        }),
    }
}

/// Institution name → `basic2021` code. Where a name occurs on several rows
/// the first row is authoritative.
#[derive(Debug, Default)]
pub struct ReferenceTable {
    codes: FxHashMap<String, i32>,
}

impl ReferenceTable {
    pub fn load(path: &Path) -> TableResult<Self> {
        let mut reader = open_table(path)?;
        let headers = reader.headers()?.clone();
        let name_idx = column_index(&headers, "name", path)?;
        let code_idx = column_index(&headers, "basic2021", path)?;

        let mut table = Self::default();
        let mut rows = 0u64;
        for record in reader.records() {
            let record = record?;
            rows += 1;
            let line = record.position().map(|p| p.line()).unwrap_or(0);
            let name = record.get(name_idx).unwrap_or("").trim();
            if name.is_empty() {
                continue;
            }
            let code = parse_code(record.get(code_idx).unwrap_or(""), line, path)?;
            table.insert(name, code);
        }
        info!(
            "Loaded {} reference institutions from {} rows in {}",
            table.len(),
            rows,
            path.display()
        );
        Ok(table)
    }

    pub fn from_pairs<'a>(pairs: impl IntoIterator<Item = (&'a str, i32)>) -> Self {
        let mut table = Self::default();
        for (name, code) in pairs {
            table.insert(name, code);
        }
        table
    }

    fn insert(&mut self, name: &str, code: i32) {
        if self.codes.contains_key(name) {
            debug!("Duplicate reference row for '{}' ignored", name);
            return;
        }
        self.codes.insert(name.to_string(), code);
    }

    pub fn get(&self, name: &str) -> Option<i32> {
        self.codes.get(name).copied()
    }

    pub fn len(&self) -> usize {
        self.codes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.codes.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassLabel {
    pub value: i32,
    pub label: String,
}

/// Reads the classification value/label table, keeping file order.
pub fn load_class_labels(path: &Path) -> TableResult<Vec<ClassLabel>> {
    let mut reader = open_table(path)?;
    let headers = reader.headers()?.clone();
    let value_idx = column_index(&headers, "Value", path)?;
    let label_idx = column_index(&headers, "Label", path)?;

    let mut labels = Vec::new();
    for record in reader.records() {
        let record = record?;
        let line = record.position().map(|p| p.line()).unwrap_or(0);
        let raw_value = record.get(value_idx).unwrap_or("");
        if raw_value.trim().is_empty() {
            continue;
        }
        labels.push(ClassLabel {
            value: parse_code(raw_value, line, path)?,
            label: record.get(label_idx).unwrap_or("").trim().to_string(),
        });
    }
    info!("Loaded {} classification labels from {}", labels.len(), path.display());
    Ok(labels)
}
