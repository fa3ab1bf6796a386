//! In-memory view of a tabular source: named sheets of addressable cells.
//!
//! Spreadsheet files are loaded through `calamine`; delimited text files are
//! loaded as a single sheet named after the file stem. Rows and columns are
//! addressed 1-based, and an empty sheet still reports one row and one column.

use std::{
    fmt,
    path::{Path, PathBuf},
};

use calamine::{Data, Reader, open_workbook_auto};
use chrono::NaiveDateTime;
use encoding_rs::{Encoding, UTF_8};
use log::debug;

use crate::{
    error::{CellReadError, ReconcileError},
    io_utils,
};

const SPREADSHEET_EXTENSIONS: &[&str] = &["xlsx", "xlsm", "xlsb", "xls", "ods"];
const DELIMITED_EXTENSIONS: &[&str] = &["csv", "tsv", "txt"];

#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Empty,
    Text(String),
    Integer(i64),
    Float(f64),
    Boolean(bool),
    DateTime(NaiveDateTime),
    /// A spreadsheet error literal such as `#N/A`.
    Error(String),
}

impl CellValue {
    /// `true` for cells without a value and for zero-length strings.
    pub fn is_blank(&self) -> bool {
        match self {
            CellValue::Empty => true,
            CellValue::Text(text) => text.is_empty(),
            _ => false,
        }
    }

    pub fn to_text(&self, row: usize, column: usize) -> Result<String, CellReadError> {
        match self {
            CellValue::Empty => Ok(String::new()),
            CellValue::Text(text) => Ok(text.clone()),
            CellValue::Integer(value) => Ok(value.to_string()),
            CellValue::Float(value) => Ok(format_float(*value)),
            CellValue::Boolean(value) => Ok(if *value { "True" } else { "False" }.to_string()),
            CellValue::DateTime(value) => Ok(value.format("%Y-%m-%d %H:%M:%S").to_string()),
            CellValue::Error(code) => Err(CellReadError {
                row,
                column,
                message: format!("cell holds error value {code}"),
            }),
        }
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Error(code) => write!(f, "{code}"),
            other => write!(f, "{}", other.to_text(0, 0).unwrap_or_default()),
        }
    }
}

fn format_float(value: f64) -> String {
    if value.is_finite() && value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{value:.0}")
    } else {
        value.to_string()
    }
}

impl From<&Data> for CellValue {
    fn from(value: &Data) -> Self {
        match value {
            Data::Empty => CellValue::Empty,
            Data::String(text) => CellValue::Text(text.clone()),
            Data::Int(value) => CellValue::Integer(*value),
            Data::Float(value) => CellValue::Float(*value),
            Data::Bool(value) => CellValue::Boolean(*value),
            Data::DateTime(value) => value
                .as_datetime()
                .map(CellValue::DateTime)
                .unwrap_or_else(|| CellValue::Float(value.as_f64())),
            Data::DateTimeIso(text) | Data::DurationIso(text) => CellValue::Text(text.clone()),
            Data::Error(code) => CellValue::Error(code.to_string()),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Sheet {
    name: String,
    rows: Vec<Vec<CellValue>>,
}

impl Sheet {
    pub fn new(name: impl Into<String>, rows: Vec<Vec<CellValue>>) -> Self {
        Self {
            name: name.into(),
            rows,
        }
    }

    /// Builds a sheet from plain strings, mapping `""` to [`CellValue::Empty`].
    pub fn from_strings<R, S>(name: impl Into<String>, rows: R) -> Self
    where
        R: IntoIterator,
        R::Item: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let rows = rows
            .into_iter()
            .map(|row| {
                row.into_iter()
                    .map(|value| {
                        let value = value.into();
                        if value.is_empty() {
                            CellValue::Empty
                        } else {
                            CellValue::Text(value)
                        }
                    })
                    .collect()
            })
            .collect();
        Self::new(name, rows)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn max_row(&self) -> usize {
        self.rows.len().max(1)
    }

    pub fn max_column(&self) -> usize {
        self.rows.iter().map(Vec::len).max().unwrap_or(0).max(1)
    }

    /// Cell at a 1-based position; `None` when outside the stored data.
    pub fn cell(&self, row: usize, column: usize) -> Option<&CellValue> {
        if row == 0 || column == 0 {
            return None;
        }
        self.rows.get(row - 1)?.get(column - 1)
    }

    pub fn rows(&self) -> &[Vec<CellValue>] {
        &self.rows
    }
}

#[derive(Debug, Clone)]
pub struct SourceOptions {
    pub delimiter: Option<u8>,
    pub encoding: &'static Encoding,
}

impl Default for SourceOptions {
    fn default() -> Self {
        Self {
            delimiter: None,
            encoding: UTF_8,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Workbook {
    path: PathBuf,
    sheets: Vec<Sheet>,
}

impl Workbook {
    pub fn new(path: impl Into<PathBuf>, sheets: Vec<Sheet>) -> Self {
        Self {
            path: path.into(),
            sheets,
        }
    }

    pub fn open(path: &Path, options: &SourceOptions) -> Result<Self, ReconcileError> {
        let extension = io_utils::extension_lowercase(path).unwrap_or_default();
        if SPREADSHEET_EXTENSIONS.contains(&extension.as_str()) {
            Self::open_spreadsheet(path)
        } else if DELIMITED_EXTENSIONS.contains(&extension.as_str()) {
            Self::open_delimited(path, options)
        } else {
            Err(ReconcileError::unreadable(
                path,
                format!("unsupported file extension '{extension}'"),
            ))
        }
    }

    fn open_spreadsheet(path: &Path) -> Result<Self, ReconcileError> {
        let mut workbook =
            open_workbook_auto(path).map_err(|err| ReconcileError::unreadable(path, err))?;
        let mut sheets = Vec::new();
        for name in workbook.sheet_names() {
            let range = workbook
                .worksheet_range(&name)
                .map_err(|err| ReconcileError::unreadable(path, format!("sheet '{name}': {err}")))?;
            let (start_row, start_col) = range
                .start()
                .map(|(row, col)| (row as usize, col as usize))
                .unwrap_or((0, 0));
            let mut rows: Vec<Vec<CellValue>> = vec![Vec::new(); start_row];
            for row in range.rows() {
                let mut cells = vec![CellValue::Empty; start_col];
                cells.extend(row.iter().map(CellValue::from));
                rows.push(cells);
            }
            debug!("Loaded sheet '{}' with {} row(s)", name, rows.len());
            sheets.push(Sheet::new(name, rows));
        }
        Ok(Self::new(path, sheets))
    }

    fn open_delimited(path: &Path, options: &SourceOptions) -> Result<Self, ReconcileError> {
        let delimiter = io_utils::resolve_input_delimiter(path, options.delimiter);
        let mut reader = io_utils::open_csv_reader_from_path(path, delimiter)
            .map_err(|err| ReconcileError::unreadable(path, format!("{err:#}")))?;
        let mut rows = Vec::new();
        for (idx, record) in reader.byte_records().enumerate() {
            let record = record
                .map_err(|err| ReconcileError::unreadable(path, format!("row {}: {err}", idx + 1)))?;
            let decoded = io_utils::decode_record(&record, options.encoding)
                .map_err(|err| ReconcileError::unreadable(path, format!("row {}: {err}", idx + 1)))?;
            rows.push(decoded);
        }
        Ok(Self::new(
            path,
            vec![Sheet::from_strings(io_utils::base_name(path), rows)],
        ))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn sheet_names(&self) -> Vec<&str> {
        self.sheets.iter().map(Sheet::name).collect()
    }

    pub fn sheet(&self, name: &str) -> Option<&Sheet> {
        self.sheets.iter().find(|sheet| sheet.name == name)
    }

    pub fn sheets(&self) -> &[Sheet] {
        &self.sheets
    }
}
