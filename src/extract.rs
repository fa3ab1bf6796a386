use std::{
    collections::HashMap,
    fmt,
    path::{Path, PathBuf},
};

use log::{info, warn};
use serde::Serialize;

use crate::{
    config::{CompareConfig, column_index_to_letter},
    error::{CellReadError, DuplicateIdentifier, ReconcileError},
    workbook::{CellValue, Sheet, Workbook},
};

const SAMPLE_ID_COUNT: usize = 5;

/// Normalized content of one cell.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(untagged)]
pub enum FieldValue {
    /// The cell held no value and empty cells are being compared.
    Missing,
    Text(String),
}

impl FieldValue {
    pub fn empty() -> Self {
        FieldValue::Text(String::new())
    }

    pub fn as_str(&self) -> &str {
        match self {
            FieldValue::Missing => "",
            FieldValue::Text(text) => text,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.as_str().is_empty()
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::Text(value.to_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NormalizationPolicy {
    pub case_sensitive: bool,
    pub ignore_empty_cells: bool,
}

impl NormalizationPolicy {
    pub fn from_config(config: &CompareConfig) -> Self {
        Self {
            case_sensitive: config.case_sensitive,
            ignore_empty_cells: config.ignore_empty_cells,
        }
    }

    /// What a cell without a value normalizes to.
    pub fn blank_value(&self) -> FieldValue {
        if self.ignore_empty_cells {
            FieldValue::empty()
        } else {
            FieldValue::Missing
        }
    }

    /// Trimmed (and optionally lowercased) identifier; `None` when blank.
    pub fn normalize_identifier(&self, raw: &str) -> Option<String> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return None;
        }
        Some(self.fold_case(trimmed))
    }

    pub fn normalize_field(
        &self,
        cell: Option<&CellValue>,
        row: usize,
        column: usize,
    ) -> Result<FieldValue, CellReadError> {
        match cell {
            None | Some(CellValue::Empty) => Ok(self.blank_value()),
            Some(value) => {
                let text = value.to_text(row, column)?;
                Ok(FieldValue::Text(self.fold_case(text.trim())))
            }
        }
    }

    fn fold_case(&self, value: &str) -> String {
        if self.case_sensitive {
            value.to_string()
        } else {
            value.to_lowercase()
        }
    }
}

impl Default for NormalizationPolicy {
    fn default() -> Self {
        Self::from_config(&CompareConfig::default())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    pub id: String,
    /// 1-based row in the source sheet.
    pub row: usize,
    pub fields: HashMap<String, FieldValue>,
}

impl Record {
    pub fn new<I, K, V>(id: impl Into<String>, row: usize, fields: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<FieldValue>,
    {
        Self {
            id: id.into(),
            row,
            fields: fields
                .into_iter()
                .map(|(key, value)| (key.into(), value.into()))
                .collect(),
        }
    }

    pub fn get(&self, field: &str) -> Option<&FieldValue> {
        self.fields.get(field)
    }
}

#[derive(Debug, Clone)]
pub struct KeyedDataset {
    pub source: PathBuf,
    pub sheet_name: String,
    pub headers: Vec<String>,
    pub id_column_index: usize,
    /// Policy the field values were normalized with.
    pub policy: NormalizationPolicy,
    pub duplicates: Vec<DuplicateIdentifier>,
    pub cell_errors: Vec<CellReadError>,
    records: Vec<Record>,
    positions: HashMap<String, usize>,
}

impl KeyedDataset {
    pub fn new(
        source: impl Into<PathBuf>,
        sheet_name: impl Into<String>,
        headers: Vec<String>,
        id_column_index: usize,
    ) -> Self {
        Self {
            source: source.into(),
            sheet_name: sheet_name.into(),
            headers,
            id_column_index,
            policy: NormalizationPolicy::default(),
            duplicates: Vec::new(),
            cell_errors: Vec::new(),
            records: Vec::new(),
            positions: HashMap::new(),
        }
    }

    /// Adds a record unless its identifier is already present; the first
    /// occurrence is kept.
    pub fn insert(&mut self, record: Record) -> Result<(), DuplicateIdentifier> {
        if let Some(existing) = self.get(&record.id) {
            return Err(DuplicateIdentifier {
                id: record.id,
                first_row: existing.row,
                duplicate_row: record.row,
            });
        }
        self.positions.insert(record.id.clone(), self.records.len());
        self.records.push(record);
        Ok(())
    }

    pub fn get(&self, id: &str) -> Option<&Record> {
        self.positions.get(id).and_then(|&idx| self.records.get(idx))
    }

    pub fn contains(&self, id: &str) -> bool {
        self.positions.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Identifiers in sheet order.
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.records.iter().map(|record| record.id.as_str())
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn id_header(&self) -> &str {
        self.headers
            .get(self.id_column_index)
            .map(String::as_str)
            .unwrap_or_default()
    }

    pub fn id_column_letter(&self) -> String {
        column_index_to_letter(self.id_column_index)
    }

    pub fn source_path(&self) -> &Path {
        &self.source
    }
}

pub fn extract(
    workbook: &Workbook,
    sheet_name: &str,
    id_column_index: usize,
    config: &CompareConfig,
) -> Result<KeyedDataset, ReconcileError> {
    let sheet = workbook
        .sheet(sheet_name)
        .ok_or_else(|| ReconcileError::StructureNotFound {
            path: workbook.path().to_path_buf(),
            reason: format!("sheet '{sheet_name}' does not exist"),
        })?;
    info!(
        "Sheet size: {} rows x {} columns",
        sheet.max_row(),
        sheet.max_column()
    );

    let mut cell_errors = Vec::new();
    let headers = read_headers(sheet, &mut cell_errors);
    if id_column_index >= headers.len() {
        return Err(ReconcileError::StructureNotFound {
            path: workbook.path().to_path_buf(),
            reason: format!(
                "ID column index {id_column_index} exceeds {} header(s)",
                headers.len()
            ),
        });
    }
    info!("Found {} columns", headers.len());
    info!(
        "ID column: {} ('{}')",
        column_index_to_letter(id_column_index),
        headers[id_column_index]
    );

    let policy = NormalizationPolicy::from_config(config);
    let mut dataset = KeyedDataset::new(workbook.path(), sheet.name(), headers, id_column_index);
    dataset.policy = policy;
    for row in 2..=sheet.max_row() {
        let Some(id) = read_identifier(sheet, row, id_column_index, &policy, &mut cell_errors)
        else {
            continue;
        };
        let mut fields = HashMap::with_capacity(dataset.headers.len());
        for (col_idx, header) in dataset.headers.iter().enumerate() {
            let value = policy
                .normalize_field(sheet.cell(row, col_idx + 1), row, col_idx + 1)
                .unwrap_or_else(|err| {
                    cell_errors.push(err);
                    FieldValue::empty()
                });
            fields.insert(header.clone(), value);
        }
        if let Err(duplicate) = dataset.insert(Record { id, row, fields }) {
            warn!("{duplicate}");
            dataset.duplicates.push(duplicate);
        }
    }
    dataset.cell_errors = cell_errors;

    info!("Processed {} records", dataset.len());
    if !dataset.cell_errors.is_empty() {
        warn!(
            "{} cell reading errors (values set to empty)",
            dataset.cell_errors.len()
        );
    }
    if !dataset.is_empty() {
        let sample: Vec<&str> = dataset.ids().take(SAMPLE_ID_COUNT).collect();
        info!("Sample IDs: {sample:?}");
    }
    Ok(dataset)
}

fn read_headers(sheet: &Sheet, cell_errors: &mut Vec<CellReadError>) -> Vec<String> {
    (1..=sheet.max_column())
        .map(|col| {
            let text = match sheet.cell(1, col) {
                Some(cell) => cell.to_text(1, col).unwrap_or_else(|err| {
                    cell_errors.push(err);
                    String::new()
                }),
                None => String::new(),
            };
            let trimmed = text.trim();
            if trimmed.is_empty() {
                format!("Column_{col}")
            } else {
                trimmed.to_string()
            }
        })
        .collect()
}

fn read_identifier(
    sheet: &Sheet,
    row: usize,
    id_column_index: usize,
    policy: &NormalizationPolicy,
    cell_errors: &mut Vec<CellReadError>,
) -> Option<String> {
    let cell = sheet.cell(row, id_column_index + 1)?;
    if cell.is_blank() {
        return None;
    }
    match cell.to_text(row, id_column_index + 1) {
        Ok(raw) => policy.normalize_identifier(&raw),
        Err(err) => {
            cell_errors.push(err);
            None
        }
    }
}
