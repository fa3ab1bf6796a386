//! Sheet and identifier-column detection.
//!
//! Both decisions are made by walking an ordered list of strategies and taking
//! the first that yields a result. A configured sheet that does not exist is a
//! soft failure: it is reported as a warning and detection falls through to the
//! heuristics. A workbook where nothing can be selected is a hard failure.

use log::{info, warn};
use serde::Serialize;

use crate::{
    config::{CompareConfig, column_index_to_letter, column_letter_to_index},
    error::ReconcileError,
    workbook::{Sheet, Workbook},
};

/// Sheet names (case-insensitive) that usually hold documentation, not data.
pub const METADATA_SHEET_NAMES: &[&str] = &["about", "readme", "info", "metadata", "codebook"];

/// Header cells inspected when looking for an identifier column.
pub const ID_HEADER_SCAN_COLUMNS: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SheetSource {
    Configured,
    AutoDetected,
    FirstSheetFallback,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnSource {
    ConfiguredIndex,
    ConfiguredLetter,
    HeaderMatch,
    FirstColumnFallback,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetectedStructure {
    pub sheet_name: String,
    pub id_column_index: usize,
    pub sheet_source: SheetSource,
    pub column_source: ColumnSource,
    pub warnings: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SheetStrategy<'a> {
    Configured(&'a str),
    /// First non-metadata sheet with data below the header row.
    FirstPopulated,
    FirstSheet,
}

impl SheetStrategy<'_> {
    pub fn source(&self) -> SheetSource {
        match self {
            SheetStrategy::Configured(_) => SheetSource::Configured,
            SheetStrategy::FirstPopulated => SheetSource::AutoDetected,
            SheetStrategy::FirstSheet => SheetSource::FirstSheetFallback,
        }
    }

    pub fn select<'w>(&self, workbook: &'w Workbook) -> Option<&'w Sheet> {
        match self {
            SheetStrategy::Configured(name) => workbook.sheet(name),
            SheetStrategy::FirstPopulated => workbook
                .sheets()
                .iter()
                .find(|sheet| !is_metadata_sheet(sheet.name()) && sheet.max_row() > 1),
            SheetStrategy::FirstSheet => workbook.sheets().first(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ColumnStrategy<'a> {
    Index(usize),
    Letter(&'a str),
    HeaderContainsId,
    FirstColumn,
}

impl ColumnStrategy<'_> {
    pub fn source(&self) -> ColumnSource {
        match self {
            ColumnStrategy::Index(_) => ColumnSource::ConfiguredIndex,
            ColumnStrategy::Letter(_) => ColumnSource::ConfiguredLetter,
            ColumnStrategy::HeaderContainsId => ColumnSource::HeaderMatch,
            ColumnStrategy::FirstColumn => ColumnSource::FirstColumnFallback,
        }
    }

    pub fn select(&self, sheet: &Sheet) -> Option<usize> {
        match self {
            ColumnStrategy::Index(index) => Some(*index),
            ColumnStrategy::Letter(letter) => column_letter_to_index(letter),
            ColumnStrategy::HeaderContainsId => find_id_header(sheet),
            ColumnStrategy::FirstColumn => Some(0),
        }
    }
}

pub fn sheet_strategies(config: &CompareConfig) -> Vec<SheetStrategy<'_>> {
    let mut strategies = Vec::with_capacity(3);
    if let Some(name) = config.sheet_name.as_deref() {
        strategies.push(SheetStrategy::Configured(name));
    }
    strategies.push(SheetStrategy::FirstPopulated);
    strategies.push(SheetStrategy::FirstSheet);
    strategies
}

pub fn column_strategies(config: &CompareConfig) -> Vec<ColumnStrategy<'_>> {
    let mut strategies = Vec::with_capacity(4);
    if let Some(index) = config.id_column_index {
        strategies.push(ColumnStrategy::Index(index));
    }
    if let Some(letter) = config.id_column_letter.as_deref() {
        strategies.push(ColumnStrategy::Letter(letter));
    }
    strategies.push(ColumnStrategy::HeaderContainsId);
    strategies.push(ColumnStrategy::FirstColumn);
    strategies
}

pub fn is_metadata_sheet(name: &str) -> bool {
    let lowered = name.to_lowercase();
    METADATA_SHEET_NAMES.contains(&lowered.as_str())
}

pub fn header_mentions_id(header: &str) -> bool {
    header.to_lowercase().contains("id")
}

fn find_id_header(sheet: &Sheet) -> Option<usize> {
    (0..sheet.max_column().min(ID_HEADER_SCAN_COLUMNS)).find(|&col| {
        sheet
            .cell(1, col + 1)
            .filter(|cell| !cell.is_blank())
            .and_then(|cell| cell.to_text(1, col + 1).ok())
            .is_some_and(|text| header_mentions_id(&text))
    })
}

pub fn detect(workbook: &Workbook, config: &CompareConfig) -> Result<DetectedStructure, ReconcileError> {
    info!("Auto-detecting structure in {:?}", workbook.path());
    let mut warnings = Vec::new();

    let mut selected = None;
    for strategy in sheet_strategies(config) {
        match strategy.select(workbook) {
            Some(sheet) => {
                selected = Some((sheet, strategy.source()));
                break;
            }
            None => {
                if let SheetStrategy::Configured(name) = strategy {
                    let message = format!(
                        "Configured sheet '{}' not found; available sheets: {:?}; falling back to auto-detection",
                        name,
                        workbook.sheet_names()
                    );
                    warn!("{message}");
                    warnings.push(message);
                }
            }
        }
    }
    let (sheet, sheet_source) = selected.ok_or_else(|| ReconcileError::StructureNotFound {
        path: workbook.path().to_path_buf(),
        reason: "workbook contains no sheets".to_string(),
    })?;
    match sheet_source {
        SheetSource::Configured => info!("Using configured sheet: {}", sheet.name()),
        SheetSource::AutoDetected => info!("Auto-detected sheet: {}", sheet.name()),
        SheetSource::FirstSheetFallback => {
            let message = format!("No populated data sheet; falling back to first sheet: {}", sheet.name());
            warn!("{message}");
            warnings.push(message);
        }
    }

    let (id_column_index, column_source) = column_strategies(config)
        .into_iter()
        .find_map(|strategy| strategy.select(sheet).map(|index| (index, strategy.source())))
        .unwrap_or((0, ColumnSource::FirstColumnFallback));
    if id_column_index >= sheet.max_column() {
        return Err(ReconcileError::StructureNotFound {
            path: workbook.path().to_path_buf(),
            reason: format!(
                "ID column {} is outside sheet '{}' ({} column(s))",
                column_index_to_letter(id_column_index),
                sheet.name(),
                sheet.max_column()
            ),
        });
    }
    let letter = column_index_to_letter(id_column_index);
    match column_source {
        ColumnSource::ConfiguredIndex => {
            info!("Using configured ID column index: {id_column_index}")
        }
        ColumnSource::ConfiguredLetter => {
            info!("Using configured ID column: {letter} (index {id_column_index})")
        }
        ColumnSource::HeaderMatch => info!("Found ID column by header: {letter}"),
        ColumnSource::FirstColumnFallback => warn!("Fallback to column A as ID column"),
    }

    Ok(DetectedStructure {
        sheet_name: sheet.name().to_string(),
        id_column_index,
        sheet_source,
        column_source,
        warnings,
    })
}
