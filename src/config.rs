use std::{fs::File, io::BufReader, path::Path};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::error::ReconcileError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CompareConfig {
    /// Sheet to compare; auto-detected when unset or missing from a workbook.
    pub sheet_name: Option<String>,
    /// Single identifier column letter (`A`, `B`, ...).
    pub id_column_letter: Option<String>,
    /// 0-based identifier column; wins over `id_column_letter`.
    pub id_column_index: Option<usize>,
    pub case_sensitive: bool,
    pub ignore_empty_cells: bool,
}

impl Default for CompareConfig {
    fn default() -> Self {
        Self {
            sheet_name: None,
            id_column_letter: None,
            id_column_index: None,
            case_sensitive: true,
            ignore_empty_cells: true,
        }
    }
}

impl CompareConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let file = File::open(path).with_context(|| format!("Opening config file {path:?}"))?;
        let config: CompareConfig = serde_yaml::from_reader(BufReader::new(file))
            .with_context(|| format!("Parsing config file {path:?}"))?;
        Ok(config)
    }

    /// Checks option values and normalizes the column letter to upper case.
    pub fn validate(mut self) -> Result<Self, ReconcileError> {
        if let Some(sheet) = &self.sheet_name
            && sheet.trim().is_empty()
        {
            return Err(ReconcileError::InvalidConfig(
                "sheet name cannot be empty".to_string(),
            ));
        }
        if let Some(letter) = self.id_column_letter.take() {
            let trimmed = letter.trim();
            if column_letter_to_index(trimmed).is_none() {
                return Err(ReconcileError::InvalidConfig(format!(
                    "ID column must be a single letter A-Z, got '{letter}'"
                )));
            }
            self.id_column_letter = Some(trimmed.to_ascii_uppercase());
        }
        Ok(self)
    }
}

/// Converts a single column letter to a 0-based index (`A` → 0).
pub fn column_letter_to_index(letter: &str) -> Option<usize> {
    let mut chars = letter.chars();
    let first = chars.next()?;
    if chars.next().is_some() || !first.is_ascii_alphabetic() {
        return None;
    }
    Some((first.to_ascii_uppercase() as u8 - b'A') as usize)
}

/// Converts a 0-based column index to its spreadsheet letters (`0` → `A`, `26` → `AA`).
pub fn column_index_to_letter(index: usize) -> String {
    let mut remaining = index + 1;
    let mut letters = Vec::new();
    while remaining > 0 {
        let offset = (remaining - 1) % 26;
        letters.push((b'A' + offset as u8) as char);
        remaining = (remaining - 1) / 26;
    }
    letters.iter().rev().collect()
}
