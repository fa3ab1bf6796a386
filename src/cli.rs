use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;

use crate::config::CompareConfig;

#[derive(Debug, Parser)]
#[command(
    author,
    version,
    about = "Compare two spreadsheets by unique identifier and highlight what changed",
    long_about = None,
    after_help = "Examples:\n  id-reconcile old.xlsx new.xlsx\n  id-reconcile old.xlsx new.xlsx --sheet Data --id-column A\n  id-reconcile old.xlsx new.xlsx --output comparison_report.xlsx"
)]
pub struct Cli {
    /// Reference (original) spreadsheet
    pub reference: PathBuf,
    /// Candidate (new) spreadsheet compared against the reference
    pub candidate: PathBuf,
    /// Output report path (.xlsx); generated from the candidate name if omitted
    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,
    /// Sheet name to compare (auto-detect if not specified)
    #[arg(short = 's', long = "sheet")]
    pub sheet: Option<String>,
    /// ID column letter (A, B, C, ...); auto-detect if not specified
    #[arg(short = 'c', long = "id-column")]
    pub id_column: Option<String>,
    /// 0-based ID column index; takes precedence over --id-column
    #[arg(long = "id-column-index")]
    pub id_column_index: Option<usize>,
    /// Perform case-insensitive comparison
    #[arg(long = "case-insensitive")]
    pub case_insensitive: bool,
    /// Treat cells without a value as different from empty text
    #[arg(long = "include-empty")]
    pub include_empty: bool,
    /// YAML file with comparison options; flags override its values
    #[arg(long = "config")]
    pub config: Option<PathBuf>,
    /// Delimiter for CSV/TSV inputs (supports ',', 'tab', ';', '|')
    #[arg(long, value_parser = parse_delimiter)]
    pub delimiter: Option<u8>,
    /// Character encoding of CSV/TSV inputs (defaults to utf-8)
    #[arg(long = "input-encoding")]
    pub input_encoding: Option<String>,
    /// Also write a JSON summary of the comparison to this path
    #[arg(long = "json")]
    pub json: Option<PathBuf>,
    /// Print every field change as a table on stdout
    #[arg(long = "show-changes")]
    pub show_changes: bool,
    /// Only log warnings and errors
    #[arg(short = 'q', long = "quiet", conflicts_with = "verbose")]
    pub quiet: bool,
    /// Log debug detail
    #[arg(short = 'v', long = "verbose")]
    pub verbose: bool,
}

impl Cli {
    /// Options from `--config` (if any) overlaid with command-line flags.
    pub fn compare_config(&self) -> Result<CompareConfig> {
        let mut config = match &self.config {
            Some(path) => CompareConfig::load(path)?,
            None => CompareConfig::default(),
        };
        if let Some(sheet) = &self.sheet {
            config.sheet_name = Some(sheet.clone());
        }
        if let Some(letter) = &self.id_column {
            config.id_column_letter = Some(letter.to_ascii_uppercase());
        }
        if let Some(index) = self.id_column_index {
            config.id_column_index = Some(index);
        }
        if self.case_insensitive {
            config.case_sensitive = false;
        }
        if self.include_empty {
            config.ignore_empty_cells = false;
        }
        Ok(config)
    }
}

pub fn parse_delimiter(value: &str) -> Result<u8, String> {
    match value {
        "tab" | "\t" => Ok(b'\t'),
        "comma" | "," => Ok(b','),
        "|" | "pipe" => Ok(b'|'),
        ";" | "semicolon" => Ok(b';'),
        other => {
            let mut chars = other.chars();
            let first = chars
                .next()
                .ok_or_else(|| "Delimiter cannot be empty".to_string())?;
            if chars.next().is_some() {
                return Err("Delimiter must be a single character".to_string());
            }
            if !first.is_ascii() {
                return Err("Delimiter must be ASCII".to_string());
            }
            Ok(first as u8)
        }
    }
}
