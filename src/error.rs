use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReconcileError {
    #[error("File not found: {0:?}")]
    InputNotFound(PathBuf),

    #[error("Could not detect sheet/identifier structure in {path:?}: {reason}")]
    StructureNotFound { path: PathBuf, reason: String },

    #[error("Unable to read {path:?}: {message}")]
    SourceUnreadable { path: PathBuf, message: String },

    #[error("Failed to write report {path:?}: {message}")]
    RenderFailure { path: PathBuf, message: String },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl ReconcileError {
    pub fn unreadable(path: impl Into<PathBuf>, message: impl ToString) -> Self {
        ReconcileError::SourceUnreadable {
            path: path.into(),
            message: message.to_string(),
        }
    }

    pub fn render(path: impl Into<PathBuf>, message: impl ToString) -> Self {
        ReconcileError::RenderFailure {
            path: path.into(),
            message: message.to_string(),
        }
    }
}

/// A single cell whose content could not be interpreted as text.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Row {row} column {column}: {message}")]
pub struct CellReadError {
    pub row: usize,
    pub column: usize,
    pub message: String,
}

/// A data row whose identifier had already been seen earlier in the sheet.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Duplicate ID found: {id} at row {duplicate_row} (keeping row {first_row})")]
pub struct DuplicateIdentifier {
    pub id: String,
    pub first_row: usize,
    pub duplicate_row: usize,
}

/// Failure while classifying one identifier; the identifier is skipped.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Error processing ID {id}: {message}")]
pub struct RecordProcessingError {
    pub id: String,
    pub message: String,
}

/// Reference and candidate sheets do not share the same header row.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error(
    "Files have different column structures ({reference_columns} vs {candidate_columns} columns)"
)]
pub struct StructuralMismatch {
    pub reference_columns: usize,
    pub candidate_columns: usize,
    pub only_in_reference: Vec<String>,
    pub only_in_candidate: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_identifier_message_names_both_rows() {
        let warning = DuplicateIdentifier {
            id: "x1".to_string(),
            first_row: 2,
            duplicate_row: 7,
        };
        assert_eq!(
            warning.to_string(),
            "Duplicate ID found: x1 at row 7 (keeping row 2)"
        );
    }

    #[test]
    fn structure_error_includes_reason() {
        let err = ReconcileError::StructureNotFound {
            path: PathBuf::from("book.xlsx"),
            reason: "workbook has no sheets".to_string(),
        };
        assert!(err.to_string().contains("workbook has no sheets"));
    }
}
