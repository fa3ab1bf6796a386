use chrono::NaiveDateTime;
use serde::Serialize;

use crate::{
    compare::{ComparisonResult, Statistics},
    config::CompareConfig,
    extract::KeyedDataset,
    io_utils,
};

pub const DELETED_ID_HEADER: &str = "ID";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MarkStyle {
    Changed,
    New,
    Deleted,
}

/// Style and optional note for one cell, addressed 1-based.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CellMark {
    pub row: usize,
    pub column: usize,
    pub style: MarkStyle,
    pub note: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SummaryBlock {
    pub reference_file: String,
    pub candidate_file: String,
    pub sheet_name: String,
    pub id_column_letter: String,
    pub id_column_header: String,
    pub generated_at: NaiveDateTime,
    pub statistics: Statistics,
    pub case_sensitive: bool,
    pub ignore_empty_cells: bool,
}

impl SummaryBlock {
    pub fn id_column_label(&self) -> String {
        format!("{} ({})", self.id_column_letter, self.id_column_header)
    }

    pub fn total_changes(&self) -> usize {
        self.statistics.total_changes()
    }
}

/// Deleted records, one row per identifier, every row styled [`MarkStyle::Deleted`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeletedListing {
    pub title: String,
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AnnotationPlan {
    /// Candidate sheet the marks apply to.
    pub sheet_name: String,
    pub marks: Vec<CellMark>,
    pub summary: SummaryBlock,
    pub deleted: Option<DeletedListing>,
}

impl AnnotationPlan {
    pub fn marks_with_style(&self, style: MarkStyle) -> impl Iterator<Item = &CellMark> {
        self.marks.iter().filter(move |mark| mark.style == style)
    }

    pub fn mark_at(&self, row: usize, column: usize) -> Option<&CellMark> {
        self.marks
            .iter()
            .rev()
            .find(|mark| mark.row == row && mark.column == column)
    }
}

pub fn plan(
    reference: &KeyedDataset,
    candidate: &KeyedDataset,
    result: &ComparisonResult,
    config: &CompareConfig,
    generated_at: NaiveDateTime,
) -> AnnotationPlan {
    let mut marks = Vec::new();

    for modified in &result.modified {
        for (col_idx, header) in candidate.headers.iter().enumerate() {
            let Some(change) = modified.change_for(header) else {
                continue;
            };
            let note = (!change.old_value.is_empty())
                .then(|| format!("Previous: {}", change.old_value));
            marks.push(CellMark {
                row: modified.row,
                column: col_idx + 1,
                style: MarkStyle::Changed,
                note,
            });
        }
    }

    for added in &result.new {
        for col_idx in 0..candidate.headers.len() {
            let note = (col_idx == candidate.id_column_index)
                .then(|| format!("New record: {}", added.id));
            marks.push(CellMark {
                row: added.row,
                column: col_idx + 1,
                style: MarkStyle::New,
                note,
            });
        }
    }

    let summary = SummaryBlock {
        reference_file: io_utils::display_name(reference.source_path()),
        candidate_file: io_utils::display_name(candidate.source_path()),
        sheet_name: candidate.sheet_name.clone(),
        id_column_letter: candidate.id_column_letter(),
        id_column_header: candidate.id_header().to_string(),
        generated_at,
        statistics: result.statistics(),
        case_sensitive: config.case_sensitive,
        ignore_empty_cells: config.ignore_empty_cells,
    };

    AnnotationPlan {
        sheet_name: candidate.sheet_name.clone(),
        marks,
        summary,
        deleted: deleted_listing(reference, result),
    }
}

fn deleted_listing(reference: &KeyedDataset, result: &ComparisonResult) -> Option<DeletedListing> {
    if result.deleted.is_empty() {
        return None;
    }
    let id_header = reference.id_header();
    let value_headers: Vec<&String> = reference
        .headers
        .iter()
        .filter(|header| header.as_str() != id_header)
        .collect();

    let mut headers = vec![DELETED_ID_HEADER.to_string()];
    headers.extend(value_headers.iter().map(|header| header.to_string()));

    let rows = result
        .deleted
        .iter()
        .map(|deleted| {
            let mut row = vec![deleted.id.clone()];
            row.extend(value_headers.iter().map(|header| {
                deleted
                    .record
                    .get(header)
                    .map(|value| value.to_string())
                    .unwrap_or_default()
            }));
            row
        })
        .collect();

    Some(DeletedListing {
        title: format!(
            "Records deleted from {}",
            io_utils::display_name(reference.source_path())
        ),
        headers,
        rows,
    })
}
