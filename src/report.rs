use std::{
    collections::{HashMap, HashSet},
    fs::File,
    io::BufWriter,
    path::Path,
};

use anyhow::{Context, Result};
use log::info;
use rust_xlsxwriter::{Color, Format, Note, Workbook as XlsxWorkbook, Worksheet, XlsxError};
use serde::Serialize;

use crate::{
    annotate::{AnnotationPlan, CellMark, DeletedListing, MarkStyle, SummaryBlock},
    compare::{ComparisonResult, FieldChange},
    error::ReconcileError,
    workbook::{CellValue, Sheet, Workbook},
};

pub const SUMMARY_SHEET_NAME: &str = "Comparison Summary";
pub const DELETED_SHEET_NAME: &str = "Deleted Records";
pub const REPORT_TITLE: &str = "EXCEL ID-BASED COMPARISON REPORT";
pub const NOTE_AUTHOR: &str = "ID-Comparator";

const MAX_SHEET_NAME_CHARS: usize = 31;
const FORBIDDEN_SHEET_CHARS: &[char] = &['[', ']', ':', '*', '?', '/', '\\'];
const DATETIME_NUM_FORMAT: &str = "yyyy-mm-dd hh:mm:ss";

/// Concrete look of each [`MarkStyle`].
struct Palette {
    changed: Format,
    new: Format,
    deleted: Format,
    title: Format,
}

impl Palette {
    fn new() -> Self {
        Self {
            changed: Format::new().set_bold().set_font_color(Color::RGB(0xCC0000)),
            new: Format::new()
                .set_bold()
                .set_font_color(Color::RGB(0x008000))
                .set_background_color(Color::RGB(0xF0FFF0)),
            deleted: Format::new()
                .set_bold()
                .set_font_color(Color::RGB(0xFF8C00))
                .set_background_color(Color::RGB(0xFFF8DC)),
            title: Format::new()
                .set_bold()
                .set_font_size(16)
                .set_font_color(Color::RGB(0x000080)),
        }
    }

    fn for_style(&self, style: MarkStyle) -> &Format {
        match style {
            MarkStyle::Changed => &self.changed,
            MarkStyle::New => &self.new,
            MarkStyle::Deleted => &self.deleted,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SummaryValue {
    Text(String),
    Count(usize),
    Flag(bool),
}

/// Label/value rows of the summary sheet below the title row.
pub fn summary_rows(summary: &SummaryBlock) -> Vec<(String, Option<SummaryValue>)> {
    let text = |value: &str| Some(SummaryValue::Text(value.to_string()));
    let stats = &summary.statistics;
    let mut rows = vec![
        (String::new(), None),
        ("Reference File:".to_string(), text(&summary.reference_file)),
        ("Comparison File:".to_string(), text(&summary.candidate_file)),
        ("Compared Sheet:".to_string(), text(&summary.sheet_name)),
        ("ID Column:".to_string(), text(&summary.id_column_label())),
        (
            "Generated:".to_string(),
            text(&summary.generated_at.format("%Y-%m-%d %H:%M:%S").to_string()),
        ),
        (String::new(), None),
        ("COMPARISON RESULTS:".to_string(), None),
        ("Modified Records:".to_string(), Some(SummaryValue::Count(stats.modified))),
        ("New Records:".to_string(), Some(SummaryValue::Count(stats.new))),
        ("Deleted Records:".to_string(), Some(SummaryValue::Count(stats.deleted))),
        ("Unchanged Records:".to_string(), Some(SummaryValue::Count(stats.unchanged))),
        ("Total Changes:".to_string(), Some(SummaryValue::Count(summary.total_changes()))),
    ];
    if stats.processing_errors > 0 {
        rows.push((
            "Processing Errors:".to_string(),
            Some(SummaryValue::Count(stats.processing_errors)),
        ));
    }
    rows.extend([
        (String::new(), None),
        ("LEGEND:".to_string(), None),
        ("Red Text = Modified values (notes show previous values)".to_string(), None),
        ("Green Text + Background = New records".to_string(), None),
        (format!("See '{DELETED_SHEET_NAME}' sheet = Removed records"), None),
        ("Normal Text = Unchanged values".to_string(), None),
        (String::new(), None),
        ("CONFIGURATION:".to_string(), None),
        ("Case Sensitive:".to_string(), Some(SummaryValue::Flag(summary.case_sensitive))),
        (
            "Ignore Empty Cells:".to_string(),
            Some(SummaryValue::Flag(summary.ignore_empty_cells)),
        ),
    ]);
    rows
}

/// Makes `name` acceptable as a worksheet name.
pub fn sanitize_sheet_name(name: &str) -> String {
    let replaced: String = name
        .chars()
        .map(|ch| if FORBIDDEN_SHEET_CHARS.contains(&ch) { '_' } else { ch })
        .collect();
    let trimmed: String = replaced
        .trim_matches('\'')
        .chars()
        .take(MAX_SHEET_NAME_CHARS)
        .collect();
    if trimmed.trim().is_empty() {
        "Sheet".to_string()
    } else {
        trimmed
    }
}

fn unique_sheet_name(base: &str, used: &mut HashSet<String>) -> String {
    let base = sanitize_sheet_name(base);
    let mut candidate = base.clone();
    let mut counter = 2usize;
    while used.contains(&candidate.to_lowercase()) {
        let suffix = format!(" ({counter})");
        let room = MAX_SHEET_NAME_CHARS.saturating_sub(suffix.chars().count());
        candidate = format!("{}{suffix}", base.chars().take(room).collect::<String>());
        counter += 1;
    }
    used.insert(candidate.to_lowercase());
    candidate
}

pub fn write_report(
    plan: &AnnotationPlan,
    candidate: &Workbook,
    output: &Path,
) -> Result<(), ReconcileError> {
    info!("Creating comparison report");
    let mut workbook =
        build_report(plan, candidate).map_err(|err| ReconcileError::render(output, err))?;
    workbook
        .save(output)
        .map_err(|err| ReconcileError::render(output, err))?;
    info!("Report saved: {output:?}");
    Ok(())
}

pub fn build_report(plan: &AnnotationPlan, candidate: &Workbook) -> Result<XlsxWorkbook, XlsxError> {
    let palette = Palette::new();
    let mut workbook = XlsxWorkbook::new();

    let mut used: HashSet<String> = HashSet::new();
    let candidate_names: Vec<String> = candidate
        .sheets()
        .iter()
        .map(|sheet| unique_sheet_name(sheet.name(), &mut used))
        .collect();
    let summary_name = unique_sheet_name(SUMMARY_SHEET_NAME, &mut used);
    let deleted_name = unique_sheet_name(DELETED_SHEET_NAME, &mut used);

    write_summary_sheet(workbook.add_worksheet(), &summary_name, &plan.summary, &palette)?;

    let marks: HashMap<(usize, usize), &CellMark> = plan
        .marks
        .iter()
        .map(|mark| ((mark.row, mark.column), mark))
        .collect();
    let mut marked_changes = 0usize;
    let mut marked_new = 0usize;
    for (sheet, name) in candidate.sheets().iter().zip(&candidate_names) {
        let worksheet = workbook.add_worksheet();
        worksheet.set_name(name)?;
        if sheet.name() == plan.sheet_name {
            write_sheet_values(worksheet, sheet, &marks, &palette)?;
            marked_changes = plan.marks_with_style(MarkStyle::Changed).count();
            marked_new = plan
                .marks_with_style(MarkStyle::New)
                .filter(|mark| mark.note.is_some())
                .count();
        } else {
            write_sheet_values(worksheet, sheet, &HashMap::new(), &palette)?;
        }
    }
    info!("Marked {marked_changes} changed fields");
    info!("Marked {marked_new} new records");

    if let Some(listing) = &plan.deleted {
        write_deleted_sheet(workbook.add_worksheet(), &deleted_name, listing, &palette)?;
    }
    Ok(workbook)
}

fn write_summary_sheet(
    worksheet: &mut Worksheet,
    name: &str,
    summary: &SummaryBlock,
    palette: &Palette,
) -> Result<(), XlsxError> {
    worksheet.set_name(name)?;
    worksheet.write_string_with_format(0, 0, REPORT_TITLE, &palette.title)?;
    for (idx, (label, value)) in summary_rows(summary).into_iter().enumerate() {
        let row = idx as u32 + 1;
        if !label.is_empty() {
            worksheet.write_string(row, 0, &label)?;
        }
        match value {
            Some(SummaryValue::Text(text)) => {
                worksheet.write_string(row, 1, &text)?;
            }
            Some(SummaryValue::Count(count)) => {
                worksheet.write_number(row, 1, count as f64)?;
            }
            Some(SummaryValue::Flag(flag)) => {
                worksheet.write_boolean(row, 1, flag)?;
            }
            None => {}
        }
    }
    worksheet.set_column_width(0, 30)?;
    worksheet.set_column_width(1, 40)?;
    Ok(())
}

fn write_sheet_values(
    worksheet: &mut Worksheet,
    sheet: &Sheet,
    marks: &HashMap<(usize, usize), &CellMark>,
    palette: &Palette,
) -> Result<(), XlsxError> {
    let mut written: HashSet<(usize, usize)> = HashSet::new();
    for (row_idx, row) in sheet.rows().iter().enumerate() {
        for (col_idx, value) in row.iter().enumerate() {
            let position = (row_idx + 1, col_idx + 1);
            let format = marks.get(&position).map(|mark| palette.for_style(mark.style));
            write_cell(worksheet, row_idx as u32, col_idx as u16, value, format)?;
            written.insert(position);
        }
    }
    for (&(row, column), mark) in marks {
        if !written.contains(&(row, column)) {
            worksheet.write_blank(
                (row - 1) as u32,
                (column - 1) as u16,
                palette.for_style(mark.style),
            )?;
        }
        if let Some(text) = &mark.note {
            let note = Note::new(text).set_author(NOTE_AUTHOR);
            worksheet.insert_note((row - 1) as u32, (column - 1) as u16, &note)?;
        }
    }
    Ok(())
}

fn write_cell(
    worksheet: &mut Worksheet,
    row: u32,
    col: u16,
    value: &CellValue,
    format: Option<&Format>,
) -> Result<(), XlsxError> {
    match (value, format) {
        (CellValue::Empty, Some(format)) => {
            worksheet.write_blank(row, col, format)?;
        }
        (CellValue::Empty, None) => {}
        (CellValue::Text(text) | CellValue::Error(text), Some(format)) => {
            worksheet.write_string_with_format(row, col, text, format)?;
        }
        (CellValue::Text(text) | CellValue::Error(text), None) => {
            worksheet.write_string(row, col, text)?;
        }
        (CellValue::Integer(number), format) => {
            write_number(worksheet, row, col, *number as f64, format)?;
        }
        (CellValue::Float(number), format) => {
            write_number(worksheet, row, col, *number, format)?;
        }
        (CellValue::Boolean(flag), Some(format)) => {
            worksheet.write_boolean_with_format(row, col, *flag, format)?;
        }
        (CellValue::Boolean(flag), None) => {
            worksheet.write_boolean(row, col, *flag)?;
        }
        (CellValue::DateTime(datetime), format) => {
            let format = format
                .cloned()
                .unwrap_or_else(Format::new)
                .set_num_format(DATETIME_NUM_FORMAT);
            worksheet.write_datetime_with_format(row, col, datetime, &format)?;
        }
    }
    Ok(())
}

fn write_number(
    worksheet: &mut Worksheet,
    row: u32,
    col: u16,
    number: f64,
    format: Option<&Format>,
) -> Result<(), XlsxError> {
    match format {
        Some(format) => worksheet.write_number_with_format(row, col, number, format)?,
        None => worksheet.write_number(row, col, number)?,
    };
    Ok(())
}

fn write_deleted_sheet(
    worksheet: &mut Worksheet,
    name: &str,
    listing: &DeletedListing,
    palette: &Palette,
) -> Result<(), XlsxError> {
    worksheet.set_name(name)?;
    worksheet.write_string(0, 0, &listing.title)?;
    for (col, header) in listing.headers.iter().enumerate() {
        worksheet.write_string(2, col as u16, header)?;
    }
    for (idx, values) in listing.rows.iter().enumerate() {
        let row = idx as u32 + 3;
        for (col, value) in values.iter().enumerate() {
            let style = palette.for_style(MarkStyle::Deleted);
            if value.is_empty() {
                worksheet.write_blank(row, col as u16, style)?;
            } else {
                worksheet.write_string_with_format(row, col as u16, value, style)?;
            }
        }
    }
    Ok(())
}

#[derive(Debug, Serialize)]
struct ModifiedEntry<'a> {
    id: &'a str,
    row: usize,
    changes: &'a [FieldChange],
}

#[derive(Debug, Serialize)]
struct RowEntry<'a> {
    id: &'a str,
    row: usize,
}

#[derive(Debug, Serialize)]
struct JsonSummary<'a> {
    summary: &'a SummaryBlock,
    modified: Vec<ModifiedEntry<'a>>,
    new: Vec<RowEntry<'a>>,
    deleted: Vec<RowEntry<'a>>,
    warnings: &'a [String],
}

/// Writes a machine-readable summary of the comparison as pretty JSON.
pub fn write_json_summary(
    path: &Path,
    plan: &AnnotationPlan,
    result: &ComparisonResult,
    warnings: &[String],
) -> Result<()> {
    let document = JsonSummary {
        summary: &plan.summary,
        modified: result
            .modified
            .iter()
            .map(|record| ModifiedEntry {
                id: &record.id,
                row: record.row,
                changes: &record.changes,
            })
            .collect(),
        new: result
            .new
            .iter()
            .map(|record| RowEntry {
                id: &record.id,
                row: record.row,
            })
            .collect(),
        deleted: result
            .deleted
            .iter()
            .map(|record| RowEntry {
                id: &record.id,
                row: record.row,
            })
            .collect(),
        warnings,
    };
    let file = File::create(path).with_context(|| format!("Creating JSON summary {path:?}"))?;
    serde_json::to_writer_pretty(BufWriter::new(file), &document).context("Writing JSON summary")
}
