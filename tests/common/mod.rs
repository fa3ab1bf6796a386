#![allow(dead_code)]

use std::collections::HashMap;
use std::fs::File;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use calamine::{Reader, open_workbook_auto};
use tempfile::{TempDir, tempdir};

/// Scratch directory helper that cleans up files automatically on drop.
pub struct TestWorkspace {
    temp_dir: TempDir,
}

impl TestWorkspace {
    /// Creates a fresh scratch directory for the current test case.
    pub fn new() -> Self {
        Self {
            temp_dir: tempdir().expect("temp dir"),
        }
    }

    /// Returns the root path for all files owned by this workspace.
    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Writes `contents` into a file under the workspace and returns the path.
    pub fn write(&self, name: &str, contents: &str) -> PathBuf {
        let path = self.temp_dir.path().join(name);
        let mut file = File::create(&path).expect("create temp file");
        file.write_all(contents.as_bytes())
            .expect("write temp file contents");
        path
    }

    /// Writes an `.xlsx` workbook with string cells; `""` leaves the cell unset.
    pub fn write_xlsx(&self, name: &str, sheets: &[(&str, Vec<Vec<&str>>)]) -> PathBuf {
        let mut workbook = rust_xlsxwriter::Workbook::new();
        for (sheet_name, rows) in sheets {
            let worksheet = workbook.add_worksheet();
            worksheet.set_name(*sheet_name).expect("sheet name");
            for (row_idx, row) in rows.iter().enumerate() {
                for (col_idx, value) in row.iter().enumerate() {
                    if value.is_empty() {
                        continue;
                    }
                    worksheet
                        .write_string(row_idx as u32, col_idx as u16, *value)
                        .expect("write cell");
                }
            }
        }
        let path = self.temp_dir.path().join(name);
        workbook.save(&path).expect("save workbook");
        path
    }
}

/// Sheet names of a workbook on disk, in order.
pub fn sheet_names(path: &Path) -> Vec<String> {
    let workbook = open_workbook_auto(path).expect("open workbook");
    workbook.sheet_names()
}

/// Displayed values of a sheet, row by row, starting at its first used cell.
pub fn read_sheet(path: &Path, sheet: &str) -> Vec<Vec<String>> {
    let mut workbook = open_workbook_auto(path).expect("open workbook");
    let range = workbook.worksheet_range(sheet).expect("sheet exists");
    range
        .rows()
        .map(|row| row.iter().map(|cell| cell.to_string()).collect())
        .collect()
}

/// Finds the value next to `label` in column A of the summary sheet.
pub fn summary_value(rows: &[Vec<String>], label: &str) -> Option<String> {
    rows.iter()
        .find(|row| row.first().map(String::as_str) == Some(label))
        .and_then(|row| row.get(1).cloned())
}

/// Raw XML of one part inside an `.xlsx` package, e.g. `xl/comments1.xml`.
pub fn package_part(path: &Path, part: &str) -> String {
    let file = File::open(path).expect("open package");
    let mut archive = zip::ZipArchive::new(file).expect("read zip");
    let mut entry = archive.by_name(part).expect("part exists");
    let mut xml = String::new();
    entry.read_to_string(&mut xml).expect("read part");
    xml
}

/// Cell notes of a worksheet part, keyed by cell reference with their text runs joined.
pub fn notes_by_cell(comments_xml: &str) -> HashMap<String, String> {
    let doc = roxmltree::Document::parse(comments_xml).expect("parse comments");
    doc.descendants()
        .filter(|node| node.tag_name().name() == "comment")
        .filter_map(|node| {
            let reference = node.attribute("ref")?.to_string();
            let text: String = node.descendants().filter_map(|d| d.text()).collect();
            Some((reference, text))
        })
        .collect()
}

/// Style index of every written cell in a worksheet part; `0` when unstyled.
pub fn cell_styles(sheet_xml: &str) -> HashMap<String, u32> {
    let doc = roxmltree::Document::parse(sheet_xml).expect("parse worksheet");
    doc.descendants()
        .filter(|node| node.tag_name().name() == "c")
        .filter_map(|node| {
            let reference = node.attribute("r")?.to_string();
            let style = node
                .attribute("s")
                .and_then(|s| s.parse().ok())
                .unwrap_or(0);
            Some((reference, style))
        })
        .collect()
}
