use std::borrow::Cow;
use std::fmt::Write as _;

use crate::compare::ComparisonResult;

pub const CHANGE_HEADERS: [&str; 4] = ["id", "field", "old", "new"];

/// One row per field change, in comparison order.
pub fn change_rows(result: &ComparisonResult) -> Vec<Vec<String>> {
    result
        .modified
        .iter()
        .flat_map(|record| {
            record.changes.iter().map(move |change| {
                vec![
                    record.id.clone(),
                    change.field.clone(),
                    change.old_value.to_string(),
                    change.new_value.to_string(),
                ]
            })
        })
        .collect()
}

/// Left-aligned columns separated by two spaces, with a dashed rule under the header.
pub fn render_table(headers: &[&str], rows: &[Vec<String>]) -> String {
    let mut widths: Vec<usize> = headers.iter().map(|h| h.chars().count().max(3)).collect();
    for row in rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(clean(cell).chars().count());
        }
    }

    let mut output = String::new();
    let header_cells: Vec<Cow<'_, str>> = headers.iter().map(|h| Cow::Borrowed(*h)).collect();
    push_line(&mut output, &header_cells, &widths);
    let rule: Vec<Cow<'_, str>> = widths.iter().map(|w| Cow::Owned("-".repeat(*w))).collect();
    push_line(&mut output, &rule, &widths);
    for row in rows {
        let cells: Vec<Cow<'_, str>> = row.iter().map(|cell| clean(cell)).collect();
        push_line(&mut output, &cells, &widths);
    }
    output
}

pub fn print_table(headers: &[&str], rows: &[Vec<String>]) {
    print!("{}", render_table(headers, rows));
}

fn push_line(output: &mut String, cells: &[Cow<'_, str>], widths: &[usize]) {
    let mut line = String::new();
    for (idx, (cell, &width)) in cells.iter().zip(widths).enumerate() {
        if idx > 0 {
            line.push_str("  ");
        }
        let _ = write!(line, "{cell:<width$}");
    }
    let _ = writeln!(output, "{}", line.trim_end());
}

fn clean(value: &str) -> Cow<'_, str> {
    if value.contains(['\n', '\r', '\t']) {
        Cow::Owned(value.replace(['\n', '\r', '\t'], " "))
    } else {
        Cow::Borrowed(value)
    }
}
