mod common;

use std::collections::BTreeSet;

use common::TestWorkspace;
use id_reconcile::{
    compare::compare,
    config::CompareConfig,
    detect::{self, ColumnSource, SheetSource},
    extract::{self, FieldValue, KeyedDataset},
    workbook::{CellValue, Sheet, SourceOptions, Workbook},
};

fn load(path: &std::path::Path, config: &CompareConfig) -> KeyedDataset {
    let workbook = Workbook::open(path, &SourceOptions::default()).expect("open workbook");
    let structure = detect::detect(&workbook, config).expect("detect structure");
    extract::extract(
        &workbook,
        &structure.sheet_name,
        structure.id_column_index,
        config,
    )
    .expect("extract dataset")
}

#[test]
fn xlsx_scenario_classifies_every_identifier() {
    let workspace = TestWorkspace::new();
    let reference = workspace.write_xlsx(
        "old.xlsx",
        &[(
            "Data",
            vec![vec!["ID", "name"], vec!["A", "Jon"], vec!["B", "Sue"]],
        )],
    );
    let candidate = workspace.write_xlsx(
        "new.xlsx",
        &[(
            "Data",
            vec![vec!["ID", "name"], vec!["C", "Mia"], vec!["A", "John"]],
        )],
    );
    let config = CompareConfig::default();
    let result = compare(&load(&reference, &config), &load(&candidate, &config));

    assert_eq!(result.modified_ids(), BTreeSet::from(["A"]));
    assert_eq!(result.modified[0].row, 3);
    assert_eq!(
        result.modified[0].changes[0].old_value,
        FieldValue::from("Jon")
    );
    assert_eq!(result.new_ids(), BTreeSet::from(["C"]));
    assert_eq!(result.deleted_ids(), BTreeSet::from(["B"]));
    assert!(result.unchanged.is_empty());
}

#[test]
fn about_sheet_is_skipped_in_real_workbook() {
    let workspace = TestWorkspace::new();
    let path = workspace.write_xlsx(
        "book.xlsx",
        &[
            ("About", vec![vec!["Exported by the finance team"]]),
            (
                "Data",
                vec![
                    vec!["Name", "Customer ID"],
                    vec!["Ann", "c1"],
                    vec!["Bob", "c2"],
                    vec!["Cid", "c3"],
                    vec!["Dee", "c4"],
                ],
            ),
        ],
    );
    let workbook = Workbook::open(&path, &SourceOptions::default()).expect("open");
    assert_eq!(workbook.sheet_names(), vec!["About", "Data"]);
    let structure = detect::detect(&workbook, &CompareConfig::default()).expect("detect");
    assert_eq!(structure.sheet_name, "Data");
    assert_eq!(structure.sheet_source, SheetSource::AutoDetected);
    assert_eq!(structure.id_column_index, 1);
    assert_eq!(structure.column_source, ColumnSource::HeaderMatch);
}

#[test]
fn case_sensitivity_controls_field_changes() {
    let workspace = TestWorkspace::new();
    let reference = workspace.write("old.csv", "id,code\nr1,ABC\n");
    let candidate = workspace.write("new.csv", "id,code\nR1,abc\n");

    let insensitive = CompareConfig {
        case_sensitive: false,
        ..CompareConfig::default()
    };
    let result = compare(&load(&reference, &insensitive), &load(&candidate, &insensitive));
    assert_eq!(result.unchanged, vec!["r1".to_string()]);

    let sensitive = CompareConfig::default();
    let result = compare(&load(&reference, &sensitive), &load(&candidate, &sensitive));
    assert_eq!(result.deleted_ids(), BTreeSet::from(["r1"]));
    assert_eq!(result.new_ids(), BTreeSet::from(["R1"]));
}

#[test]
fn case_sensitive_values_on_shared_ids_are_modified() {
    let workspace = TestWorkspace::new();
    let reference = workspace.write("old.csv", "id,code\nr1,ABC\n");
    let candidate = workspace.write("new.csv", "id,code\nr1,abc\n");
    let config = CompareConfig::default();
    let result = compare(&load(&reference, &config), &load(&candidate, &config));
    assert_eq!(result.modified_ids(), BTreeSet::from(["r1"]));
}

#[test]
fn null_and_empty_string_are_equal_by_default() {
    let reference = Workbook::new(
        "old.xlsx",
        vec![Sheet::new(
            "Data",
            vec![
                vec![CellValue::Text("id".into()), CellValue::Text("note".into())],
                vec![CellValue::Text("A".into()), CellValue::Empty],
            ],
        )],
    );
    let candidate = Workbook::new(
        "new.xlsx",
        vec![Sheet::new(
            "Data",
            vec![
                vec![CellValue::Text("id".into()), CellValue::Text("note".into())],
                vec![CellValue::Text("A".into()), CellValue::Text(String::new())],
            ],
        )],
    );

    let defaults = CompareConfig::default();
    let old = extract::extract(&reference, "Data", 0, &defaults).expect("extract");
    let new = extract::extract(&candidate, "Data", 0, &defaults).expect("extract");
    assert_eq!(compare(&old, &new).unchanged, vec!["A".to_string()]);

    let include_empty = CompareConfig {
        ignore_empty_cells: false,
        ..CompareConfig::default()
    };
    let old = extract::extract(&reference, "Data", 0, &include_empty).expect("extract");
    let new = extract::extract(&candidate, "Data", 0, &include_empty).expect("extract");
    assert_eq!(compare(&old, &new).modified_ids(), BTreeSet::from(["A"]));
}

#[test]
fn duplicate_identifiers_keep_first_row() {
    let workspace = TestWorkspace::new();
    let path = workspace.write("dupes.csv", "id,qty\nX1,1\nX2,5\nX1,9\n");
    let dataset = load(&path, &CompareConfig::default());
    assert_eq!(dataset.len(), 2);
    let record = dataset.get("X1").expect("first X1");
    assert_eq!(record.row, 2);
    assert_eq!(record.get("qty"), Some(&FieldValue::from("1")));
    assert_eq!(dataset.duplicates.len(), 1);
    assert_eq!(dataset.duplicates[0].duplicate_row, 4);
}

#[test]
fn differing_column_sets_compare_missing_fields_as_empty() {
    let workspace = TestWorkspace::new();
    let reference = workspace.write("old.csv", "id,name,notes\n1,Ann,\n2,Bob,late\n");
    let candidate = workspace.write("new.csv", "id,name\n1,Ann\n2,Bob\n");
    let config = CompareConfig::default();
    let result = compare(&load(&reference, &config), &load(&candidate, &config));
    assert_eq!(result.unchanged, vec!["1".to_string()]);
    assert_eq!(result.modified_ids(), BTreeSet::from(["2"]));
    let change = &result.modified[0].changes[0];
    assert_eq!(change.field, "notes");
    assert_eq!(change.new_value, FieldValue::empty());
}

#[test]
fn one_sided_blank_column_is_unchanged_when_empties_compared() {
    let workspace = TestWorkspace::new();
    let reference = workspace.write("old.csv", "id,name,notes\n1,Ann,\n2,Bob,\n3,Cy,late\n");
    let candidate = workspace.write("new.csv", "id,name\n1,Ann\n2,Bob\n3,Cy\n");
    let config = CompareConfig {
        ignore_empty_cells: false,
        ..CompareConfig::default()
    };
    let result = compare(&load(&reference, &config), &load(&candidate, &config));
    assert_eq!(result.unchanged, vec!["1".to_string(), "2".to_string()]);
    assert_eq!(result.modified_ids(), BTreeSet::from(["3"]));
    let change = &result.modified[0].changes[0];
    assert_eq!(change.field, "notes");
    assert_eq!(change.old_value, FieldValue::from("late"));
    assert_eq!(change.new_value, FieldValue::Missing);
}

#[test]
fn falsy_identifiers_are_kept_as_records() {
    let reference = Workbook::new(
        "old.xlsx",
        vec![Sheet::new(
            "Data",
            vec![
                vec![CellValue::Text("id".into()), CellValue::Text("v".into())],
                vec![CellValue::Integer(0), CellValue::Text("zero".into())],
                vec![CellValue::Boolean(false), CellValue::Text("no".into())],
                vec![CellValue::Float(0.0), CellValue::Text("dup".into())],
                vec![CellValue::Empty, CellValue::Text("skipped".into())],
            ],
        )],
    );
    let dataset =
        extract::extract(&reference, "Data", 0, &CompareConfig::default()).expect("extract");
    assert_eq!(dataset.ids().collect::<Vec<_>>(), vec!["0", "False"]);
    assert_eq!(dataset.duplicates.len(), 1);
    assert_eq!(dataset.duplicates[0].duplicate_row, 4);
}

#[test]
fn tsv_and_semicolon_inputs_are_read() {
    let workspace = TestWorkspace::new();
    let tsv = workspace.write("snap.tsv", "id\tv\na\t1\n");
    let dataset = load(&tsv, &CompareConfig::default());
    assert_eq!(dataset.sheet_name, "snap");
    assert_eq!(dataset.get("a").and_then(|r| r.get("v")), Some(&FieldValue::from("1")));

    let semi = workspace.write("semi.csv", "id;v\nb;2\n");
    let options = SourceOptions {
        delimiter: Some(b';'),
        ..SourceOptions::default()
    };
    let workbook = Workbook::open(&semi, &options).expect("open");
    let dataset = extract::extract(&workbook, "semi", 0, &CompareConfig::default()).expect("extract");
    assert!(dataset.contains("b"));
}
