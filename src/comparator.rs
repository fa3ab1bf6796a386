use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{Local, NaiveDateTime};
use log::{info, warn};

use crate::{
    annotate::{self, AnnotationPlan},
    cli::Cli,
    compare::{self, ComparisonResult, Statistics},
    config::CompareConfig,
    detect,
    error::{ReconcileError, StructuralMismatch},
    extract::{self, KeyedDataset},
    io_utils, report, table,
    workbook::{SourceOptions, Workbook},
};

/// Everything a finished run produced.
#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub report_path: PathBuf,
    pub result: ComparisonResult,
    pub plan: AnnotationPlan,
    pub mismatch: Option<StructuralMismatch>,
    pub warnings: Vec<String>,
}

impl RunOutcome {
    pub fn statistics(&self) -> Statistics {
        self.result.statistics()
    }
}

pub fn execute(cli: &Cli) -> Result<()> {
    let config = cli.compare_config()?;
    let source = SourceOptions {
        delimiter: cli.delimiter,
        encoding: io_utils::resolve_encoding(cli.input_encoding.as_deref())?,
    };
    let outcome = compare_files(
        &cli.reference,
        &cli.candidate,
        cli.output.as_deref(),
        &config,
        &source,
    )?;

    if let Some(path) = &cli.json {
        report::write_json_summary(path, &outcome.plan, &outcome.result, &outcome.warnings)?;
        info!("JSON summary written to {path:?}");
    }
    if cli.show_changes {
        table::print_table(&table::CHANGE_HEADERS, &table::change_rows(&outcome.result));
    }
    log_final_summary(&cli.reference, &cli.candidate, &outcome);
    Ok(())
}

pub fn compare_files(
    reference: &Path,
    candidate: &Path,
    output: Option<&Path>,
    config: &CompareConfig,
    source: &SourceOptions,
) -> Result<RunOutcome> {
    let config = config.clone().validate()?;
    for path in [reference, candidate] {
        if !path.exists() {
            return Err(ReconcileError::InputNotFound(path.to_path_buf()).into());
        }
    }

    let mut warnings = Vec::new();
    let (_, reference_data) = load_dataset(reference, &config, source, &mut warnings)
        .with_context(|| format!("Could not extract data from {reference:?}"))?;
    let (candidate_book, candidate_data) = load_dataset(candidate, &config, source, &mut warnings)
        .with_context(|| format!("Could not extract data from {candidate:?}"))?;

    let mismatch = structural_mismatch(&reference_data.headers, &candidate_data.headers);
    if let Some(mismatch) = &mismatch {
        warn!("WARNING: {mismatch}");
        if !mismatch.only_in_reference.is_empty() {
            warn!("Only in reference: {:?}", mismatch.only_in_reference);
        }
        if !mismatch.only_in_candidate.is_empty() {
            warn!("Only in candidate: {:?}", mismatch.only_in_candidate);
        }
        warnings.push(mismatch.to_string());
    }

    let result = compare::compare(&reference_data, &candidate_data);
    warnings.extend(result.errors.iter().map(ToString::to_string));

    let now = Local::now().naive_local();
    let report_path = output
        .map(Path::to_path_buf)
        .unwrap_or_else(|| default_output_path(candidate, now));
    let plan = annotate::plan(&reference_data, &candidate_data, &result, &config, now);
    report::write_report(&plan, &candidate_book, &report_path)?;

    Ok(RunOutcome {
        report_path,
        result,
        plan,
        mismatch,
        warnings,
    })
}

fn load_dataset(
    path: &Path,
    config: &CompareConfig,
    source: &SourceOptions,
    warnings: &mut Vec<String>,
) -> Result<(Workbook, KeyedDataset), ReconcileError> {
    info!("Reading {}...", io_utils::display_name(path));
    let workbook = Workbook::open(path, source)?;
    let structure = detect::detect(&workbook, config)?;
    let dataset = extract::extract(
        &workbook,
        &structure.sheet_name,
        structure.id_column_index,
        config,
    )?;

    let name = io_utils::display_name(path);
    warnings.extend(
        structure
            .warnings
            .into_iter()
            .map(|warning| format!("{name}: {warning}")),
    );
    warnings.extend(
        dataset
            .duplicates
            .iter()
            .map(|duplicate| format!("{name}: {duplicate}")),
    );
    if !dataset.cell_errors.is_empty() {
        warnings.push(format!(
            "{name}: {} cell reading errors (values set to empty)",
            dataset.cell_errors.len()
        ));
    }
    Ok((workbook, dataset))
}

/// `None` when both header rows are identical, in order.
pub fn structural_mismatch(reference: &[String], candidate: &[String]) -> Option<StructuralMismatch> {
    if reference == candidate {
        return None;
    }
    Some(StructuralMismatch {
        reference_columns: reference.len(),
        candidate_columns: candidate.len(),
        only_in_reference: reference
            .iter()
            .filter(|header| !candidate.contains(header))
            .cloned()
            .collect(),
        only_in_candidate: candidate
            .iter()
            .filter(|header| !reference.contains(header))
            .cloned()
            .collect(),
    })
}

/// `comparison_<candidate-stem>_<YYYYMMDD_HHMMSS>.xlsx` in the working directory.
pub fn default_output_path(candidate: &Path, now: NaiveDateTime) -> PathBuf {
    PathBuf::from(format!(
        "comparison_{}_{}.xlsx",
        io_utils::base_name(candidate),
        now.format("%Y%m%d_%H%M%S")
    ))
}

fn log_final_summary(reference: &Path, candidate: &Path, outcome: &RunOutcome) {
    let stats = outcome.statistics();
    info!("Comparison completed");
    if stats.total_changes() == 0 {
        info!("No differences found - files are identical");
    } else {
        info!(
            "Found {} total changes: {} modified, {} new, {} deleted",
            stats.total_changes(),
            stats.modified,
            stats.new,
            stats.deleted
        );
    }
    info!("Reference: {}", io_utils::display_name(reference));
    info!("Comparison: {}", io_utils::display_name(candidate));
    info!("Report: {}", outcome.report_path.display());
}
