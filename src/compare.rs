use std::collections::BTreeSet;

use itertools::Itertools;
use log::{info, warn};
use serde::Serialize;

use crate::{
    error::RecordProcessingError,
    extract::{FieldValue, KeyedDataset, NormalizationPolicy, Record},
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldChange {
    pub field: String,
    pub old_value: FieldValue,
    pub new_value: FieldValue,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModifiedRecord {
    pub id: String,
    /// Row of the record in the candidate sheet.
    pub row: usize,
    pub changes: Vec<FieldChange>,
    pub record: Record,
}

impl ModifiedRecord {
    pub fn change_for(&self, field: &str) -> Option<&FieldChange> {
        self.changes.iter().find(|change| change.field == field)
    }
}

/// A record present on one side only, with its row on that side.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassifiedRecord {
    pub id: String,
    pub row: usize,
    pub record: Record,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classification {
    Modified(ModifiedRecord),
    New(ClassifiedRecord),
    Deleted(ClassifiedRecord),
    Unchanged(String),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Statistics {
    pub reference_records: usize,
    pub candidate_records: usize,
    pub modified: usize,
    pub new: usize,
    pub deleted: usize,
    pub unchanged: usize,
    pub processing_errors: usize,
}

impl Statistics {
    pub fn total_changes(&self) -> usize {
        self.modified + self.new + self.deleted
    }
}

#[derive(Debug, Clone, Default)]
pub struct ComparisonResult {
    pub modified: Vec<ModifiedRecord>,
    pub new: Vec<ClassifiedRecord>,
    pub deleted: Vec<ClassifiedRecord>,
    pub unchanged: Vec<String>,
    pub errors: Vec<RecordProcessingError>,
    reference_records: usize,
    candidate_records: usize,
}

impl ComparisonResult {
    pub fn statistics(&self) -> Statistics {
        Statistics {
            reference_records: self.reference_records,
            candidate_records: self.candidate_records,
            modified: self.modified.len(),
            new: self.new.len(),
            deleted: self.deleted.len(),
            unchanged: self.unchanged.len(),
            processing_errors: self.errors.len(),
        }
    }

    pub fn modified_ids(&self) -> BTreeSet<&str> {
        self.modified.iter().map(|r| r.id.as_str()).collect()
    }

    pub fn new_ids(&self) -> BTreeSet<&str> {
        self.new.iter().map(|r| r.id.as_str()).collect()
    }

    pub fn deleted_ids(&self) -> BTreeSet<&str> {
        self.deleted.iter().map(|r| r.id.as_str()).collect()
    }

    pub fn unchanged_ids(&self) -> BTreeSet<&str> {
        self.unchanged.iter().map(String::as_str).collect()
    }

    fn push(&mut self, classification: Classification) {
        match classification {
            Classification::Modified(record) => self.modified.push(record),
            Classification::New(record) => self.new.push(record),
            Classification::Deleted(record) => self.deleted.push(record),
            Classification::Unchanged(id) => self.unchanged.push(id),
        }
    }
}

pub fn compare(reference: &KeyedDataset, candidate: &KeyedDataset) -> ComparisonResult {
    info!("Comparing datasets");
    info!("File 1: {} records", reference.len());
    info!("File 2: {} records", candidate.len());

    let field_order: Vec<String> = reference
        .headers
        .iter()
        .chain(candidate.headers.iter())
        .unique()
        .cloned()
        .collect();
    let all_ids: Vec<&str> = reference
        .ids()
        .chain(candidate.ids().filter(|id| !reference.contains(id)))
        .collect();
    info!("Total unique IDs: {}", all_ids.len());

    let mut result = ComparisonResult {
        reference_records: reference.len(),
        candidate_records: candidate.len(),
        ..ComparisonResult::default()
    };
    for id in all_ids {
        match classify(
            id,
            reference.get(id),
            candidate.get(id),
            &field_order,
            &reference.policy,
        ) {
            Ok(classification) => result.push(classification),
            Err(err) => {
                warn!("{err}");
                result.errors.push(err);
            }
        }
    }

    let stats = result.statistics();
    info!("Modified records: {}", stats.modified);
    info!("New records: {}", stats.new);
    info!("Deleted records: {}", stats.deleted);
    info!("Unchanged records: {}", stats.unchanged);
    if stats.processing_errors > 0 {
        warn!("Processing errors: {}", stats.processing_errors);
    }
    result
}

/// Classifies one identifier given its record on each side.
pub fn classify(
    id: &str,
    reference: Option<&Record>,
    candidate: Option<&Record>,
    field_order: &[String],
    policy: &NormalizationPolicy,
) -> Result<Classification, RecordProcessingError> {
    for record in [reference, candidate].into_iter().flatten() {
        if record.id != id {
            return Err(RecordProcessingError {
                id: id.to_string(),
                message: format!("record is keyed as '{}' but carries id '{}'", id, record.id),
            });
        }
    }
    match (reference, candidate) {
        (Some(old), Some(new)) => {
            let changes = diff_records(old, new, field_order, policy);
            if changes.is_empty() {
                Ok(Classification::Unchanged(id.to_string()))
            } else {
                Ok(Classification::Modified(ModifiedRecord {
                    id: id.to_string(),
                    row: new.row,
                    changes,
                    record: new.clone(),
                }))
            }
        }
        (None, Some(new)) => Ok(Classification::New(ClassifiedRecord {
            id: id.to_string(),
            row: new.row,
            record: new.clone(),
        })),
        (Some(old), None) => Ok(Classification::Deleted(ClassifiedRecord {
            id: id.to_string(),
            row: old.row,
            record: old.clone(),
        })),
        (None, None) => Err(RecordProcessingError {
            id: id.to_string(),
            message: "identifier has no record in either dataset".to_string(),
        }),
    }
}

/// Field-level differences over the union of both records' fields. A field
/// missing on one side compares as a blank cell under `policy`.
pub fn diff_records(
    old: &Record,
    new: &Record,
    field_order: &[String],
    policy: &NormalizationPolicy,
) -> Vec<FieldChange> {
    let extra: BTreeSet<&String> = old
        .fields
        .keys()
        .chain(new.fields.keys())
        .filter(|field| !field_order.contains(field))
        .collect();
    let absent = policy.blank_value();

    field_order
        .iter()
        .chain(extra)
        .filter(|field| old.fields.contains_key(*field) || new.fields.contains_key(*field))
        .filter_map(|field| {
            let old_value = old.get(field).unwrap_or(&absent);
            let new_value = new.get(field).unwrap_or(&absent);
            (old_value != new_value).then(|| FieldChange {
                field: field.clone(),
                old_value: old_value.clone(),
                new_value: new_value.clone(),
            })
        })
        .collect()
}
