use std::collections::{BTreeMap, BTreeSet};

use id_reconcile::{
    compare::compare,
    extract::{KeyedDataset, Record},
};
use proptest::prelude::*;

const FIELDS: [&str; 2] = ["name", "qty"];

fn dataset(rows: &BTreeMap<String, (String, String)>) -> KeyedDataset {
    let headers = ["id", "name", "qty"].map(String::from).to_vec();
    let mut dataset = KeyedDataset::new("generated.xlsx", "Data", headers, 0);
    for (offset, (id, (name, qty))) in rows.iter().enumerate() {
        let record = Record::new(
            id.clone(),
            offset + 2,
            [
                ("id", id.as_str()),
                (FIELDS[0], name.as_str()),
                (FIELDS[1], qty.as_str()),
            ],
        );
        dataset.insert(record).expect("generated ids are unique");
    }
    dataset
}

fn rows_strategy() -> impl Strategy<Value = BTreeMap<String, (String, String)>> {
    proptest::collection::btree_map("[a-e][0-9]", ("[a-c]{0,2}", "[0-9]{0,2}"), 0..12)
}

proptest! {
    #[test]
    fn partitions_are_disjoint_and_cover_the_union(
        old in rows_strategy(),
        new in rows_strategy()
    ) {
        let result = compare(&dataset(&old), &dataset(&new));
        let modified = result.modified_ids();
        let added = result.new_ids();
        let deleted = result.deleted_ids();
        let unchanged = result.unchanged_ids();

        prop_assert!(modified.is_disjoint(&added));
        prop_assert!(modified.is_disjoint(&deleted));
        prop_assert!(modified.is_disjoint(&unchanged));
        prop_assert!(added.is_disjoint(&deleted));
        prop_assert!(added.is_disjoint(&unchanged));
        prop_assert!(deleted.is_disjoint(&unchanged));

        let mut covered: BTreeSet<&str> = BTreeSet::new();
        covered.extend(&modified);
        covered.extend(&added);
        covered.extend(&deleted);
        covered.extend(&unchanged);
        let expected: BTreeSet<&str> = old.keys().chain(new.keys()).map(String::as_str).collect();
        prop_assert_eq!(covered, expected);
        prop_assert!(result.errors.is_empty());

        let stats = result.statistics();
        prop_assert_eq!(stats.reference_records, old.len());
        prop_assert_eq!(stats.candidate_records, new.len());
        prop_assert_eq!(stats.total_changes(), stats.modified + stats.new + stats.deleted);
    }

    #[test]
    fn comparing_a_dataset_with_itself_changes_nothing(rows in rows_strategy()) {
        let data = dataset(&rows);
        let result = compare(&data, &data);
        prop_assert!(result.modified.is_empty());
        prop_assert!(result.new.is_empty());
        prop_assert!(result.deleted.is_empty());
        prop_assert_eq!(result.unchanged.len(), rows.len());
    }

    #[test]
    fn swapping_inputs_swaps_new_and_deleted(
        old in rows_strategy(),
        new in rows_strategy()
    ) {
        let forward = compare(&dataset(&old), &dataset(&new));
        let backward = compare(&dataset(&new), &dataset(&old));
        prop_assert_eq!(forward.new_ids(), backward.deleted_ids());
        prop_assert_eq!(forward.deleted_ids(), backward.new_ids());
        prop_assert_eq!(forward.modified_ids(), backward.modified_ids());
        prop_assert_eq!(forward.unchanged_ids(), backward.unchanged_ids());
    }

    #[test]
    fn every_modified_record_has_a_real_change(
        old in rows_strategy(),
        new in rows_strategy()
    ) {
        let result = compare(&dataset(&old), &dataset(&new));
        for modified in &result.modified {
            prop_assert!(!modified.changes.is_empty());
            for change in &modified.changes {
                prop_assert_ne!(&change.old_value, &change.new_value);
            }
        }
    }
}
