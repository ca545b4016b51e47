//! Diff engine: computes the change descriptor between two collections.

use crate::canonical::canonical_value_string;
use crate::descriptor::{Change, ChangeDescriptor, CounterChange, RecordPatch};
use crate::record::Record;
use crate::Collection;
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};

/// Describe how to turn `base` into `target`.
///
/// Records only in `base` are removed, records only in `target` are added in
/// full, and records in both yield a patch with the changed scalar fields and
/// the signed delta of every counter whose value moved. Unchanged records are
/// left out, so `diff(a, a)` is always empty.
pub fn diff(base: &Collection, target: &Collection) -> ChangeDescriptor {
    let before = index_by_name(base);
    let after = index_by_name(target);

    let mut descriptor = ChangeDescriptor::new();

    for (name, old) in &before {
        match after.get(name) {
            Some(new) => {
                if let Some(patch) = diff_record(old, new) {
                    descriptor.insert(*name, Change::Modified(patch));
                }
            }
            None => descriptor.insert(*name, Change::Removed),
        }
    }

    for (name, new) in &after {
        if !before.contains_key(name) {
            descriptor.insert(*name, Change::Added((*new).clone()));
        }
    }

    descriptor
}

/// Field-level difference between two versions of the same record.
///
/// Returns `None` when nothing but local-only attributes differ.
pub fn diff_record(old: &Record, new: &Record) -> Option<RecordPatch> {
    let mut patch = RecordPatch::default();

    if old.description != new.description {
        patch.description = Some(new.description.clone());
    }

    let old_attrs: BTreeMap<&str, &Value> = old.synced_attributes().collect();
    let new_attrs: BTreeMap<&str, &Value> = new.synced_attributes().collect();
    let attr_keys: BTreeSet<&str> = old_attrs.keys().chain(new_attrs.keys()).copied().collect();
    for key in attr_keys {
        match (old_attrs.get(key), new_attrs.get(key)) {
            (Some(a), Some(b)) if values_equal(a, b) => {}
            (_, Some(b)) => {
                patch.attributes.insert(key.to_string(), Some((*b).clone()));
            }
            (Some(_), None) => {
                patch.attributes.insert(key.to_string(), None);
            }
            (None, None) => {}
        }
    }

    let counter_keys: BTreeSet<&str> = old.counters.keys().chain(new.counters.keys()).collect();
    for key in counter_keys {
        let (before, after) = (old.counters.get(key), new.counters.get(key));
        if before == after {
            continue;
        }
        // A delta that does not fit in i64 travels as the target value.
        let change = after
            .checked_sub(before)
            .map_or(CounterChange::Absolute(after), CounterChange::Delta);
        patch.counters.insert(key.to_string(), change);
    }

    (!patch.is_empty()).then_some(patch)
}

fn index_by_name(collection: &Collection) -> BTreeMap<&str, &Record> {
    collection
        .records
        .iter()
        .map(|r| (r.name.as_str(), r))
        .collect()
}

/// Strict equality for scalars, canonical text equality for composites.
fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Array(_) | Value::Object(_), _) | (_, Value::Array(_) | Value::Object(_)) => {
            canonical_value_string(a) == canonical_value_string(b)
        }
        _ => a == b,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn delta(d: i64) -> CounterChange {
        CounterChange::Delta(d)
    }

    #[test]
    fn counter_increment_is_a_delta() {
        let base = Collection::with_records([Record::new("x").with_counter("d1", 2)]);
        let target = Collection::with_records([Record::new("x").with_counter("d1", 3)]);

        let descriptor = diff(&base, &target);
        assert_eq!(
            descriptor.to_canonical_json().unwrap(),
            r#"{"x":{"data":{"d1":"+1"}}}"#
        );
    }

    #[test]
    fn mixed_changes() {
        let base = Collection::with_records([
            Record::new("streak_1").with_description("description"),
            Record::new("streak_2")
                .with_counter("2014-12-26", 2)
                .with_counter("2014-12-28", 1),
            Record::new("streak_3"),
        ]);
        let target = Collection::with_records([
            Record::new("streak_1").with_description("updated_description"),
            Record::new("streak_2")
                .with_counter("2014-12-24", 1)
                .with_counter("2014-12-25", 1)
                .with_counter("2014-12-26", 1),
        ]);

        let descriptor = diff(&base, &target);

        assert_eq!(descriptor.len(), 3);
        assert_eq!(descriptor.get("streak_3"), Some(&Change::Removed));
        match descriptor.get("streak_1") {
            Some(Change::Modified(patch)) => {
                assert_eq!(patch.description.as_deref(), Some("updated_description"));
                assert!(patch.counters.is_empty());
            }
            other => panic!("unexpected: {:?}", other),
        }
        match descriptor.get("streak_2") {
            Some(Change::Modified(patch)) => {
                assert_eq!(patch.description, None);
                assert_eq!(patch.counters["2014-12-24"], delta(1));
                assert_eq!(patch.counters["2014-12-25"], delta(1));
                assert_eq!(patch.counters["2014-12-26"], delta(-1));
                assert_eq!(patch.counters["2014-12-28"], delta(-1));
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn added_record_is_sent_in_full() {
        let base = Collection::new();
        let record = Record::new("new").with_counter("d1", -2);
        let target = Collection::with_records([record.clone()]);

        assert_eq!(diff(&base, &target).get("new"), Some(&Change::Added(record)));
    }

    #[test]
    fn identical_collections_have_empty_diff() {
        let collection = Collection::with_records([
            Record::new("a").with_counter("d1", 1),
            Record::new("b").with_attribute("tags", json!(["x", "y"])),
        ]);
        assert!(diff(&collection, &collection.clone()).is_empty());
    }

    #[test]
    fn composite_attributes_compare_by_content() {
        let old = Record::new("a").with_attribute("meta", json!({"x": 1, "y": [1, 2]}));
        let same = Record::new("a").with_attribute("meta", json!({"y": [1, 2], "x": 1}));
        let moved = Record::new("a").with_attribute("meta", json!({"y": [2, 1], "x": 1}));

        assert_eq!(diff_record(&old, &same), None);
        assert!(diff_record(&old, &moved).is_some());
    }

    #[test]
    fn removed_attribute_and_reserved_keys() {
        let old = Record::new("a")
            .with_attribute("color", json!("red"))
            .with_attribute("_cache", json!(1));
        let new = Record::new("a").with_attribute("_cache", json!(2));

        let patch = diff_record(&old, &new).unwrap();
        assert_eq!(patch.attributes.len(), 1);
        assert_eq!(patch.attributes["color"], None);
    }

    #[test]
    fn extreme_counters_do_not_overflow() {
        let old = Record::new("x").with_counter("d", i64::MIN);
        let new = Record::new("x").with_counter("d", i64::MAX);

        let patch = diff_record(&old, &new).unwrap();
        assert_eq!(patch.counters["d"], CounterChange::Absolute(i64::MAX));

        let back = diff_record(&new, &old).unwrap();
        assert_eq!(back.counters["d"], CounterChange::Absolute(i64::MIN));

        let mut replica = Collection::with_records([old]);
        let descriptor = diff(&replica, &Collection::with_records([new.clone()]));
        crate::patch(&mut replica, &descriptor);
        assert_eq!(replica.record("x"), Some(&new));
    }
}
