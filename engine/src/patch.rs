//! Patch engine: applies a change descriptor to a collection in place.

use crate::descriptor::{Change, ChangeDescriptor, CounterChange, RecordPatch};
use crate::record::Record;
use crate::Collection;

/// Apply `descriptor` to `collection`, returning it for chaining.
///
/// Removals drop the record and leave a tombstone. Patches addressed to a
/// name the collection does not hold yet create the record from an empty
/// base, so descriptors replayed out of step with a local add still apply.
/// Removals of unknown names are ignored.
pub fn patch<'a>(collection: &'a mut Collection, descriptor: &ChangeDescriptor) -> &'a mut Collection {
    for (name, change) in descriptor.iter() {
        match change {
            Change::Removed => {
                collection.remove(name);
            }
            Change::Added(record) => upsert_with(collection, name, &RecordPatch::from(record)),
            Change::Modified(fields) => upsert_with(collection, name, fields),
        }
    }
    collection
}

/// Apply field-patch semantics to a single record.
pub fn apply_record_patch(record: &mut Record, fields: &RecordPatch) {
    if let Some(description) = &fields.description {
        record.description.clone_from(description);
    }

    for (key, value) in &fields.attributes {
        match value {
            Some(value) => {
                record.attributes.insert(key.clone(), value.clone());
            }
            None => {
                record.attributes.remove(key);
            }
        }
    }

    for (key, change) in &fields.counters {
        match *change {
            CounterChange::Absolute(value) => record.counters.set(key.as_str(), value),
            CounterChange::Delta(delta) => record.counters.add(key.as_str(), delta),
        }
    }
}

fn upsert_with(collection: &mut Collection, name: &str, fields: &RecordPatch) {
    match collection.record_mut(name) {
        Some(existing) => apply_record_patch(existing, fields),
        None => {
            let mut record = Record::new(name);
            apply_record_patch(&mut record, fields);
            collection.tombstones.remove(name);
            collection.records.push(record);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn replays_all_change_kinds() {
        let mut collection = Collection::with_records([
            Record::new("streak_1").with_description("description"),
            Record::new("streak_2").with_counter("2014-12-26", 2),
            Record::new("streak_3"),
        ]);

        let descriptor = ChangeDescriptor::from_json(
            r#"{
                "streak_1": {"description": "updated_description"},
                "streak_2": {"data": {"2014-12-24": "+1", "2014-12-25": 1, "2014-12-26": "-1"}},
                "streak_3": null,
                "streak_4": {"data": {"2014-12-26": "-1"}}
            }"#,
        )
        .unwrap();

        patch(&mut collection, &descriptor);

        let expected = Collection::with_records([
            Record::new("streak_1").with_description("updated_description"),
            Record::new("streak_2")
                .with_counter("2014-12-24", 1)
                .with_counter("2014-12-25", 1)
                .with_counter("2014-12-26", 1),
            Record::new("streak_4").with_counter("2014-12-26", -1),
        ]);
        assert_eq!(collection.records, expected.records);
        assert_eq!(
            collection.tombstones.iter().collect::<Vec<_>>(),
            vec!["streak_3"]
        );
    }

    #[test]
    fn delta_back_to_zero_removes_key() {
        let mut collection = Collection::with_records([Record::new("a").with_counter("d1", 1)]);
        let descriptor = ChangeDescriptor::from_json(r#"{"a": {"data": {"d1": "-1"}}}"#).unwrap();

        patch(&mut collection, &descriptor);
        assert!(collection.record("a").unwrap().counters.is_empty());
    }

    #[test]
    fn removal_of_unknown_name_is_ignored() {
        let mut collection = Collection::with_records([Record::new("a")]);
        let descriptor = ChangeDescriptor::from_json(r#"{"ghost": null}"#).unwrap();

        patch(&mut collection, &descriptor);
        assert_eq!(collection.len(), 1);
        assert!(collection.tombstones.is_empty());
    }

    #[test]
    fn added_record_over_existing_keeps_untouched_counters() {
        let mut collection = Collection::with_records([Record::new("a")
            .with_counter("d1", 4)
            .with_counter("d2", 1)]);
        let descriptor = ChangeDescriptor::from_json(
            r#"{"a": {"name": "a", "description": "new", "data": {"d1": 2}}}"#,
        )
        .unwrap();

        patch(&mut collection, &descriptor);
        let record = collection.record("a").unwrap();
        assert_eq!(record.description, "new");
        assert_eq!(record.counters.get("d1"), 2);
        assert_eq!(record.counters.get("d2"), 1);
    }
}
