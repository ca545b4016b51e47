//! Change descriptors: the mergeable delta format published to the log.
//!
//! A descriptor maps record names to a [`Change`]. On the wire it is a JSON
//! object where `null` removes a record, a full record object adds one, and
//! a partial object modifies one. Counter entries inside a modification are
//! signed delta strings (`"+2"`, `"-1"`), which is what makes concurrent
//! increments from different clients commute when replayed.

use crate::canonical::to_canonical_string;
use crate::error::{Error, Result};
use crate::record::Record;
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Wire key holding the counter map.
pub const COUNTERS_KEY: &str = "data";
const NAME_KEY: &str = "name";
const DESCRIPTION_KEY: &str = "description";

/// How a single counter changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CounterChange {
    /// Overwrite with this value (wire: JSON number)
    Absolute(i64),
    /// Add this signed amount (wire: string with explicit sign)
    Delta(i64),
}

impl CounterChange {
    /// Parse the wire form of a delta, e.g. `"+2"` or `"-1"`.
    pub fn parse_delta(text: &str) -> Result<Self> {
        text.trim()
            .parse::<i64>()
            .map(CounterChange::Delta)
            .map_err(|_| Error::InvalidDelta(text.to_string()))
    }

    fn to_value(self) -> Value {
        match self {
            CounterChange::Absolute(v) => Value::from(v),
            CounterChange::Delta(d) if d >= 0 => Value::String(format!("+{}", d)),
            CounterChange::Delta(d) => Value::String(d.to_string()),
        }
    }

    fn from_value(value: &Value) -> Result<Self> {
        match value {
            Value::String(s) => Self::parse_delta(s),
            Value::Number(n) => n.as_i64().map(CounterChange::Absolute).ok_or_else(|| {
                Error::InvalidDescriptor(format!("counter value {} is not an integer", n))
            }),
            other => Err(Error::InvalidDescriptor(format!(
                "counter value must be a number or delta string, got {}",
                other
            ))),
        }
    }
}

/// Field-level modification of one record.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RecordPatch {
    /// New description, if it changed
    pub description: Option<String>,
    /// Changed attributes; `None` removes the attribute
    pub attributes: BTreeMap<String, Option<Value>>,
    /// Changed counters
    pub counters: BTreeMap<String, CounterChange>,
}

impl RecordPatch {
    pub fn is_empty(&self) -> bool {
        self.description.is_none() && self.attributes.is_empty() && self.counters.is_empty()
    }

    fn to_value(&self) -> Value {
        let mut map = Map::new();
        for (key, value) in &self.attributes {
            map.insert(key.clone(), value.clone().unwrap_or(Value::Null));
        }
        if let Some(description) = &self.description {
            map.insert(DESCRIPTION_KEY.into(), Value::String(description.clone()));
        }
        if !self.counters.is_empty() {
            let counters = self
                .counters
                .iter()
                .map(|(k, c)| (k.clone(), c.to_value()))
                .collect();
            map.insert(COUNTERS_KEY.into(), Value::Object(counters));
        }
        Value::Object(map)
    }

    fn from_map(map: Map<String, Value>) -> Result<Self> {
        let mut patch = RecordPatch::default();
        for (key, value) in map {
            match key.as_str() {
                NAME_KEY => {}
                DESCRIPTION_KEY => match value {
                    Value::String(s) => patch.description = Some(s),
                    Value::Null => patch.description = Some(String::new()),
                    other => {
                        return Err(Error::InvalidDescriptor(format!(
                            "description must be a string, got {}",
                            other
                        )))
                    }
                },
                COUNTERS_KEY => match value {
                    Value::Object(counters) => {
                        for (bucket, change) in &counters {
                            patch
                                .counters
                                .insert(bucket.clone(), CounterChange::from_value(change)?);
                        }
                    }
                    Value::Null => {}
                    other => {
                        return Err(Error::InvalidDescriptor(format!(
                            "counters must be an object, got {}",
                            other
                        )))
                    }
                },
                _ => {
                    let value = (!value.is_null()).then_some(value);
                    patch.attributes.insert(key, value);
                }
            }
        }
        Ok(patch)
    }
}

impl From<&Record> for RecordPatch {
    /// A patch that writes every field of `record` as an absolute value.
    fn from(record: &Record) -> Self {
        RecordPatch {
            description: Some(record.description.clone()),
            attributes: record
                .attributes
                .iter()
                .map(|(k, v)| (k.clone(), Some(v.clone())))
                .collect(),
            counters: record
                .counters
                .iter()
                .map(|(k, v)| (k.to_string(), CounterChange::Absolute(v)))
                .collect(),
        }
    }
}

/// What happened to one record.
#[derive(Debug, Clone, PartialEq)]
pub enum Change {
    /// The record was removed (wire: `null`)
    Removed,
    /// The record was added (wire: the full record)
    Added(Record),
    /// Some fields of the record changed (wire: partial object)
    Modified(RecordPatch),
}

impl Change {
    fn to_value(&self) -> Result<Value> {
        Ok(match self {
            Change::Removed => Value::Null,
            Change::Added(record) => serde_json::to_value(record)?,
            Change::Modified(patch) => patch.to_value(),
        })
    }

    fn from_value(name: &str, value: Value) -> Result<Self> {
        match value {
            Value::Null => Ok(Change::Removed),
            Value::Object(map) => {
                if map.contains_key(NAME_KEY) {
                    // Full records carry absolute counters; anything else
                    // under a name key is still a field patch.
                    if let Ok(mut record) =
                        serde_json::from_value::<Record>(Value::Object(map.clone()))
                    {
                        record.name = name.to_string();
                        return Ok(Change::Added(record));
                    }
                }
                RecordPatch::from_map(map).map(Change::Modified)
            }
            other => Err(Error::InvalidDescriptor(format!(
                "change for '{}' must be an object or null, got {}",
                name, other
            ))),
        }
    }
}

/// A set of record changes keyed by record name.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ChangeDescriptor(BTreeMap<String, Change>);

impl ChangeDescriptor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, change: Change) {
        self.0.insert(name.into(), change);
    }

    pub fn get(&self, name: &str) -> Option<&Change> {
        self.0.get(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Change)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Parse a published entry body.
    pub fn from_json(text: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(text)?;
        Self::from_value(value)
    }

    /// Decode from an already-parsed JSON value.
    pub fn from_value(value: Value) -> Result<Self> {
        let Value::Object(map) = value else {
            return Err(Error::InvalidDescriptor(
                "descriptor must be a JSON object".into(),
            ));
        };
        let mut descriptor = ChangeDescriptor::new();
        for (name, change) in map {
            let change = Change::from_value(&name, change)?;
            descriptor.insert(name, change);
        }
        Ok(descriptor)
    }

    /// Encode as a JSON value.
    pub fn to_value(&self) -> Result<Value> {
        let mut map = Map::new();
        for (name, change) in &self.0 {
            map.insert(name.clone(), change.to_value()?);
        }
        Ok(Value::Object(map))
    }

    /// Encode as the canonical entry body.
    pub fn to_canonical_json(&self) -> Result<String> {
        to_canonical_string(&self.to_value()?)
    }
}

impl FromIterator<(String, Change)> for ChangeDescriptor {
    fn from_iter<I: IntoIterator<Item = (String, Change)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl Serialize for ChangeDescriptor {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.to_value()
            .map_err(serde::ser::Error::custom)?
            .serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for ChangeDescriptor {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        ChangeDescriptor::from_value(value).map_err(D::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn delta_wire_form_has_explicit_sign() {
        assert_eq!(CounterChange::Delta(2).to_value(), json!("+2"));
        assert_eq!(CounterChange::Delta(-1).to_value(), json!("-1"));
        assert_eq!(CounterChange::Absolute(3).to_value(), json!(3));
    }

    #[test]
    fn parse_delta() {
        assert_eq!(
            CounterChange::parse_delta("+2").unwrap(),
            CounterChange::Delta(2)
        );
        assert_eq!(
            CounterChange::parse_delta("-1").unwrap(),
            CounterChange::Delta(-1)
        );
        assert!(matches!(
            CounterChange::parse_delta("two"),
            Err(Error::InvalidDelta(_))
        ));
    }

    #[test]
    fn decode_mixed_descriptor() {
        let descriptor = ChangeDescriptor::from_json(
            r#"{
                "streak_1": {"description": "updated"},
                "streak_2": {"data": {"d1": "+1", "d2": 1}},
                "streak_3": null,
                "streak_4": {"name": "streak_4", "description": "", "data": {"d1": 5}}
            }"#,
        )
        .unwrap();

        assert_eq!(descriptor.len(), 4);
        assert_eq!(
            descriptor.get("streak_1"),
            Some(&Change::Modified(RecordPatch {
                description: Some("updated".into()),
                ..Default::default()
            }))
        );
        match descriptor.get("streak_2") {
            Some(Change::Modified(patch)) => {
                assert_eq!(patch.counters["d1"], CounterChange::Delta(1));
                assert_eq!(patch.counters["d2"], CounterChange::Absolute(1));
            }
            other => panic!("unexpected change: {:?}", other),
        }
        assert_eq!(descriptor.get("streak_3"), Some(&Change::Removed));
        assert_eq!(
            descriptor.get("streak_4"),
            Some(&Change::Added(Record::new("streak_4").with_counter("d1", 5)))
        );
    }

    #[test]
    fn named_object_with_deltas_is_a_patch() {
        let descriptor =
            ChangeDescriptor::from_json(r#"{"x": {"name": "x", "data": {"d": "+1"}}}"#).unwrap();
        assert!(matches!(descriptor.get("x"), Some(Change::Modified(_))));
    }

    #[test]
    fn attribute_removal_is_null() {
        let mut patch = RecordPatch::default();
        patch.attributes.insert("color".into(), None);
        let mut descriptor = ChangeDescriptor::new();
        descriptor.insert("x", Change::Modified(patch.clone()));

        assert_eq!(
            descriptor.to_canonical_json().unwrap(),
            r#"{"x":{"color":null}}"#
        );
        let parsed = ChangeDescriptor::from_json(r#"{"x":{"color":null}}"#).unwrap();
        assert_eq!(parsed.get("x"), Some(&Change::Modified(patch)));
    }

    #[test]
    fn rejects_non_descriptors() {
        assert!(ChangeDescriptor::from_json("nice streak!").is_err());
        assert!(ChangeDescriptor::from_json("[1, 2]").is_err());
        assert!(ChangeDescriptor::from_json(r#"{"x": 3}"#).is_err());
        assert!(ChangeDescriptor::from_json(r#"{"x": {"data": {"d": "lots"}}}"#).is_err());
    }

    #[test]
    fn canonical_body_is_stable() {
        let mut first = ChangeDescriptor::new();
        first.insert("b", Change::Removed);
        first.insert(
            "a",
            Change::Modified(RecordPatch {
                counters: [("d1".to_string(), CounterChange::Delta(1))].into(),
                ..Default::default()
            }),
        );
        let second: ChangeDescriptor = first.iter().map(|(k, v)| (k.to_string(), v.clone())).collect();

        assert_eq!(
            first.to_canonical_json().unwrap(),
            r#"{"a":{"data":{"d1":"+1"}},"b":null}"#
        );
        assert_eq!(
            first.to_canonical_json().unwrap(),
            second.to_canonical_json().unwrap()
        );
    }
}
