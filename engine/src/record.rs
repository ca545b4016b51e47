//! Record types: a named streak with scalar attributes and a counter map.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Prefix marking attributes (and snapshot files) that never take part in sync.
pub const RESERVED_PREFIX: char = '_';

/// A counter map that never stores zero.
///
/// Absence of a key means zero. Every mutation re-derives that invariant, so
/// two maps that agree on all non-zero values are always equal.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Counters(BTreeMap<String, i64>);

impl Counters {
    /// Create an empty counter map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Current value of `key` (zero when absent).
    pub fn get(&self, key: &str) -> i64 {
        self.0.get(key).copied().unwrap_or(0)
    }

    /// Set `key` to an absolute value. Setting zero removes the key.
    pub fn set(&mut self, key: impl Into<String>, value: i64) {
        let key = key.into();
        if value == 0 {
            self.0.remove(&key);
        } else {
            self.0.insert(key, value);
        }
    }

    /// Add a signed delta to `key`. A result of zero removes the key.
    pub fn add(&mut self, key: impl Into<String>, delta: i64) {
        let key = key.into();
        let value = self.get(&key).saturating_add(delta);
        self.set(key, value);
    }

    /// Iterate over the stored (non-zero) counters in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, i64)> {
        self.0.iter().map(|(k, v)| (k.as_str(), *v))
    }

    /// Iterate over the stored keys.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Into<String>> FromIterator<(K, i64)> for Counters {
    fn from_iter<I: IntoIterator<Item = (K, i64)>>(iter: I) -> Self {
        let mut counters = Counters::new();
        for (key, value) in iter {
            counters.set(key, value);
        }
        counters
    }
}

impl<'de> Deserialize<'de> for Counters {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = BTreeMap::<String, i64>::deserialize(deserializer)?;
        Ok(raw.into_iter().collect())
    }
}

/// A streak: a named entity with a description, free-form attributes and
/// per-key counters.
///
/// The serialized form is the file content stored in the remote snapshot.
/// Counters travel under the `data` key for compatibility with existing sets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    /// Unique name within its collection
    #[serde(default)]
    pub name: String,
    /// Free-text description
    #[serde(default, deserialize_with = "null_as_empty")]
    pub description: String,
    /// Counter values keyed by bucket (typically a date)
    #[serde(default, rename = "data")]
    pub counters: Counters,
    /// Any other fields present on the record
    #[serde(flatten)]
    pub attributes: BTreeMap<String, Value>,
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

impl Record {
    /// Create an empty record.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            counters: Counters::new(),
            attributes: BTreeMap::new(),
        }
    }

    /// Set the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Set a counter value.
    pub fn with_counter(mut self, key: impl Into<String>, value: i64) -> Self {
        self.counters.set(key, value);
        self
    }

    /// Set an extra attribute.
    pub fn with_attribute(mut self, key: impl Into<String>, value: Value) -> Self {
        self.attributes.insert(key.into(), value);
        self
    }

    /// Attributes that take part in diffing (no reserved prefix).
    pub fn synced_attributes(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.attributes
            .iter()
            .filter(|(k, _)| !is_reserved(k))
            .map(|(k, v)| (k.as_str(), v))
    }
}

/// Whether a key is local-only (starts with `_`).
pub fn is_reserved(key: &str) -> bool {
    key.starts_with(RESERVED_PREFIX)
}
