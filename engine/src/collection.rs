//! Collections of records and the log position they reflect.

use crate::record::Record;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeSet;
use std::fmt;

/// Identifier of a log entry.
///
/// Entry ids are opaque, but the hosted log issues numeric ids and older
/// clients write them into the snapshot metadata as JSON numbers. Both forms
/// normalize to the same decimal text, and numeric ids serialize back as
/// numbers.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EntryId(String);

impl EntryId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for EntryId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for EntryId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<u64> for EntryId {
    fn from(id: u64) -> Self {
        Self(id.to_string())
    }
}

impl Serialize for EntryId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self.0.parse::<u64>() {
            Ok(n) if n.to_string() == self.0 => serializer.serialize_u64(n),
            _ => serializer.serialize_str(&self.0),
        }
    }
}

impl<'de> Deserialize<'de> for EntryId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Number(u64),
            Text(String),
        }

        Ok(match Raw::deserialize(deserializer)? {
            Raw::Number(n) => EntryId::from(n),
            Raw::Text(s) => EntryId(s),
        })
    }
}

/// Position of a collection in the remote change log.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Version {
    /// No entry has been folded into the snapshot yet (freshly created set).
    #[default]
    Initial,
    /// The snapshot reflects every entry up to and including this one.
    At(EntryId),
}

impl Version {
    pub fn entry(&self) -> Option<&EntryId> {
        match self {
            Version::Initial => None,
            Version::At(id) => Some(id),
        }
    }

    /// Whether `id` is the entry this version points at.
    pub fn is(&self, id: &EntryId) -> bool {
        self.entry() == Some(id)
    }
}

impl From<EntryId> for Version {
    fn from(id: EntryId) -> Self {
        Version::At(id)
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Version::Initial => f.write_str("initial"),
            Version::At(id) => write!(f, "{}", id),
        }
    }
}

/// A named set of records as seen by one client.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Collection {
    /// Server-issued identifier, `None` until created remotely
    pub id: Option<String>,
    /// Login of the owning account
    pub owner: Option<String>,
    /// Last log entry reflected in `records`
    pub version: Version,
    /// Records in display order; names are unique
    pub records: Vec<Record>,
    /// Names removed locally whose remote files still need deleting
    pub tombstones: BTreeSet<String>,
}

impl Collection {
    /// Create an empty, not yet published collection.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a collection with the given records.
    pub fn with_records(records: impl IntoIterator<Item = Record>) -> Self {
        let mut collection = Self::new();
        for record in records {
            collection.upsert(record);
        }
        collection
    }

    /// Set the identifier.
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Set the version.
    pub fn at_version(mut self, version: impl Into<EntryId>) -> Self {
        self.version = Version::At(version.into());
        self
    }

    /// Look up a record by name.
    pub fn record(&self, name: &str) -> Option<&Record> {
        self.records.iter().find(|r| r.name == name)
    }

    /// Look up a record by name for modification.
    pub fn record_mut(&mut self, name: &str) -> Option<&mut Record> {
        self.records.iter_mut().find(|r| r.name == name)
    }

    /// Names of all records, in order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.records.iter().map(|r| r.name.as_str())
    }

    /// Insert a record, replacing any record with the same name in place.
    pub fn upsert(&mut self, record: Record) {
        self.tombstones.remove(&record.name);
        match self.record_mut(&record.name) {
            Some(existing) => *existing = record,
            None => self.records.push(record),
        }
    }

    /// Remove a record and remember its name as a tombstone.
    pub fn remove(&mut self, name: &str) -> Option<Record> {
        let index = self.records.iter().position(|r| r.name == name)?;
        let record = self.records.remove(index);
        self.tombstones.insert(record.name.clone());
        Some(record)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
