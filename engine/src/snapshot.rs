//! Snapshot codec: the full remote copy of a collection.
//!
//! A snapshot is a set of files. Each record lives in a file named after it
//! whose content is the record's canonical JSON; files whose name starts with
//! `_` are reserved, and `_meta` holds the log version the snapshot reflects.
//! The snapshot's description doubles as a schema tag.

use crate::canonical::to_canonical_string;
use crate::collection::{Collection, EntryId, Version};
use crate::error::{Error, Result};
use crate::record::{is_reserved, Record};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Description every streak set snapshot must carry.
pub const SCHEMA_TAG: &str = "strkio::set";

/// Reserved file holding snapshot metadata.
pub const META_FILE: &str = "_meta";

/// Content of the `_meta` file.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SnapshotMeta {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<EntryId>,
}

impl SnapshotMeta {
    fn version(&self) -> Version {
        self.version.clone().map(Version::At).unwrap_or_default()
    }
}

/// Account owning a snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Owner {
    pub login: String,
}

/// A file as returned by the remote.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RemoteFile {
    #[serde(default)]
    pub content: Option<String>,
    /// Set when `content` was cut short and must be fetched from `raw_url`
    #[serde(default)]
    pub truncated: bool,
    #[serde(default)]
    pub raw_url: Option<String>,
}

impl RemoteFile {
    pub fn with_content(content: impl Into<String>) -> Self {
        Self {
            content: Some(content.into()),
            ..Default::default()
        }
    }
}

/// Snapshot as returned by the remote on fetch, create and update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteSnapshot {
    pub id: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub owner: Option<Owner>,
    #[serde(default)]
    pub files: BTreeMap<String, RemoteFile>,
}

impl RemoteSnapshot {
    /// Fail unless the snapshot carries the streak set schema tag.
    pub fn check_schema(&self) -> Result<()> {
        match self.description.as_deref() {
            Some(SCHEMA_TAG) => Ok(()),
            other => Err(Error::SchemaMismatch {
                expected: SCHEMA_TAG.to_string(),
                found: other.unwrap_or_default().to_string(),
            }),
        }
    }

    /// Record files whose content has to be fetched separately, as
    /// `(file name, raw url)` pairs.
    pub fn truncated_files(&self) -> Vec<(String, String)> {
        self.files
            .iter()
            .filter(|(name, file)| !is_reserved(name) && file.truncated)
            .filter_map(|(name, file)| Some((name.clone(), file.raw_url.clone()?)))
            .collect()
    }

    /// Replace a truncated file's content with its full text.
    pub fn resolve_file(&mut self, name: &str, content: String) {
        if let Some(file) = self.files.get_mut(name) {
            file.content = Some(content);
            file.truncated = false;
        }
    }

    /// Log version recorded in `_meta`.
    ///
    /// A snapshot created moments ago has no usable `_meta` yet; that reads
    /// as [`Version::Initial`].
    pub fn version(&self) -> Version {
        self.files
            .get(META_FILE)
            .and_then(|file| file.content.as_deref())
            .and_then(|content| serde_json::from_str::<SnapshotMeta>(content).ok())
            .map(|meta| meta.version())
            .unwrap_or_default()
    }

    /// Parse into a collection. Reserved files are not records.
    pub fn into_collection(self) -> Result<Collection> {
        self.check_schema()?;
        let version = self.version();

        let mut records = Vec::new();
        for (name, file) in self.files {
            if is_reserved(&name) {
                continue;
            }
            let content = match file.content {
                Some(content) if !file.truncated => content,
                _ => return Err(Error::MissingContent(name)),
            };
            let mut record: Record =
                serde_json::from_str(&content).map_err(|e| Error::InvalidRecord {
                    name: name.clone(),
                    reason: e.to_string(),
                })?;
            record.name = name;
            records.push(record);
        }

        let mut collection = Collection::with_records(records);
        collection.id = Some(self.id);
        collection.owner = self.owner.map(|o| o.login);
        collection.version = version;
        Ok(collection)
    }
}

/// File body in an upload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileContent {
    pub content: String,
}

/// Request body for creating or overwriting a snapshot.
///
/// A `None` file deletes that file remotely.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotUpload {
    pub description: String,
    pub files: BTreeMap<String, Option<FileContent>>,
}

impl SnapshotUpload {
    /// Full snapshot of `collection`, deleting files of tombstoned records.
    pub fn from_collection(collection: &Collection) -> Result<Self> {
        let mut files = BTreeMap::new();

        for name in &collection.tombstones {
            files.insert(name.clone(), None);
        }
        for record in &collection.records {
            let content = to_canonical_string(record)?;
            files.insert(record.name.clone(), Some(FileContent { content }));
        }

        let meta = SnapshotMeta {
            version: collection.version.entry().cloned(),
        };
        files.insert(
            META_FILE.to_string(),
            Some(FileContent {
                content: to_canonical_string(&meta)?,
            }),
        );

        Ok(Self {
            description: SCHEMA_TAG.to_string(),
            files,
        })
    }
}
