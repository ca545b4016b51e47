//! Sync controller: fetch, reconcile, save and create streak sets.

use crate::config::ClientConfig;
use crate::error::{Operation, Result, SyncError, TransportError, UNSAVED};
use crate::http::GistRemote;
use crate::remote::Remote;
use crate::scanner::find_entries_since;
use streaks_engine::{diff, patch, Collection, RemoteSnapshot, SnapshotUpload, Version};

/// Client for one remote; every operation is a sequential pipeline of
/// round trips.
#[derive(Debug)]
pub struct SyncClient<R> {
    config: ClientConfig,
    remote: R,
}

impl SyncClient<GistRemote> {
    /// Client talking to the Gists API described by `config`.
    pub fn github(config: ClientConfig) -> std::result::Result<Self, TransportError> {
        let remote = GistRemote::new(&config)?;
        Ok(Self::new(config, remote))
    }
}

impl<R: Remote> SyncClient<R> {
    pub fn new(config: ClientConfig, remote: R) -> Self {
        Self { config, remote }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn remote(&self) -> &R {
        &self.remote
    }

    /// Fetch a set and fold in every change published since its snapshot.
    ///
    /// Pending log entries are replayed oldest first, advancing the version
    /// to each entry in turn, and the reconciled set is written back as the
    /// new snapshot. Without a credential the snapshot is returned as-is,
    /// since nothing could be written back.
    ///
    /// A failure after local replay but before the snapshot is written back
    /// leaves nothing to resume from; retry the whole call.
    pub async fn fetch_and_reconcile(&self, id: &str) -> Result<Collection> {
        let op = Operation::Fetch;

        let snapshot = self
            .remote
            .get_snapshot(id)
            .await
            .map_err(|e| SyncError::transport(op, id, e))?;
        let mut collection = self.load(op, id, snapshot).await?;

        if !self.config.has_credential() {
            tracing::debug!(collection = %id, "No credential configured, skipping log replay");
            return Ok(collection);
        }

        let outcome = find_entries_since(
            &self.remote,
            id,
            &collection.version,
            self.config.page_size,
        )
        .await
        .map_err(|e| SyncError::transport(op, id, e))?;

        if !outcome.found_known && collection.version != Version::Initial {
            tracing::warn!(
                collection = %id,
                version = %collection.version,
                "Known version not found in log, replaying from the beginning"
            );
        }
        if outcome.entries.is_empty() {
            tracing::debug!(collection = %id, version = %collection.version, "Already up to date");
            return Ok(collection);
        }

        let replayed = outcome.entries.len();
        for entry in outcome.entries {
            patch(&mut collection, &entry.payload);
            collection.version = Version::At(entry.id);
        }

        let upload = SnapshotUpload::from_collection(&collection)
            .map_err(|e| SyncError::engine(op, id, e))?;
        let published = self
            .remote
            .update_snapshot(id, &upload)
            .await
            .map_err(|e| SyncError::transport(op, id, e))?;
        let reconciled = self.load(op, id, published).await?;

        tracing::info!(
            collection = %id,
            replayed,
            version = %reconciled.version,
            "Reconciled set with change log"
        );
        Ok(reconciled)
    }

    /// Publish the changes from `previous` to `updated` as one log entry.
    ///
    /// `updated` is returned as the new local state; the published entry is
    /// not replayed locally. An empty diff makes no request at all.
    pub async fn save(&self, previous: &Collection, mut updated: Collection) -> Result<Collection> {
        let op = Operation::Save;
        self.require_credential(op, previous.id.as_deref().or(updated.id.as_deref()))?;

        let descriptor = diff(previous, &updated);
        if descriptor.is_empty() {
            tracing::debug!("Nothing to save");
            return Ok(updated);
        }

        let id = previous
            .id
            .as_deref()
            .or(updated.id.as_deref())
            .ok_or(SyncError::NotCreated {
                operation: op,
                collection: None,
            })?
            .to_string();
        let body = descriptor
            .to_canonical_json()
            .map_err(|e| SyncError::engine(op, &id, e))?;
        let entry = self
            .remote
            .append_entry(&id, &body)
            .await
            .map_err(|e| SyncError::transport(op, &id, e))?;

        tracing::info!(
            collection = %id,
            entry = %entry,
            changes = descriptor.len(),
            "Published change"
        );
        if updated.id.is_none() {
            updated.id = Some(id);
        }
        Ok(updated)
    }

    /// Publish `collection` as a brand new set.
    ///
    /// The returned collection carries the issued id and owner.
    pub async fn create(&self, collection: &Collection) -> Result<Collection> {
        let op = Operation::Create;
        self.require_credential(op, collection.id.as_deref())?;

        let mut fresh = collection.clone();
        fresh.tombstones.clear();
        let upload =
            SnapshotUpload::from_collection(&fresh).map_err(|e| SyncError::engine(op, UNSAVED, e))?;
        let created = self
            .remote
            .create_snapshot(&upload)
            .await
            .map_err(|e| SyncError::transport(op, UNSAVED, e))?;

        let id = created.id.clone();
        let collection = self.load(op, &id, created).await?;
        tracing::info!(collection = %id, records = collection.len(), "Created set");
        Ok(collection)
    }

    fn require_credential(&self, operation: Operation, collection: Option<&str>) -> Result<()> {
        if self.config.has_credential() {
            Ok(())
        } else {
            Err(SyncError::Unauthorized {
                operation,
                collection: collection.map(str::to_string),
            })
        }
    }

    /// Check the schema tag, pull in truncated files, and parse.
    async fn load(
        &self,
        op: Operation,
        id: &str,
        mut snapshot: RemoteSnapshot,
    ) -> Result<Collection> {
        snapshot
            .check_schema()
            .map_err(|e| SyncError::engine(op, id, e))?;

        for (name, url) in snapshot.truncated_files() {
            tracing::debug!(collection = %id, file = %name, "Fetching truncated file");
            let content = self
                .remote
                .fetch_raw(&url)
                .await
                .map_err(|e| SyncError::transport(op, id, e))?;
            snapshot.resolve_file(&name, content);
        }

        snapshot
            .into_collection()
            .map_err(|e| SyncError::engine(op, id, e))
    }
}
