//! The remote snapshot and change-log service.

use crate::error::TransportError;
use std::future::Future;
use std::sync::Arc;
use streaks_engine::{EntryId, RawEntry, RemoteSnapshot, SnapshotUpload};

/// One page of the change log.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct EntryPage {
    /// Entries on this page, oldest first
    pub entries: Vec<RawEntry>,
    /// Index of the last page at the requested page size, when the log
    /// spans more than one page
    pub last_page: Option<u32>,
}

/// Remote holding snapshots and their append-only change logs.
///
/// Implementations only move data; every protocol decision lives in the
/// engine and the [`SyncClient`](crate::SyncClient).
pub trait Remote: Send + Sync {
    /// Fetch the current snapshot.
    fn get_snapshot(
        &self,
        id: &str,
    ) -> impl Future<Output = Result<RemoteSnapshot, TransportError>> + Send;

    /// Create a new snapshot; the response carries the issued id.
    fn create_snapshot(
        &self,
        upload: &SnapshotUpload,
    ) -> impl Future<Output = Result<RemoteSnapshot, TransportError>> + Send;

    /// Overwrite the files of an existing snapshot.
    fn update_snapshot(
        &self,
        id: &str,
        upload: &SnapshotUpload,
    ) -> impl Future<Output = Result<RemoteSnapshot, TransportError>> + Send;

    /// Fetch the full content of a truncated file.
    fn fetch_raw(&self, url: &str) -> impl Future<Output = Result<String, TransportError>> + Send;

    /// List one page of the change log (pages are 1-based).
    fn list_entries(
        &self,
        id: &str,
        per_page: u32,
        page: u32,
    ) -> impl Future<Output = Result<EntryPage, TransportError>> + Send;

    /// Append an entry to the change log, returning its id.
    fn append_entry(
        &self,
        id: &str,
        body: &str,
    ) -> impl Future<Output = Result<EntryId, TransportError>> + Send;
}

impl<R: Remote> Remote for Arc<R> {
    fn get_snapshot(
        &self,
        id: &str,
    ) -> impl Future<Output = Result<RemoteSnapshot, TransportError>> + Send {
        (**self).get_snapshot(id)
    }

    fn create_snapshot(
        &self,
        upload: &SnapshotUpload,
    ) -> impl Future<Output = Result<RemoteSnapshot, TransportError>> + Send {
        (**self).create_snapshot(upload)
    }

    fn update_snapshot(
        &self,
        id: &str,
        upload: &SnapshotUpload,
    ) -> impl Future<Output = Result<RemoteSnapshot, TransportError>> + Send {
        (**self).update_snapshot(id, upload)
    }

    fn fetch_raw(&self, url: &str) -> impl Future<Output = Result<String, TransportError>> + Send {
        (**self).fetch_raw(url)
    }

    fn list_entries(
        &self,
        id: &str,
        per_page: u32,
        page: u32,
    ) -> impl Future<Output = Result<EntryPage, TransportError>> + Send {
        (**self).list_entries(id, per_page, page)
    }

    fn append_entry(
        &self,
        id: &str,
        body: &str,
    ) -> impl Future<Output = Result<EntryId, TransportError>> + Send {
        (**self).append_entry(id, body)
    }
}
