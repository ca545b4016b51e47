//! In-memory remote with Gist semantics.
//!
//! Useful for tests and offline demos: snapshots merge files on update
//! (a `null` file deletes), log entries get sequential numeric ids, and page
//! hints are only reported when the log spans more than one page, exactly as
//! the hosted service behaves.

use crate::error::TransportError;
use crate::remote::{EntryPage, Remote};
use std::collections::{BTreeMap, HashMap};
use streaks_engine::{
    Collection, EntryId, Owner, RawEntry, RemoteFile, RemoteSnapshot, SnapshotUpload,
};
use tokio::sync::Mutex;

const RAW_SCHEME: &str = "memory://";

/// Kind of request made against a [`MemoryRemote`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RequestKind {
    GetSnapshot,
    CreateSnapshot,
    UpdateSnapshot,
    FetchRaw,
    ListEntries,
    AppendEntry,
}

/// A recorded request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    GetSnapshot { id: String },
    CreateSnapshot,
    UpdateSnapshot { id: String },
    FetchRaw { url: String },
    ListEntries { id: String, per_page: u32, page: u32 },
    AppendEntry { id: String },
}

impl Request {
    pub fn kind(&self) -> RequestKind {
        match self {
            Request::GetSnapshot { .. } => RequestKind::GetSnapshot,
            Request::CreateSnapshot => RequestKind::CreateSnapshot,
            Request::UpdateSnapshot { .. } => RequestKind::UpdateSnapshot,
            Request::FetchRaw { .. } => RequestKind::FetchRaw,
            Request::ListEntries { .. } => RequestKind::ListEntries,
            Request::AppendEntry { .. } => RequestKind::AppendEntry,
        }
    }
}

#[derive(Debug, Clone)]
struct StoredSnapshot {
    description: Option<String>,
    files: BTreeMap<String, String>,
}

#[derive(Debug, Default)]
struct State {
    snapshots: HashMap<String, StoredSnapshot>,
    logs: HashMap<String, Vec<RawEntry>>,
    next_snapshot: u64,
    next_entry: u64,
    requests: Vec<Request>,
    // (kind, matching requests to let through first)
    failures: Vec<(RequestKind, usize)>,
}

impl State {
    fn record(&mut self, request: Request) -> Result<(), TransportError> {
        let kind = request.kind();
        self.requests.push(request);
        let Some(index) = self.failures.iter().position(|(k, _)| *k == kind) else {
            return Ok(());
        };
        if self.failures[index].1 == 0 {
            self.failures.remove(index);
            Err(TransportError::Injected(format!("{:?}", kind)))
        } else {
            self.failures[index].1 -= 1;
            Ok(())
        }
    }

    fn bump_entry_id(&mut self, id: &EntryId) {
        if let Ok(n) = id.as_str().parse::<u64>() {
            self.next_entry = self.next_entry.max(n);
        }
    }
}

/// Remote that keeps everything in process memory.
#[derive(Debug)]
pub struct MemoryRemote {
    owner: String,
    truncate_above: Option<usize>,
    state: Mutex<State>,
}

impl Default for MemoryRemote {
    fn default() -> Self {
        Self::new("owner")
    }
}

impl MemoryRemote {
    /// Create an empty remote whose snapshots are owned by `owner`.
    pub fn new(owner: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            truncate_above: None,
            state: Mutex::new(State::default()),
        }
    }

    /// Report files longer than `limit` bytes as truncated.
    pub fn with_truncation(mut self, limit: usize) -> Self {
        self.truncate_above = Some(limit);
        self
    }

    /// Store raw files under `id`.
    pub async fn insert_snapshot(
        &self,
        id: impl Into<String>,
        description: impl Into<String>,
        files: impl IntoIterator<Item = (String, String)>,
    ) {
        let snapshot = StoredSnapshot {
            description: Some(description.into()),
            files: files.into_iter().collect(),
        };
        self.state.lock().await.snapshots.insert(id.into(), snapshot);
    }

    /// Store `collection` under `id` the way a client would publish it.
    pub async fn seed_collection(
        &self,
        id: impl Into<String>,
        collection: &Collection,
    ) -> streaks_engine::Result<()> {
        let upload = SnapshotUpload::from_collection(collection)?;
        let files = upload
            .files
            .into_iter()
            .filter_map(|(name, file)| Some((name, file?.content)));
        self.insert_snapshot(id, upload.description, files).await;
        Ok(())
    }

    /// Append an entry with a chosen id and raw body.
    pub async fn seed_entry(&self, id: &str, entry_id: impl Into<EntryId>, body: impl Into<String>) {
        let entry = RawEntry::new(entry_id, body);
        let mut state = self.state.lock().await;
        state.bump_entry_id(&entry.id);
        state.logs.entry(id.to_string()).or_default().push(entry);
    }

    /// Make the next request of `kind` fail.
    pub async fn fail_next(&self, kind: RequestKind) {
        self.fail_nth(kind, 1).await;
    }

    /// Make the `n`-th upcoming request of `kind` fail (1-based).
    pub async fn fail_nth(&self, kind: RequestKind, n: usize) {
        let skip = n.saturating_sub(1);
        self.state.lock().await.failures.push((kind, skip));
    }

    /// Current snapshot under `id`, as a fetch would return it.
    pub async fn snapshot(&self, id: &str) -> Option<RemoteSnapshot> {
        let state = self.state.lock().await;
        state
            .snapshots
            .get(id)
            .map(|stored| self.render(id, stored))
    }

    /// All entries logged under `id`, oldest first.
    pub async fn entries(&self, id: &str) -> Vec<RawEntry> {
        self.state
            .lock()
            .await
            .logs
            .get(id)
            .cloned()
            .unwrap_or_default()
    }

    /// Every request made so far.
    pub async fn requests(&self) -> Vec<Request> {
        self.state.lock().await.requests.clone()
    }

    /// Log pages fetched at a page size other than the one-entry probe.
    pub async fn page_fetches(&self) -> Vec<u32> {
        self.state
            .lock()
            .await
            .requests
            .iter()
            .filter_map(|r| match r {
                Request::ListEntries { per_page, page, .. } if *per_page != 1 => Some(*page),
                _ => None,
            })
            .collect()
    }

    /// Forget recorded requests.
    pub async fn clear_requests(&self) {
        self.state.lock().await.requests.clear();
    }

    fn render(&self, id: &str, stored: &StoredSnapshot) -> RemoteSnapshot {
        let files = stored
            .files
            .iter()
            .map(|(name, content)| {
                let file = match self.truncate_above {
                    Some(limit) if content.len() > limit => RemoteFile {
                        content: Some(truncate(content, limit)),
                        truncated: true,
                        raw_url: Some(format!("{}{}/{}", RAW_SCHEME, id, name)),
                    },
                    _ => RemoteFile::with_content(content.clone()),
                };
                (name.clone(), file)
            })
            .collect();

        RemoteSnapshot {
            id: id.to_string(),
            description: stored.description.clone(),
            owner: Some(Owner {
                login: self.owner.clone(),
            }),
            files,
        }
    }
}

fn truncate(content: &str, limit: usize) -> String {
    let mut end = limit;
    while !content.is_char_boundary(end) {
        end -= 1;
    }
    content[..end].to_string()
}

fn apply_upload(files: &mut BTreeMap<String, String>, upload: &SnapshotUpload) {
    for (name, file) in &upload.files {
        match file {
            Some(file) => {
                files.insert(name.clone(), file.content.clone());
            }
            None => {
                files.remove(name);
            }
        }
    }
}

impl Remote for MemoryRemote {
    async fn get_snapshot(&self, id: &str) -> Result<RemoteSnapshot, TransportError> {
        let mut state = self.state.lock().await;
        state.record(Request::GetSnapshot { id: id.to_string() })?;
        state
            .snapshots
            .get(id)
            .map(|stored| self.render(id, stored))
            .ok_or_else(|| TransportError::NotFound(format!("snapshot {}", id)))
    }

    async fn create_snapshot(
        &self,
        upload: &SnapshotUpload,
    ) -> Result<RemoteSnapshot, TransportError> {
        let mut state = self.state.lock().await;
        state.record(Request::CreateSnapshot)?;

        state.next_snapshot += 1;
        let id = format!("gist-{}", state.next_snapshot);
        let mut stored = StoredSnapshot {
            description: Some(upload.description.clone()),
            files: BTreeMap::new(),
        };
        apply_upload(&mut stored.files, upload);

        let rendered = self.render(&id, &stored);
        state.snapshots.insert(id, stored);
        Ok(rendered)
    }

    async fn update_snapshot(
        &self,
        id: &str,
        upload: &SnapshotUpload,
    ) -> Result<RemoteSnapshot, TransportError> {
        let mut state = self.state.lock().await;
        state.record(Request::UpdateSnapshot { id: id.to_string() })?;

        let stored = state
            .snapshots
            .get_mut(id)
            .ok_or_else(|| TransportError::NotFound(format!("snapshot {}", id)))?;
        stored.description = Some(upload.description.clone());
        apply_upload(&mut stored.files, upload);
        let stored = stored.clone();
        Ok(self.render(id, &stored))
    }

    async fn fetch_raw(&self, url: &str) -> Result<String, TransportError> {
        let mut state = self.state.lock().await;
        state.record(Request::FetchRaw {
            url: url.to_string(),
        })?;

        let not_found = || TransportError::NotFound(url.to_string());
        let (id, name) = url
            .strip_prefix(RAW_SCHEME)
            .and_then(|path| path.split_once('/'))
            .ok_or_else(not_found)?;
        state
            .snapshots
            .get(id)
            .and_then(|stored| stored.files.get(name))
            .cloned()
            .ok_or_else(not_found)
    }

    async fn list_entries(
        &self,
        id: &str,
        per_page: u32,
        page: u32,
    ) -> Result<EntryPage, TransportError> {
        let mut state = self.state.lock().await;
        state.record(Request::ListEntries {
            id: id.to_string(),
            per_page,
            page,
        })?;

        let log = state.logs.get(id).map(Vec::as_slice).unwrap_or_default();
        let per_page = per_page.max(1) as usize;
        let pages = log.len().div_ceil(per_page);
        let start = (page.max(1) as usize - 1) * per_page;
        let entries = log.iter().skip(start).take(per_page).cloned().collect();

        Ok(EntryPage {
            entries,
            last_page: (pages > 1).then_some(pages as u32),
        })
    }

    async fn append_entry(&self, id: &str, body: &str) -> Result<EntryId, TransportError> {
        let mut state = self.state.lock().await;
        state.record(Request::AppendEntry { id: id.to_string() })?;

        if !state.snapshots.contains_key(id) {
            return Err(TransportError::NotFound(format!("snapshot {}", id)));
        }
        state.next_entry += 1;
        let entry_id = EntryId::from(state.next_entry);
        state
            .logs
            .entry(id.to_string())
            .or_default()
            .push(RawEntry::new(entry_id.clone(), body));
        Ok(entry_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn pages_and_hints() {
        let remote = MemoryRemote::default();
        for i in 1..=4u64 {
            remote.seed_entry("g", i, "{}").await;
        }

        let probe = remote.list_entries("g", 1, 1).await.unwrap();
        assert_eq!(probe.last_page, Some(4));
        assert_eq!(probe.entries.len(), 1);

        let last = remote.list_entries("g", 3, 2).await.unwrap();
        assert_eq!(last.entries, vec![RawEntry::new(4u64, "{}")]);

        let whole = remote.list_entries("g", 10, 1).await.unwrap();
        assert_eq!(whole.last_page, None);
        assert_eq!(whole.entries.len(), 4);
    }

    #[tokio::test]
    async fn update_merges_files() {
        let remote = MemoryRemote::new("bob");
        remote
            .insert_snapshot(
                "g",
                "strkio::set",
                [
                    ("a".to_string(), "{}".to_string()),
                    ("b".to_string(), "{}".to_string()),
                ],
            )
            .await;

        let mut files = BTreeMap::new();
        files.insert("a".to_string(), None);
        files.insert(
            "c".to_string(),
            Some(streaks_engine::FileContent {
                content: "{}".into(),
            }),
        );
        let upload = SnapshotUpload {
            description: "strkio::set".into(),
            files,
        };

        let updated = remote.update_snapshot("g", &upload).await.unwrap();
        assert_eq!(updated.files.keys().collect::<Vec<_>>(), vec!["b", "c"]);
        assert_eq!(updated.owner.unwrap().login, "bob");
    }

    #[tokio::test]
    async fn injected_failures_are_one_shot() {
        let remote = MemoryRemote::default();
        remote.insert_snapshot("g", "strkio::set", Vec::new()).await;
        remote.fail_next(RequestKind::GetSnapshot).await;

        assert!(matches!(
            remote.get_snapshot("g").await,
            Err(TransportError::Injected(_))
        ));
        assert!(remote.get_snapshot("g").await.is_ok());
        assert_eq!(remote.requests().await.len(), 2);
    }

    #[tokio::test]
    async fn appended_ids_follow_seeded_ids() {
        let remote = MemoryRemote::default();
        remote.insert_snapshot("g", "strkio::set", Vec::new()).await;
        remote.seed_entry("g", 41u64, "{}").await;

        let id = remote.append_entry("g", "{}").await.unwrap();
        assert_eq!(id, EntryId::from(42));
    }
}
