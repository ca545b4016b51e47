//! # Streaks Client
//!
//! Keeps a local streak set in step with a remote snapshot and its shared,
//! append-only change log, using the GitHub Gists API as the remote.
//!
//! The merge logic lives in [`streaks_engine`]; this crate owns the I/O:
//!
//! - [`SyncClient::fetch_and_reconcile`] fetches a set, replays the log
//!   entries published since its snapshot, and writes the result back
//! - [`SyncClient::save`] publishes local edits as a single diff entry
//! - [`SyncClient::create`] publishes a new set
//!
//! Configuration is explicit: build a [`ClientConfig`] (or load it from the
//! environment) and hand it to the client. Any type implementing [`Remote`]
//! can stand in for the Gists API; [`MemoryRemote`] keeps everything in
//! process.
//!
//! ```rust
//! use streaks_client::{ClientConfig, MemoryRemote, SyncClient};
//! use streaks_engine::{Collection, Record};
//!
//! let runtime = tokio::runtime::Builder::new_current_thread().build().unwrap();
//! runtime.block_on(async {
//!     let config = ClientConfig::new().with_token("secret");
//!     let client = SyncClient::new(config, MemoryRemote::new("bob"));
//!
//!     let draft = Collection::with_records([Record::new("reading")]);
//!     let created = client.create(&draft).await.unwrap();
//!     assert_eq!(created.owner.as_deref(), Some("bob"));
//!
//!     let mut edited = created.clone();
//!     edited.record_mut("reading").unwrap().counters.add("2024-01-01", 1);
//!     let saved = client.save(&created, edited).await.unwrap();
//!
//!     let id = saved.id.clone().unwrap();
//!     let fetched = client.fetch_and_reconcile(&id).await.unwrap();
//!     assert_eq!(fetched.record("reading").unwrap().counters.get("2024-01-01"), 1);
//! });
//! ```

pub mod config;
pub mod controller;
pub mod error;
pub mod http;
pub mod memory;
pub mod remote;
pub mod scanner;

pub use config::{ClientConfig, ConfigError};
pub use controller::SyncClient;
pub use error::{Operation, Result, SyncError, TransportError};
pub use http::GistRemote;
pub use memory::{MemoryRemote, Request, RequestKind};
pub use remote::{EntryPage, Remote};
pub use scanner::find_entries_since;
