//! # Streaks Engine
//!
//! Deterministic merge logic for syncing sets of streaks through a shared,
//! append-only change log.
//!
//! This crate holds everything about the protocol that does not touch the
//! network: the data model, the diff and patch engines, the backward log
//! scan, and the snapshot codec. The same inputs always produce the same
//! outputs, and every published byte goes through canonical JSON.
//!
//! ## Design Principles
//!
//! - **No IO**: the engine never talks to the remote; drivers feed it data
//! - **Commutative counters**: counter changes travel as signed deltas
//! - **Last writer wins** for descriptions and other scalar fields
//!
//! ## Core Concepts
//!
//! ### Records and Collections
//!
//! A [`Record`] is a named streak with a description, free-form attributes
//! and a [`Counters`] map that never stores zero. A [`Collection`] is the set
//! of records plus the [`Version`] (last log entry) they reflect.
//!
//! ### Change Descriptors
//!
//! [`diff`] turns two collections into a [`ChangeDescriptor`]; [`patch`]
//! applies one. Removed records become `null`, added records travel in full,
//! and modified counters become deltas such as `"+1"`.
//!
//! ### Log Scanning
//!
//! [`BackwardScan`] finds the entries published after a known version by
//! walking pages from the last page backwards.
//!
//! ## Quick Start
//!
//! ```rust
//! use streaks_engine::{diff, patch, Collection, Record};
//!
//! let base = Collection::with_records([Record::new("x").with_counter("d1", 2)]);
//! let target = Collection::with_records([Record::new("x").with_counter("d1", 3)]);
//!
//! let descriptor = diff(&base, &target);
//! assert_eq!(
//!     descriptor.to_canonical_json().unwrap(),
//!     r#"{"x":{"data":{"d1":"+1"}}}"#
//! );
//!
//! let mut replica = base.clone();
//! patch(&mut replica, &descriptor);
//! assert_eq!(replica.records, target.records);
//! ```

pub mod canonical;
pub mod collection;
pub mod descriptor;
pub mod diff;
pub mod error;
pub mod patch;
pub mod record;
pub mod scan;
pub mod snapshot;

// Re-export main types at crate root
pub use canonical::to_canonical_string;
pub use collection::{Collection, EntryId, Version};
pub use descriptor::{Change, ChangeDescriptor, CounterChange, RecordPatch};
pub use diff::{diff, diff_record};
pub use error::{Error, Result};
pub use patch::{apply_record_patch, patch};
pub use record::{Counters, Record};
pub use scan::{last_page_for, BackwardScan, LogEntry, RawEntry, ScanOutcome};
pub use snapshot::{
    FileContent, Owner, RemoteFile, RemoteSnapshot, SnapshotMeta, SnapshotUpload, META_FILE,
    SCHEMA_TAG,
};
