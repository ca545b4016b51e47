//! Backward scan over a paginated, append-only change log.
//!
//! The log can only be listed forward, one fixed-size page at a time, and the
//! only shortcut is learning the index of the last page. [`BackwardScan`]
//! walks pages from the last one towards page 1 and inspects each page from
//! its newest entry to its oldest, stopping as soon as it meets the entry the
//! caller already knows. The driver owns the I/O: it asks
//! [`BackwardScan::next_page`] what to fetch and hands the result to
//! [`BackwardScan::feed`].

use crate::collection::{EntryId, Version};
use crate::descriptor::ChangeDescriptor;
use crate::error::Error;
use serde::{Deserialize, Serialize};

/// A log entry as listed by the remote, body still unparsed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawEntry {
    pub id: EntryId,
    pub body: String,
}

impl RawEntry {
    pub fn new(id: impl Into<EntryId>, body: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            body: body.into(),
        }
    }

    /// Parse the body as a change descriptor.
    pub fn parse(&self) -> Result<LogEntry, Error> {
        ChangeDescriptor::from_json(&self.body)
            .map(|payload| LogEntry {
                id: self.id.clone(),
                payload,
            })
            .map_err(|e| Error::MalformedEntry {
                id: self.id.to_string(),
                reason: e.to_string(),
            })
    }
}

/// A published, parsed change.
#[derive(Debug, Clone, PartialEq)]
pub struct LogEntry {
    pub id: EntryId,
    pub payload: ChangeDescriptor,
}

/// Index of the last page when listing `total_entries` at `page_size` per page.
///
/// Probing with a page size of one makes the last-page hint equal to the
/// number of entries in the log.
pub fn last_page_for(total_entries: u32, page_size: u32) -> u32 {
    let page_size = page_size.max(1);
    total_entries.div_ceil(page_size).max(1)
}

/// Result of a finished scan.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ScanOutcome {
    /// Entries newer than the known version, oldest first
    pub entries: Vec<LogEntry>,
    /// Pages handed to the scan
    pub pages_scanned: u32,
    /// Entries whose body failed to parse
    pub skipped: Vec<Error>,
    /// Whether the known version was found in the log
    pub found_known: bool,
}

/// State machine for a backward page scan.
#[derive(Debug)]
pub struct BackwardScan {
    known: Version,
    cursor: Option<u32>,
    found: bool,
    // Newest first until `finish`.
    collected: Vec<LogEntry>,
    skipped: Vec<Error>,
    pages_scanned: u32,
}

impl BackwardScan {
    /// Start a scan for entries newer than `known`, beginning at `last_page`.
    pub fn new(known: &Version, last_page: u32) -> Self {
        Self {
            known: known.clone(),
            cursor: Some(last_page.max(1)),
            found: false,
            collected: Vec::new(),
            skipped: Vec::new(),
            pages_scanned: 0,
        }
    }

    /// Scan a log that fits in a single, already fetched page.
    pub fn single_page(known: &Version, entries: Vec<RawEntry>) -> ScanOutcome {
        let mut scan = Self::new(known, 1);
        scan.feed(entries);
        scan.finish()
    }

    /// Page to fetch next, or `None` when the scan is complete.
    pub fn next_page(&self) -> Option<u32> {
        if self.found {
            None
        } else {
            self.cursor
        }
    }

    pub fn is_done(&self) -> bool {
        self.next_page().is_none()
    }

    /// Consume one page of entries, ordered oldest to newest as listed.
    pub fn feed(&mut self, entries: Vec<RawEntry>) {
        if self.is_done() {
            return;
        }
        self.pages_scanned += 1;

        for raw in entries.into_iter().rev() {
            if self.known.is(&raw.id) {
                self.found = true;
                break;
            }
            match raw.parse() {
                Ok(entry) => self.collected.push(entry),
                Err(e) => self.skipped.push(e),
            }
        }

        self.cursor = match self.cursor {
            Some(page) if page > 1 => Some(page - 1),
            _ => None,
        };
    }

    /// Finish the scan, returning entries in chronological order.
    pub fn finish(mut self) -> ScanOutcome {
        self.collected.reverse();
        self.skipped.reverse();
        ScanOutcome {
            entries: self.collected,
            pages_scanned: self.pages_scanned,
            skipped: self.skipped,
            found_known: self.found,
        }
    }
}
