//! Drives [`BackwardScan`] against a [`Remote`].

use crate::error::TransportError;
use crate::remote::Remote;
use streaks_engine::{last_page_for, BackwardScan, ScanOutcome, Version};

/// Collect the log entries published after `known`, oldest first.
///
/// A first request with a page size of one reveals how many entries the log
/// holds. When everything fits on that page it is scanned directly;
/// otherwise pages of `page_size` entries are fetched from the last page
/// backwards until the known entry turns up or page 1 has been read. Any
/// transport error aborts the scan without a partial result.
pub async fn find_entries_since<R: Remote>(
    remote: &R,
    collection_id: &str,
    known: &Version,
    page_size: u32,
) -> Result<ScanOutcome, TransportError> {
    let probe = remote.list_entries(collection_id, 1, 1).await?;

    let outcome = match probe.last_page {
        None => BackwardScan::single_page(known, probe.entries),
        Some(total) => {
            let mut scan = BackwardScan::new(known, last_page_for(total, page_size));
            while let Some(page) = scan.next_page() {
                tracing::trace!(collection = %collection_id, page, "fetching log page");
                let listed = remote.list_entries(collection_id, page_size, page).await?;
                scan.feed(listed.entries);
            }
            scan.finish()
        }
    };

    for skipped in &outcome.skipped {
        tracing::warn!(collection = %collection_id, "Skipping log entry: {}", skipped);
    }
    tracing::debug!(
        collection = %collection_id,
        known = %known,
        pending = outcome.entries.len(),
        pages = outcome.pages_scanned,
        "Log scan finished"
    );

    Ok(outcome)
}
