//! Finds the staged entries that have outlived their time-to-live.
//!
//! An entry is due once `mtime + ttl <= now`, where `mtime` is the _current_ modification time of
//! the entry in quarantine. Touching a quarantined entry therefore pushes its deletion back.

use std::path::Path;

use srm_filesystem::locations::quarantine::QuarantineDirectory;
use srm_filesystem::platform::{FilesystemPlatform, Platform};
use srm_types::{FileRecord, Timespec};
use tokio::sync::oneshot;

/// Returns the subset of `records` that are due as of `now`, in their original order.
///
/// Entries that can't be stat'd are logged and skipped, a single broken entry never fails the
/// scan. This is blocking, see [`spawn`] for running it in the background.
pub fn find_due(root: &Path, records: &[FileRecord], now: Timespec) -> Vec<FileRecord> {
    records
        .iter()
        .filter(|record| {
            let path = root.join(record.entry_name());
            let stat = match FilesystemPlatform::lstat(&path) {
                Ok(stat) => stat,
                Err(err) => {
                    tracing::warn!(name = record.name(), %err, "skipping entry, failed to stat");
                    return false;
                }
            };

            match record.due_at(stat.mtime) {
                Some(due_at) => due_at <= now,
                // A deadline past the end of time is never reached.
                None => false,
            }
        })
        .cloned()
        .collect()
}

/// Start scanning `records` for entries that are due as of `now`.
///
/// The scan runs on the worker of `quarantine` and gets an owned snapshot of the records, so
/// the caller is free to keep going until it needs the result.
pub fn spawn(
    quarantine: &QuarantineDirectory,
    records: Vec<FileRecord>,
    now: Timespec,
) -> ScanHandle {
    let root = quarantine.root().to_path_buf();
    tracing::debug!(num_records = records.len(), ?now, "starting eviction scan");

    let rx = quarantine.worker().run_typed(move || {
        let due = find_due(&root, &records[..], now);
        tracing::debug!(num_due = due.len(), "finished eviction scan");
        due
    });
    ScanHandle { rx }
}

/// A scan started with [`spawn`].
#[derive(Debug)]
pub struct ScanHandle {
    rx: oneshot::Receiver<Vec<FileRecord>>,
}

impl ScanHandle {
    /// Wait for the scan to complete, returning the records that are due.
    ///
    /// If the worker went away before finishing the scan nothing is considered due.
    pub async fn join(self) -> Vec<FileRecord> {
        match self.rx.await {
            Ok(due) => due,
            Err(_) => {
                tracing::warn!("eviction scan never completed, nothing will be deleted");
                Vec::new()
            }
        }
    }
}
