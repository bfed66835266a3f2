//! Permanently deletes entries that the scanner found to be due.

use std::fmt;

use srm_filesystem::locations::quarantine::QuarantineDirectory;
use srm_types::FileRecord;

/// Delete every record in `due`, except the one named `exclude`.
///
/// Every deletion is attempted regardless of earlier failures, an entry that is already gone
/// counts as deleted.
pub async fn delete_staged(
    due: Vec<FileRecord>,
    quarantine: &QuarantineDirectory,
    exclude: Option<&str>,
) -> DeletionReport {
    let mut outcomes = Vec::with_capacity(due.len());

    for record in due {
        if exclude == Some(record.name()) {
            tracing::debug!(name = record.name(), "excluded from deletion");
            continue;
        }

        let result = match quarantine.remove(record.name(), record.kind()).await {
            Ok(()) => {
                tracing::info!(name = record.name(), kind = %record.kind(), "deleted entry");
                Ok(())
            }
            Err(err) if err.is_not_found() => {
                tracing::info!(name = record.name(), "entry already gone");
                Ok(())
            }
            Err(err) => {
                tracing::warn!(name = record.name(), %err, "failed to delete entry");
                Err(err)
            }
        };
        outcomes.push((record, result));
    }

    DeletionReport { outcomes }
}

/// Outcome of every deletion attempted by [`delete_staged`].
#[derive(Debug, Default)]
pub struct DeletionReport {
    outcomes: Vec<(FileRecord, Result<(), srm_filesystem::Error>)>,
}

impl DeletionReport {
    /// Records whose entries no longer exist.
    pub fn deleted(&self) -> impl Iterator<Item = &FileRecord> + '_ {
        self.outcomes
            .iter()
            .filter(|(_, result)| result.is_ok())
            .map(|(record, _)| record)
    }

    /// Records that could not be deleted, along with why.
    pub fn failures(&self) -> impl Iterator<Item = (&FileRecord, &srm_filesystem::Error)> + '_ {
        self.outcomes
            .iter()
            .filter_map(|(record, result)| result.as_ref().err().map(|err| (record, err)))
    }

    /// Number of deletions that were attempted.
    pub fn len(&self) -> usize {
        self.outcomes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }

    /// Collapse this report into the deleted records, or a single error naming every failure.
    pub fn into_result(self) -> Result<Vec<FileRecord>, DeletionError> {
        let mut deleted = Vec::new();
        let mut failures = Vec::new();
        for (record, result) in self.outcomes {
            match result {
                Ok(()) => deleted.push(record),
                Err(err) => failures.push((record, err)),
            }
        }

        if failures.is_empty() {
            Ok(deleted)
        } else {
            Err(DeletionError { failures })
        }
    }
}

/// Every failure from a [`DeletionReport`].
#[derive(Debug, thiserror::Error)]
#[error("failed to delete {} staged entries: {}", .failures.len(), FailureList(.failures))]
pub struct DeletionError {
    failures: Vec<(FileRecord, srm_filesystem::Error)>,
}

impl DeletionError {
    pub fn failures(&self) -> &[(FileRecord, srm_filesystem::Error)] {
        &self.failures[..]
    }
}

struct FailureList<'a>(&'a [(FileRecord, srm_filesystem::Error)]);

impl fmt::Display for FailureList<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (idx, (record, err)) in self.0.iter().enumerate() {
            if idx > 0 {
                write!(f, "; ")?;
            }
            write!(f, "'{}' ({err})", record.name())?;
        }
        Ok(())
    }
}
