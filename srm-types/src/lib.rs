//! Types used throughout `srm`.
//!
//! The goal of this crate is to be very lightweight, so take care with adding dependencies.

use std::fmt;
use std::num::NonZeroU64;
use std::time::{SystemTime, UNIX_EPOCH};

/// Character that terminates the name of every [`FileKind::Directory`] record.
pub const DIRECTORY_SEPARATOR: char = '/';

/// What kind of object a [`FileRecord`] refers to.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum FileKind {
    /// Removed with a single unlink.
    File,
    /// Removed recursively.
    Directory,
}

impl FileKind {
    /// Derive the kind of a record from its normalized name.
    ///
    /// The kind is never persisted, directories are recognized solely by a trailing
    /// [`DIRECTORY_SEPARATOR`].
    pub fn from_name(name: &str) -> FileKind {
        if name.ends_with(DIRECTORY_SEPARATOR) {
            FileKind::Directory
        } else {
            FileKind::File
        }
    }
}

impl fmt::Display for FileKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FileKind::File => write!(f, "file"),
            FileKind::Directory => write!(f, "directory"),
        }
    }
}

/// A single entry that has been moved into the quarantine directory.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FileRecord {
    /// Seconds after the last modification of the entry at which it may be deleted.
    ttl: NonZeroU64,
    /// Derived from `name`, cached because it's consulted on every deletion.
    kind: FileKind,
    /// Name relative to the quarantine directory.
    name: String,
}

impl FileRecord {
    /// Create a [`FileRecord`] from an already normalized name.
    ///
    /// The [`FileKind`] is derived from `name`, see [`FileKind::from_name`].
    pub fn new(name: String, ttl: NonZeroU64) -> Self {
        let kind = FileKind::from_name(&name);
        FileRecord { ttl, kind, name }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> FileKind {
        self.kind
    }

    pub fn ttl(&self) -> NonZeroU64 {
        self.ttl
    }

    /// Name of the entry on disk, i.e. without the trailing separator of directories.
    pub fn entry_name(&self) -> &str {
        self.name.trim_end_matches(DIRECTORY_SEPARATOR)
    }

    /// The instant this record becomes due, given the last modification time of its entry.
    ///
    /// Returns `None` if the deadline isn't representable, such a record is never due.
    pub fn due_at(&self, mtime: Timespec) -> Option<Timespec> {
        mtime.checked_add_secs(self.ttl.get())
    }
}

/// Time info returned from a `stat` call.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Timespec {
    /// Seconds since the Unix epoch.
    pub secs: i64,
    /// Nanoseconds, always within `0..1_000_000_000`.
    ///
    /// Not all filesystems provide this, thus often it will be 0.
    pub nanos: i64,
}

impl Timespec {
    const NANOS_PER_SEC: i64 = 1_000_000_000;

    pub const fn from_secs(secs: i64) -> Self {
        Timespec { secs, nanos: 0 }
    }

    pub fn now() -> Self {
        Timespec::from_system_time(SystemTime::now())
    }

    pub fn from_system_time(time: SystemTime) -> Self {
        match time.duration_since(UNIX_EPOCH) {
            Ok(since) => Timespec {
                secs: i64::try_from(since.as_secs()).unwrap_or(i64::MAX),
                nanos: i64::from(since.subsec_nanos()),
            },
            Err(err) => {
                // Before the epoch, borrow a second so `nanos` stays positive.
                let before = err.duration();
                let secs = i64::try_from(before.as_secs()).unwrap_or(i64::MAX);
                let nanos = i64::from(before.subsec_nanos());
                if nanos == 0 {
                    Timespec { secs: -secs, nanos }
                } else {
                    Timespec {
                        secs: -secs - 1,
                        nanos: Self::NANOS_PER_SEC - nanos,
                    }
                }
            }
        }
    }

    pub fn checked_add_secs(self, secs: u64) -> Option<Self> {
        let secs = i64::try_from(secs).ok()?;
        Some(Timespec {
            secs: self.secs.checked_add(secs)?,
            nanos: self.nanos,
        })
    }

    /// Whole seconds from `self` until `later`, negative if `later` has already passed.
    pub fn secs_until(self, later: Timespec) -> i64 {
        later.secs.saturating_sub(self.secs)
    }
}
