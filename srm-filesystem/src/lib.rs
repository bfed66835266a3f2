//! Filesystem access for `srm`.
//!
//! All of the operations here are blocking syscalls, so they get run on a [`FilesystemWorker`]
//! instead of directly on the async runtime.
//!
//! [`FilesystemWorker`]: crate::filesystem::FilesystemWorker

use std::io;
use std::path::{Path, PathBuf};

use srm_types::{FileKind, Timespec};

pub mod filesystem;
pub mod locations;
pub mod platform;


#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("failed to {op} '{}'", .path.display())]
    Io {
        op: &'static str,
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("'{}' exists but is not a directory", .0.display())]
    NotADirectory(PathBuf),
    #[error("'{}' already exists", .0.display())]
    AlreadyExists(PathBuf),
    #[error("'{}' does not name a file or directory", .0.display())]
    NoFileName(PathBuf),
    #[error("'{}' is not valid UTF-8", .0.display())]
    NonUtf8(PathBuf),
    #[error("failed to start filesystem worker")]
    WorkerPool(#[from] rayon::ThreadPoolBuildError),
    #[error("filesystem worker shutting down")]
    WorkerShutdown,
}

impl Error {
    /// Returns a closure that wraps an [`io::Error`] from `op` on `path`.
    pub fn io<'a>(op: &'static str, path: &'a Path) -> impl FnOnce(io::Error) -> Error + 'a {
        move |source| Error::Io {
            op,
            path: path.to_path_buf(),
            source,
        }
    }

    /// Whether the underlying error is that the path doesn't exist.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::Io { source, .. } if source.kind() == io::ErrorKind::NotFound)
    }
}

/// Kind of object returned from a `stat` call.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum FileType {
    File,
    Directory,
    Symlink,
    Other,
}

impl FileType {
    /// How an entry of this type gets deleted. Symlinks are never followed.
    pub fn deletion_kind(self) -> FileKind {
        match self {
            FileType::Directory => FileKind::Directory,
            FileType::File | FileType::Symlink | FileType::Other => FileKind::File,
        }
    }
}

/// Metadata about an object on the filesystem.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct FileStat {
    /// Type of the object, symlinks are not followed.
    pub kind: FileType,
    /// Size of the object in bytes.
    pub size: u64,
    /// File modified time.
    ///
    /// Generally changes when the file content changes.
    pub mtime: Timespec,
}
