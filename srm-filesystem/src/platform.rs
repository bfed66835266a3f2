//! Abstract interface for the filesystem primitives of a specific platform.

use std::path::Path;

use srm_types::FileKind;

use crate::{Error, FileStat};

mod portable;

/// Platform specific filesystem operations.
///
/// Every operation is blocking, run them on a [`FilesystemWorker`].
///
/// [`FilesystemWorker`]: crate::filesystem::FilesystemWorker
pub trait Platform {
    /// Metadata for `path`, without following a trailing symlink.
    fn lstat(path: &Path) -> Result<FileStat, Error>;
    /// Metadata for `path`, following symlinks.
    fn stat(path: &Path) -> Result<FileStat, Error>;

    /// Whether anything, including a dangling symlink, exists at `path`.
    fn exists(path: &Path) -> Result<bool, Error> {
        match Self::lstat(path) {
            Ok(_) => Ok(true),
            Err(err) if err.is_not_found() => Ok(false),
            Err(err) => Err(err),
        }
    }

    /// Create `path` and all of its missing parents, accessible only by the current user.
    fn mkdir_all(path: &Path) -> Result<(), Error>;

    fn rename(from: &Path, to: &Path) -> Result<(), Error>;

    /// Remove `path`, recursively if `kind` is [`FileKind::Directory`].
    fn remove(path: &Path, kind: FileKind) -> Result<(), Error>;

    /// Read the entire contents of `path`, `None` if it doesn't exist.
    fn read(path: &Path) -> Result<Option<Vec<u8>>, Error>;
    /// Create or truncate `path`, write `data`, and flush it to disk.
    fn write(path: &Path, data: &[u8]) -> Result<(), Error>;
}

pub use portable::PortablePlatform as FilesystemPlatform;
