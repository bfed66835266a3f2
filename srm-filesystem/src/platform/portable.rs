//! [`Platform`] implemented on top of `std::fs`.

use std::fs;
use std::io::{self, Write};
use std::path::Path;

use srm_types::{FileKind, Timespec};

use crate::platform::Platform;
use crate::{Error, FileStat, FileType};

pub struct PortablePlatform;

impl PortablePlatform {
    fn to_stat(path: &Path, metadata: fs::Metadata) -> Result<FileStat, Error> {
        let file_type = metadata.file_type();
        let kind = if file_type.is_symlink() {
            FileType::Symlink
        } else if file_type.is_dir() {
            FileType::Directory
        } else if file_type.is_file() {
            FileType::File
        } else {
            FileType::Other
        };
        let mtime = metadata.modified().map_err(Error::io("stat", path))?;

        Ok(FileStat {
            kind,
            size: metadata.len(),
            mtime: Timespec::from_system_time(mtime),
        })
    }
}

impl Platform for PortablePlatform {
    fn lstat(path: &Path) -> Result<FileStat, Error> {
        let metadata = fs::symlink_metadata(path).map_err(Error::io("stat", path))?;
        Self::to_stat(path, metadata)
    }

    fn stat(path: &Path) -> Result<FileStat, Error> {
        let metadata = fs::metadata(path).map_err(Error::io("stat", path))?;
        Self::to_stat(path, metadata)
    }

    fn mkdir_all(path: &Path) -> Result<(), Error> {
        let mut builder = fs::DirBuilder::new();
        builder.recursive(true);
        cfg_if::cfg_if! {
            if #[cfg(unix)] {
                use std::os::unix::fs::DirBuilderExt;
                builder.mode(0o700);
            }
        }
        builder.create(path).map_err(Error::io("create directory", path))
    }

    fn rename(from: &Path, to: &Path) -> Result<(), Error> {
        fs::rename(from, to).map_err(Error::io("rename", from))
    }

    fn remove(path: &Path, kind: FileKind) -> Result<(), Error> {
        match kind {
            FileKind::File => fs::remove_file(path).map_err(Error::io("remove", path)),
            FileKind::Directory => {
                fs::remove_dir_all(path).map_err(Error::io("recursively remove", path))
            }
        }
    }

    fn read(path: &Path) -> Result<Option<Vec<u8>>, Error> {
        match fs::read(path) {
            Ok(data) => Ok(Some(data)),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(Error::io("read", path)(err)),
        }
    }

    fn write(path: &Path, data: &[u8]) -> Result<(), Error> {
        let mut file = fs::File::create(path).map_err(Error::io("create", path))?;
        file.write_all(data).map_err(Error::io("write", path))?;
        file.sync_all().map_err(Error::io("fsync", path))
    }
}
