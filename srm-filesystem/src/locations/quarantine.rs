use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use derivative::Derivative;
use srm_types::{DIRECTORY_SEPARATOR, FileKind};

use crate::filesystem::FilesystemWorker;
use crate::platform::{FilesystemPlatform, Platform};
use crate::{Error, FileStat, FileType};

/// Separator between a staged name and the sequence number used to make it unique.
static COLLISION_SEPARATOR: char = '~';

/// A "quarantine" directory that entries get moved into before they're permanently deleted.
///
/// Staged entries keep their base name, and this type never tracks which entries it contains,
/// that's the job of whoever stages them. Some names can be reserved for bookkeeping files that
/// live alongside the staged entries, see [`QuarantineDirectory::reserve`].
#[derive(Derivative, Clone)]
#[derivative(Debug)]
pub struct QuarantineDirectory {
    /// Root of the quarantine directory.
    root: Arc<PathBuf>,
    /// Names that staged entries must never use.
    reserved: Arc<BTreeSet<String>>,
    /// Worker that runs our blocking I/O.
    #[derivative(Debug = "ignore")]
    worker: FilesystemWorker,
}

impl QuarantineDirectory {
    /// Open the quarantine directory at `root`, creating it if it doesn't exist.
    ///
    /// # Errors
    ///
    /// * If `root` exists but is not a directory.
    /// * If `root` cannot be created.
    ///
    pub async fn open(root: PathBuf, worker: FilesystemWorker) -> Result<Self, Error> {
        let root = std::path::absolute(&root).map_err(Error::io("resolve", &root))?;
        tracing::info!(?root, "opening quarantine directory");

        let root_ = root.clone();
        worker
            .run(move || match FilesystemPlatform::stat(&root_) {
                Ok(stat) if stat.kind == FileType::Directory => Ok(()),
                Ok(_) => Err(Error::NotADirectory(root_)),
                Err(err) if err.is_not_found() => {
                    tracing::info!(root = ?root_, "creating quarantine directory");
                    FilesystemPlatform::mkdir_all(&root_)
                }
                Err(err) => Err(err),
            })
            .await?;

        Ok(QuarantineDirectory {
            root: Arc::new(root),
            reserved: Arc::new(BTreeSet::new()),
            worker,
        })
    }

    /// Reserve `names` so no staged entry will ever be given one of them.
    pub fn reserve<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let reserved = Arc::make_mut(&mut self.reserved);
        reserved.extend(names.into_iter().map(Into::into));
        self
    }

    /// Root of the quarantine directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Worker that runs I/O for this directory.
    pub fn worker(&self) -> &FilesystemWorker {
        &self.worker
    }

    /// Location of the entry `name` within the quarantine directory.
    ///
    /// `name` can be either a bare entry name, or a directory name with a trailing separator.
    pub fn path_of(&self, name: &str) -> PathBuf {
        self.root.join(name.trim_end_matches(DIRECTORY_SEPARATOR))
    }

    /// Metadata for the quarantined entry `name`, symlinks are not followed.
    pub async fn stat(&self, name: &str) -> Result<FileStat, Error> {
        let path = self.path_of(name);
        self.worker.run(move || FilesystemPlatform::lstat(&path)).await
    }

    /// Permanently remove the quarantined entry `name`, recursively if it's a directory.
    pub async fn remove(&self, name: &str, kind: FileKind) -> Result<(), Error> {
        let path = self.path_of(name);
        self.worker
            .run(move || {
                tracing::debug!(?path, %kind, "removing entry");
                FilesystemPlatform::remove(&path, kind)
            })
            .await
    }

    /// Move `source` into the quarantine directory, returning the name it was staged as.
    ///
    /// The base name of `source` is kept unless an entry of that name is already quarantined,
    /// in which case a `~N` suffix is added to make it unique.
    pub async fn stage(&self, source: PathBuf) -> Result<String, Error> {
        let root = Arc::clone(&self.root);
        let reserved = Arc::clone(&self.reserved);

        self.worker
            .run(move || {
                // Make sure the source exists before picking a name.
                FilesystemPlatform::lstat(&source)?;

                let base = source
                    .file_name()
                    .ok_or_else(|| Error::NoFileName(source.clone()))?
                    .to_str()
                    .ok_or_else(|| Error::NonUtf8(source.clone()))?;
                let name = unique_name(&root, &reserved, base)?;
                let destination = root.join(&name);

                tracing::info!(?source, ?destination, "staging entry");
                FilesystemPlatform::rename(&source, &destination)?;
                Ok(name)
            })
            .await
    }

    /// Move the entry `name` out of quarantine and into `destination_dir`.
    ///
    /// An entry that was renamed to `<name>~<N>` when staged gets its original name back, unless
    /// something in `destination_dir` already has that name. Returns the path the entry was
    /// restored to. Never overwrites an existing object.
    pub async fn restore(&self, name: &str, destination_dir: PathBuf) -> Result<PathBuf, Error> {
        let source = self.path_of(name);
        let entry_name = name.trim_end_matches(DIRECTORY_SEPARATOR).to_string();

        self.worker
            .run(move || {
                let original = original_name(&entry_name).map(|name| destination_dir.join(name));
                let destination = match original {
                    Some(original) if !FilesystemPlatform::exists(&original)? => original,
                    _ => destination_dir.join(&entry_name),
                };
                if FilesystemPlatform::exists(&destination)? {
                    return Err(Error::AlreadyExists(destination));
                }

                tracing::info!(?source, ?destination, "restoring entry");
                FilesystemPlatform::rename(&source, &destination)?;
                Ok(destination)
            })
            .await
    }

    /// Read the bookkeeping file `filename`, `None` if it doesn't exist yet.
    pub async fn read_file(&self, filename: &str) -> Result<Option<Vec<u8>>, Error> {
        let path = self.root.join(filename);
        self.worker.run(move || FilesystemPlatform::read(&path)).await
    }

    /// Atomically replace the bookkeeping file `filename` with `contents`.
    ///
    /// The contents are written to `scratch_filename` first and then renamed over `filename`,
    /// so a failure part way through never leaves a truncated file behind.
    pub async fn persist_file(
        &self,
        filename: &str,
        scratch_filename: &str,
        contents: Vec<u8>,
    ) -> Result<(), Error> {
        let path = self.root.join(filename);
        let scratch = self.root.join(scratch_filename);

        self.worker
            .run(move || {
                tracing::debug!(?scratch, len = contents.len(), "writing scratch file");
                FilesystemPlatform::write(&scratch, &contents[..])?;
                FilesystemPlatform::rename(&scratch, &path)
            })
            .await
    }

    /// Move the bookkeeping file `filename` to `aside_filename`, replacing it if it exists.
    pub async fn set_aside(&self, filename: &str, aside_filename: &str) -> Result<PathBuf, Error> {
        let from = self.root.join(filename);
        let to = self.root.join(aside_filename);

        self.worker
            .run(move || {
                tracing::debug!(?from, ?to, "setting aside file");
                FilesystemPlatform::rename(&from, &to)?;
                Ok(to)
            })
            .await
    }
}

/// The name `staged` had before [`unique_name`] disambiguated it, if it looks disambiguated.
fn original_name(staged: &str) -> Option<&str> {
    let (base, seq) = staged.rsplit_once(COLLISION_SEPARATOR)?;
    let is_seq = !seq.is_empty() && seq.bytes().all(|b| b.is_ascii_digit());
    (is_seq && !base.is_empty()).then_some(base)
}

/// Pick a name, starting with `base`, that doesn't exist in `root` and isn't reserved.
fn unique_name(root: &Path, reserved: &BTreeSet<String>, base: &str) -> Result<String, Error> {
    let is_free = |name: &str| -> Result<bool, Error> {
        if reserved.contains(name) {
            return Ok(false);
        }
        Ok(!FilesystemPlatform::exists(&root.join(name))?)
    };

    if is_free(base)? {
        return Ok(base.to_string());
    }

    let mut seq: u64 = 1;
    loop {
        let candidate = format!("{base}{COLLISION_SEPARATOR}{seq}");
        if is_free(&candidate)? {
            tracing::debug!(?base, ?candidate, "disambiguated colliding name");
            return Ok(candidate);
        }
        seq += 1;
    }
}
