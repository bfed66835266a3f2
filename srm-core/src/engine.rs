//! The main sequence of a single `srm` invocation.

use std::num::NonZeroU64;
use std::path::PathBuf;

use anyhow::Context;
use derivative::Derivative;
use srm_cfg::ConfigSet;
use srm_filesystem::filesystem::FilesystemWorker;
use srm_filesystem::locations::quarantine::QuarantineDirectory;
use srm_filesystem::platform::{FilesystemPlatform, Platform};
use srm_filesystem::FileType;
use srm_ore::fmt::HumanSecs;
use srm_store::{EntryStore, DEFAULT_TTL};
use srm_types::{FileKind, FileRecord, Timespec, DIRECTORY_SEPARATOR};

use crate::cfgs::{DEFAULT_TTL_SECS, ENTRIES_FILENAME, SCAN_WORKER_THREADS};
use crate::executor::{self, DeletionReport};
use crate::scanner;

/// Suffix of the scratch file a new snapshot is written to before replacing the old one.
static SCRATCH_SUFFIX: &str = ".tmp";
/// Suffix an unreadable snapshot is moved aside to.
static CORRUPT_SUFFIX: &str = ".corrupt";

/// Configuration for creating an [`Engine`].
pub struct EngineConfig {
    /// Directory that staged entries, and their snapshot, live in.
    pub quarantine_root: PathBuf,
    /// Dynamic configs for `srm`.
    pub configs: ConfigSet,
}

/// What the caller wants done in this invocation, besides sweeping due entries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Intent {
    /// Move `path` into quarantine, a `ttl_secs` of 0 uses the default.
    Stage {
        path: PathBuf,
        ttl_secs: u64,
        recursive: bool,
    },
    /// Delete `path` right away without staging it.
    DeleteNow { path: PathBuf, recursive: bool },
    /// Move the entry `name` out of quarantine and into `destination_dir`.
    Restore {
        name: String,
        destination_dir: PathBuf,
    },
    /// Change the default time-to-live of the quarantine.
    SetDefaultTtl { ttl: NonZeroU64 },
    /// Describe everything that is currently staged.
    List,
    /// Only delete the entries that are due.
    Sweep,
}

/// Result of applying an [`Intent`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Staged { record: FileRecord },
    Deleted { path: PathBuf, kind: FileKind },
    Restored { record: FileRecord, path: PathBuf },
    DefaultTtlSet { old: NonZeroU64, new: NonZeroU64 },
    Listing {
        default_ttl: NonZeroU64,
        entries: Vec<EntryStatus>,
    },
    Swept,
}

/// A staged entry and how long until it gets deleted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryStatus {
    pub record: FileRecord,
    /// Seconds until the entry is due, `None` if it could not be stat'd.
    pub due_in_secs: Option<i64>,
}

/// Everything that happened in a call to [`Engine::execute`].
#[derive(Debug)]
pub struct Execution {
    /// Deletions of due entries, these happen even if the intent fails.
    pub report: DeletionReport,
    pub outcome: Result<Outcome, anyhow::Error>,
}

/// An [`Intent`] that has been validated against the filesystem and the store.
#[derive(Debug)]
enum Prepared {
    Stage {
        path: PathBuf,
        kind: FileKind,
        ttl_secs: u64,
    },
    DeleteNow {
        path: PathBuf,
        kind: FileKind,
    },
    Restore {
        name: String,
        destination_dir: PathBuf,
    },
    SetDefaultTtl {
        ttl: NonZeroU64,
    },
    List,
    Sweep,
}

#[derive(Derivative)]
#[derivative(Debug)]
pub struct Engine {
    /// Where staged entries live.
    quarantine: QuarantineDirectory,
    /// Authoritative set of staged entries.
    store: EntryStore,
    /// Filename of the persisted [`EntryStore`] within the quarantine directory.
    entries_filename: String,
    /// Dynamic configs for `srm`.
    #[derivative(Debug = "ignore")]
    configs: ConfigSet,
}

impl Engine {
    /// Open the quarantine directory and load the staged entries from it.
    ///
    /// A snapshot that can't be decoded is moved aside and replaced with an empty store.
    pub async fn new(config: EngineConfig) -> Result<Self, anyhow::Error> {
        let EngineConfig {
            quarantine_root,
            configs,
        } = config;

        let num_threads = usize::try_from(SCAN_WORKER_THREADS.read(&configs)).unwrap_or(1);
        let worker = FilesystemWorker::new(num_threads)?;

        let entries_filename = ENTRIES_FILENAME.read(&configs).to_string();
        let quarantine = QuarantineDirectory::open(quarantine_root.clone(), worker)
            .await
            .with_context(|| {
                format!(
                    "failed to open quarantine directory '{}'",
                    quarantine_root.display()
                )
            })?
            .reserve([
                entries_filename.clone(),
                format!("{entries_filename}{SCRATCH_SUFFIX}"),
                format!("{entries_filename}{CORRUPT_SUFFIX}"),
            ]);

        let default_ttl = NonZeroU64::new(DEFAULT_TTL_SECS.read(&configs)).unwrap_or(DEFAULT_TTL);
        let store = Self::load_store(&quarantine, &entries_filename, default_ttl).await?;
        tracing::info!(
            num_entries = store.len(),
            default_ttl = %HumanSecs(store.default_ttl().get()),
            "loaded entry store"
        );

        Ok(Engine {
            quarantine,
            store,
            entries_filename,
            configs,
        })
    }

    async fn load_store(
        quarantine: &QuarantineDirectory,
        entries_filename: &str,
        default_ttl: NonZeroU64,
    ) -> Result<EntryStore, anyhow::Error> {
        let Some(raw) = quarantine
            .read_file(entries_filename)
            .await
            .context("failed to read entry store")?
        else {
            tracing::debug!("no entry store yet, starting fresh");
            return Ok(EntryStore::new(default_ttl));
        };

        let decoded = match String::from_utf8(raw) {
            Ok(raw) if raw.trim().is_empty() => return Ok(EntryStore::new(default_ttl)),
            Ok(raw) => srm_store::decode(&raw).map_err(anyhow::Error::from),
            Err(err) => Err(anyhow::Error::from(err)),
        };

        match decoded {
            Ok(store) => Ok(store),
            Err(err) => {
                let aside = format!("{entries_filename}{CORRUPT_SUFFIX}");
                let aside = quarantine
                    .set_aside(entries_filename, &aside)
                    .await
                    .context("failed to set aside unreadable entry store")?;
                tracing::warn!(
                    ?aside,
                    %err,
                    "entry store is unreadable, starting fresh, previously staged entries may be lost"
                );
                Ok(EntryStore::new(default_ttl))
            }
        }
    }

    pub fn store(&self) -> &EntryStore {
        &self.store
    }

    pub fn quarantine(&self) -> &QuarantineDirectory {
        &self.quarantine
    }

    pub fn configs(&self) -> &ConfigSet {
        &self.configs
    }

    /// Sweep every due entry and then apply `intent`.
    ///
    /// The scan for due entries runs in the background while `intent` is validated, and all due
    /// entries are deleted before anything new is staged.
    pub async fn execute(&mut self, intent: Intent) -> Execution {
        let now = Timespec::now();
        let scan = scanner::spawn(&self.quarantine, self.store.list_entries().to_vec(), now);

        let (due, prepared) = futures::join!(scan.join(), self.prepare(intent));

        let exclude = match &prepared {
            Ok(Prepared::Restore { name, .. }) => Some(name.as_str()),
            _ => None,
        };
        let report = executor::delete_staged(due, &self.quarantine, exclude).await;
        for record in report.deleted() {
            if let Err(err) = self.store.remove_entry(record.name()) {
                tracing::warn!(%err, "deleted entry was not in the store");
            }
        }

        let outcome = match prepared {
            Ok(prepared) => self.apply(prepared, now).await,
            Err(err) => Err(err),
        };
        Execution { report, outcome }
    }

    async fn prepare(&self, intent: Intent) -> Result<Prepared, anyhow::Error> {
        let prepared = match intent {
            Intent::Stage {
                path,
                ttl_secs,
                recursive,
            } => {
                let (path, kind) = self.inspect_target(path, recursive).await?;
                Prepared::Stage {
                    path,
                    kind,
                    ttl_secs,
                }
            }
            Intent::DeleteNow { path, recursive } => {
                let (path, kind) = self.inspect_target(path, recursive).await?;
                Prepared::DeleteNow { path, kind }
            }
            Intent::Restore {
                name,
                destination_dir,
            } => {
                // Directories can be named with or without their trailing separator.
                let record = self
                    .store
                    .find(&name)
                    .or_else(|| self.store.find(&format!("{name}{DIRECTORY_SEPARATOR}")))
                    .ok_or_else(|| srm_store::Error::NotFound { name: name.clone() })?;
                Prepared::Restore {
                    name: record.name().to_string(),
                    destination_dir,
                }
            }
            Intent::SetDefaultTtl { ttl } => Prepared::SetDefaultTtl { ttl },
            Intent::List => Prepared::List,
            Intent::Sweep => Prepared::Sweep,
        };
        Ok(prepared)
    }

    /// Resolve `path` and determine how it would get deleted.
    async fn inspect_target(
        &self,
        path: PathBuf,
        recursive: bool,
    ) -> Result<(PathBuf, FileKind), anyhow::Error> {
        if path.file_name().is_none() {
            anyhow::bail!("refusing to remove '{}'", path.display());
        }
        let path = std::path::absolute(&path)
            .with_context(|| format!("failed to resolve '{}'", path.display()))?;
        if path.starts_with(self.quarantine.root()) || self.quarantine.root().starts_with(&path) {
            anyhow::bail!(
                "refusing to remove '{}', it overlaps the quarantine directory",
                path.display()
            );
        }

        let path_ = path.clone();
        let stat = self
            .quarantine
            .worker()
            .run(move || FilesystemPlatform::lstat(&path_))
            .await?;
        if stat.kind == FileType::Directory && !recursive {
            anyhow::bail!("cannot remove '{}': is a directory", path.display());
        }

        Ok((path, stat.kind.deletion_kind()))
    }

    async fn apply(&mut self, prepared: Prepared, now: Timespec) -> Result<Outcome, anyhow::Error> {
        let outcome = match prepared {
            Prepared::Stage {
                path,
                kind,
                ttl_secs,
            } => {
                let name = self.quarantine.stage(path).await?;
                let record = self.store.add_entry(&name, kind, ttl_secs)?.clone();
                tracing::info!(
                    name = record.name(),
                    ttl = %HumanSecs(record.ttl().get()),
                    "staged entry"
                );
                Outcome::Staged { record }
            }
            Prepared::DeleteNow { path, kind } => {
                let path_ = path.clone();
                self.quarantine
                    .worker()
                    .run(move || FilesystemPlatform::remove(&path_, kind))
                    .await?;
                tracing::info!(?path, %kind, "deleted immediately");
                Outcome::Deleted { path, kind }
            }
            Prepared::Restore {
                name,
                destination_dir,
            } => {
                let path = self.quarantine.restore(&name, destination_dir).await?;
                let record = self.store.remove_entry(&name)?;
                Outcome::Restored { record, path }
            }
            Prepared::SetDefaultTtl { ttl } => {
                let old = self.store.default_ttl();
                self.store.set_default_ttl(ttl);
                Outcome::DefaultTtlSet { old, new: ttl }
            }
            Prepared::List => {
                let mut entries = Vec::with_capacity(self.store.len());
                for record in self.store.list_entries() {
                    let due_in_secs = match self.quarantine.stat(record.name()).await {
                        Ok(stat) => record.due_at(stat.mtime).map(|due| now.secs_until(due)),
                        Err(err) => {
                            tracing::warn!(name = record.name(), %err, "failed to stat entry");
                            None
                        }
                    };
                    entries.push(EntryStatus {
                        record: record.clone(),
                        due_in_secs,
                    });
                }
                Outcome::Listing {
                    default_ttl: self.store.default_ttl(),
                    entries,
                }
            }
            Prepared::Sweep => Outcome::Swept,
        };
        Ok(outcome)
    }

    /// Write the entry store back to the quarantine directory.
    pub async fn persist(&self) -> Result<(), anyhow::Error> {
        let contents = srm_store::encode(&self.store);
        let scratch = format!("{}{SCRATCH_SUFFIX}", self.entries_filename);
        self.quarantine
            .persist_file(&self.entries_filename, &scratch, contents.into_bytes())
            .await
            .with_context(|| {
                format!(
                    "failed to persist entry store to '{}'",
                    self.quarantine.root().join(&self.entries_filename).display()
                )
            })?;
        tracing::debug!(num_entries = self.store.len(), "persisted entry store");
        Ok(())
    }
}
