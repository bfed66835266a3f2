//! In-memory model of everything currently staged in quarantine.

use std::num::NonZeroU64;

use srm_types::{DIRECTORY_SEPARATOR, FileKind, FileRecord};

use crate::Error;

/// Time-to-live of a new [`EntryStore`], one day.
pub const DEFAULT_TTL: NonZeroU64 = NonZeroU64::new(24 * 60 * 60).expect("non-zero");

/// Collection of [`FileRecord`]s, kept in the order they were staged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryStore {
    /// Time-to-live used for entries that are staged without one.
    default_ttl: NonZeroU64,
    /// Staged entries, persisted in this order.
    records: Vec<FileRecord>,
}

impl Default for EntryStore {
    fn default() -> Self {
        EntryStore::new(DEFAULT_TTL)
    }
}

impl EntryStore {
    /// Create an empty [`EntryStore`].
    pub fn new(default_ttl: NonZeroU64) -> Self {
        EntryStore {
            default_ttl,
            records: Vec::new(),
        }
    }

    /// Create an [`EntryStore`] from already validated records, used when decoding.
    pub(crate) fn from_parts(default_ttl: NonZeroU64, records: Vec<FileRecord>) -> Self {
        EntryStore {
            default_ttl,
            records,
        }
    }

    pub fn default_ttl(&self) -> NonZeroU64 {
        self.default_ttl
    }

    /// Change the time-to-live used for future entries, existing entries keep theirs.
    pub fn set_default_ttl(&mut self, ttl: NonZeroU64) {
        tracing::debug!(old = %self.default_ttl, new = %ttl, "updating default ttl");
        self.default_ttl = ttl;
    }

    /// Record a newly staged entry.
    ///
    /// Directory names are normalized to end with a separator, and a `ttl_secs` of 0 is
    /// replaced by [`EntryStore::default_ttl`]. Duplicate names are _not_ rejected, it's up to
    /// the caller to stage entries under unique names.
    ///
    /// # Errors
    ///
    /// * If `name` is empty.
    /// * If `kind` is [`FileKind::File`] but `name` ends with a separator.
    ///
    pub fn add_entry(
        &mut self,
        name: &str,
        kind: FileKind,
        ttl_secs: u64,
    ) -> Result<&FileRecord, Error> {
        let name = normalize_name(name, kind)?;
        let ttl = NonZeroU64::new(ttl_secs).unwrap_or(self.default_ttl);

        let record = FileRecord::new(name, ttl);
        tracing::debug!(?record, "adding entry");
        self.records.push(record);

        let record = self.records.last().expect("just pushed");
        Ok(record)
    }

    /// Remove the first entry named exactly `name`.
    ///
    /// The store is left untouched if there is no such entry.
    pub fn remove_entry(&mut self, name: &str) -> Result<FileRecord, Error> {
        let Some(idx) = self.records.iter().position(|r| r.name() == name) else {
            return Err(Error::NotFound {
                name: name.to_string(),
            });
        };
        Ok(self.records.remove(idx))
    }

    /// The first entry named exactly `name`, if any.
    pub fn find(&self, name: &str) -> Option<&FileRecord> {
        self.records.iter().find(|r| r.name() == name)
    }

    /// All of the entries in the order they were staged.
    pub fn list_entries(&self) -> &[FileRecord] {
        &self.records[..]
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

fn normalize_name(name: &str, kind: FileKind) -> Result<String, Error> {
    let invalid = |reason| Error::InvalidName {
        name: name.to_string(),
        reason,
    };

    let base = name.trim_end_matches(DIRECTORY_SEPARATOR);
    if base.is_empty() {
        return Err(invalid("name is empty"));
    }
    if !is_single_component(base) {
        return Err(invalid("name must be a single path component"));
    }

    match kind {
        FileKind::File if name.ends_with(DIRECTORY_SEPARATOR) => {
            Err(invalid("file names cannot end with a separator"))
        }
        FileKind::File => Ok(name.to_string()),
        FileKind::Directory if name.ends_with(DIRECTORY_SEPARATOR) => Ok(name.to_string()),
        FileKind::Directory => {
            let mut name = name.to_string();
            name.push(DIRECTORY_SEPARATOR);
            Ok(name)
        }
    }
}

/// Whether `base`, a name without its trailing separators, names something directly inside the
/// quarantine directory.
pub(crate) fn is_single_component(base: &str) -> bool {
    !base.contains(DIRECTORY_SEPARATOR) && base != "." && base != ".."
}

#[cfg(test)]
mod test {
    use super::*;

    fn ttl(secs: u64) -> NonZeroU64 {
        NonZeroU64::new(secs).unwrap()
    }

    #[test]
    fn smoketest_default_ttl_substitution() {
        let mut store = EntryStore::new(ttl(3600));
        let record = store.add_entry("notes.txt", FileKind::File, 0).unwrap();
        assert_eq!(record.ttl(), ttl(3600));

        let record = store.add_entry("todo.txt", FileKind::File, 5).unwrap();
        assert_eq!(record.ttl(), ttl(5));
    }

    #[test]
    fn smoketest_directory_normalization() {
        let mut store = EntryStore::default();
        let record = store.add_entry("foo", FileKind::Directory, 10).unwrap();
        assert_eq!(record.name(), "foo/");
        assert_eq!(record.kind(), FileKind::Directory);

        // Already normalized names are left alone.
        let record = store.add_entry("bar/", FileKind::Directory, 10).unwrap();
        assert_eq!(record.name(), "bar/");
    }

    #[test]
    fn smoketest_invalid_names() {
        let mut store = EntryStore::default();
        assert!(matches!(
            store.add_entry("", FileKind::File, 1),
            Err(Error::InvalidName { .. })
        ));
        assert!(matches!(
            store.add_entry("/", FileKind::Directory, 1),
            Err(Error::InvalidName { .. })
        ));
        assert!(matches!(
            store.add_entry("file/", FileKind::File, 1),
            Err(Error::InvalidName { .. })
        ));
        for name in ["../escape", "a/b", "/etc/passwd", ".", ".."] {
            assert!(
                matches!(
                    store.add_entry(name, FileKind::File, 1),
                    Err(Error::InvalidName { .. })
                ),
                "{name:?} should be rejected"
            );
        }
        assert!(matches!(
            store.add_entry("../", FileKind::Directory, 1),
            Err(Error::InvalidName { .. })
        ));
        assert!(store.is_empty());
    }

    #[test]
    fn smoketest_duplicates_are_independent() {
        let mut store = EntryStore::default();
        store.add_entry("a", FileKind::File, 1).unwrap();
        store.add_entry("a", FileKind::File, 2).unwrap();
        assert_eq!(store.len(), 2);

        // Only the first match is removed.
        let removed = store.remove_entry("a").unwrap();
        assert_eq!(removed.ttl(), ttl(1));
        assert_eq!(store.find("a").map(|r| r.ttl()), Some(ttl(2)));
    }

    #[test]
    fn smoketest_remove_missing() {
        let mut store = EntryStore::default();
        store.add_entry("a", FileKind::File, 1).unwrap();
        store.add_entry("b", FileKind::Directory, 2).unwrap();
        let before = store.clone();

        let err = store.remove_entry("missing").unwrap_err();
        assert!(matches!(err, Error::NotFound { name } if name == "missing"));
        assert_eq!(store, before);

        // Directory records have to be removed by their normalized name.
        assert!(store.remove_entry("b").is_err());
        assert!(store.remove_entry("b/").is_ok());
    }

    #[test]
    fn smoketest_set_default_ttl() {
        let mut store = EntryStore::default();
        store.add_entry("old", FileKind::File, 0).unwrap();
        store.set_default_ttl(ttl(7));
        store.add_entry("new", FileKind::File, 0).unwrap();

        let ttls: Vec<_> = store.list_entries().iter().map(|r| r.ttl().get()).collect();
        assert_eq!(ttls, vec![DEFAULT_TTL.get(), 7]);
    }
}
