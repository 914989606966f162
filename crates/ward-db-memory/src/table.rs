use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use time::OffsetDateTime;
use ward_storage::{Record, StorageError, StorageResult, Stored};

/// A map of versioned records keyed by id.
///
/// Writes lock only the shard holding the record, so the version check and
/// the replacement happen atomically for that record.
pub struct VersionedTable<T: Record> {
    rows: DashMap<T::Id, Stored<T>>,
}

impl<T: Record> Default for VersionedTable<T> {
    fn default() -> Self {
        Self {
            rows: DashMap::new(),
        }
    }
}

impl<T: Record> VersionedTable<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, record: T, version: u64, at: OffsetDateTime) -> StorageResult<Stored<T>> {
        match self.rows.entry(record.id().clone()) {
            Entry::Occupied(entry) => Err(StorageError::already_exists(T::KIND, entry.key())),
            Entry::Vacant(entry) => {
                let stored = Stored {
                    record,
                    version,
                    created_at: at,
                    last_updated: at,
                };
                entry.insert(stored.clone());
                Ok(stored)
            }
        }
    }

    pub fn get(&self, id: &T::Id) -> Option<Stored<T>> {
        self.rows.get(id).map(|row| row.value().clone())
    }

    /// Replace `record` if it is still at `expected_version`.
    ///
    /// `next_version` is only called once the check has passed, while the
    /// shard is locked.
    pub fn update(
        &self,
        record: T,
        expected_version: u64,
        next_version: impl FnOnce() -> u64,
        at: OffsetDateTime,
    ) -> StorageResult<Stored<T>> {
        let mut row = self
            .rows
            .get_mut(record.id())
            .ok_or_else(|| StorageError::not_found(T::KIND, record.id()))?;
        if row.version != expected_version {
            return Err(StorageError::version_conflict(
                T::KIND,
                record.id(),
                expected_version,
                row.version,
            ));
        }
        let stored = row.next(record, next_version(), at);
        *row = stored.clone();
        Ok(stored)
    }

    pub fn filter(&self, predicate: impl Fn(&T) -> bool) -> Vec<Stored<T>> {
        let mut rows: Vec<_> = self
            .rows
            .iter()
            .filter(|row| predicate(&row.value().record))
            .map(|row| row.value().clone())
            .collect();
        rows.sort_by_key(|row| row.version);
        rows
    }

    pub fn all(&self) -> Vec<Stored<T>> {
        self.filter(|_| true)
    }

    /// Rows whose version lies in `(since, until]`.
    pub fn changed_between(&self, since: u64, until: u64) -> Vec<Stored<T>> {
        self.rows
            .iter()
            .filter(|row| row.version > since && row.version <= until)
            .map(|row| row.value().clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}
