use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use sepulca_types::{IdGenerator, RecordId};
use tracing::{debug, info, warn};

use crate::encoding;
use crate::error::{StoreError, StoreResult};
use crate::lock::ProcessLock;
use crate::record::{Attributes, Record};
use crate::traits::Storage;

/// Fixed name of the lock file inside the storage directory.
pub const LOCK_FILE_NAME: &str = "lock.txt";

/// Cap on identifier generation retries in [`Storage::create`].
///
/// With a 64-bit token space this never triggers in practice; the cap turns a
/// pathological generator into an error instead of a livelock.
const MAX_CREATE_ATTEMPTS: usize = 1000;

/// File-backed record storage: one directory, one file per record, one
/// advisory lock serializing every operation across processes.
///
/// All storages opened on the same directory, in this process or any other,
/// share the directory and exclude each other through the lock; none owns the
/// directory exclusively.
pub struct FileStorage {
    dir: PathBuf,
    lock: ProcessLock,
    gen: Mutex<IdGenerator>,
}

impl FileStorage {
    /// Open a storage over `dir`, creating the directory (with parents) if it
    /// does not exist and opening the lock file inside it.
    pub fn open(dir: impl Into<PathBuf>) -> StoreResult<Self> {
        Self::with_generator(dir, IdGenerator::new())
    }

    /// Open a storage with a caller-supplied identifier generator.
    ///
    /// A seeded generator makes record creation deterministic, for tests.
    pub fn with_generator(dir: impl Into<PathBuf>, gen: IdGenerator) -> StoreResult<Self> {
        let dir = dir.into();
        match fs::metadata(&dir) {
            Ok(meta) if meta.is_dir() => {}
            Ok(_) => return Err(StoreError::NotADirectory(dir)),
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                info!(dir = %dir.display(), "storage directory not found, creating");
                fs::create_dir_all(&dir)?;
            }
            Err(err) => return Err(err.into()),
        }

        let lock = ProcessLock::open(dir.join(LOCK_FILE_NAME))?;
        Ok(Self {
            dir,
            lock,
            gen: Mutex::new(gen),
        })
    }

    /// The storage's backing directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Backing file path for the given identifier. Deterministic and
    /// reversible: the id is the file stem, with one fixed extension.
    fn record_path(&self, id: &RecordId) -> PathBuf {
        self.dir.join(format!("{id}.txt"))
    }

    fn check_exists(&self, id: &RecordId) -> bool {
        self.record_path(id).is_file()
    }
}

impl Storage for FileStorage {
    fn create(&self, attrs: Attributes) -> StoreResult<Record<'_>> {
        let _guard = self.lock.guard()?;

        let mut gen = self.gen.lock().expect("lock poisoned");
        let id = (0..MAX_CREATE_ATTEMPTS)
            .map(|_| gen.new_id())
            .find(|candidate| !self.check_exists(candidate))
            .ok_or(StoreError::IdSpaceExhausted(MAX_CREATE_ATTEMPTS))?;
        drop(gen);

        encoding::write_record(&self.record_path(&id), &id, &attrs)?;
        debug!(%id, "created record");
        Ok(Record::new(self, id, attrs))
    }

    fn get(&self, id: &RecordId) -> StoreResult<Record<'_>> {
        let _guard = self.lock.guard()?;

        match encoding::read_record(&self.record_path(id)) {
            Ok((stored_id, attrs)) => Ok(Record::new(self, stored_id, attrs)),
            // Absent, unreadable and corrupt files alike read as not-found;
            // enumeration is the path that reports corruption.
            Err(_) => Err(StoreError::RecordNotFound(id.clone())),
        }
    }

    fn exists(&self, id: &RecordId) -> StoreResult<bool> {
        let _guard = self.lock.guard()?;
        Ok(self.check_exists(id))
    }

    fn enumerate(&self, visit: &mut dyn FnMut(Record<'_>) -> bool) -> StoreResult<()> {
        let _guard = self.lock.guard()?;

        for entry in fs::read_dir(&self.dir)? {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) => {
                    warn!("skipping unreadable directory entry: {err}");
                    continue;
                }
            };
            let path = entry.path();
            if path == self.lock.path() {
                continue;
            }
            match entry.file_type() {
                Ok(file_type) if file_type.is_file() => {}
                Ok(_) => continue,
                Err(err) => {
                    warn!(path = %path.display(), "skipping unreadable directory entry: {err}");
                    continue;
                }
            }
            match encoding::read_record(&path) {
                Ok((id, attrs)) => {
                    if !visit(Record::new(self, id, attrs)) {
                        break;
                    }
                }
                Err(err) => {
                    warn!(path = %path.display(), "skipping unreadable record: {err}");
                }
            }
        }
        Ok(())
    }

    fn commit(&self, id: &RecordId, attrs: &Attributes) -> StoreResult<()> {
        let _guard = self.lock.guard()?;

        encoding::write_record(&self.record_path(id), id, attrs)?;
        debug!(%id, "committed record");
        Ok(())
    }

    fn erase(&self, id: &RecordId) -> StoreResult<()> {
        let _guard = self.lock.guard()?;

        if !self.check_exists(id) {
            return Err(StoreError::RecordNotFound(id.clone()));
        }
        fs::remove_file(self.record_path(id))?;
        debug!(%id, "erased record");
        Ok(())
    }
}

impl std::fmt::Debug for FileStorage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileStorage")
            .field("dir", &self.dir)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;
    use std::thread;

    fn attrs(pairs: &[(&str, &str)]) -> Attributes {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn open_creates_a_missing_directory() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("a/b/storage");
        let storage = FileStorage::open(&nested).unwrap();
        assert!(nested.is_dir());
        assert!(storage.dir().join("lock.txt").is_file());
    }

    #[test]
    fn open_rejects_a_non_directory_path() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("occupied");
        fs::write(&file, "x").unwrap();

        assert!(matches!(
            FileStorage::open(&file),
            Err(StoreError::NotADirectory(_))
        ));
    }

    #[test]
    fn created_ids_are_pairwise_distinct() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileStorage::open(dir.path()).unwrap();

        let mut seen = BTreeSet::new();
        for _ in 0..50 {
            let record = storage.create(Attributes::new()).unwrap();
            assert!(seen.insert(record.id().clone()), "duplicate id");
        }
    }

    #[test]
    fn create_retries_past_existing_ids() {
        let dir = tempfile::tempdir().unwrap();

        // Two storages with identical seeds generate the same id sequence, so
        // the second create must skip the id the first one took.
        let storage = FileStorage::with_generator(dir.path(), IdGenerator::with_seed(3)).unwrap();
        let first = storage.create(Attributes::new()).unwrap();

        let rival = FileStorage::with_generator(dir.path(), IdGenerator::with_seed(3)).unwrap();
        let second = rival.create(Attributes::new()).unwrap();

        assert_ne!(first.id(), second.id());
        assert!(storage.exists(second.id()).unwrap());
    }

    #[test]
    fn create_then_get_roundtrips_attributes() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileStorage::open(dir.path()).unwrap();

        let original = attrs(&[("name", "sepulca"), ("mood", "pensive"), ("size", "")]);
        let created = storage.create(original.clone()).unwrap();

        let loaded = storage.get(created.id()).unwrap();
        assert_eq!(loaded.id(), created.id());
        assert_eq!(loaded.attrs(), &original);
    }

    #[test]
    fn commit_overwrites_previous_state() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileStorage::open(dir.path()).unwrap();

        let mut record = storage.create(Attributes::new()).unwrap();
        record.set_attr("k", "v1");
        record.commit().unwrap();
        record.set_attr("k", "v2");
        record.commit().unwrap();

        let loaded = storage.get(record.id()).unwrap();
        assert_eq!(loaded.attr("k").unwrap(), "v2");
        assert_eq!(loaded.attrs().len(), 1);
    }

    #[test]
    fn erase_then_recommit_revives_the_record() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileStorage::open(dir.path()).unwrap();

        let mut record = storage.create(attrs(&[("k", "v")])).unwrap();
        record.erase().unwrap();
        assert!(!storage.exists(record.id()).unwrap());

        record.set_attr("revived", "yes");
        record.commit().unwrap();
        assert!(storage.exists(record.id()).unwrap());

        let loaded = storage.get(record.id()).unwrap();
        assert_eq!(loaded.attr("revived").unwrap(), "yes");
    }

    #[test]
    fn double_erase_is_record_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileStorage::open(dir.path()).unwrap();

        let record = storage.create(Attributes::new()).unwrap();
        record.erase().unwrap();
        assert!(matches!(
            record.erase(),
            Err(StoreError::RecordNotFound(_))
        ));
    }

    #[test]
    fn exists_is_stable_and_read_only() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileStorage::open(dir.path()).unwrap();

        let record = storage.create(Attributes::new()).unwrap();
        assert!(storage.exists(record.id()).unwrap());
        assert!(storage.exists(record.id()).unwrap());

        let absent = RecordId::parse("{dead-beef-dead-beef}").unwrap();
        assert!(!storage.exists(&absent).unwrap());
        assert!(!storage.exists(&absent).unwrap());
    }

    #[test]
    fn get_missing_is_record_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileStorage::open(dir.path()).unwrap();

        let absent = RecordId::parse("{dead-beef-dead-beef}").unwrap();
        assert!(matches!(
            storage.get(&absent),
            Err(StoreError::RecordNotFound(id)) if id == absent
        ));
    }

    #[test]
    fn enumerate_visits_exactly_the_live_records() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileStorage::open(dir.path()).unwrap();

        let mut expected = BTreeSet::new();
        let mut erased = Vec::new();
        for i in 0..6 {
            let record = storage.create(attrs(&[("i", &i.to_string())])).unwrap();
            if i % 3 == 0 {
                erased.push(record);
            } else {
                expected.insert(record.id().clone());
            }
        }
        for record in &erased {
            record.erase().unwrap();
        }

        let mut visited = BTreeSet::new();
        storage
            .enumerate(&mut |record| {
                assert!(visited.insert(record.id().clone()), "visited twice");
                true
            })
            .unwrap();
        assert_eq!(visited, expected);
    }

    #[test]
    fn enumerate_stops_when_the_visitor_declines() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileStorage::open(dir.path()).unwrap();
        for _ in 0..5 {
            storage.create(Attributes::new()).unwrap();
        }

        let mut count = 0;
        storage
            .enumerate(&mut |_| {
                count += 1;
                count < 2
            })
            .unwrap();
        assert_eq!(count, 2);
    }

    #[test]
    fn corrupt_files_are_isolated() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileStorage::open(dir.path()).unwrap();
        let good = storage.create(attrs(&[("k", "v")])).unwrap();

        let bogus_id = RecordId::parse("{0bad-0bad-0bad-0bad}").unwrap();
        fs::write(
            dir.path().join(format!("{bogus_id}.txt")),
            "Not A Sepulca\ngarbage\n",
        )
        .unwrap();

        // Enumeration skips the corrupt entry without failing.
        let mut visited = Vec::new();
        storage
            .enumerate(&mut |record| {
                visited.push(record.id().clone());
                true
            })
            .unwrap();
        assert_eq!(visited, vec![good.id().clone()]);

        // Direct lookup reads it as not-found.
        assert!(matches!(
            storage.get(&bogus_id),
            Err(StoreError::RecordNotFound(_))
        ));
        // But the file is still physically present.
        assert!(storage.exists(&bogus_id).unwrap());
    }

    #[test]
    fn get_unreadable_file_is_record_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileStorage::open(dir.path()).unwrap();

        // A directory squatting on the record path cannot be opened as a
        // file; the lookup must still read as not-found, not an I/O error.
        let id = RecordId::parse("{0bad-0bad-0bad-0bad}").unwrap();
        fs::create_dir(dir.path().join(format!("{id}.txt"))).unwrap();

        assert!(matches!(
            storage.get(&id),
            Err(StoreError::RecordNotFound(got)) if got == id
        ));
    }

    #[test]
    #[cfg(unix)]
    fn enumerate_survives_odd_directory_entries() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileStorage::open(dir.path()).unwrap();
        let good = storage.create(Attributes::new()).unwrap();

        fs::create_dir(dir.path().join("subdir")).unwrap();
        std::os::unix::fs::symlink(
            dir.path().join("no-such-target"),
            dir.path().join("dangling"),
        )
        .unwrap();

        let mut visited = Vec::new();
        storage
            .enumerate(&mut |record| {
                visited.push(record.id().clone());
                true
            })
            .unwrap();
        assert_eq!(visited, vec![good.id().clone()]);
    }

    #[test]
    fn enumerate_never_visits_the_lock_file() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileStorage::open(dir.path()).unwrap();
        storage.create(Attributes::new()).unwrap();

        let mut count = 0;
        storage
            .enumerate(&mut |record| {
                assert_ne!(record.id().as_str(), "lock");
                count += 1;
                true
            })
            .unwrap();
        assert_eq!(count, 1);
    }

    #[test]
    fn newline_values_are_rejected_before_touching_disk() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileStorage::open(dir.path()).unwrap();

        assert!(matches!(
            storage.create(attrs(&[("note", "a\nb")])),
            Err(StoreError::InvalidAttribute { .. })
        ));

        let mut record = storage.create(Attributes::new()).unwrap();
        record.set_attr("note", "a\nb");
        assert!(matches!(
            record.commit(),
            Err(StoreError::InvalidAttribute { .. })
        ));
        // The on-disk state is untouched by the failed commit.
        let loaded = storage.get(record.id()).unwrap();
        assert!(loaded.attrs().is_empty());
    }

    #[test]
    fn concurrent_commits_never_interleave() {
        let dir = tempfile::tempdir().unwrap();
        FileStorage::open(dir.path()).unwrap();

        let mut workers = Vec::new();
        for worker in 0..4 {
            let path = dir.path().to_path_buf();
            workers.push(thread::spawn(move || {
                let storage = FileStorage::open(&path).unwrap();
                let payload = "x".repeat(4096);
                for i in 0..25 {
                    let record = storage
                        .create(attrs(&[
                            ("worker", &worker.to_string()),
                            ("iteration", &i.to_string()),
                            ("payload", &payload),
                        ]))
                        .unwrap();
                    record.commit().unwrap();
                }
            }));
        }
        for worker in workers {
            worker.join().unwrap();
        }

        // Every resulting file parses validly and carries the full payload.
        let storage = FileStorage::open(dir.path()).unwrap();
        let mut total = 0;
        storage
            .enumerate(&mut |record| {
                assert_eq!(record.attr("payload").unwrap().len(), 4096);
                total += 1;
                true
            })
            .unwrap();
        assert_eq!(total, 100);
    }
}
