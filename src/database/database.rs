use std::fs;
use std::path::{Path, PathBuf};

use eyre::{bail, Result, WrapErr};
use parking_lot::RwLock;

use crate::config::{MAX_KEY_SIZE, MAX_VALUE_SIZE, SEGMENT_INITIALIZING_EXT};
use crate::entry::{Entry, EntryFlag};
use crate::error::StoreError;
use crate::index::{Index, IndexRecord};
use crate::storage::{parse_segment_filename, segment_filename, Segment};

use super::{DatabaseBuilder, Options, Stats};

/// An embeddable append-only key/value store.
///
/// A database owns a directory of segment files and an in-memory index
/// rebuilt from them on open. It is safe to share across threads: reads
/// run concurrently, mutations are serialized by an internal lock.
pub struct Database {
    path: PathBuf,
    options: Options,
    index: Index,
    segments: RwLock<Vec<Segment>>,
}

impl Database {
    /// Opens or creates a database at `path` with default options.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::builder().path(path).open()
    }

    /// Returns a builder for configuring `fsync` and the hash function.
    pub fn builder() -> DatabaseBuilder {
        DatabaseBuilder::new()
    }

    pub(crate) fn open_with_options(path: &Path, options: Options) -> Result<Self> {
        fs::create_dir_all(path).wrap_err_with(|| {
            format!("failed to create database directory '{}'", path.display())
        })?;

        let mut found = Vec::new();
        let dir = fs::read_dir(path)
            .wrap_err_with(|| format!("failed to read database directory '{}'", path.display()))?;
        for dir_entry in dir {
            let dir_entry = dir_entry.wrap_err("failed to read directory entry")?;
            let entry_path = dir_entry.path();

            // A leftover .initializing file is an interrupted segment
            // creation; the final rename never happened, so drop it.
            if entry_path
                .extension()
                .map_or(false, |ext| ext == SEGMENT_INITIALIZING_EXT)
            {
                fs::remove_file(&entry_path).wrap_err_with(|| {
                    format!(
                        "failed to remove stale segment file '{}'",
                        entry_path.display()
                    )
                })?;
                continue;
            }

            if let Some(id) = dir_entry
                .file_name()
                .to_str()
                .and_then(parse_segment_filename)
            {
                found.push((id, entry_path));
            }
        }
        found.sort_by_key(|(id, _)| *id);

        let mut segments = Vec::with_capacity(found.len().max(1));
        for (id, segment_path) in found {
            segments.push(Segment::open(id, segment_path)?);
        }
        if segments.is_empty() {
            segments.push(Segment::create(0, path.join(segment_filename(0)))?);
        }

        let index = Index::new();
        index.load(&segments, options.hash_fn)?;

        Ok(Self {
            path: path.to_path_buf(),
            options,
            index,
            segments: RwLock::new(segments),
        })
    }

    /// Maps `key` to `value`. An existing mapping is superseded, not
    /// overwritten: the old entry's bytes stay on disk, unreachable
    /// through the index.
    pub fn put(&self, key: &[u8], value: &[u8]) -> Result<()> {
        validate_key(key)?;
        if value.len() as u64 > u64::from(MAX_VALUE_SIZE) {
            return Err(StoreError::ValueTooLarge.into());
        }
        let entry = Entry::new(EntryFlag::Put, key, value);

        let mut segments = self.segments.write();
        self.append_locked(&mut segments, &entry)
    }

    /// Returns the latest value for `key`, copied out of the segment
    /// mapping.
    pub fn get(&self, key: &[u8]) -> Result<Vec<u8>> {
        validate_key(key)?;

        let segments = self.segments.read();
        let record = self
            .index
            .get((self.options.hash_fn)(key))
            .ok_or(StoreError::KeyNotFound)?;
        // The list is sorted by id; ids are normally dense, but a directory
        // with gaps (manually pruned segments) must still resolve.
        let segment = match segments.binary_search_by_key(&record.segment_id, Segment::id) {
            Ok(i) => &segments[i],
            Err(_) => {
                return Err(StoreError::SegmentNotFound).wrap_err_with(|| {
                    format!("index references segment {:04x}", record.segment_id)
                })
            }
        };

        let entry = segment.read_entry(record.offset)?;
        entry.verify(key)?;
        if entry.is_tombstone() {
            return Err(StoreError::KeyDeleted.into());
        }
        Ok(entry.value().to_vec())
    }

    /// Records a tombstone for `key`. Later gets fail `KeyDeleted` until
    /// the key is put again.
    pub fn delete(&self, key: &[u8]) -> Result<()> {
        validate_key(key)?;
        let entry = Entry::new(EntryFlag::Delete, key, &[]);

        let mut segments = self.segments.write();
        self.append_locked(&mut segments, &entry)
    }

    /// Appends `entry` to the active segment, rolling over first when it
    /// does not fit, then publishes the new location in the index. Callers
    /// hold the exclusive lock.
    fn append_locked(&self, segments: &mut Vec<Segment>, entry: &Entry<'_>) -> Result<()> {
        let needs_rollover = segments.last().map_or(true, |active| !active.can_write(entry));
        if needs_rollover {
            self.create_segment(segments)?;
        }
        let active = match segments.last_mut() {
            Some(active) => active,
            None => bail!("no active segment"),
        };

        let offset = active.size();
        active.write_entry(entry)?;
        // The index is updated only after the entry bytes landed; a failed
        // write must not leave a stale index record.
        self.index.insert(
            (self.options.hash_fn)(entry.key()),
            IndexRecord {
                segment_id: active.id(),
                offset,
            },
        );

        if self.options.fsync {
            active.flush()?;
        }
        Ok(())
    }

    /// Seals the current active segment and appends a fresh one with the
    /// next id.
    fn create_segment(&self, segments: &mut Vec<Segment>) -> Result<()> {
        let id = match segments.last() {
            Some(active) => {
                // The outgoing segment is never written again.
                active.flush()?;
                active
                    .id()
                    .checked_add(1)
                    .ok_or(StoreError::SegmentNotWritable)
                    .wrap_err("segment id space exhausted")?
            }
            None => 0,
        };
        let segment = Segment::create(id, self.path.join(segment_filename(id)))?;
        segments.push(segment);
        Ok(())
    }

    /// Flushes the active segment to stable storage. Useful for callers
    /// running with `fsync` off that want a durability point.
    pub fn sync(&self) -> Result<()> {
        let segments = self.segments.read();
        match segments.last() {
            Some(active) if !active.is_closed() => active.flush(),
            _ => Ok(()),
        }
    }

    /// Flushes the active segment, then closes every segment and releases
    /// its mapping. Further operations fail `Closed`.
    pub fn close(&self) -> Result<()> {
        let mut segments = self.segments.write();
        if let Some(active) = segments.last() {
            if !active.is_closed() {
                active.flush()?;
            }
        }
        for segment in segments.iter_mut() {
            segment.close()?;
        }
        Ok(())
    }

    /// Distinct key hashes currently indexed. Colliding keys count once,
    /// so this is an approximation of the live-key count.
    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn stats(&self) -> Stats {
        let segments = self.segments.read();
        Stats {
            segments: segments.len(),
            keys: self.index.len(),
            active_segment_size: segments.last().map_or(0, |s| s.size()),
        }
    }
}

impl Drop for Database {
    fn drop(&mut self) {
        // Callers that care about errors call close(); Drop is
        // best-effort.
        let segments = self.segments.write();
        if let Some(active) = segments.last() {
            if !active.is_closed() {
                let _ = active.flush();
            }
        }
    }
}

fn validate_key(key: &[u8]) -> Result<()> {
    if key.is_empty() {
        return Err(StoreError::EmptyKey.into());
    }
    if key.len() > MAX_KEY_SIZE {
        return Err(StoreError::KeyTooLarge.into());
    }
    Ok(())
}
