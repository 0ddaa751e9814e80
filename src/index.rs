//! # In-Memory Index
//!
//! The index maps the 64-bit hash of a key to the location of the latest
//! entry written for it: `(segment_id, byte offset)`. It is the only
//! read path into the log; `get` never scans.
//!
//! ## Sharding
//!
//! The map is partitioned into [`INDEX_BUCKET_COUNT`] shards selected by
//! the low bits of the hash, each guarded by its own
//! `parking_lot::RwLock`. The store has a single writer, so sharding
//! exists to keep that writer from stalling concurrent readers: an insert
//! locks one shard while reads proceed against the other 511.
//!
//! ## Recovery
//!
//! Nothing is persisted. On open, [`Index::load`] replays every segment in
//! ascending id order and upserts each entry's location; the last insert
//! for a hash wins, which matches append-only semantics (a newer put or
//! tombstone supersedes whatever came before). Tombstones are inserted
//! like any other entry so a read can distinguish "never existed" from
//! "explicitly deleted" by looking at the entry's flag.
//!
//! ## Collisions
//!
//! Two keys may share a hash; the index does not know. The database
//! resolves collisions at read time by comparing the stored key against
//! the requested one.

use std::sync::atomic::{AtomicUsize, Ordering};

use eyre::Result;
use hashbrown::HashMap;
use parking_lot::RwLock;

use crate::config::INDEX_BUCKET_COUNT;
use crate::hash::HashFn;
use crate::storage::Segment;

/// Location of the latest entry for a key hash.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexRecord {
    pub segment_id: u16,
    pub offset: u32,
}

/// Sharded map from key hash to entry location.
pub struct Index {
    shards: Box<[RwLock<HashMap<u64, IndexRecord>>]>,
    len: AtomicUsize,
}

impl Default for Index {
    fn default() -> Self {
        Self::new()
    }
}

impl Index {
    pub fn new() -> Self {
        let shards = (0..INDEX_BUCKET_COUNT)
            .map(|_| RwLock::new(HashMap::new()))
            .collect();
        Self {
            shards,
            len: AtomicUsize::new(0),
        }
    }

    #[inline]
    fn shard(&self, hash: u64) -> &RwLock<HashMap<u64, IndexRecord>> {
        &self.shards[hash as usize & (INDEX_BUCKET_COUNT - 1)]
    }

    /// Upserts the location for `hash`. The last insert wins.
    pub fn insert(&self, hash: u64, record: IndexRecord) {
        let previous = self.shard(hash).write().insert(hash, record);
        if previous.is_none() {
            self.len.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn get(&self, hash: u64) -> Option<IndexRecord> {
        self.shard(hash).read().get(&hash).copied()
    }

    /// Number of distinct hashes tracked. Colliding keys count once, so
    /// this is an upper-bound approximation of live keys, not an exact
    /// count.
    pub fn len(&self) -> usize {
        self.len.load(Ordering::Relaxed)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Rebuilds the index by replaying `segments` in the order given
    /// (ascending id). Every valid entry is inserted, tombstones included.
    pub fn load(&self, segments: &[Segment], hash_fn: HashFn) -> Result<()> {
        for segment in segments {
            segment.for_each_entry(|offset, entry| {
                self.insert(
                    hash_fn(entry.key()),
                    IndexRecord {
                        segment_id: segment.id(),
                        offset,
                    },
                );
                Ok(())
            })?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SEGMENT_HEADER_SIZE;
    use crate::entry::{Entry, EntryFlag};
    use crate::hash::default_hash;
    use crate::storage::SegmentHeader;
    use std::fs::File;
    use std::io::Write as _;
    use std::sync::Arc;
    use zerocopy::IntoBytes;

    #[test]
    fn insert_then_get() {
        let index = Index::new();
        let record = IndexRecord {
            segment_id: 3,
            offset: 42,
        };

        index.insert(7, record);

        assert_eq!(index.get(7), Some(record));
        assert_eq!(index.get(8), None);
        assert_eq!(index.len(), 1);
    }

    #[test]
    fn last_insert_wins() {
        let index = Index::new();
        index.insert(
            7,
            IndexRecord {
                segment_id: 0,
                offset: 6,
            },
        );
        index.insert(
            7,
            IndexRecord {
                segment_id: 1,
                offset: 100,
            },
        );

        assert_eq!(
            index.get(7),
            Some(IndexRecord {
                segment_id: 1,
                offset: 100,
            })
        );
        // Upserting the same hash does not double-count.
        assert_eq!(index.len(), 1);
    }

    #[test]
    fn len_counts_distinct_hashes() {
        let index = Index::new();
        for hash in 0..100u64 {
            index.insert(
                hash,
                IndexRecord {
                    segment_id: 0,
                    offset: 6,
                },
            );
        }
        assert_eq!(index.len(), 100);
        assert!(!index.is_empty());
    }

    #[test]
    fn adjacent_hashes_land_in_adjacent_shards() {
        // Shard selection uses the low bits, so hashes differing only
        // there must not contend on the same lock.
        let index = Index::new();
        let a = index.shard(0) as *const _;
        let b = index.shard(1) as *const _;
        assert_ne!(a, b);
        // And the mask wraps: bucket_count maps back to shard 0.
        let c = index.shard(INDEX_BUCKET_COUNT as u64) as *const _;
        assert_eq!(a, c);
    }

    #[test]
    fn load_replays_segments_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let mut segments = Vec::new();
        for (id, batch) in [
            vec![(b"k1".as_slice(), b"old1".as_slice()), (b"k2".as_slice(), b"old2".as_slice())],
            vec![(b"k1".as_slice(), b"new1".as_slice())],
        ]
        .into_iter()
        .enumerate()
        {
            let path = dir.path().join(format!("{:04x}", id));
            let mut file = File::create(&path).unwrap();
            file.write_all(SegmentHeader::new().as_bytes())
                .unwrap();
            file.set_len(4096).unwrap();
            drop(file);

            let mut segment = Segment::open(id as u16, &path).unwrap();
            for (k, v) in batch {
                segment.write_entry(&Entry::new(EntryFlag::Put, k, v)).unwrap();
            }
            segments.push(segment);
        }

        let index = Index::new();
        index.load(&segments, default_hash).unwrap();

        // k1 was rewritten in segment 1; the replay must point there.
        let k1 = index.get(default_hash(b"k1")).unwrap();
        assert_eq!(k1.segment_id, 1);
        assert_eq!(k1.offset, SEGMENT_HEADER_SIZE as u32);

        let k2 = index.get(default_hash(b"k2")).unwrap();
        assert_eq!(k2.segment_id, 0);
        assert_eq!(index.len(), 2);
    }

    #[test]
    fn tombstones_are_indexed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("0000");
        let mut file = File::create(&path).unwrap();
        file.write_all(SegmentHeader::new().as_bytes())
            .unwrap();
        file.set_len(4096).unwrap();
        drop(file);

        let mut segment = Segment::open(0, &path).unwrap();
        segment
            .write_entry(&Entry::new(EntryFlag::Put, b"k", b"v"))
            .unwrap();
        let tombstone_offset = segment.size();
        segment
            .write_entry(&Entry::new(EntryFlag::Delete, b"k", b""))
            .unwrap();

        let index = Index::new();
        index.load(std::slice::from_ref(&segment), default_hash).unwrap();

        let record = index.get(default_hash(b"k")).unwrap();
        assert_eq!(record.offset, tombstone_offset);
        let entry = segment.read_entry(record.offset).unwrap();
        assert!(entry.is_tombstone());
    }

    #[test]
    fn concurrent_readers_see_writer_updates() {
        let index = Arc::new(Index::new());
        let mut handles = Vec::new();

        for t in 0..4u64 {
            let index = Arc::clone(&index);
            handles.push(std::thread::spawn(move || {
                for i in 0..1000u64 {
                    let hash = t * 1000 + i;
                    index.insert(
                        hash,
                        IndexRecord {
                            segment_id: t as u16,
                            offset: i as u32,
                        },
                    );
                    assert!(index.get(hash).is_some());
                }
            }));
        }
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(index.len(), 4000);
    }
}
