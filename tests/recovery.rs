//! # Recovery Tests
//!
//! The index is never persisted; everything a reopen knows comes from
//! replaying segment files. These tests cover that replay: durable puts
//! after a simulated crash, tombstones surviving reopen, ordered scans,
//! and cleanup of interrupted segment creation.

use arkdb::storage::Segment;
use arkdb::{Database, StoreError};
use tempfile::tempdir;

fn err_kind<T: std::fmt::Debug>(result: eyre::Result<T>) -> StoreError {
    *result.unwrap_err().downcast_ref::<StoreError>().unwrap()
}

mod reopen_tests {
    use super::*;

    #[test]
    fn closed_database_reopens_with_all_data() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("db");

        {
            let db = Database::open(&path).unwrap();
            for i in 0..100u32 {
                db.put(format!("key-{i:03}").as_bytes(), &i.to_le_bytes())
                    .unwrap();
            }
            db.close().unwrap();
        }

        let db = Database::open(&path).unwrap();
        assert_eq!(db.len(), 100);
        for i in 0..100u32 {
            assert_eq!(
                db.get(format!("key-{i:03}").as_bytes()).unwrap(),
                i.to_le_bytes()
            );
        }
    }

    #[test]
    fn fsynced_puts_survive_crash_without_close() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("db");

        {
            let db = Database::builder().path(&path).fsync(true).open().unwrap();
            db.put(b"committed-1", b"v1").unwrap();
            db.put(b"committed-2", b"v2").unwrap();
            // Simulate a crash: neither close() nor Drop runs.
            std::mem::forget(db);
        }

        let db = Database::open(&path).unwrap();
        assert_eq!(db.get(b"committed-1").unwrap(), b"v1");
        assert_eq!(db.get(b"committed-2").unwrap(), b"v2");
    }

    #[test]
    fn tombstones_survive_reopen() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("db");

        {
            let db = Database::open(&path).unwrap();
            db.put(b"kept", b"v").unwrap();
            db.put(b"dropped", b"v").unwrap();
            db.delete(b"dropped").unwrap();
            db.close().unwrap();
        }

        let db = Database::open(&path).unwrap();
        assert_eq!(db.get(b"kept").unwrap(), b"v");
        assert_eq!(err_kind(db.get(b"dropped")), StoreError::KeyDeleted);
    }

    #[test]
    fn replay_keeps_only_the_latest_version() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("db");

        {
            let db = Database::open(&path).unwrap();
            for round in 0..5u8 {
                db.put(b"k", &[round]).unwrap();
            }
            db.close().unwrap();
        }

        let db = Database::open(&path).unwrap();
        assert_eq!(db.get(b"k").unwrap(), [4]);
        assert_eq!(db.len(), 1);
    }

    #[test]
    fn repeated_open_close_cycles() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("db");

        for i in 0..10u32 {
            let db = Database::open(&path).unwrap();
            db.put(format!("cycle-{i}").as_bytes(), &i.to_le_bytes())
                .unwrap();
            db.close().unwrap();
        }

        let db = Database::open(&path).unwrap();
        assert_eq!(db.len(), 10);
        for i in 0..10u32 {
            assert_eq!(
                db.get(format!("cycle-{i}").as_bytes()).unwrap(),
                i.to_le_bytes()
            );
        }
    }
}

mod segment_scan_tests {
    use super::*;

    #[test]
    fn scan_yields_entries_in_write_order() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("db");

        {
            let db = Database::open(&path).unwrap();
            for key in [b"a1", b"a2", b"a3"] {
                db.put(key, key).unwrap();
            }
            db.close().unwrap();
        }

        let segment = Segment::open(0, path.join("0000")).unwrap();
        let mut seen = Vec::new();
        segment
            .for_each_entry(|_, entry| {
                seen.push((entry.key().to_vec(), entry.value().to_vec()));
                Ok(())
            })
            .unwrap();

        assert_eq!(
            seen,
            vec![
                (b"a1".to_vec(), b"a1".to_vec()),
                (b"a2".to_vec(), b"a2".to_vec()),
                (b"a3".to_vec(), b"a3".to_vec()),
            ]
        );
    }
}

mod interrupted_creation_tests {
    use super::*;
    use std::fs;

    #[test]
    fn leftover_initializing_file_is_cleaned_up() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("db");

        {
            let db = Database::open(&path).unwrap();
            db.put(b"k", b"v").unwrap();
            db.close().unwrap();
        }
        // Simulate a crash between header sync and rename.
        fs::write(path.join("0001.initializing"), b"ArSeG\x01partial").unwrap();

        let db = Database::open(&path).unwrap();

        assert!(!path.join("0001.initializing").exists());
        assert_eq!(db.get(b"k").unwrap(), b"v");
        assert_eq!(db.stats().segments, 1);
    }
}
