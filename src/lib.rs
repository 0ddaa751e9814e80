//! # ArkDB - Embeddable Append-Only Key/Value Store
//!
//! ArkDB is an embeddable key/value store optimized for archive workloads:
//! keys are written once and rarely overwritten, values are read back
//! verbatim, and nothing is ever updated in place. This Rust
//! implementation prioritizes:
//!
//! - **Zero-copy reads**: values are served from mmap'd segment files
//! - **Cheap writes**: an append is a memcpy into the active segment
//! - **Simple crash recovery**: the index is rebuilt by replaying segments
//!
//! ## Quick Start
//!
//! ```ignore
//! use arkdb::Database;
//!
//! let db = Database::builder()
//!     .path("./archive")
//!     .fsync(true)
//!     .open()?;
//!
//! db.put(b"report-2024-01", b"...")?;
//! assert_eq!(db.get(b"report-2024-01")?, b"...");
//! db.delete(b"report-2024-01")?;
//! db.close()?;
//! ```
//!
//! ## Architecture
//!
//! ArkDB uses a layered architecture:
//!
//! ```text
//! ┌─────────────────────────────────────┐
//! │       Public API (Database)         │
//! ├──────────────────┬──────────────────┤
//! │  In-Memory Index │  Entry Codec     │
//! │  hash → (seg,off)│  header+CRC-32C  │
//! ├──────────────────┴──────────────────┤
//! │      Segments (append-only log)     │
//! ├─────────────────────────────────────┤
//! │      Memory-Mapped File I/O         │
//! └─────────────────────────────────────┘
//! ```
//!
//! ## File Layout
//!
//! A database is a directory of fixed-size segment files named by
//! hexadecimal id:
//!
//! ```text
//! archive/
//! ├── 0000                 # oldest segment, sealed
//! ├── 0001                 # sealed
//! └── 0002                 # active segment, appends go here
//! ```
//!
//! Each segment holds a magic+version header and a contiguous run of
//! entries `[flag][key_len][value_len][crc32c][key][value]`. Deletes are
//! tombstone entries; stale and deleted data stays on disk (no
//! compaction), which is the archive-workload tradeoff.
//!
//! ## Concurrency Model
//!
//! Many readers, one writer: `get` takes a shared lock, `put`/`delete`
//! take an exclusive lock. A `get` that happens after a returned
//! `put(k, v)` observes `v` or a later value for `k`, never an older one.
//! The database is not safe for multi-process access.
//!
//! ## Module Overview
//!
//! - [`database`]: the `Database` façade and its builder
//! - [`storage`]: memory-mapped files and append-only segments
//! - [`entry`]: on-disk entry codec with CRC-32C integrity
//! - [`index`]: sharded in-memory hash index, rebuilt on open
//! - [`hash`]: default keyed xxh3-64 and the `HashFn` contract
//! - [`error`]: the `StoreError` code set
//! - [`config`]: format constants (segment size, key/value limits)

#[macro_use]
mod macros;

pub mod config;
pub mod database;
pub mod entry;
pub mod error;
pub mod hash;
pub mod index;
pub mod storage;

pub use database::{Database, DatabaseBuilder, Stats};
pub use error::StoreError;
pub use hash::{default_hash, HashFn};
