//! # Database Module
//!
//! This module provides the high-level Database API for ArkDB, combining
//! the storage layer (segments over mmap), the in-memory index, and the
//! durability policy into a unified interface.
//!
//! ## Write Pipeline
//!
//! ```text
//! put(key, value)
//!     │
//!     ▼
//! ┌─────────────────────────────────────────────────────┐
//! │ 1. VALIDATE: key 1..=255 bytes, value fits segment  │
//! └─────────────────────────────────────────────────────┘
//!     │
//!     ▼
//! ┌─────────────────────────────────────────────────────┐
//! │ 2. LOCK: exclusive database lock                    │
//! │    (rollover needs a stable active-segment view)    │
//! └─────────────────────────────────────────────────────┘
//!     │
//!     ▼
//! ┌─────────────────────────────────────────────────────┐
//! │ 3. APPEND: roll to segment id+1 if needed, then     │
//! │    write header+key+value at the segment cursor     │
//! └─────────────────────────────────────────────────────┘
//!     │
//!     ▼
//! ┌─────────────────────────────────────────────────────┐
//! │ 4. INDEX: hash(key) → (segment id, entry offset)    │
//! │    only after the bytes are in place                │
//! └─────────────────────────────────────────────────────┘
//!     │
//!     ▼
//! ┌─────────────────────────────────────────────────────┐
//! │ 5. DURABILITY: msync + fsync when fsync is enabled  │
//! └─────────────────────────────────────────────────────┘
//! ```
//!
//! `get` takes the shared lock, follows the index to `(segment, offset)`,
//! verifies the entry (lengths, stored key, CRC), and copies the value out
//! of the mapping. `delete` is a `put` of a tombstone entry.
//!
//! ## Concurrency
//!
//! `Database` is `Send + Sync`. One readers-writer lock serializes
//! mutations and lets reads proceed concurrently; the index adds per-shard
//! locks underneath so the writer's index update does not stall readers on
//! unrelated shards. The lock is deliberately coarse (archive workloads
//! write rarely), and fsync happens inside the exclusive section, so
//! callers that need concurrent reads during slow syncs should leave
//! `fsync` off and call [`Database::sync`] at their own cadence.
//!
//! ## Usage Example
//!
//! ```ignore
//! use arkdb::Database;
//!
//! let db = Database::builder()
//!     .path("./archive")
//!     .fsync(true)
//!     .open()?;
//!
//! db.put(b"report-2024-01", &bytes)?;
//! let report = db.get(b"report-2024-01")?;
//! db.close()?;
//! ```

#[allow(clippy::module_inception)]
mod database;
mod builder;

pub use builder::DatabaseBuilder;
pub use database::Database;

/// Point-in-time counters for diagnostics and tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Stats {
    /// Number of open segments, the active one included.
    pub segments: usize,
    /// Distinct key hashes in the index (collisions count once).
    pub keys: usize,
    /// Bytes used in the active segment, header included.
    pub active_segment_size: u32,
}

/// Resolved option set carried by an open database.
#[derive(Clone, Copy)]
pub(crate) struct Options {
    pub(crate) fsync: bool,
    pub(crate) hash_fn: crate::hash::HashFn,
}
