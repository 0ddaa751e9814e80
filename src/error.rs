//! # Error Codes
//!
//! This module defines [`StoreError`], the set of failures a caller can
//! meaningfully distinguish. Fallible operations throughout ArkDB return
//! `eyre::Result`, and `StoreError` values travel inside the `eyre::Report`
//! with whatever path/offset context the failing layer attached; match on
//! them with [`eyre::Report::downcast_ref`]:
//!
//! ```ignore
//! match db.get(b"missing") {
//!     Err(e) if e.downcast_ref() == Some(&StoreError::KeyNotFound) => { /* ... */ }
//!     other => { /* ... */ }
//! }
//! ```
//!
//! ## Taxonomy
//!
//! - **Validation** (pre-I/O): `EmptyKey`, `KeyTooLarge`, `ValueTooLarge`.
//!   Returned before any mutation.
//! - **Integrity**: `InvalidEntryHeader`, `LengthMismatch`, `KeyMismatch`,
//!   `ChecksumFailed`. Data corruption; the store stays operable because
//!   entries are independent.
//! - **Logical absence**: `KeyNotFound` (never written) vs `KeyDeleted`
//!   (tombstoned). Callers can tell first-write from overwrite-after-delete.
//! - **Segment lifecycle**: `InvalidSegment`, `InvalidSegmentVersion`,
//!   `SegmentNotFound`, `SegmentNotWritable`, `InvalidOffset`.
//! - **Mapping lifecycle**: `BadDescriptor`, `Closed`, `ShortWrite`.
//!
//! Plain I/O failures are not enumerated here; they surface as
//! `std::io::Error` wrapped with eyre context.

use thiserror::Error;

/// Caller-distinguishable failures of the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum StoreError {
    /// The key has never been written.
    #[error("key not found")]
    KeyNotFound,
    /// The latest entry for the key is a tombstone.
    #[error("key deleted")]
    KeyDeleted,
    /// Keys must be at least one byte.
    #[error("empty key")]
    EmptyKey,
    /// The key exceeds the 255-byte on-disk limit.
    #[error("key size is too large")]
    KeyTooLarge,
    /// The value cannot fit in a single segment.
    #[error("value size is too large")]
    ValueTooLarge,
    /// The entry at the indexed location holds a different key (hash
    /// collision).
    #[error("key mismatch")]
    KeyMismatch,
    /// Header lengths disagree with the stored payload.
    #[error("length mismatch")]
    LengthMismatch,
    /// CRC-32C over the value does not match the stored checksum.
    #[error("checksum failed")]
    ChecksumFailed,
    /// The entry header could not be decoded.
    #[error("invalid entry header")]
    InvalidEntryHeader,
    /// The offset does not point at a valid entry within the segment.
    #[error("invalid offset")]
    InvalidOffset,
    /// The segment cannot fit the entry.
    #[error("segment not writable")]
    SegmentNotWritable,
    /// The segment file header is malformed.
    #[error("invalid segment")]
    InvalidSegment,
    /// The segment format version is not supported.
    #[error("invalid segment version")]
    InvalidSegmentVersion,
    /// The index references a segment that is not loaded.
    #[error("segment not found")]
    SegmentNotFound,
    /// A write was attempted through a read-only mapping.
    #[error("bad file descriptor mode")]
    BadDescriptor,
    /// The mapping has been closed.
    #[error("file is closed")]
    Closed,
    /// A write would extend past the mapped length.
    #[error("short write")]
    ShortWrite,
}
