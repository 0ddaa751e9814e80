//! # ArkDB Configuration Constants
//!
//! This module centralizes all configuration constants, grouping
//! interdependent values together and documenting their relationships.
//! Constants that depend on each other are co-located to prevent mismatch
//! bugs.
//!
//! ## Dependency Graph
//!
//! ```text
//! SEGMENT_SIZE (1 GiB)
//!       │
//!       ├─> MAX_VALUE_SIZE (derived: SEGMENT_SIZE - SEGMENT_HEADER_SIZE)
//!       │     A value must fit in a single segment together with its
//!       │     entry header and key.
//!       │
//!       └─> Segment files are truncated to SEGMENT_SIZE at creation and
//!           zero-filled past the last entry. The zero tail is how scans
//!           find the logical end of a segment (0 is not a valid flag).
//!
//! SEGMENT_HEADER_SIZE (6 bytes)
//!       │
//!       └─> SEGMENT_MAGIC (5 bytes) + one version byte. Entry offsets
//!           never point below this.
//!
//! ENTRY_HEADER_SIZE (10 bytes)
//!       │
//!       ├─> MAX_KEY_SIZE (255): the key length field is a single byte
//!       │
//!       └─> entry size = ENTRY_HEADER_SIZE + key_len + value_len
//!
//! INDEX_BUCKET_COUNT (512)
//!       │
//!       └─> Shard selection is `hash & (INDEX_BUCKET_COUNT - 1)`, so the
//!           count MUST be a power of two.
//! ```
//!
//! ## Critical Invariants
//!
//! These invariants are enforced by compile-time assertions:
//!
//! 1. `SEGMENT_HEADER_SIZE == SEGMENT_MAGIC.len() + 1`
//! 2. `MAX_VALUE_SIZE == SEGMENT_SIZE - SEGMENT_HEADER_SIZE` (derived)
//! 3. `INDEX_BUCKET_COUNT` is a power of two (shard mask correctness)
//! 4. `MAX_KEY_SIZE` fits the one-byte on-disk key length field

// ============================================================================
// SEGMENT LAYOUT
// These define the on-disk segment file format
// ============================================================================

/// Magic bytes at the start of every segment file.
pub const SEGMENT_MAGIC: &[u8; 5] = b"ArSeG";

/// On-disk segment format version. Bump for incompatible format changes
/// (TTL fields, wider key lengths, ...).
pub const SEGMENT_VERSION: u8 = 1;

/// Size of the segment file header: magic plus one version byte.
pub const SEGMENT_HEADER_SIZE: usize = 6;

/// Maximum size of a segment file in bytes (1 GiB). Segments are
/// pre-allocated to this length at creation; a new segment is created when
/// the active one cannot fit the next entry.
pub const SEGMENT_SIZE: u32 = 1 << 30;

/// File name suffix used while a segment is being initialized. The file is
/// atomically renamed to its final name only after the header is synced, so
/// a half-initialized segment never appears under a parseable name.
pub const SEGMENT_INITIALIZING_EXT: &str = "initializing";

const _: () = assert!(
    SEGMENT_HEADER_SIZE == SEGMENT_MAGIC.len() + 1,
    "SEGMENT_HEADER_SIZE must cover the magic and the version byte"
);

// ============================================================================
// ENTRY LAYOUT
// These define the on-disk entry format within a segment
// ============================================================================

/// Size of the fixed entry header:
/// `[flag:1][key_len:1][value_len:4 LE][checksum:4 LE]`.
pub const ENTRY_HEADER_SIZE: usize = 10;

/// Maximum key length in bytes. The on-disk key length field is a single
/// byte, so keys are limited to 255 bytes.
pub const MAX_KEY_SIZE: usize = u8::MAX as usize;

/// Maximum value length in bytes. A value must fit in a single segment
/// past the segment header.
pub const MAX_VALUE_SIZE: u32 = SEGMENT_SIZE - SEGMENT_HEADER_SIZE as u32;

const _: () = assert!(
    MAX_KEY_SIZE <= u8::MAX as usize,
    "MAX_KEY_SIZE must fit the one-byte on-disk key length field"
);

const _: () = assert!(
    MAX_VALUE_SIZE == SEGMENT_SIZE - SEGMENT_HEADER_SIZE as u32,
    "MAX_VALUE_SIZE derivation mismatch"
);

// ============================================================================
// INDEX CONFIGURATION
// These control lock contention characteristics
// ============================================================================

/// Number of shards in the in-memory index. Higher values reduce contention
/// between the writer and concurrent readers, at a small memory cost.
pub const INDEX_BUCKET_COUNT: usize = 512;

const _: () = assert!(
    INDEX_BUCKET_COUNT.is_power_of_two(),
    "INDEX_BUCKET_COUNT must be a power of two for shard mask selection"
);

// ============================================================================
// HASHING
// ============================================================================

/// Seed for the default keyed xxh3-64 hash. Fixed so that hashes are stable
/// across process restarts (the index is rebuilt from segments on open, so
/// the seed could change between runs, but a stable seed keeps behavior
/// reproducible).
pub const HASH_SEED: u64 = 0x9E37_79B9_7F4A_7C15;
