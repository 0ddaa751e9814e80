//! # Key Hashing
//!
//! The index addresses entries by a 64-bit hash of the key, never by the
//! key itself. The hash function is the one pluggable behavior of the
//! store, expressed as a plain function value rather than a trait: any
//! `fn(&[u8]) -> u64` can be supplied through
//! [`DatabaseBuilder::hash_fn`](crate::DatabaseBuilder::hash_fn).
//!
//! The default is xxh3-64 keyed with a fixed seed. Collisions are not
//! fatal: the database compares the stored key against the requested key
//! on every read and surfaces a mismatch as
//! [`StoreError::KeyMismatch`](crate::StoreError::KeyMismatch).
//!
//! The hash MUST be deterministic across process restarts; the index is
//! rebuilt from segments on every open and a drifting hash would strand
//! previously written keys.

use xxhash_rust::xxh3::xxh3_64_with_seed;

use crate::config::HASH_SEED;

/// A 64-bit key hash function.
pub type HashFn = fn(&[u8]) -> u64;

/// Default keyed hash: xxh3-64 seeded with [`HASH_SEED`].
pub fn default_hash(key: &[u8]) -> u64 {
    xxh3_64_with_seed(key, HASH_SEED)
}
