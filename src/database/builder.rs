//! # Database Builder
//!
//! This module provides the `DatabaseBuilder` API for configuring and
//! opening ArkDB databases.
//!
//! ## Configuration Options
//!
//! | Option    | Default          | Description                            |
//! |-----------|------------------|----------------------------------------|
//! | path      | (required)       | Database directory, created if missing |
//! | fsync     | false            | Flush after every mutating operation   |
//! | hash_fn   | seeded xxh3-64   | 64-bit key hash used by the index      |
//!
//! ## Durability Tradeoff
//!
//! With `fsync(false)` (the default), writes land in the mmap and the OS
//! decides when dirty pages reach disk; a machine crash can lose the most
//! recent writes, a process crash cannot. With `fsync(true)` every
//! `put`/`delete` returns only after msync+fsync, which bounds loss to
//! nothing but serializes all readers behind the sync (the flush happens
//! inside the exclusive lock).
//!
//! ## Custom Hash Functions
//!
//! The hash function must be deterministic across runs, because the index
//! is rebuilt from segment files on every open. Changing the function for an
//! existing database is safe for the same reason: nothing hash-derived is
//! persisted.
//!
//! ## Usage Examples
//!
//! ### Defaults:
//!
//! ```ignore
//! let db = Database::builder()
//!     .path("./archive")
//!     .open()?;
//! ```
//!
//! ### Durable writes and a custom hash:
//!
//! ```ignore
//! let db = Database::builder()
//!     .path("./archive")
//!     .fsync(true)
//!     .hash_fn(my_hash64)
//!     .open()?;
//! ```

use std::path::{Path, PathBuf};

use eyre::Result;

use crate::hash::{default_hash, HashFn};

use super::{Database, Options};

/// Builder for configuring and opening an ArkDB database.
///
/// Use [`Database::builder`] to create one, chain configuration methods,
/// then call [`open`](DatabaseBuilder::open).
pub struct DatabaseBuilder {
    path: Option<PathBuf>,
    fsync: bool,
    hash_fn: HashFn,
}

impl Default for DatabaseBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl DatabaseBuilder {
    /// Creates a builder with default settings.
    pub fn new() -> Self {
        Self {
            path: None,
            fsync: false,
            hash_fn: default_hash,
        }
    }

    /// Sets the database directory. Created if it does not exist.
    pub fn path<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.path = Some(path.as_ref().to_path_buf());
        self
    }

    /// Flush the active segment to stable storage after every mutating
    /// operation. Defaults to `false`.
    pub fn fsync(mut self, fsync: bool) -> Self {
        self.fsync = fsync;
        self
    }

    /// Replaces the 64-bit key hash used by the index. Defaults to a
    /// seeded xxh3-64. Must be deterministic across process restarts.
    pub fn hash_fn(mut self, hash_fn: HashFn) -> Self {
        self.hash_fn = hash_fn;
        self
    }

    /// Opens or creates the database with the configured settings.
    ///
    /// # Errors
    ///
    /// Returns an error if no path was specified, the directory cannot be
    /// created or read, or a segment file is corrupt
    /// (`InvalidSegment`/`InvalidSegmentVersion`).
    pub fn open(self) -> Result<Database> {
        let path = self
            .path
            .as_ref()
            .ok_or_else(|| eyre::eyre!("database path not specified: call .path() first"))?;

        Database::open_with_options(
            path,
            Options {
                fsync: self.fsync,
                hash_fn: self.hash_fn,
            },
        )
    }

    /// Returns the configured path, if any.
    pub fn get_path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Returns whether per-operation fsync is enabled.
    pub fn get_fsync(&self) -> bool {
        self.fsync
    }
}
