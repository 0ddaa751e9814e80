//! # Memory-Mapped File
//!
//! This module implements [`MmapFile`], the low-level building block for
//! segment I/O. It maps an entire file into the process address space and
//! exposes positional reads and writes over the mapping.
//!
//! ## Design
//!
//! Reads return `&[u8]` slices pointing directly into the mapping, with
//! no allocation and no copy. Writes copy the caller's bytes into the mapping;
//! the OS writes dirty pages back, and [`MmapFile::sync`] forces them to
//! stable storage.
//!
//! The mapping is fixed-length for the lifetime of the handle: segments
//! are pre-allocated to their full size at creation, so there is no grow
//! or remap path, and slices handed out for sealed regions stay valid
//! until the handle is closed.
//!
//! Alongside `read_at`/`write_at`, the handle keeps an implicit cursor
//! (`seek`/`read`/`write`) used by the segment append path.
//!
//! ## Modes and Lifecycle
//!
//! A handle is opened [`AccessMode::Read`] or [`AccessMode::ReadWrite`];
//! writing through a read-only handle fails `BadDescriptor`. Reads past
//! the mapped length fail `InvalidOffset`; writes past it fail
//! `ShortWrite` (callers pre-allocate, so this indicates a logic error or
//! an undersized file). `close` unmaps and drops the descriptor, is
//! idempotent, and every later operation fails `Closed`.

use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};

use eyre::{ensure, Result, WrapErr};
use memmap2::{Mmap, MmapMut};

use crate::error::StoreError;

/// How a mapping may be accessed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessMode {
    Read,
    ReadWrite,
}

#[derive(Debug)]
enum Map {
    Ro(Mmap),
    Rw(MmapMut),
}

impl Map {
    fn as_slice(&self) -> &[u8] {
        match self {
            Map::Ro(m) => m,
            Map::Rw(m) => m,
        }
    }

    fn len(&self) -> usize {
        self.as_slice().len()
    }
}

#[derive(Debug)]
struct Inner {
    file: File,
    map: Map,
}

/// A file mapped in its entirety, with positional access and an implicit
/// write cursor.
#[derive(Debug)]
pub struct MmapFile {
    path: PathBuf,
    mode: AccessMode,
    position: usize,
    inner: Option<Inner>,
}

impl MmapFile {
    /// Maps the entire current length of the file at `path`.
    pub fn open<P: AsRef<Path>>(path: P, mode: AccessMode) -> Result<Self> {
        let path = path.as_ref();

        let file = OpenOptions::new()
            .read(true)
            .write(mode == AccessMode::ReadWrite)
            .open(path)
            .wrap_err_with(|| format!("failed to open '{}'", path.display()))?;

        let len = file
            .metadata()
            .wrap_err_with(|| format!("failed to stat '{}'", path.display()))?
            .len();

        ensure!(len > 0, "cannot map empty file '{}'", path.display());

        // SAFETY: mapping a file is unsafe because external processes could
        // truncate or modify it under us. This is safe because:
        // 1. The database directory is single-process by contract; nothing
        //    else writes these files.
        // 2. The mapping length is fixed at open and never re-truncated by
        //    this handle.
        // 3. All access goes through read_at/write_at, which bounds-check
        //    against the mapped length.
        let map = unsafe {
            match mode {
                AccessMode::Read => Map::Ro(
                    Mmap::map(&file)
                        .wrap_err_with(|| format!("failed to mmap '{}'", path.display()))?,
                ),
                AccessMode::ReadWrite => Map::Rw(
                    MmapMut::map_mut(&file)
                        .wrap_err_with(|| format!("failed to mmap '{}'", path.display()))?,
                ),
            }
        };

        Ok(Self {
            path: path.to_path_buf(),
            mode,
            position: 0,
            inner: Some(Inner { file, map }),
        })
    }

    fn inner(&self) -> Result<&Inner> {
        self.inner
            .as_ref()
            .ok_or(StoreError::Closed)
            .wrap_err_with(|| format!("mapping of '{}' is closed", self.path.display()))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn mode(&self) -> AccessMode {
        self.mode
    }

    /// Mapped length in bytes; zero once closed.
    pub fn len(&self) -> usize {
        self.inner.as_ref().map_or(0, |i| i.map.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_closed(&self) -> bool {
        self.inner.is_none()
    }

    /// Current cursor position.
    pub fn position(&self) -> usize {
        self.position
    }

    /// Moves the cursor. The cursor may sit anywhere up to and including
    /// the mapped length (one past the last byte).
    pub fn seek(&mut self, position: usize) -> Result<()> {
        let len = self.inner()?.map.len();
        if position > len {
            return Err(StoreError::InvalidOffset)
                .wrap_err_with(|| format!("seek to {} past mapped length {}", position, len));
        }
        self.position = position;
        Ok(())
    }

    /// Returns `n` bytes at `offset` as a slice into the mapping.
    pub fn read_at(&self, offset: usize, n: usize) -> Result<&[u8]> {
        let inner = self.inner()?;
        let len = inner.map.len();
        if offset.checked_add(n).map_or(true, |end| end > len) {
            return Err(StoreError::InvalidOffset).wrap_err_with(|| {
                format!(
                    "read of {} bytes at offset {} exceeds mapped length {}",
                    n, offset, len
                )
            });
        }
        Ok(&inner.map.as_slice()[offset..offset + n])
    }

    /// Reads `n` bytes at the cursor and advances it.
    pub fn read(&mut self, n: usize) -> Result<&[u8]> {
        let offset = self.position;
        let len = self.inner()?.map.len();
        if offset.checked_add(n).map_or(true, |end| end > len) {
            return Err(StoreError::InvalidOffset).wrap_err_with(|| {
                format!(
                    "read of {} bytes at offset {} exceeds mapped length {}",
                    n, offset, len
                )
            });
        }
        self.position = offset + n;
        let inner = self.inner()?;
        Ok(&inner.map.as_slice()[offset..offset + n])
    }

    /// Copies `buf` into the mapping at `offset`.
    pub fn write_at(&mut self, buf: &[u8], offset: usize) -> Result<()> {
        if self.mode != AccessMode::ReadWrite {
            return Err(StoreError::BadDescriptor).wrap_err_with(|| {
                format!(
                    "write through read-only mapping of '{}'",
                    self.path.display()
                )
            });
        }
        let inner = match self.inner.as_mut() {
            Some(inner) => inner,
            None => {
                return Err(StoreError::Closed)
                    .wrap_err_with(|| format!("mapping of '{}' is closed", self.path.display()))
            }
        };
        let len = inner.map.len();
        if offset.checked_add(buf.len()).map_or(true, |end| end > len) {
            return Err(StoreError::ShortWrite).wrap_err_with(|| {
                format!(
                    "write of {} bytes at offset {} exceeds mapped length {}",
                    buf.len(),
                    offset,
                    len
                )
            });
        }
        match &mut inner.map {
            Map::Rw(m) => m[offset..offset + buf.len()].copy_from_slice(buf),
            // Unreachable: mode was checked above and never changes.
            Map::Ro(_) => return Err(StoreError::BadDescriptor.into()),
        }
        Ok(())
    }

    /// Copies `buf` into the mapping at the cursor and advances it.
    pub fn write(&mut self, buf: &[u8]) -> Result<()> {
        let offset = self.position;
        self.write_at(buf, offset)?;
        self.position = offset + buf.len();
        Ok(())
    }

    /// Flushes dirty pages and the underlying file buffers to stable
    /// storage.
    pub fn sync(&self) -> Result<()> {
        let inner = self.inner()?;
        if let Map::Rw(m) = &inner.map {
            m.flush()
                .wrap_err_with(|| format!("failed to msync '{}'", self.path.display()))?;
            inner
                .file
                .sync_all()
                .wrap_err_with(|| format!("failed to fsync '{}'", self.path.display()))?;
        }
        Ok(())
    }

    /// Unmaps and closes the file descriptor. Idempotent.
    pub fn close(&mut self) -> Result<()> {
        self.inner = None;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn err_kind<T: std::fmt::Debug>(result: Result<T>) -> StoreError {
        *result.unwrap_err().downcast_ref::<StoreError>().unwrap()
    }

    fn temp_file(len: u64) -> (tempfile::TempDir, PathBuf) {
        let dir = tempdir().unwrap();
        let path = dir.path().join("data");
        let file = File::create(&path).unwrap();
        file.set_len(len).unwrap();
        (dir, path)
    }

    #[test]
    fn write_then_read_at_roundtrips() {
        let (_dir, path) = temp_file(64);
        let mut m = MmapFile::open(&path, AccessMode::ReadWrite).unwrap();

        m.write_at(b"hello", 10).unwrap();

        assert_eq!(m.read_at(10, 5).unwrap(), b"hello");
        assert_eq!(m.len(), 64);
    }

    #[test]
    fn cursor_reads_and_writes_advance() {
        let (_dir, path) = temp_file(32);
        let mut m = MmapFile::open(&path, AccessMode::ReadWrite).unwrap();

        m.write(b"abc").unwrap();
        m.write(b"def").unwrap();
        assert_eq!(m.position(), 6);

        m.seek(0).unwrap();
        assert_eq!(m.read(6).unwrap(), b"abcdef");
        assert_eq!(m.position(), 6);
    }

    #[test]
    fn read_only_mode_rejects_writes() {
        let (_dir, path) = temp_file(32);
        {
            let mut m = MmapFile::open(&path, AccessMode::ReadWrite).unwrap();
            m.write_at(b"persisted", 0).unwrap();
            m.sync().unwrap();
        }

        let mut m = MmapFile::open(&path, AccessMode::Read).unwrap();
        assert_eq!(m.read_at(0, 9).unwrap(), b"persisted");
        assert_eq!(err_kind(m.write_at(b"x", 0)), StoreError::BadDescriptor);
    }

    #[test]
    fn out_of_range_read_fails_invalid_offset() {
        let (_dir, path) = temp_file(16);
        let m = MmapFile::open(&path, AccessMode::ReadWrite).unwrap();

        assert_eq!(err_kind(m.read_at(16, 1)), StoreError::InvalidOffset);
        assert_eq!(err_kind(m.read_at(8, 9)), StoreError::InvalidOffset);
        assert_eq!(err_kind(m.read_at(usize::MAX, 2)), StoreError::InvalidOffset);
    }

    #[test]
    fn write_past_end_fails_short_write() {
        let (_dir, path) = temp_file(16);
        let mut m = MmapFile::open(&path, AccessMode::ReadWrite).unwrap();

        assert_eq!(err_kind(m.write_at(b"xy", 15)), StoreError::ShortWrite);

        m.seek(14).unwrap();
        assert_eq!(err_kind(m.write(b"abc")), StoreError::ShortWrite);
        // A failed write must not move the cursor.
        assert_eq!(m.position(), 14);
    }

    #[test]
    fn seek_past_end_fails() {
        let (_dir, path) = temp_file(16);
        let mut m = MmapFile::open(&path, AccessMode::ReadWrite).unwrap();

        m.seek(16).unwrap();
        assert_eq!(err_kind(m.seek(17)), StoreError::InvalidOffset);
    }

    #[test]
    fn operations_after_close_fail_closed() {
        let (_dir, path) = temp_file(16);
        let mut m = MmapFile::open(&path, AccessMode::ReadWrite).unwrap();

        m.close().unwrap();
        m.close().unwrap();

        assert!(m.is_closed());
        assert_eq!(m.len(), 0);
        assert_eq!(err_kind(m.read_at(0, 1)), StoreError::Closed);
        assert_eq!(err_kind(m.write_at(b"x", 0)), StoreError::Closed);
        assert_eq!(err_kind(m.sync()), StoreError::Closed);
    }

    #[test]
    fn open_empty_file_fails() {
        let (_dir, path) = temp_file(0);
        assert!(MmapFile::open(&path, AccessMode::ReadWrite).is_err());
    }

    #[test]
    fn sync_persists_across_handles() {
        let (_dir, path) = temp_file(8);

        {
            let mut m = MmapFile::open(&path, AccessMode::ReadWrite).unwrap();
            m.write_at(b"durable!", 0).unwrap();
            m.sync().unwrap();
        }

        let m = MmapFile::open(&path, AccessMode::Read).unwrap();
        assert_eq!(m.read_at(0, 8).unwrap(), b"durable!");
    }
}
