//! # Segment
//!
//! A segment is one pre-allocated append-only file holding a short header
//! followed by a contiguous run of entries.
//!
//! ## File Format
//!
//! ```text
//! +------------+-------------+---------+---------+-----+--------------+
//! | magic (5B) | version(1B) | entry 0 | entry 1 | ... | zero fill    |
//! | "ArSeG"    | 0x01        |         |         |     | to capacity  |
//! +------------+-------------+---------+---------+-----+--------------+
//! ```
//!
//! Files are named with the 4-digit lowercase hexadecimal segment id
//! (`0000`, `0001`, ...) and truncated to [`SEGMENT_SIZE`] at creation.
//! The zero fill is load-bearing: `0` is not a valid entry flag, so a
//! forward scan from offset 6 finds the logical end of the segment at the
//! first byte that does not decode to a valid flag.
//!
//! ## Creation Protocol
//!
//! `create` writes the header into `<name>.initializing`, truncates to
//! full size, fsyncs, and only then renames to the final name. A crash
//! mid-creation leaves at worst a `.initializing` file, which the database
//! deletes on open; a half-initialized segment never appears under a
//! parseable name.
//!
//! ## Write Protocol
//!
//! Writes go through the mmap cursor, which `open` positions at the first
//! byte past the last valid entry. `can_write` pre-checks capacity, so a
//! partial entry is never started; the database rolls over to a new
//! segment when the active one cannot fit the next entry. Sealed segments
//! (every segment but the last) are never written again.

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use eyre::{Result, WrapErr};
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout, Unaligned};

use crate::config::{
    ENTRY_HEADER_SIZE, SEGMENT_HEADER_SIZE, SEGMENT_INITIALIZING_EXT, SEGMENT_MAGIC, SEGMENT_SIZE,
    SEGMENT_VERSION,
};
use crate::entry::{Entry, EntryHeader};
use crate::error::StoreError;

use super::mmap::{AccessMode, MmapFile};

/// The 6-byte segment file header.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, IntoBytes, FromBytes, Immutable, KnownLayout, Unaligned)]
pub struct SegmentHeader {
    magic: [u8; 5],
    version: u8,
}

const _: () = assert!(
    std::mem::size_of::<SegmentHeader>() == SEGMENT_HEADER_SIZE,
    "SegmentHeader must pack to exactly SEGMENT_HEADER_SIZE bytes"
);

impl SegmentHeader {
    pub(crate) fn new() -> Self {
        Self {
            magic: *SEGMENT_MAGIC,
            version: SEGMENT_VERSION,
        }
    }

    /// Decodes and validates the magic; version compatibility is the
    /// caller's decision.
    fn decode(b: &[u8]) -> Result<Self> {
        if b.len() < SEGMENT_HEADER_SIZE {
            return Err(StoreError::InvalidSegment).wrap_err("segment header truncated");
        }
        let hdr = SegmentHeader::read_from_bytes(&b[..SEGMENT_HEADER_SIZE])
            .map_err(|_| StoreError::InvalidSegment)?;
        if hdr.magic != *SEGMENT_MAGIC {
            return Err(StoreError::InvalidSegment).wrap_err("invalid magic");
        }
        Ok(hdr)
    }

    pub fn version(&self) -> u8 {
        self.version
    }
}

/// One append-only log file.
#[derive(Debug)]
pub struct Segment {
    id: u16,
    path: PathBuf,
    mmap: MmapFile,
    size: u32,
}

impl Segment {
    /// Atomically creates an empty segment at `path` and opens it.
    pub fn create<P: AsRef<Path>>(id: u16, path: P) -> Result<Self> {
        let path = path.as_ref();
        let tmp = path.with_extension(SEGMENT_INITIALIZING_EXT);

        let mut file = File::create(&tmp)
            .wrap_err_with(|| format!("failed to create segment at '{}'", tmp.display()))?;
        file.write_all(SegmentHeader::new().as_bytes())
            .wrap_err("failed to write segment header")?;
        file.set_len(u64::from(SEGMENT_SIZE))
            .wrap_err_with(|| format!("failed to pre-allocate {} bytes", SEGMENT_SIZE))?;
        file.sync_all()
            .wrap_err_with(|| format!("failed to sync new segment '{}'", tmp.display()))?;
        drop(file);

        // Rename after fsync so a half-initialized file never appears
        // under the final name.
        fs::rename(&tmp, path).wrap_err_with(|| {
            format!(
                "failed to rename '{}' to '{}'",
                tmp.display(),
                path.display()
            )
        })?;

        Self::open(id, path)
    }

    /// Maps the segment, verifies its header, and scans forward to find
    /// the first byte past the last valid entry.
    pub fn open<P: AsRef<Path>>(id: u16, path: P) -> Result<Self> {
        let path = path.as_ref();
        let mmap = MmapFile::open(path, AccessMode::ReadWrite)
            .wrap_err_with(|| format!("failed to map segment {:04x}", id))?;

        let hdr = SegmentHeader::decode(mmap.read_at(0, SEGMENT_HEADER_SIZE.min(mmap.len()))?)
            .wrap_err_with(|| format!("segment '{}'", path.display()))?;
        if hdr.version() != SEGMENT_VERSION {
            return Err(StoreError::InvalidSegmentVersion).wrap_err_with(|| {
                format!(
                    "segment '{}' has version {}, expected {}",
                    path.display(),
                    hdr.version(),
                    SEGMENT_VERSION
                )
            });
        }

        let mut segment = Self {
            id,
            path: path.to_path_buf(),
            mmap,
            size: SEGMENT_HEADER_SIZE as u32,
        };
        segment.size = segment.scan_size()?;
        segment.mmap.seek(segment.size as usize)?;
        Ok(segment)
    }

    /// Walks the entry stream from the segment header to the first invalid
    /// flag (the zero-filled tail) or the end of capacity.
    fn scan_size(&self) -> Result<u32> {
        let capacity = u64::from(self.capacity());
        let mut size = SEGMENT_HEADER_SIZE as u64;
        while size + ENTRY_HEADER_SIZE as u64 <= capacity {
            let hdr = EntryHeader::decode(self.mmap.read_at(size as usize, ENTRY_HEADER_SIZE)?)?;
            if hdr.flag().is_none() {
                break;
            }
            let entry_size = hdr.entry_size();
            if size + entry_size > capacity {
                // A header whose lengths run past capacity cannot be a
                // complete entry; treat the tail as unwritten.
                break;
            }
            size += entry_size;
        }
        Ok(size as u32)
    }

    pub fn id(&self) -> u16 {
        self.id
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Bytes used by the header and all valid entries.
    pub fn size(&self) -> u32 {
        self.size
    }

    /// Total writable bytes, i.e. the mapped file length. Normally
    /// [`SEGMENT_SIZE`]; smaller files roll over sooner. Clamped so an
    /// oversized file cannot wrap 32-bit offsets.
    pub fn capacity(&self) -> u32 {
        self.mmap.len().min(u32::MAX as usize) as u32
    }

    pub fn is_closed(&self) -> bool {
        self.mmap.is_closed()
    }

    /// Whether `entry` fits in the remaining capacity.
    pub fn can_write(&self, entry: &Entry<'_>) -> bool {
        !self.is_closed() && u64::from(self.size) + entry.size() <= u64::from(self.capacity())
    }

    /// Appends header, key, and value contiguously at the write cursor.
    pub fn write_entry(&mut self, entry: &Entry<'_>) -> Result<()> {
        if !self.can_write(entry) {
            return Err(StoreError::SegmentNotWritable).wrap_err_with(|| {
                format!(
                    "entry of {} bytes does not fit segment {:04x} ({} of {} bytes used)",
                    entry.size(),
                    self.id,
                    self.size,
                    self.capacity()
                )
            });
        }
        debug_assert_eq!(self.mmap.position(), self.size as usize);

        self.mmap
            .write(entry.header().as_bytes())
            .wrap_err("failed to write entry header")?;
        self.mmap.write(entry.key()).wrap_err("failed to write key")?;
        self.mmap
            .write(entry.value())
            .wrap_err("failed to write value")?;

        // can_write bounded the sum by capacity, so the cast is lossless.
        self.size += entry.size() as u32;
        Ok(())
    }

    /// Reads the entry whose header starts at `offset`. The returned entry
    /// borrows the segment mapping.
    pub fn read_entry(&self, offset: u32) -> Result<Entry<'_>> {
        if offset >= self.size || offset + ENTRY_HEADER_SIZE as u32 > self.size {
            return Err(StoreError::InvalidOffset).wrap_err_with(|| {
                format!(
                    "offset {} exceeds segment {:04x} size {}",
                    offset, self.id, self.size
                )
            });
        }
        let hdr = EntryHeader::decode(self.mmap.read_at(offset as usize, ENTRY_HEADER_SIZE)?)?;
        if hdr.flag().is_none() {
            return Err(StoreError::InvalidOffset).wrap_err_with(|| {
                format!(
                    "offset {} in segment {:04x} holds flag byte {}, not an entry",
                    offset,
                    self.id,
                    hdr.raw_flag()
                )
            });
        }
        if u64::from(offset) + hdr.entry_size() > u64::from(self.size) {
            return Err(StoreError::InvalidOffset).wrap_err_with(|| {
                format!(
                    "entry at offset {} runs past segment {:04x} size {}",
                    offset, self.id, self.size
                )
            });
        }

        let key_start = offset as usize + ENTRY_HEADER_SIZE;
        let key = self.mmap.read_at(key_start, usize::from(hdr.key_len()))?;
        let value = self
            .mmap
            .read_at(key_start + key.len(), hdr.value_len() as usize)?;
        Ok(Entry::from_parts(hdr, key, value))
    }

    /// Walks every entry in order, invoking `f` with the entry's offset.
    /// An invalid flag ends the walk; it is the end-of-log marker, not an
    /// error.
    pub fn for_each_entry<F>(&self, mut f: F) -> Result<()>
    where
        F: FnMut(u32, Entry<'_>) -> Result<()>,
    {
        let mut offset = SEGMENT_HEADER_SIZE as u32;
        while offset + ENTRY_HEADER_SIZE as u32 <= self.size {
            let hdr = EntryHeader::decode(self.mmap.read_at(offset as usize, ENTRY_HEADER_SIZE)?)?;
            if hdr.flag().is_none() {
                break;
            }
            let entry = self.read_entry(offset)?;
            f(offset, entry)?;
            // read_entry bounded the entry by self.size, so this fits.
            offset += hdr.entry_size() as u32;
        }
        Ok(())
    }

    /// Flushes the mapping to stable storage.
    pub fn flush(&self) -> Result<()> {
        self.mmap
            .sync()
            .wrap_err_with(|| format!("failed to flush segment {:04x}", self.id))
    }

    /// Unmaps the segment. Idempotent.
    pub fn close(&mut self) -> Result<()> {
        self.mmap.close()
    }
}

/// Parses a directory entry name as a segment id: exactly four hexadecimal
/// digits. Anything else is not a segment file and is skipped by the
/// directory scan.
pub fn parse_segment_filename(name: &str) -> Option<u16> {
    if name.len() != 4 || !name.bytes().all(|b| b.is_ascii_hexdigit()) {
        return None;
    }
    u16::from_str_radix(name, 16).ok()
}

/// The file name for a segment id.
pub fn segment_filename(id: u16) -> String {
    format!("{:04x}", id)
}
