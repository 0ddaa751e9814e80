//! # Entry Codec
//!
//! An entry is the unit of the on-disk log: one `put` or one `delete`
//! recorded as a header, the key bytes, and the value bytes, packed
//! contiguously with no padding.
//!
//! ## Entry Format
//!
//! ```text
//! +----------+--------------+----------------+---------------+-----+-------+
//! | flag(1B) |  key_len(1B) | value_len (4B) | checksum (4B) | key | value |
//! +----------+--------------+----------------+---------------+-----+-------+
//! ```
//!
//! All multi-byte integers are little-endian. The checksum is CRC-32C
//! (Castagnoli) computed over the value bytes only. Total entry size is
//! `10 + key_len + value_len`.
//!
//! ## Flags
//!
//! `flag` is `1` (Put) or `2` (Delete). Any other value is invalid, which
//! doubles as the end-of-log marker: segments are zero-filled past the last
//! entry, and a scan stops at the first byte that does not decode to a
//! valid flag.
//!
//! ## Verification
//!
//! Reads go through [`Entry::verify`], which checks header/payload length
//! agreement, that the stored key equals the requested key (the index is
//! hash-addressed, so a collision lands here), and the value CRC. The
//! checks run in that order so a corrupted length is reported as
//! `LengthMismatch` rather than as a spurious checksum failure.

use crc::{Crc, CRC_32_ISCSI};
use eyre::Result;
use zerocopy::little_endian::U32;
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout, Unaligned};

use crate::config::{ENTRY_HEADER_SIZE, MAX_KEY_SIZE};
use crate::error::StoreError;

/// CRC-32/iSCSI, the Castagnoli polynomial (0x1EDC6F41).
const CRC32C: Crc<u32> = Crc::<u32>::new(&CRC_32_ISCSI);

/// Computes the value checksum stored in an entry header.
pub fn checksum(value: &[u8]) -> u32 {
    CRC32C.checksum(value)
}

/// What an entry records for its key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum EntryFlag {
    /// The key maps to the entry's value.
    Put = 1,
    /// The key is deleted; the entry is a tombstone with an empty value.
    Delete = 2,
}

impl EntryFlag {
    /// Decodes a raw flag byte. `None` means the byte does not start a
    /// valid entry, which scans treat as the logical end of the segment.
    pub fn from_u8(raw: u8) -> Option<Self> {
        match raw {
            1 => Some(EntryFlag::Put),
            2 => Some(EntryFlag::Delete),
            _ => None,
        }
    }
}

/// The fixed 10-byte entry header.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, IntoBytes, FromBytes, Immutable, KnownLayout, Unaligned)]
pub struct EntryHeader {
    flag: u8,
    key_len: u8,
    value_len: U32,
    checksum: U32,
}

const _: () = assert!(
    std::mem::size_of::<EntryHeader>() == ENTRY_HEADER_SIZE,
    "EntryHeader must pack to exactly ENTRY_HEADER_SIZE bytes"
);

impl EntryHeader {
    zerocopy_accessors! {
        value_len: u32,
        checksum: u32,
    }

    fn new(flag: EntryFlag, key_len: u8, value_len: u32, checksum: u32) -> Self {
        Self {
            flag: flag as u8,
            key_len,
            value_len: U32::new(value_len),
            checksum: U32::new(checksum),
        }
    }

    /// Decodes a header from the start of `b`.
    pub fn decode(b: &[u8]) -> Result<Self> {
        if b.len() < ENTRY_HEADER_SIZE {
            return Err(StoreError::InvalidEntryHeader.into());
        }
        let hdr = EntryHeader::read_from_bytes(&b[..ENTRY_HEADER_SIZE])
            .map_err(|_| StoreError::InvalidEntryHeader)?;
        Ok(hdr)
    }

    /// The raw flag byte as stored on disk.
    pub fn raw_flag(&self) -> u8 {
        self.flag
    }

    /// The decoded flag, or `None` for an invalid byte.
    pub fn flag(&self) -> Option<EntryFlag> {
        EntryFlag::from_u8(self.flag)
    }

    pub fn key_len(&self) -> u8 {
        self.key_len
    }

    /// Total on-disk size of the entry this header describes. Widened to
    /// u64 so a corrupt length field cannot overflow scan arithmetic.
    pub fn entry_size(&self) -> u64 {
        ENTRY_HEADER_SIZE as u64 + u64::from(self.key_len) + u64::from(self.value_len())
    }
}

/// A single log record. Write-side entries borrow the caller's key and
/// value; read-side entries borrow slices of the segment mmap, so owned
/// results must be copied out before the segment goes away.
#[derive(Debug, Clone, Copy)]
pub struct Entry<'a> {
    hdr: EntryHeader,
    key: &'a [u8],
    value: &'a [u8],
}

impl<'a> Entry<'a> {
    /// Builds an entry for writing, filling the checksum from `value`.
    /// This is the only way to construct an entry with a trusted header.
    ///
    /// The caller is responsible for key/value size validation; the
    /// database façade rejects oversized input before reaching here.
    pub fn new(flag: EntryFlag, key: &'a [u8], value: &'a [u8]) -> Self {
        debug_assert!(!key.is_empty() && key.len() <= MAX_KEY_SIZE);
        debug_assert!(value.len() <= u32::MAX as usize);
        Self {
            hdr: EntryHeader::new(flag, key.len() as u8, value.len() as u32, checksum(value)),
            key,
            value,
        }
    }

    /// Reassembles an entry read back from a segment. The header is taken
    /// as stored; [`verify`](Self::verify) decides whether to trust it.
    pub(crate) fn from_parts(hdr: EntryHeader, key: &'a [u8], value: &'a [u8]) -> Self {
        Self { hdr, key, value }
    }

    pub fn header(&self) -> &EntryHeader {
        &self.hdr
    }

    pub fn key(&self) -> &'a [u8] {
        self.key
    }

    pub fn value(&self) -> &'a [u8] {
        self.value
    }

    /// Total on-disk size in bytes.
    pub fn size(&self) -> u64 {
        self.hdr.entry_size()
    }

    pub fn is_tombstone(&self) -> bool {
        self.hdr.flag() == Some(EntryFlag::Delete)
    }

    /// Validates the entry against the key the caller asked for.
    pub fn verify(&self, expected_key: &[u8]) -> Result<()> {
        if usize::from(self.hdr.key_len()) != self.key.len()
            || self.hdr.value_len() as usize != self.value.len()
        {
            return Err(StoreError::LengthMismatch.into());
        }
        if self.key != expected_key {
            return Err(StoreError::KeyMismatch.into());
        }
        if checksum(self.value) != self.hdr.checksum() {
            return Err(StoreError::ChecksumFailed.into());
        }
        Ok(())
    }
}
