//! # Storage Module
//!
//! This module provides the on-disk layer of ArkDB: memory-mapped files
//! and the append-only segments built on top of them.
//!
//! ## Architecture Overview
//!
//! The storage layer is built around memory-mapped I/O. Instead of copying
//! data between kernel and user space, segment files are mapped directly
//! into the process address space:
//!
//! - **Zero-copy reads**: entry lookups return `&[u8]` slices pointing
//!   into the mapping
//! - **Minimal syscall overhead**: appends are memcpys into the mapping;
//!   durability is a single msync when requested
//! - **Efficient caching**: the OS page cache is the only cache
//!
//! ## Database Directory Layout
//!
//! ```text
//! database_dir/
//! ├── 0000                 # First segment (1 GiB, pre-allocated)
//! ├── 0001                 # Created when 0000 could not fit an entry
//! └── 0002                 # Active segment (highest id)
//! ```
//!
//! Segment files are named with their 4-digit lowercase hexadecimal id.
//! Files whose names do not parse as such are ignored by the directory
//! scan; a leftover `<id>.initializing` file from an interrupted creation
//! is deleted on open.
//!
//! ## Safety Model
//!
//! Mapped regions stay valid for the lifetime of their segment because
//! segments never grow or remap: files are pre-allocated to full size at
//! creation, and the single writer only appends past offsets that readers
//! could have observed. Owned read results are copied out of the mapping
//! before the segment lock is released.
//!
//! ## Module Organization
//!
//! - `mmap`: fixed-length memory-mapped file ([`MmapFile`])
//! - `segment`: append-only entry log over a mapping ([`Segment`])

mod mmap;
mod segment;

pub use mmap::{AccessMode, MmapFile};
pub use segment::{parse_segment_filename, segment_filename, Segment, SegmentHeader};
