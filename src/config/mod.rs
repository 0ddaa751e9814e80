//! # Configuration Module
//!
//! Centralized configuration for ArkDB. All compile-time constants live in
//! `constants.rs` and are re-exported here; import them from this module
//! rather than defining values locally:
//!
//! ```ignore
//! use arkdb::config::{SEGMENT_SIZE, MAX_KEY_SIZE};
//! ```

mod constants;

pub use constants::*;
