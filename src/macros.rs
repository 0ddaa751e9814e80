//! # Internal Macros
//!
//! This module provides internal macros for reducing boilerplate in ArkDB.
//!
//! ## zerocopy_accessors!
//!
//! Generates getter and setter methods for zerocopy struct fields that use
//! little-endian wrapper types (U16, U32, U64).
//!
//! ### Usage
//!
//! ```ignore
//! use zerocopy::little_endian::U32;
//!
//! #[repr(C)]
//! struct Header {
//!     value_len: U32,
//!     checksum: U32,
//! }
//!
//! impl Header {
//!     zerocopy_accessors! {
//!         value_len: u32,
//!         checksum: u32,
//!     }
//! }
//!
//! // Generates:
//! // pub fn value_len(&self) -> u32 { self.value_len.get() }
//! // pub fn set_value_len(&mut self, val: u32) { self.value_len = U32::new(val); }
//! // pub fn checksum(&self) -> u32 { self.checksum.get() }
//! // pub fn set_checksum(&mut self, val: u32) { self.checksum = U32::new(val); }
//! ```

/// Generates getter and setter methods for zerocopy little-endian fields.
#[macro_export]
macro_rules! zerocopy_accessors {
    (@impl $field:ident, u16) => {
        ::paste::paste! {
            #[inline]
            pub fn $field(&self) -> u16 {
                self.$field.get()
            }

            #[inline]
            pub fn [<set_ $field>](&mut self, val: u16) {
                self.$field = ::zerocopy::little_endian::U16::new(val);
            }
        }
    };
    (@impl $field:ident, u32) => {
        ::paste::paste! {
            #[inline]
            pub fn $field(&self) -> u32 {
                self.$field.get()
            }

            #[inline]
            pub fn [<set_ $field>](&mut self, val: u32) {
                self.$field = ::zerocopy::little_endian::U32::new(val);
            }
        }
    };
    (@impl $field:ident, u64) => {
        ::paste::paste! {
            #[inline]
            pub fn $field(&self) -> u64 {
                self.$field.get()
            }

            #[inline]
            pub fn [<set_ $field>](&mut self, val: u64) {
                self.$field = ::zerocopy::little_endian::U64::new(val);
            }
        }
    };
    ($($field:ident: $ty:tt),+ $(,)?) => {
        $(
            $crate::zerocopy_accessors!(@impl $field, $ty);
        )+
    };
}
