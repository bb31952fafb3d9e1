#![warn(missing_docs)]
#![doc = include_str!("../README.md")]
#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

/// Errors reported by the checked set operations and policy construction.
pub mod error;

pub mod hash_table;

/// A hash set on top of the linear-probing `HashTable`.
///
/// This module provides a `HashSet` that pairs the `HashTable` with a
/// configurable hasher builder and exposes a standard set interface.
pub mod hash_set;

pub mod policy;

pub use error::Error;
pub use hash_set::HashSet;
pub use hash_table::HashTable;
pub use policy::ResizePolicy;

cfg_if::cfg_if! {
    if #[cfg(feature = "foldhash")] {
        /// The hasher builder used when none is specified.
        pub type DefaultHashBuilder = foldhash::fast::RandomState;
    } else if #[cfg(feature = "std")] {
        /// The hasher builder used when none is specified.
        pub type DefaultHashBuilder = std::hash::RandomState;
    } else {
        /// Placeholder when neither `foldhash` nor `std` is enabled. It cannot
        /// be constructed, so sets must be created with
        /// [`HashSet::with_hasher`].
        pub enum DefaultHashBuilder {}
    }
}
