//! Read-only FAT12/16/32 volume access over a sector device.
//!
//! The crate is `no_std` and allocation-free: a volume borrows its FAT image
//! and cluster scratch buffer from a caller-supplied [`BufferAllocator`].

#![cfg_attr(not(any(test, feature = "testing")), no_std)]

#[macro_use]
extern crate log;

mod common;
pub mod fs;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use common::*;
pub use fs::*;
