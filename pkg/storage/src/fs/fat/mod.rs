//! FAT12/16/32 volumes, read-only, root directory only.
//!
//! reference: <https://wiki.osdev.org/FAT>
//! reference: Microsoft Extensible Firmware Initiative FAT32 File System Specification

mod bpb;
mod direntry;
mod file;
mod impls;
mod table;

pub use bpb::*;
pub use direntry::*;
pub use file::*;
pub use table::*;

use crate::*;

/// FAT variant, decided solely by the volume's data cluster count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FatType {
    Fat12,
    Fat16,
    Fat32,
}

impl FatType {
    pub const fn from_cluster_count(clusters: u32) -> Self {
        if clusters < 4085 {
            FatType::Fat12
        } else if clusters < 65525 {
            FatType::Fat16
        } else {
            FatType::Fat32
        }
    }

    /// Smallest entry value that marks the end of a cluster chain.
    pub const fn eoc_threshold(&self) -> u32 {
        match self {
            FatType::Fat12 => 0x0FF8,
            FatType::Fat16 => 0xFFF8,
            FatType::Fat32 => 0x0FFF_FFF8,
        }
    }

    /// Canonical end-of-chain value written by formatters.
    pub const fn eoc_mark(&self) -> u32 {
        match self {
            FatType::Fat12 => 0x0FFF,
            FatType::Fat16 => 0xFFFF,
            FatType::Fat32 => 0x0FFF_FFFF,
        }
    }
}

/// A mounted FAT volume.
///
/// Holds the BPB, the derived geometry, the whole first FAT in memory
/// and one cluster of scratch space. Open files are plain [`FileHandle`]
/// values owned by the caller; the volume does not track them.
pub struct FatVolume<'a, D: BlockDevice> {
    device: D,
    bpb: FatBpb,
    geometry: Geometry,
    fat: FatTable<'a>,
    scratch: &'a mut [u8],
    /// Cluster currently held in `scratch`.
    cached_cluster: Option<Cluster>,
}

impl<D: BlockDevice> core::fmt::Debug for FatVolume<'_, D> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("FatVolume")
            .field("bpb", &self.bpb)
            .field("geometry", &self.geometry)
            .field("cached_cluster", &self.cached_cluster)
            .finish()
    }
}
