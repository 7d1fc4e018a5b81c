//! File Allocation Table lookups.
//!
//! reference: <https://wiki.osdev.org/FAT#File_Allocation_Table>

use super::*;

/// One in-memory copy of the FAT.
#[derive(Clone, Copy)]
pub struct FatTable<'a> {
    bytes: &'a [u8],
    fat_type: FatType,
}

impl<'a> FatTable<'a> {
    pub fn new(bytes: &'a [u8], fat_type: FatType) -> Self {
        Self { bytes, fat_type }
    }


    /// Raw entry value for `cluster`, with FAT32's reserved top nibble cleared.
    pub fn entry(&self, cluster: Cluster) -> FsResult<u32> {
        let c = cluster.0 as usize;
        let out_of_range = FsError::CorruptVolume("cluster beyond the end of the FAT");

        match self.fat_type {
            FatType::Fat12 => {
                // 12-bit entries are packed in pairs: offset = c + c / 2
                let offset = c.checked_add(c / 2).ok_or(out_of_range)?;
                let raw = self.read_u16(offset).ok_or(out_of_range)?;
                Ok(if c & 1 == 1 {
                    (raw >> 4) as u32
                } else {
                    (raw & 0x0FFF) as u32
                })
            }
            FatType::Fat16 => {
                let offset = c.checked_mul(2).ok_or(out_of_range)?;
                Ok(self.read_u16(offset).ok_or(out_of_range)? as u32)
            }
            FatType::Fat32 => {
                let offset = c.checked_mul(4).ok_or(out_of_range)?;
                Ok(self.read_u32(offset).ok_or(out_of_range)? & 0x0FFF_FFFF)
            }
        }
    }

    /// Follows the chain one step. Returns [`Cluster::END_OF_FILE`] when
    /// `cluster` is the last of its chain, the raw entry otherwise.
    pub fn next_cluster(&self, cluster: Cluster) -> FsResult<Cluster> {
        let value = self.entry(cluster)?;
        if value >= self.fat_type.eoc_threshold() {
            Ok(Cluster::END_OF_FILE)
        } else {
            Ok(Cluster(value))
        }
    }

    fn read_u16(&self, offset: usize) -> Option<u16> {
        let bytes = self.bytes.get(offset..offset.checked_add(2)?)?;
        Some(u16::from_le_bytes([bytes[0], bytes[1]]))
    }

    fn read_u32(&self, offset: usize) -> Option<u32> {
        let bytes = self.bytes.get(offset..offset.checked_add(4)?)?;
        Some(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }
}

impl core::fmt::Debug for FatTable<'_> {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        f.debug_struct("FatTable")
            .field("fat_type", &self.fat_type)
            .field("bytes", &self.bytes.len())
            .finish()
    }
}
