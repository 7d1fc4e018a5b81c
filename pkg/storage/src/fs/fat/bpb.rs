//! Boot sector / BIOS Parameter Block
//!
//! reference: <https://wiki.osdev.org/FAT#Boot_Record>

use super::*;

macro_rules! define_field {
    (u8, $offset:expr, $name:ident) => {
        pub fn $name(&self) -> u8 {
            self.data[$offset]
        }
    };
    (u16, $offset:expr, $name:ident) => {
        pub fn $name(&self) -> u16 {
            u16::from_le_bytes([self.data[$offset], self.data[$offset + 1]])
        }
    };
    (u32, $offset:expr, $name:ident) => {
        pub fn $name(&self) -> u32 {
            u32::from_le_bytes([
                self.data[$offset],
                self.data[$offset + 1],
                self.data[$offset + 2],
                self.data[$offset + 3],
            ])
        }
    };
    ([u8; $len:expr], $offset:expr, $name:ident) => {
        pub fn $name(&self) -> [u8; $len] {
            let mut out = [0u8; $len];
            out.copy_from_slice(&self.data[$offset..$offset + $len]);
            out
        }
    };
}

/// The 512-byte boot sector, with typed accessors for the BPB fields.
///
/// Offsets 0..36 are common to all FAT variants; offsets from 36 on are only
/// meaningful through the `fat32_*` accessors on a FAT32 volume.
#[derive(Clone, PartialEq, Eq)]
pub struct FatBpb {
    data: [u8; BLOCK_SIZE],
}

impl FatBpb {
    /// Wraps a boot sector, rejecting it when bytes 510..512 are not `55 AA`.
    pub fn new(data: &[u8]) -> FsResult<FatBpb> {
        let data: [u8; BLOCK_SIZE] = data
            .try_into()
            .map_err(|_| FsError::InvalidArgument)?;
        let bpb = FatBpb { data };

        if bpb.trail() != 0xAA55 {
            return Err(FsError::CorruptVolume("missing 0x55AA boot signature"));
        }

        Ok(bpb)
    }

    pub fn total_sectors(&self) -> u32 {
        if self.total_sectors_16() != 0 {
            self.total_sectors_16() as u32
        } else {
            self.total_sectors_32()
        }
    }

    pub fn sectors_per_fat(&self) -> u32 {
        if self.sectors_per_fat_16() != 0 {
            self.sectors_per_fat_16() as u32
        } else {
            self.fat32_sectors_per_fat()
        }
    }

    define_field!([u8; 3], 0x00, jump_instruction);
    define_field!([u8; 8], 0x03, oem_name);
    define_field!(u16, 0x0b, bytes_per_sector);
    define_field!(u8, 0x0d, sectors_per_cluster);
    define_field!(u16, 0x0e, reserved_sector_count);
    define_field!(u8, 0x10, fat_count);
    define_field!(u16, 0x11, root_entries_count);
    define_field!(u16, 0x13, total_sectors_16);
    define_field!(u8, 0x15, media_descriptor);
    define_field!(u16, 0x16, sectors_per_fat_16);
    define_field!(u16, 0x18, sectors_per_track);
    define_field!(u16, 0x1a, track_count);
    define_field!(u32, 0x1c, hidden_sectors);
    define_field!(u32, 0x20, total_sectors_32);

    // FAT32 extended BPB
    define_field!(u32, 0x24, fat32_sectors_per_fat);
    define_field!(u16, 0x28, fat32_ext_flags);
    define_field!(u16, 0x2a, fat32_version);
    define_field!(u32, 0x2c, fat32_root_cluster);
    define_field!(u16, 0x30, fat32_fs_info_sector);
    define_field!(u16, 0x32, fat32_backup_boot_sector);
    define_field!([u8; 11], 0x47, fat32_volume_label);

    // FAT12/16 extended BPB
    define_field!(u8, 0x24, drive_number);
    define_field!(u8, 0x26, boot_signature);
    define_field!(u32, 0x27, volume_id);
    define_field!([u8; 11], 0x2b, volume_label);

    define_field!(u16, 0x1fe, trail);
}

impl core::fmt::Debug for FatBpb {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        f.debug_struct("FatBpb")
            .field("oem_name", &core::str::from_utf8(&self.oem_name()).unwrap_or("?"))
            .field("bytes_per_sector", &self.bytes_per_sector())
            .field("sectors_per_cluster", &self.sectors_per_cluster())
            .field("reserved_sector_count", &self.reserved_sector_count())
            .field("fat_count", &self.fat_count())
            .field("root_entries_count", &self.root_entries_count())
            .field("total_sectors", &self.total_sectors())
            .field("media_descriptor", &format_args!("{:#x}", self.media_descriptor()))
            .field("sectors_per_fat", &self.sectors_per_fat())
            .field("hidden_sectors", &self.hidden_sectors())
            .field("trail", &format_args!("{:#x}", self.trail()))
            .finish()
    }
}

/// Volume layout derived from the BPB. All sector numbers are absolute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Geometry {
    pub bytes_per_sector: usize,
    pub sectors_per_cluster: usize,
    pub num_fats: usize,
    /// First sector of the first FAT (the reserved sector count).
    pub fat_start: usize,
    /// Sectors per FAT copy.
    pub fat_size: usize,
    /// First sector after the FATs; the root directory region on FAT12/16.
    pub root_dir_start: usize,
    /// Zero on FAT32.
    pub root_dir_sectors: usize,
    pub first_data_sector: usize,
    pub total_sectors: usize,
    pub total_clusters: u32,
    pub fat_type: FatType,
    /// First cluster of the root directory on FAT32, `Cluster::ROOT_DIR` otherwise.
    pub root_cluster: Cluster,
}

impl Geometry {
    pub fn new(bpb: &FatBpb) -> FsResult<Self> {
        let bytes_per_sector = bpb.bytes_per_sector() as usize;
        if bytes_per_sector != BLOCK_SIZE {
            return Err(FsError::CorruptVolume("unsupported sector size"));
        }

        let sectors_per_cluster = bpb.sectors_per_cluster() as usize;
        if !sectors_per_cluster.is_power_of_two() {
            return Err(FsError::CorruptVolume("sectors per cluster is not a power of two"));
        }

        let num_fats = bpb.fat_count() as usize;
        let fat_start = bpb.reserved_sector_count() as usize;
        let fat_size = bpb.sectors_per_fat() as usize;
        if num_fats == 0 || fat_start == 0 || fat_size == 0 {
            return Err(FsError::CorruptVolume("empty reserved or FAT region"));
        }

        // RootDirSectors = ceil(RootEntCnt * 32 / BytsPerSec)
        let root_dir_sectors =
            (bpb.root_entries_count() as usize * DirEntry::LEN).div_ceil(bytes_per_sector);
        let root_dir_start = fat_start + num_fats * fat_size;
        let first_data_sector = root_dir_start + root_dir_sectors;

        let total_sectors = bpb.total_sectors() as usize;
        if total_sectors <= first_data_sector {
            return Err(FsError::CorruptVolume("no room for a data region"));
        }

        let data_sectors = total_sectors - first_data_sector;
        let total_clusters = (data_sectors / sectors_per_cluster) as u32;
        let fat_type = FatType::from_cluster_count(total_clusters);

        let root_cluster = match fat_type {
            FatType::Fat32 => {
                let root = bpb.fat32_root_cluster();
                if root < 2 {
                    return Err(FsError::CorruptVolume("FAT32 root cluster below 2"));
                }
                Cluster(root)
            }
            _ => Cluster::ROOT_DIR,
        };

        Ok(Self {
            bytes_per_sector,
            sectors_per_cluster,
            num_fats,
            fat_start,
            fat_size,
            root_dir_start,
            root_dir_sectors,
            first_data_sector,
            total_sectors,
            total_clusters,
            fat_type,
            root_cluster,
        })
    }

    pub fn cluster_size(&self) -> usize {
        self.sectors_per_cluster * self.bytes_per_sector
    }

    /// Bytes of one FAT copy.
    pub fn fat_bytes(&self) -> usize {
        self.fat_size * self.bytes_per_sector
    }

    /// Whether `cluster` names a cluster of the data region.
    pub fn is_data_cluster(&self, cluster: Cluster) -> bool {
        cluster.0 >= 2 && cluster.0 < self.total_clusters.saturating_add(2)
    }

    // FirstSectorofCluster = ((N - 2) * BPB_SecPerClus) + FirstDataSector
    pub fn cluster_to_sector(&self, cluster: Cluster) -> usize {
        match cluster {
            Cluster::ROOT_DIR => self.root_dir_start,
            Cluster(c) => {
                (c as usize).saturating_sub(2) * self.sectors_per_cluster + self.first_data_sector
            }
        }
    }
}
