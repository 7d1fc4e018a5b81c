//! In-memory devices and FAT images for tests.
//!
//! Built only with `cfg(test)` or the `testing` feature, so std is available.

use crate::*;
use std::cell::Cell;
use std::collections::BTreeMap;

/// A sparse in-memory disk. Sectors never written read back as zeros.
#[derive(Debug, Default)]
pub struct MemDisk {
    sectors: BTreeMap<usize, [u8; BLOCK_SIZE]>,
    block_count: usize,
    blocks_read: Cell<usize>,
}

impl MemDisk {
    pub fn new(block_count: usize) -> Self {
        Self {
            block_count,
            ..Default::default()
        }
    }

    /// Copies `data` to the disk starting at byte `offset`.
    pub fn write_bytes(&mut self, offset: usize, data: &[u8]) {
        for (i, byte) in data.iter().enumerate() {
            let at = offset + i;
            let sector = self
                .sectors
                .entry(at / BLOCK_SIZE)
                .or_insert([0u8; BLOCK_SIZE]);
            sector[at % BLOCK_SIZE] = *byte;
        }
    }

    pub fn write_sector(&mut self, lba: usize, data: &[u8; BLOCK_SIZE]) {
        self.sectors.insert(lba, *data);
    }

    pub fn sector(&self, lba: usize) -> [u8; BLOCK_SIZE] {
        self.sectors.get(&lba).copied().unwrap_or([0u8; BLOCK_SIZE])
    }

    /// Total blocks handed out by `read_blocks` so far.
    pub fn blocks_read(&self) -> usize {
        self.blocks_read.get()
    }
}

impl BlockDevice for MemDisk {
    fn block_count(&self) -> FsResult<usize> {
        Ok(self.block_count)
    }

    fn read_blocks(&self, offset: usize, count: usize, buf: &mut [u8]) -> FsResult {
        check_read_args(count, buf)?;
        if offset + count > self.block_count {
            return Err(DeviceError::ReadError.into());
        }

        for (i, chunk) in buf.chunks_exact_mut(BLOCK_SIZE).take(count).enumerate() {
            chunk.copy_from_slice(&self.sector(offset + i));
        }
        self.blocks_read.set(self.blocks_read.get() + count);

        Ok(())
    }
}

/// Hands out leaked heap buffers, optionally up to a byte limit.
#[derive(Debug, Default)]
pub struct LeakingAllocator {
    limit: Option<usize>,
    used: Cell<usize>,
}

impl LeakingAllocator {
    pub fn with_limit(limit: usize) -> Self {
        Self {
            limit: Some(limit),
            used: Cell::new(0),
        }
    }

    pub fn used(&self) -> usize {
        self.used.get()
    }
}

impl<'a> BufferAllocator<'a> for LeakingAllocator {
    fn allocate(&'a self, len: usize) -> Option<&'a mut [u8]> {
        let used = self.used.get().checked_add(len)?;
        if len == 0 || self.limit.is_some_and(|limit| used > limit) {
            return None;
        }
        self.used.set(used);
        Some(Box::leak(vec![0u8; len].into_boxed_slice()))
    }
}

struct RawEntry {
    name_attr: [u8; 12],
    cluster: u32,
    size: u32,
}

/// Builds small FAT12/16/32 images with files in the root directory.
///
/// Every file gets the timestamp 2024-09-01 12:30:00 and the archive bit.
pub struct FatImageBuilder {
    fat_type: FatType,
    total_sectors: u32,
    sectors_per_cluster: u8,
    reserved_sectors: u16,
    fat_count: u8,
    root_entries: u16,
    fat_size: u32,
    root_chain: Vec<u32>,
    entries: Vec<RawEntry>,
    contents: Vec<(Vec<u32>, Vec<u8>)>,
    signature: bool,
}

impl FatImageBuilder {
    /// A 1.44 MiB floppy layout: 2847 one-sector clusters.
    pub fn fat12() -> Self {
        Self {
            fat_type: FatType::Fat12,
            total_sectors: 2880,
            sectors_per_cluster: 1,
            reserved_sectors: 1,
            fat_count: 2,
            root_entries: 224,
            fat_size: 9,
            root_chain: Vec::new(),
            entries: Vec::new(),
            contents: Vec::new(),
            signature: true,
        }
    }

    /// 4 MiB, 8095 one-sector clusters.
    pub fn fat16() -> Self {
        Self {
            fat_type: FatType::Fat16,
            total_sectors: 8192,
            fat_size: 32,
            root_entries: 512,
            ..Self::fat12()
        }
    }

    /// 70000 sectors, 68888 one-sector clusters, root directory at cluster 2.
    pub fn fat32() -> Self {
        Self {
            fat_type: FatType::Fat32,
            total_sectors: 70000,
            reserved_sectors: 32,
            fat_size: 540,
            root_entries: 0,
            root_chain: vec![2],
            ..Self::fat12()
        }
    }

    /// Clusters holding the FAT32 root directory, in chain order.
    pub fn root_chain(mut self, clusters: &[u32]) -> Self {
        assert_eq!(self.fat_type, FatType::Fat32);
        self.root_chain = clusters.to_vec();
        self
    }

    pub fn add_file(self, name: &str, data: &[u8], clusters: &[u32]) -> Self {
        self.add_file_with_size(name, data, clusters, data.len() as u32)
    }

    /// Adds a file whose directory entry claims `size` bytes, whatever `data` holds.
    pub fn add_file_with_size(mut self, name: &str, data: &[u8], clusters: &[u32], size: u32) -> Self {
        let sfn = ShortFileName::parse(name).expect("valid 8.3 name");
        let mut name_attr = [0u8; 12];
        name_attr[..11].copy_from_slice(&sfn.as_bytes());
        name_attr[11] = Attributes::ARCHIVE.bits();

        let cluster = clusters.first().copied().unwrap_or(0);
        self.entries.push(RawEntry {
            name_attr,
            cluster,
            size,
        });
        self.contents.push((clusters.to_vec(), data.to_vec()));
        self
    }

    /// Adds a directory entry from its 11 name bytes plus the attribute byte.
    pub fn add_entry_raw(mut self, name_attr: &[u8; 12], cluster: Cluster, size: u32) -> Self {
        self.entries.push(RawEntry {
            name_attr: *name_attr,
            cluster: cluster.0,
            size,
        });
        self
    }

    /// Zeroes bytes 510..512 of the boot sector.
    pub fn without_signature(mut self) -> Self {
        self.signature = false;
        self
    }

    fn cluster_size(&self) -> usize {
        self.sectors_per_cluster as usize * BLOCK_SIZE
    }

    fn root_dir_start(&self) -> usize {
        self.reserved_sectors as usize + self.fat_count as usize * self.fat_size as usize
    }

    fn first_data_sector(&self) -> usize {
        let root_dir_sectors = (self.root_entries as usize * DirEntry::LEN).div_ceil(BLOCK_SIZE);
        self.root_dir_start() + root_dir_sectors
    }

    fn cluster_offset(&self, cluster: u32) -> usize {
        let sector = (cluster as usize - 2) * self.sectors_per_cluster as usize + self.first_data_sector();
        sector * BLOCK_SIZE
    }

    fn boot_sector(&self) -> [u8; BLOCK_SIZE] {
        let mut bs = [0u8; BLOCK_SIZE];
        let mut put = |offset: usize, bytes: &[u8]| bs[offset..offset + bytes.len()].copy_from_slice(bytes);

        put(0x00, &[0xEB, 0x3C, 0x90]);
        put(0x03, b"NUCLEUS ");
        put(0x0b, &(BLOCK_SIZE as u16).to_le_bytes());
        put(0x0d, &[self.sectors_per_cluster]);
        put(0x0e, &self.reserved_sectors.to_le_bytes());
        put(0x10, &[self.fat_count]);
        put(0x11, &self.root_entries.to_le_bytes());
        if self.total_sectors < 0x10000 && self.fat_type != FatType::Fat32 {
            put(0x13, &(self.total_sectors as u16).to_le_bytes());
        } else {
            put(0x20, &self.total_sectors.to_le_bytes());
        }
        put(0x15, &[0xF8]);

        match self.fat_type {
            FatType::Fat32 => {
                put(0x24, &self.fat_size.to_le_bytes());
                put(0x2c, &self.root_chain[0].to_le_bytes());
                put(0x42, &[0x29]);
                put(0x47, b"NUCLEUS    ");
                put(0x52, b"FAT32   ");
            }
            _ => {
                put(0x16, &(self.fat_size as u16).to_le_bytes());
                put(0x26, &[0x29]);
                put(0x2b, b"NUCLEUS    ");
                put(0x36, b"FAT     ");
            }
        }

        if self.signature {
            put(0x1fe, &[0x55, 0xAA]);
        }
        bs
    }

    fn set_fat_entry(&self, fat: &mut [u8], cluster: u32, value: u32) {
        let c = cluster as usize;
        match self.fat_type {
            FatType::Fat12 => {
                let offset = c + c / 2;
                let old = u16::from_le_bytes([fat[offset], fat[offset + 1]]);
                let new = if c & 1 == 1 {
                    (old & 0x000F) | ((value as u16) << 4)
                } else {
                    (old & 0xF000) | (value as u16 & 0x0FFF)
                };
                fat[offset..offset + 2].copy_from_slice(&new.to_le_bytes());
            }
            FatType::Fat16 => fat[c * 2..c * 2 + 2].copy_from_slice(&(value as u16).to_le_bytes()),
            FatType::Fat32 => fat[c * 4..c * 4 + 4].copy_from_slice(&value.to_le_bytes()),
        }
    }

    fn link_chain(&self, fat: &mut [u8], clusters: &[u32]) {
        for pair in clusters.windows(2) {
            self.set_fat_entry(fat, pair[0], pair[1]);
        }
        if let Some(&last) = clusters.last() {
            self.set_fat_entry(fat, last, self.fat_type.eoc_mark());
        }
    }

    pub fn build(self) -> MemDisk {
        let mut disk = MemDisk::new(self.total_sectors as usize);
        disk.write_sector(0, &self.boot_sector());

        // FAT
        let mut fat = vec![0u8; self.fat_size as usize * BLOCK_SIZE];
        self.set_fat_entry(&mut fat, 0, self.fat_type.eoc_threshold() & !0xFF | 0xF8);
        self.set_fat_entry(&mut fat, 1, self.fat_type.eoc_mark());
        self.link_chain(&mut fat, &self.root_chain);
        for (clusters, _) in &self.contents {
            self.link_chain(&mut fat, clusters);
        }
        for copy in 0..self.fat_count as usize {
            let start = self.reserved_sectors as usize + copy * self.fat_size as usize;
            disk.write_bytes(start * BLOCK_SIZE, &fat);
        }

        // root directory
        let per_cluster = self.cluster_size() / DirEntry::LEN;
        for (i, entry) in self.entries.iter().enumerate() {
            let offset = match self.fat_type {
                FatType::Fat32 => {
                    let cluster = self.root_chain[i / per_cluster];
                    self.cluster_offset(cluster) + (i % per_cluster) * DirEntry::LEN
                }
                _ => {
                    assert!(i < self.root_entries as usize, "root directory full");
                    self.root_dir_start() * BLOCK_SIZE + i * DirEntry::LEN
                }
            };
            disk.write_bytes(offset, &encode_entry(entry));
        }

        // file data
        let cluster_size = self.cluster_size();
        for (clusters, data) in &self.contents {
            assert!(data.len() <= clusters.len() * cluster_size, "not enough clusters");
            for (chunk, &cluster) in data.chunks(cluster_size).zip(clusters) {
                disk.write_bytes(self.cluster_offset(cluster), chunk);
            }
        }

        disk
    }
}

fn encode_entry(entry: &RawEntry) -> [u8; DirEntry::LEN] {
    // 2024-09-01 12:30:00
    const DATE: u16 = (44 << 9) | (9 << 5) | 1;
    const TIME: u16 = (12 << 11) | (30 << 5);

    let mut raw = [0u8; DirEntry::LEN];
    raw[..12].copy_from_slice(&entry.name_attr);
    raw[14..16].copy_from_slice(&TIME.to_le_bytes());
    raw[16..18].copy_from_slice(&DATE.to_le_bytes());
    raw[18..20].copy_from_slice(&DATE.to_le_bytes());
    raw[20..22].copy_from_slice(&((entry.cluster >> 16) as u16).to_le_bytes());
    raw[22..24].copy_from_slice(&TIME.to_le_bytes());
    raw[24..26].copy_from_slice(&DATE.to_le_bytes());
    raw[26..28].copy_from_slice(&(entry.cluster as u16).to_le_bytes());
    raw[28..32].copy_from_slice(&entry.size.to_le_bytes());
    raw
}
