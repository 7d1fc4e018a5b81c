//! File
//!
//! reference: <https://wiki.osdev.org/FAT#Reading_Files>

use super::*;
use core::cmp::min;

/// Read cursor over one file of a [`FatVolume`].
///
/// A handle is plain data: it stays valid as long as the volume it was opened
/// on, and dropping it releases nothing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileHandle {
    first_cluster: Cluster,
    /// The cluster holding the bytes at `cluster_offset..cluster_offset + cluster_size`.
    current_cluster: Cluster,
    /// File offset at which `current_cluster` begins.
    cluster_offset: usize,
    file_size: usize,
    /// The current offset in the file in bytes
    position: usize,
    is_open: bool,
}

impl FileHandle {
    pub fn new(entry: &DirEntry) -> Self {
        Self {
            first_cluster: entry.cluster,
            current_cluster: entry.cluster,
            cluster_offset: 0,
            file_size: entry.size as usize,
            position: 0,
            is_open: true,
        }
    }

    pub fn first_cluster(&self) -> Cluster {
        self.first_cluster
    }

    pub fn current_cluster(&self) -> Cluster {
        self.current_cluster
    }

    pub fn file_size(&self) -> usize {
        self.file_size
    }

    pub fn position(&self) -> usize {
        self.position
    }

    pub fn is_open(&self) -> bool {
        self.is_open
    }

    pub fn remaining(&self) -> usize {
        self.file_size.saturating_sub(self.position)
    }

    pub fn is_eof(&self) -> bool {
        self.remaining() == 0
    }
}

impl<'a, D: BlockDevice> FatVolume<'a, D> {
    /// Copies up to `buf.len()` bytes from the handle's position into `buf`
    /// and advances the handle. Returns 0 at end of file.
    ///
    /// The cluster chain is walked only when the next byte to copy lies past
    /// the current cluster, so a read that ends on a cluster boundary leaves
    /// the handle on the cluster it just finished.
    pub fn read(&mut self, handle: &mut FileHandle, buf: &mut [u8]) -> FsResult<usize> {
        if !handle.is_open {
            return Err(FsError::InvalidArgument);
        }

        let want = min(buf.len(), handle.remaining());
        if want == 0 {
            return Ok(0);
        }

        let cluster_size = self.geometry.cluster_size();
        let mut read = 0;

        while read < want {
            if handle.position >= handle.cluster_offset + cluster_size {
                let next = self.fat.next_cluster(handle.current_cluster)?;
                if next == Cluster::END_OF_FILE {
                    warn!(
                        "Cluster chain ended at {} with {} bytes of the file left",
                        handle.current_cluster,
                        handle.remaining()
                    );
                    break;
                }
                handle.current_cluster = next;
                handle.cluster_offset += cluster_size;
            }

            self.load_cluster(handle.current_cluster)?;

            let offset_in_cluster = handle.position - handle.cluster_offset;
            let count = min(cluster_size - offset_in_cluster, want - read);
            buf[read..read + count]
                .copy_from_slice(&self.scratch[offset_in_cluster..offset_in_cluster + count]);

            read += count;
            handle.position += count;
        }

        Ok(read)
    }

    /// Brings `cluster` into the scratch buffer unless it is already there.
    fn load_cluster(&mut self, cluster: Cluster) -> FsResult {
        if self.cached_cluster == Some(cluster) {
            return Ok(());
        }
        if !self.geometry.is_data_cluster(cluster) {
            warn!("Refusing to read cluster {} outside the data region", cluster);
            return Err(FsError::BadCluster);
        }

        self.cached_cluster = None;
        let sector = self.geometry.cluster_to_sector(cluster);
        self.device
            .read_blocks(sector, self.geometry.sectors_per_cluster, self.scratch)?;
        self.cached_cluster = Some(cluster);

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::*;

    /// 1024 bytes counting 0x00..=0xFF four times.
    fn counting_pattern() -> Vec<u8> {
        (0..1024).map(|i| i as u8).collect()
    }

    #[test]
    fn test_read_small_file() {
        let disk = FatImageBuilder::fat12()
            .add_file("HELLO.TXT", b"Hello, world!", &[2])
            .build();
        let arena = LeakingAllocator::default();
        let mut volume = FatVolume::mount(&disk, &arena).unwrap();

        let mut handle = volume.open("HELLO.TXT").unwrap();
        let mut buf = [0u8; 100];
        assert_eq!(volume.read(&mut handle, &mut buf).unwrap(), 13);
        assert_eq!(&buf[..13], b"Hello, world!");
        assert!(handle.is_eof());
    }

    #[test]
    fn test_cross_cluster_read() {
        let content: Vec<u8> = (0..1536).map(|i| (i * 7 % 251) as u8).collect();
        let disk = FatImageBuilder::fat16()
            .add_file("BIG.BIN", &content, &[3, 6, 9])
            .build();
        let arena = LeakingAllocator::default();
        let mut volume = FatVolume::mount(&disk, &arena).unwrap();
        assert_eq!(volume.geometry().cluster_size(), 512);

        let mut handle = volume.open("BIG.BIN").unwrap();
        let mut buf = vec![0u8; 1536];
        assert_eq!(volume.read(&mut handle, &mut buf).unwrap(), 1536);
        assert_eq!(buf, content);
        assert_eq!(handle.current_cluster(), Cluster(9));
    }

    #[test]
    fn test_partial_reads_match_single_read() {
        let content: Vec<u8> = (0..1536).map(|i| (i * 13 % 256) as u8).collect();
        let disk = FatImageBuilder::fat16()
            .add_file("BIG.BIN", &content, &[3, 6, 9])
            .build();
        let arena = LeakingAllocator::default();
        let mut volume = FatVolume::mount(&disk, &arena).unwrap();

        let mut handle = volume.open("BIG.BIN").unwrap();
        let mut buf = vec![0u8; 1536];
        assert_eq!(volume.read(&mut handle, &mut buf[..500]).unwrap(), 500);
        assert_eq!(volume.read(&mut handle, &mut buf[500..1000]).unwrap(), 500);
        assert_eq!(volume.read(&mut handle, &mut buf[1000..]).unwrap(), 536);
        assert_eq!(buf, content);
    }

    #[test]
    fn test_round_trip_over_every_partition_shape() {
        let content = counting_pattern();
        let partitions: &[&[usize]] = &[
            &[1024],
            &[512, 512],
            &[1, 511, 1, 511],
            &[256, 256, 256, 256],
            &[100, 412, 300, 212],
            &[511, 2, 511],
            &[1000, 24],
            &[3; 341],
        ];

        for fat in [FatImageBuilder::fat12(), FatImageBuilder::fat16(), FatImageBuilder::fat32()] {
            let disk = fat.add_file("COUNT.BIN", &content, &[10, 4]).build();
            let arena = LeakingAllocator::default();
            let mut volume = FatVolume::mount(&disk, &arena).unwrap();

            for sizes in partitions {
                let mut handle = volume.open("COUNT.BIN").unwrap();
                let mut out = vec![0u8; 1024];
                let mut at = 0;
                for &size in sizes.iter() {
                    assert_eq!(volume.read(&mut handle, &mut out[at..at + size]).unwrap(), size);
                    at += size;
                }
                // 341 reads of 3 bytes leave one byte over
                let tail = 1024 - at;
                assert_eq!(volume.read(&mut handle, &mut out[at..]).unwrap(), tail);
                assert_eq!(out, content, "partition {:?}", sizes);
            }
        }
    }

    #[test]
    fn test_eof_semantics() {
        let disk = FatImageBuilder::fat12()
            .add_file("HELLO.TXT", b"Hello, world!", &[2])
            .build();
        let arena = LeakingAllocator::default();
        let mut volume = FatVolume::mount(&disk, &arena).unwrap();
        let mut handle = volume.open("HELLO.TXT").unwrap();
        let mut buf = [0u8; 10];

        assert_eq!(volume.read(&mut handle, &mut buf).unwrap(), 10);
        assert_eq!(handle.position(), 10);
        // crossing EOF returns exactly what is left
        assert_eq!(volume.read(&mut handle, &mut buf).unwrap(), 3);
        assert_eq!(&buf[..3], b"ld!");
        assert_eq!(handle.position(), handle.file_size());
        // past EOF
        assert_eq!(volume.read(&mut handle, &mut buf).unwrap(), 0);
        assert_eq!(handle.position(), 13);
    }

    #[test]
    fn test_empty_file_and_empty_buffer() {
        let disk = FatImageBuilder::fat16()
            .add_file("EMPTY.TXT", b"", &[])
            .add_file("ONE.TXT", b"1", &[2])
            .build();
        let arena = LeakingAllocator::default();
        let mut volume = FatVolume::mount(&disk, &arena).unwrap();

        let mut empty = volume.open("EMPTY.TXT").unwrap();
        assert_eq!(empty.first_cluster(), Cluster::EMPTY);
        assert_eq!(volume.read(&mut empty, &mut [0u8; 8]).unwrap(), 0);

        let mut one = volume.open("ONE.TXT").unwrap();
        assert_eq!(volume.read(&mut one, &mut []).unwrap(), 0);
        assert_eq!(one.position(), 0);
    }

    #[test]
    fn test_closed_handle_is_rejected() {
        let disk = FatImageBuilder::fat12().build();
        let arena = LeakingAllocator::default();
        let mut volume = FatVolume::mount(&disk, &arena).unwrap();

        let mut handle = FileHandle::default();
        assert!(!handle.is_open());
        assert_eq!(
            volume.read(&mut handle, &mut [0u8; 4]),
            Err(FsError::InvalidArgument)
        );
    }

    #[test]
    fn test_short_chain_stops_early() {
        // directory entry claims 1024 bytes but the chain holds one cluster
        let disk = FatImageBuilder::fat16()
            .add_file_with_size("SHORT.BIN", &[0xAB; 512], &[5], 1024)
            .build();
        let arena = LeakingAllocator::default();
        let mut volume = FatVolume::mount(&disk, &arena).unwrap();

        let mut handle = volume.open("SHORT.BIN").unwrap();
        let mut buf = [0u8; 1024];
        assert_eq!(volume.read(&mut handle, &mut buf).unwrap(), 512);
        assert!(buf[..512].iter().all(|&b| b == 0xAB));
    }

    #[test]
    fn test_cluster_outside_data_region() {
        let disk = FatImageBuilder::fat16()
            .add_file_with_size("BAD.BIN", &[], &[], 16)
            .build();
        let arena = LeakingAllocator::default();
        let mut volume = FatVolume::mount(&disk, &arena).unwrap();

        let mut handle = volume.open("BAD.BIN").unwrap();
        assert_eq!(
            volume.read(&mut handle, &mut [0u8; 16]),
            Err(FsError::BadCluster)
        );
    }

    #[test]
    fn test_scratch_cluster_is_reused() {
        let content = counting_pattern();
        let disk = FatImageBuilder::fat16()
            .add_file("COUNT.BIN", &content, &[2, 3])
            .build();
        let arena = LeakingAllocator::default();
        let mut volume = FatVolume::mount(&disk, &arena).unwrap();
        let mut handle = volume.open("COUNT.BIN").unwrap();

        let before = disk.blocks_read();
        let mut buf = [0u8; 128];
        for _ in 0..4 {
            volume.read(&mut handle, &mut buf).unwrap();
        }
        // four reads inside cluster 2 touch the disk once
        assert_eq!(disk.blocks_read() - before, 1);
    }
}
