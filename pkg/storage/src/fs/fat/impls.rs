use super::*;
use core::ops::ControlFlow;

impl<'a, D: BlockDevice> FatVolume<'a, D> {
    /// Mounts the FAT volume found on `device`.
    ///
    /// Takes two buffers from `alloc` and keeps them for the volume's
    /// lifetime: one for the first FAT copy and one cluster of scratch space.
    pub fn mount<A: BufferAllocator<'a> + ?Sized>(device: D, alloc: &'a A) -> FsResult<Self> {
        let mut boot_sector = Block512::default();
        device.read_block(0, &mut boot_sector)?;

        let bpb = FatBpb::new(boot_sector.as_ref())?;
        let geometry = Geometry::new(&bpb)?;

        let fat_bytes = alloc
            .allocate(geometry.fat_bytes())
            .ok_or(FsError::OutOfMemory)?;
        read_contiguous(&device, geometry.fat_start, fat_bytes)?;
        let fat = FatTable::new(fat_bytes, geometry.fat_type);

        let scratch = alloc
            .allocate(geometry.cluster_size())
            .ok_or(FsError::OutOfMemory)?;

        info!(
            "Mounted {:?} volume: {} clusters of {} bytes, FAT at sector {} ({} sectors), data at sector {}",
            geometry.fat_type,
            geometry.total_clusters,
            geometry.cluster_size(),
            geometry.fat_start,
            geometry.fat_size,
            geometry.first_data_sector
        );
        trace!("{:#?}", bpb);

        Ok(Self {
            device,
            bpb,
            geometry,
            fat,
            scratch,
            cached_cluster: None,
        })
    }

    pub fn fat_type(&self) -> FatType {
        self.geometry.fat_type
    }

    pub fn geometry(&self) -> &Geometry {
        &self.geometry
    }

    /// Space-padded volume label from the extended BPB.
    pub fn volume_label(&self) -> [u8; 11] {
        match self.geometry.fat_type {
            FatType::Fat32 => self.bpb.fat32_volume_label(),
            _ => self.bpb.volume_label(),
        }
    }

    pub fn cluster_to_sector(&self, cluster: Cluster) -> usize {
        self.geometry.cluster_to_sector(cluster)
    }

    pub fn next_cluster(&self, cluster: Cluster) -> FsResult<Cluster> {
        self.fat.next_cluster(cluster)
    }

    /// Opens the regular file `name` in the root directory.
    pub fn open(&self, name: &str) -> FsResult<FileHandle> {
        let entry = self.find_entry(name)?;
        debug!("Opened {}: cluster {}, {} bytes", entry.filename, entry.cluster, entry.size);
        Ok(FileHandle::new(&entry))
    }

    /// Looks up a regular file in the root directory by its 8.3 name.
    pub fn find_entry(&self, name: &str) -> FsResult<DirEntry> {
        let sfn = ShortFileName::parse(name)?;

        let found = self.scan_root_dir(|entry| {
            if entry.is_file() && entry.filename.matches(&sfn) {
                ControlFlow::Break(entry.clone())
            } else {
                ControlFlow::Continue(())
            }
        })?;

        found.ok_or(FsError::FileNotFound)
    }

    /// Calls `f` for every file and directory in the root directory, in
    /// on-disk order, and returns how many there were.
    pub fn root_entries<F: FnMut(&DirEntry)>(&self, mut f: F) -> FsResult<usize> {
        let mut count = 0;
        self.scan_root_dir::<(), _>(|entry| {
            if !entry.is_volume_label() {
                f(entry);
                count += 1;
            }
            ControlFlow::Continue(())
        })?;
        Ok(count)
    }

    /// Walks the live entries of the root directory until `f` breaks.
    ///
    /// Deleted and long-name entries are never passed to `f`. The walk ends at
    /// the first end-of-directory marker.
    fn scan_root_dir<T, F>(&self, mut f: F) -> FsResult<Option<T>>
    where
        F: FnMut(&DirEntry) -> ControlFlow<T>,
    {
        let mut block = Block512::default();

        let mut scan_sector = |sector: usize| -> FsResult<ControlFlow<Option<T>>> {
            self.device.read_block(sector, &mut block)?;

            for raw in block.chunks_exact(DirEntry::LEN) {
                match raw[0] {
                    DirEntry::END_OF_DIRECTORY => return Ok(ControlFlow::Break(None)),
                    DirEntry::DELETED => continue,
                    _ => {}
                }

                let entry = DirEntry::parse(raw)?;
                if entry.is_long_name() {
                    continue;
                }
                if let ControlFlow::Break(found) = f(&entry) {
                    return Ok(ControlFlow::Break(Some(found)));
                }
            }

            Ok(ControlFlow::Continue(()))
        };

        match self.geometry.fat_type {
            FatType::Fat12 | FatType::Fat16 => {
                let start = self.geometry.root_dir_start;
                for sector in start..start + self.geometry.root_dir_sectors {
                    if let ControlFlow::Break(found) = scan_sector(sector)? {
                        return Ok(found);
                    }
                }
            }
            FatType::Fat32 => {
                let mut cluster = self.geometry.root_cluster;
                // a well-formed chain visits each cluster at most once
                for _ in 0..self.geometry.total_clusters {
                    if !self.geometry.is_data_cluster(cluster) {
                        return Err(FsError::BadCluster);
                    }
                    let first = self.geometry.cluster_to_sector(cluster);
                    for sector in first..first + self.geometry.sectors_per_cluster {
                        if let ControlFlow::Break(found) = scan_sector(sector)? {
                            return Ok(found);
                        }
                    }
                    cluster = self.fat.next_cluster(cluster)?;
                    if cluster == Cluster::END_OF_FILE {
                        break;
                    }
                }
            }
        }

        Ok(None)
    }
}
