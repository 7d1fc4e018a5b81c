//! ATA Drive
//!
//! Polled LBA28 PIO access to a drive on one of the legacy IDE buses.
//!
//! reference: https://wiki.osdev.org/ATA_PIO_Mode

mod bus;
mod consts;
#[cfg(test)]
mod mock;

use crate::arch::{HardwarePorts, PortIo};
use bus::AtaBus;
pub use consts::*;
use spin::Mutex;
use storage::*;

pub struct AtaDrive<P: PortIo = HardwarePorts> {
    bus: Mutex<AtaBus<P>>,
    drive: u8,
    blocks: u32,
    model: [u8; 40],
}

impl AtaDrive {
    /// Opens `drive` (0 master, 1 slave) on `bus` (0 primary, 1 secondary).
    pub fn open(bus: u8, drive: u8) -> FsResult<Self> {
        let (io_base, ctrl_base) = match bus {
            0 => PRIMARY_BUS,
            1 => SECONDARY_BUS,
            _ => return Err(DeviceError::UnknownDevice.into()),
        };
        // SAFETY: the legacy IDE ports belong to this driver alone
        let ports = unsafe { HardwarePorts::new() };
        Self::with_ports(ports, io_base, ctrl_base, drive)
    }
}

impl<P: PortIo> AtaDrive<P> {
    /// Identifies `drive` behind the given port bases.
    pub fn with_ports(ports: P, io_base: u16, ctrl_base: u16, drive: u8) -> FsResult<Self> {
        let mut bus = AtaBus::new(ports, io_base, ctrl_base);
        let words = bus.identify_drive(drive)?;

        // words 27..47 hold the model, two characters per word, high byte first
        let mut model = [0u8; 40];
        for (pair, word) in model.chunks_exact_mut(2).zip(&words[27..47]) {
            pair.copy_from_slice(&word.to_be_bytes());
        }
        // words 60..62 hold the number of LBA28 addressable sectors
        let blocks = ((words[61] as u32) << 16) | words[60] as u32;

        let drive = Self {
            bus: Mutex::new(bus),
            drive,
            blocks,
            model,
        };
        info!("Drive {} opened: {:?}", drive.drive, drive);
        Ok(drive)
    }

    pub fn model(&self) -> &str {
        core::str::from_utf8(&self.model)
            .unwrap_or("Unknown")
            .trim_end_matches([' ', '\0'])
    }

    pub fn blocks(&self) -> u32 {
        self.blocks
    }

    /// Reads `count` sectors starting at `lba` into `buf`, one PIO transfer per sector.
    ///
    /// `count` must be in `1..=256`, `buf` must hold `count * 512` bytes and the
    /// range must lie inside the drive.
    pub fn disk_read(&self, lba: u32, count: usize, buf: &mut [u8]) -> FsResult {
        check_read_args(count, buf)?;
        if lba as u64 + count as u64 > self.blocks as u64 {
            return Err(FsError::InvalidArgument);
        }

        let mut bus = self.bus.lock();
        for (i, sector) in buf[..count * BLOCK_SIZE]
            .chunks_exact_mut(BLOCK_SIZE)
            .enumerate()
        {
            bus.read_pio(self.drive, lba + i as u32, sector)?;
        }
        Ok(())
    }
}

impl<P: PortIo> BlockDevice for AtaDrive<P> {
    fn block_count(&self) -> FsResult<usize> {
        Ok(self.blocks as usize)
    }

    fn read_blocks(&self, offset: usize, count: usize, buf: &mut [u8]) -> FsResult {
        let lba = u32::try_from(offset).map_err(|_| FsError::InvalidArgument)?;
        self.disk_read(lba, count, buf)
    }
}

impl<P: PortIo> core::fmt::Debug for AtaDrive<P> {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        let (size, unit) = crate::humanized_size(self.blocks as u64 * BLOCK_SIZE as u64);
        f.debug_struct("AtaDrive")
            .field("model", &self.model())
            .field("drive", &self.drive)
            .field("blocks", &self.blocks)
            .field("size", &format_args!("{:.2} {}", size, unit))
            .finish()
    }
}
