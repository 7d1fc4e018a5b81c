//! ATA Bus
//!
//! reference: https://wiki.osdev.org/IDE
//! reference: https://wiki.osdev.org/ATA_PIO_Mode

use super::consts::*;
use crate::arch::PortIo;
use storage::{DeviceError, FsError, FsResult};

/// One ATA channel: a command block at `io_base` and a control block at `ctrl_base`.
#[derive(Debug)]
pub struct AtaBus<P: PortIo> {
    ports: P,
    io_base: u16,
    ctrl_base: u16,
}

impl<P: PortIo> AtaBus<P> {
    pub fn new(ports: P, io_base: u16, ctrl_base: u16) -> Self {
        Self {
            ports,
            io_base,
            ctrl_base,
        }
    }

    #[inline]
    fn read_reg(&mut self, offset: u16) -> u8 {
        self.ports.inb(self.io_base + offset)
    }

    #[inline]
    fn write_reg(&mut self, offset: u16, value: u8) {
        self.ports.outb(self.io_base + offset, value)
    }

    #[inline]
    fn alternate_status(&mut self) -> AtaStatus {
        AtaStatus::from_bits_retain(self.ports.inb(self.ctrl_base))
    }

    /// Four reads of the alternate status port, about 400ns.
    #[inline]
    fn settle(&mut self) {
        for _ in 0..4 {
            self.alternate_status();
        }
    }

    /// Reads the `status` port after the standard 400ns settle delay.
    #[inline]
    fn status(&mut self) -> AtaStatus {
        self.settle();
        AtaStatus::from_bits_retain(self.read_reg(REG_STATUS))
    }

    #[inline]
    fn error(&mut self) -> AtaError {
        AtaError::from_bits_retain(self.read_reg(REG_ERROR))
    }

    /// Log debug information about the bus
    fn debug(&mut self, status: AtaStatus) {
        warn!("ATA error register  : {:?}", self.error());
        warn!("ATA status register : {:?}", status);
    }

    /// Polls until BSY clears, giving up after [`ATA_POLL_LIMIT`] reads.
    fn wait_not_busy(&mut self) -> FsResult<AtaStatus> {
        for _ in 0..ATA_POLL_LIMIT {
            let status = self.status();
            if !status.contains(AtaStatus::BUSY) {
                return Ok(status);
            }
            core::hint::spin_loop();
        }

        warn!("ATA timeout: bus {:#x} stayed busy", self.io_base);
        Err(DeviceError::Timeout.into())
    }

    /// Polls until BSY clears and DRQ sets. ERR or DF ends the wait with a read error.
    fn wait_data_ready(&mut self) -> FsResult {
        for _ in 0..ATA_POLL_LIMIT {
            let status = self.status();
            if !status.contains(AtaStatus::BUSY) {
                if status.intersects(AtaStatus::ERROR | AtaStatus::DRIVE_WRITE_FAULT) {
                    self.debug(status);
                    return Err(DeviceError::ReadError.into());
                }
                if status.contains(AtaStatus::DATA_REQUEST_READY) {
                    return Ok(());
                }
            }
            core::hint::spin_loop();
        }

        warn!("ATA timeout: bus {:#x} never requested data", self.io_base);
        Err(DeviceError::Timeout.into())
    }

    /// Identifies the drive at the given `drive` number (0 or 1).
    ///
    /// Returns the 256 IDENTIFY words of a PATA drive. A bus with nothing
    /// attached, or a device that is not plain PATA, is an unknown device.
    ///
    /// reference: https://wiki.osdev.org/ATA_PIO_Mode#IDENTIFY_command
    pub(super) fn identify_drive(&mut self, drive: u8) -> FsResult<[u16; SECTOR_WORDS]> {
        info!("Identifying drive {}", drive);

        self.wait_not_busy()?;
        self.write_reg(REG_DRIVE_SELECT, 0xA0 | ((drive & 1) << 4));
        self.write_reg(REG_SECTOR_COUNT, 0);
        self.write_reg(REG_LBA_LOW, 0);
        self.write_reg(REG_LBA_MID, 0);
        self.write_reg(REG_LBA_HIGH, 0);
        self.write_reg(REG_COMMAND, AtaCommand::IdentifyDevice as u8);

        if self.status().is_empty() {
            return Err(DeviceError::UnknownDevice.into());
        }

        self.wait_not_busy()?;

        let mid = self.read_reg(REG_LBA_MID);
        let high = self.read_reg(REG_LBA_HIGH);
        match AtaDeviceType::from_signature(mid, high) {
            AtaDeviceType::Pata => {}
            other => {
                warn!("Drive {} is {:?}, only PATA is supported", drive, other);
                return Err(DeviceError::UnknownDevice.into());
            }
        }

        self.wait_data_ready()?;

        let mut words = [0u16; SECTOR_WORDS];
        self.ports.inw_rep(self.io_base + REG_DATA, &mut words);
        Ok(words)
    }

    /// Reads the single sector `lba` of `drive` into `buf` (exactly 512 bytes).
    ///
    /// reference: https://wiki.osdev.org/ATA_PIO_Mode#28_bit_PIO
    pub(super) fn read_pio(&mut self, drive: u8, lba: u32, buf: &mut [u8]) -> FsResult {
        if lba as u64 >= LBA28_LIMIT || buf.len() != SECTOR_WORDS * 2 {
            return Err(FsError::InvalidArgument);
        }

        self.wait_not_busy()?;

        let bytes = lba.to_le_bytes();
        self.write_reg(
            REG_DRIVE_SELECT,
            0xE0 | ((drive & 1) << 4) | (bytes[3] & 0x0F),
        );
        self.write_reg(REG_SECTOR_COUNT, 1);
        self.write_reg(REG_LBA_LOW, bytes[0]);
        self.write_reg(REG_LBA_MID, bytes[1]);
        self.write_reg(REG_LBA_HIGH, bytes[2]);
        self.write_reg(REG_COMMAND, AtaCommand::ReadPio as u8);

        self.wait_data_ready()?;

        let mut words = [0u16; SECTOR_WORDS];
        self.ports.inw_rep(self.io_base + REG_DATA, &mut words);
        for (chunk, word) in buf.chunks_exact_mut(2).zip(words) {
            chunk.copy_from_slice(&word.to_le_bytes());
        }

        self.settle();
        Ok(())
    }
}
