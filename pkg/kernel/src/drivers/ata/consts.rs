//! ATA register layout, status bits and commands.
//!
//! reference: https://wiki.osdev.org/ATA_PIO_Mode#Registers

/// I/O and control port bases of the primary bus.
pub const PRIMARY_BUS: (u16, u16) = (0x1F0, 0x3F6);
/// I/O and control port bases of the secondary bus.
pub const SECONDARY_BUS: (u16, u16) = (0x170, 0x376);

pub const REG_DATA: u16 = 0;
pub const REG_ERROR: u16 = 1;
pub const REG_SECTOR_COUNT: u16 = 2;
pub const REG_LBA_LOW: u16 = 3;
pub const REG_LBA_MID: u16 = 4;
pub const REG_LBA_HIGH: u16 = 5;
pub const REG_DRIVE_SELECT: u16 = 6;
/// Status on read, command on write.
pub const REG_STATUS: u16 = 7;
pub const REG_COMMAND: u16 = 7;

/// Words moved per sector.
pub const SECTOR_WORDS: usize = 256;
/// First LBA that does not fit in 28 bits.
pub const LBA28_LIMIT: u64 = 1 << 28;
/// Status reads before a wait gives up with a timeout.
pub const ATA_POLL_LIMIT: usize = 100_000;

bitflags! {
    /// The status register.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct AtaStatus: u8 {
        const ERROR = 0x01;
        const INDEX = 0x02;
        const CORRECTED_DATA = 0x04;
        const DATA_REQUEST_READY = 0x08;
        const OVERLAPPED_MODE_SERVICE_REQUEST = 0x10;
        const DRIVE_WRITE_FAULT = 0x20;
        const READY = 0x40;
        const BUSY = 0x80;
    }
}

bitflags! {
    /// The error register, valid while `AtaStatus::ERROR` is set.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct AtaError: u8 {
        const ADDRESS_MARK_NOT_FOUND = 0x01;
        const TRACK_ZERO_NOT_FOUND = 0x02;
        const ABORTED = 0x04;
        const MEDIA_CHANGE_REQUEST = 0x08;
        const ID_NOT_FOUND = 0x10;
        const MEDIA_CHANGED = 0x20;
        const UNCORRECTABLE_DATA = 0x40;
        const BAD_BLOCK = 0x80;
    }
}

#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AtaCommand {
    ReadPio = 0x20,
    IdentifyDevice = 0xEC,
}

/// What answered an IDENTIFY, told apart by the LBA mid/high signature.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AtaDeviceType {
    Pata,
    PataPi,
    Sata,
    SataPi,
    Unknown,
}

impl AtaDeviceType {
    pub fn from_signature(mid: u8, high: u8) -> Self {
        match (mid, high) {
            (0x00, 0x00) => Self::Pata,
            (0x14, 0xEB) => Self::PataPi,
            (0x3C, 0xC3) => Self::Sata,
            (0x69, 0x96) => Self::SataPi,
            _ => Self::Unknown,
        }
    }
}
