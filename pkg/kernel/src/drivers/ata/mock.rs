//! A register-level ATA controller emulated over a [`MemDisk`].

use super::consts::*;
use crate::arch::PortIo;
use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;
use storage::BlockDevice;
use storage::testing::MemDisk;

pub const MOCK_MODEL: &str = "NUCLEUS MOCK DISK";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IssuedCommand {
    pub command: u8,
    pub drive_select: u8,
    pub sector_count: u8,
    pub lba: [u8; 3],
}

#[derive(Debug, Default)]
pub struct MockState {
    pub disk: MemDisk,
    /// Status reads answered with BSY after every command.
    pub busy_reads: usize,
    /// Floating bus: every port reads 0xFF.
    pub dead: bool,
    /// Reads of this LBA fail with ERR and an aborted command.
    pub failing_lba: Option<u32>,
    /// LBA mid/high left behind by IDENTIFY.
    pub signature: (u8, u8),
    pub commands: Vec<IssuedCommand>,
    registers: [u8; 8],
    busy_left: usize,
    error: bool,
    data: VecDeque<u16>,
}

impl MockState {
    fn status(&self) -> u8 {
        if self.dead {
            return 0xFF;
        }
        let status = if self.busy_left > 0 {
            AtaStatus::BUSY | AtaStatus::READY
        } else if self.error {
            AtaStatus::READY | AtaStatus::ERROR
        } else if !self.data.is_empty() {
            AtaStatus::READY | AtaStatus::DATA_REQUEST_READY
        } else {
            AtaStatus::READY
        };
        status.bits()
    }

    fn slave_selected(&self) -> bool {
        self.registers[REG_DRIVE_SELECT as usize] & 0x10 != 0
    }

    fn identify_words(&self) -> [u16; SECTOR_WORDS] {
        let mut words = [0u16; SECTOR_WORDS];
        words[0] = 0x0040;

        let mut model = [b' '; 40];
        model[..MOCK_MODEL.len()].copy_from_slice(MOCK_MODEL.as_bytes());
        for (i, pair) in model.chunks_exact(2).enumerate() {
            words[27 + i] = u16::from_be_bytes([pair[0], pair[1]]);
        }

        let blocks = self.disk.block_count().unwrap_or(0) as u32;
        words[60] = blocks as u16;
        words[61] = (blocks >> 16) as u16;
        words
    }

    fn execute(&mut self, command: u8) {
        let r = self.registers;
        self.commands.push(IssuedCommand {
            command,
            drive_select: r[REG_DRIVE_SELECT as usize],
            sector_count: r[REG_SECTOR_COUNT as usize],
            lba: [
                r[REG_LBA_LOW as usize],
                r[REG_LBA_MID as usize],
                r[REG_LBA_HIGH as usize],
            ],
        });

        self.error = false;
        self.data.clear();

        if self.slave_selected() {
            // nothing attached: the status register stays zero
            return;
        }
        self.busy_left = self.busy_reads;

        if command == AtaCommand::IdentifyDevice as u8 {
            self.registers[REG_LBA_MID as usize] = self.signature.0;
            self.registers[REG_LBA_HIGH as usize] = self.signature.1;
            if self.signature == (0, 0) {
                let words = self.identify_words();
                self.data.extend(words);
            }
        } else if command == AtaCommand::ReadPio as u8 {
            let lba = u32::from_le_bytes([
                r[REG_LBA_LOW as usize],
                r[REG_LBA_MID as usize],
                r[REG_LBA_HIGH as usize],
                r[REG_DRIVE_SELECT as usize] & 0x0F,
            ]);
            let in_range = (lba as usize) < self.disk.block_count().unwrap_or(0);
            if self.failing_lba == Some(lba) || !in_range {
                self.error = true;
                return;
            }
            let sector = self.disk.sector(lba as usize);
            self.data.extend(
                sector
                    .chunks_exact(2)
                    .map(|pair| u16::from_le_bytes([pair[0], pair[1]])),
            );
        } else {
            self.error = true;
        }
    }
}

/// Primary-bus ports backed by a shared [`MockState`].
pub struct MockController {
    pub state: Rc<RefCell<MockState>>,
}

impl MockController {
    pub fn new(disk: MemDisk) -> Self {
        Self {
            state: Rc::new(RefCell::new(MockState {
                disk,
                ..Default::default()
            })),
        }
    }

    /// A second handle on the emulated state, for inspection after the
    /// controller has been moved into a driver.
    pub fn handle(&self) -> Rc<RefCell<MockState>> {
        self.state.clone()
    }
}

impl PortIo for MockController {
    fn inb(&mut self, port: u16) -> u8 {
        let (io_base, ctrl_base) = PRIMARY_BUS;
        let mut state = self.state.borrow_mut();
        if state.dead {
            return 0xFF;
        }

        if port == ctrl_base {
            return state.status();
        }
        match port.wrapping_sub(io_base) {
            REG_STATUS => {
                let status = if state.slave_selected() { 0 } else { state.status() };
                state.busy_left = state.busy_left.saturating_sub(1);
                status
            }
            REG_ERROR if state.error => AtaError::ABORTED.bits(),
            REG_ERROR => 0,
            offset if offset < 8 => state.registers[offset as usize],
            _ => 0xFF,
        }
    }

    fn outb(&mut self, port: u16, value: u8) {
        let (io_base, _) = PRIMARY_BUS;
        let mut state = self.state.borrow_mut();
        match port.wrapping_sub(io_base) {
            REG_COMMAND => state.execute(value),
            offset if offset < 7 => state.registers[offset as usize] = value,
            _ => {}
        }
    }

    fn inw_rep(&mut self, port: u16, buf: &mut [u16]) {
        let mut state = self.state.borrow_mut();
        if port != PRIMARY_BUS.0 + REG_DATA || state.dead {
            buf.fill(0xFFFF);
            return;
        }
        for word in buf {
            *word = state.data.pop_front().unwrap_or(0xFFFF);
        }
    }
}
