//! Two-level 32-bit paging structures.
//!
//! Entries keep a packed field order: the
//! frame number sits directly above the flag bits (bit 10 in a directory
//! entry, bit 9 in a table entry) rather than at bit 12 as the MMU expects.

use super::PhysAddr;
use bit_field::BitField;
use core::ops::Range;

pub const ENTRY_COUNT: usize = 1024;

macro_rules! entry_flag {
    ($get:ident, $set:ident, $bit:expr) => {
        pub fn $get(&self) -> bool {
            self.0.get_bit($bit)
        }

        pub fn $set(&mut self, value: bool) -> &mut Self {
            self.0.set_bit($bit, value);
            self
        }
    };
}

macro_rules! entry_bits {
    ($get:ident, $set:ident, $range:expr) => {
        pub fn $get(&self) -> u32 {
            self.0.get_bits($range)
        }

        /// Values wider than the field are truncated to fit.
        pub fn $set(&mut self, value: u32) -> &mut Self {
            let range: Range<usize> = $range;
            let width = range.end - range.start;
            self.0.set_bits(range, value & ((1 << width) - 1));
            self
        }
    };
}

/// Page-directory entry.
#[repr(transparent)]
#[derive(Clone, Copy, Default, PartialEq, Eq)]
pub struct PageDirectoryEntry(u32);

impl PageDirectoryEntry {
    pub const fn new(raw: u32) -> Self {
        Self(raw)
    }

    pub const fn bits(&self) -> u32 {
        self.0
    }

    entry_flag!(present, set_present, 0);
    entry_flag!(rw, set_rw, 1);
    entry_flag!(user, set_user, 2);
    entry_flag!(pwt, set_pwt, 3);
    entry_flag!(pcd, set_pcd, 4);
    entry_flag!(accessed, set_accessed, 5);
    entry_flag!(ignored, set_ignored, 6);
    entry_flag!(pagesize, set_pagesize, 7);
    entry_bits!(ignored2, set_ignored2, 8..10);
    entry_bits!(frame_number, set_frame_number, 10..30);
}

/// Page-table entry.
#[repr(transparent)]
#[derive(Clone, Copy, Default, PartialEq, Eq)]
pub struct PageTableEntry(u32);

impl PageTableEntry {
    pub const fn new(raw: u32) -> Self {
        Self(raw)
    }

    pub const fn bits(&self) -> u32 {
        self.0
    }

    entry_flag!(present, set_present, 0);
    entry_flag!(rw, set_rw, 1);
    entry_flag!(user, set_user, 2);
    entry_flag!(accessed, set_accessed, 3);
    entry_flag!(dirty, set_dirty, 4);
    entry_flag!(pwt, set_pwt, 5);
    entry_flag!(pcd, set_pcd, 6);
    entry_flag!(unused, set_unused, 7);
    entry_flag!(global, set_global, 8);
    entry_bits!(frame_number, set_frame_number, 9..29);
}

impl core::fmt::Debug for PageDirectoryEntry {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        f.debug_struct("PageDirectoryEntry")
            .field("present", &self.present())
            .field("rw", &self.rw())
            .field("user", &self.user())
            .field("frame_number", &format_args!("{:#x}", self.frame_number()))
            .finish()
    }
}

impl core::fmt::Debug for PageTableEntry {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        f.debug_struct("PageTableEntry")
            .field("present", &self.present())
            .field("rw", &self.rw())
            .field("user", &self.user())
            .field("frame_number", &format_args!("{:#x}", self.frame_number()))
            .finish()
    }
}

#[repr(C, align(4096))]
#[derive(Clone)]
pub struct PageDirectory {
    pub entries: [PageDirectoryEntry; ENTRY_COUNT],
}

#[repr(C, align(4096))]
#[derive(Clone)]
pub struct PageTable {
    pub entries: [PageTableEntry; ENTRY_COUNT],
}

impl PageDirectory {
    pub const fn new() -> Self {
        Self {
            entries: [PageDirectoryEntry(0); ENTRY_COUNT],
        }
    }

    /// Points directory slot `index` at the page table in frame `table_frame`,
    /// present, writable, supervisor only.
    pub fn set_table(&mut self, index: usize, table_frame: u32) {
        let entry = &mut self.entries[index];
        *entry = PageDirectoryEntry::default();
        entry
            .set_present(true)
            .set_rw(true)
            .set_frame_number(table_frame);
    }
}

impl PageTable {
    pub const fn new() -> Self {
        Self {
            entries: [PageTableEntry(0); ENTRY_COUNT],
        }
    }

    /// Maps the table's 1024 pages onto consecutive frames from `first_frame`,
    /// present, writable, supervisor only.
    pub fn identity_map(&mut self, first_frame: u32) {
        for (i, entry) in self.entries.iter_mut().enumerate() {
            *entry = PageTableEntry::default();
            entry
                .set_present(true)
                .set_rw(true)
                .set_frame_number(first_frame + i as u32);
        }
    }
}

impl Default for PageDirectory {
    fn default() -> Self {
        Self::new()
    }
}

impl Default for PageTable {
    fn default() -> Self {
        Self::new()
    }
}

/// The kernel's page directory and its first page table.
pub struct KernelPaging {
    pub directory: PageDirectory,
    pub table: PageTable,
}

impl KernelPaging {
    pub const fn new() -> Self {
        Self {
            directory: PageDirectory::new(),
            table: PageTable::new(),
        }
    }

    /// Fills the table with the first 4 MiB and installs it in directory slot 0.
    pub fn prepare(&mut self) {
        self.table.identity_map(0);
        let table_frame = PhysAddr::from_ptr(&self.table).frame_number();
        self.directory.set_table(0, table_frame);
    }

    pub fn directory_address(&self) -> PhysAddr {
        PhysAddr::from_ptr(&self.directory)
    }
}

impl Default for KernelPaging {
    fn default() -> Self {
        Self::new()
    }
}
