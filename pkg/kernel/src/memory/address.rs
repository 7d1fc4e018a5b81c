use core::fmt;

pub const PAGE_SIZE: u32 = 4096;
pub const FRAME_SIZE: u32 = PAGE_SIZE;

const PAGE_SHIFT: u32 = 12;

/// A 32-bit physical address.
#[repr(transparent)]
#[derive(Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PhysAddr(u32);

impl PhysAddr {
    pub const fn new(addr: u32) -> Self {
        Self(addr)
    }

    /// Start address of frame `frame_number`.
    pub const fn from_frame(frame_number: u32) -> Self {
        Self(frame_number << PAGE_SHIFT)
    }

    pub const fn as_u32(self) -> u32 {
        self.0
    }

    /// Index of the 4 KiB frame containing this address.
    pub const fn frame_number(self) -> u32 {
        self.0 >> PAGE_SHIFT
    }

    pub const fn is_aligned(self) -> bool {
        self.0 % PAGE_SIZE == 0
    }

    pub fn from_ptr<T>(ptr: *const T) -> Self {
        Self(ptr as usize as u32)
    }
}

impl fmt::Debug for PhysAddr {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "PhysAddr({:#010x})", self.0)
    }
}

impl fmt::Display for PhysAddr {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{:#010x}", self.0)
    }
}
