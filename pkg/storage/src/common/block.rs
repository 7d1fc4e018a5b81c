use core::fmt::{Debug, Formatter};
use core::ops::{Deref, DerefMut};

/// Size of a disk sector, the unit every [`BlockDevice`](super::BlockDevice) transfers.
pub const BLOCK_SIZE: usize = 512;

/// A fixed-size block of bytes, stored inline.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Block<const SIZE: usize> {
    contents: [u8; SIZE],
}

pub type Block512 = Block<BLOCK_SIZE>;

impl<const SIZE: usize> Block<SIZE> {
    pub const fn new(contents: [u8; SIZE]) -> Self {
        Self { contents }
    }

    pub const fn size() -> usize {
        SIZE
    }
}

impl<const SIZE: usize> Default for Block<SIZE> {
    fn default() -> Self {
        Self {
            contents: [0; SIZE],
        }
    }
}

impl<const SIZE: usize> AsRef<[u8]> for Block<SIZE> {
    fn as_ref(&self) -> &[u8] {
        &self.contents
    }
}

impl<const SIZE: usize> AsMut<[u8]> for Block<SIZE> {
    fn as_mut(&mut self) -> &mut [u8] {
        &mut self.contents
    }
}

impl<const SIZE: usize> Deref for Block<SIZE> {
    type Target = [u8; SIZE];

    fn deref(&self) -> &Self::Target {
        &self.contents
    }
}

impl<const SIZE: usize> DerefMut for Block<SIZE> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.contents
    }
}

impl<const SIZE: usize> Debug for Block<SIZE> {
    fn fmt(&self, f: &mut Formatter) -> core::fmt::Result {
        writeln!(f, "Block<{}> {{", SIZE)?;
        for (row, chunk) in self.contents.chunks(16).enumerate() {
            write!(f, "    {:04x}:", row * 16)?;
            for byte in chunk {
                write!(f, " {:02x}", byte)?;
            }
            writeln!(f)?;
        }
        write!(f, "}}")
    }
}
