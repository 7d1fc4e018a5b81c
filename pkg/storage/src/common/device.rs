use super::*;

/// Largest run of blocks a single [`BlockDevice::read_blocks`] call may request.
///
/// Matches the LBA28 PIO sector-count limit; callers that need more split the read.
pub const MAX_BLOCKS_PER_READ: usize = 256;

/// A synchronous device addressed in [`BLOCK_SIZE`]-byte blocks.
pub trait BlockDevice {
    /// Number of addressable blocks.
    fn block_count(&self) -> FsResult<usize>;

    /// Read `count` consecutive blocks starting at block `offset` into `buf`.
    ///
    /// `count` must be in `1..=MAX_BLOCKS_PER_READ` and `buf` must hold at
    /// least `count * BLOCK_SIZE` bytes.
    fn read_blocks(&self, offset: usize, count: usize, buf: &mut [u8]) -> FsResult;

    fn read_block(&self, offset: usize, block: &mut Block512) -> FsResult {
        self.read_blocks(offset, 1, block.as_mut())
    }
}

impl<T: BlockDevice + ?Sized> BlockDevice for &T {
    fn block_count(&self) -> FsResult<usize> {
        (**self).block_count()
    }

    fn read_blocks(&self, offset: usize, count: usize, buf: &mut [u8]) -> FsResult {
        (**self).read_blocks(offset, count, buf)
    }
}

/// Checks the `read_blocks` argument contract shared by every device.
pub fn check_read_args(count: usize, buf: &[u8]) -> FsResult {
    if count == 0 || count > MAX_BLOCKS_PER_READ || buf.len() < count * BLOCK_SIZE {
        return Err(FsError::InvalidArgument);
    }
    Ok(())
}

/// Reads `buf.len() / BLOCK_SIZE` blocks starting at `offset`, splitting the
/// transfer into runs the device accepts.
pub fn read_contiguous<D: BlockDevice + ?Sized>(
    device: &D,
    offset: usize,
    buf: &mut [u8],
) -> FsResult {
    let run_bytes = MAX_BLOCKS_PER_READ * BLOCK_SIZE;
    for (i, chunk) in buf.chunks_mut(run_bytes).enumerate() {
        let count = chunk.len() / BLOCK_SIZE;
        if count == 0 {
            break;
        }
        device.read_blocks(offset + i * MAX_BLOCKS_PER_READ, count, chunk)?;
    }
    Ok(())
}

/// Hands out byte buffers that live as long as the allocator itself.
///
/// Buffers are never returned: a volume takes what it needs once at mount.
pub trait BufferAllocator<'a> {
    /// Returns a buffer of exactly `len` bytes, or `None`
    /// when `len == 0` or the allocator is exhausted.
    fn allocate(&'a self, len: usize) -> Option<&'a mut [u8]>;
}
