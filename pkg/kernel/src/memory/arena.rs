//! Kernel bump arena.
//!
//! Hands out 4-byte aligned slices of a fixed static buffer. Nothing is ever
//! reclaimed: `kfree` exists for symmetry and does nothing.

use core::cell::UnsafeCell;
use core::ptr::NonNull;
use core::sync::atomic::{AtomicUsize, Ordering};
use storage::BufferAllocator;

pub const KERNEL_ARENA_SIZE: usize = 1024 * 1024; // 1 MiB

const ARENA_ALIGN: usize = 4;

pub static KERNEL_ARENA: BumpArena<KERNEL_ARENA_SIZE> = BumpArena::new();

/// Allocates `size` bytes from the kernel arena.
pub fn kmalloc(size: usize) -> Option<NonNull<u8>> {
    KERNEL_ARENA.kmalloc(size)
}

/// Does nothing: the kernel arena never reclaims memory.
pub fn kfree(ptr: Option<NonNull<u8>>) {
    KERNEL_ARENA.kfree(ptr)
}

#[repr(C, align(4096))]
struct ArenaMemory<const N: usize>([u8; N]);

pub struct BumpArena<const N: usize> {
    memory: UnsafeCell<ArenaMemory<N>>,
    /// Offset of the next free byte; only ever grows.
    next: AtomicUsize,
}

// SAFETY: every byte range is handed out at most once, by an atomic bump of `next`.
unsafe impl<const N: usize> Sync for BumpArena<N> {}

impl<const N: usize> BumpArena<N> {
    pub const fn new() -> Self {
        Self {
            memory: UnsafeCell::new(ArenaMemory([0; N])),
            next: AtomicUsize::new(0),
        }
    }

    /// Reserves `size` bytes rounded up to a multiple of 4.
    ///
    /// Returns `None` for a zero size or when the arena cannot fit the request.
    pub fn kmalloc(&self, size: usize) -> Option<NonNull<u8>> {
        if size == 0 {
            return None;
        }
        let rounded = size.checked_next_multiple_of(ARENA_ALIGN)?;

        let offset = self
            .next
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |next| {
                next.checked_add(rounded).filter(|&end| end <= N)
            })
            .ok()?;

        let base = self.memory.get() as *mut u8;
        // SAFETY: offset + rounded <= N keeps the pointer inside the buffer.
        NonNull::new(unsafe { base.add(offset) })
    }

    pub fn kfree(&self, _ptr: Option<NonNull<u8>>) {}

    /// Bytes handed out so far, including alignment padding.
    pub fn used(&self) -> usize {
        self.next.load(Ordering::Acquire)
    }

    pub const fn capacity(&self) -> usize {
        N
    }

    pub fn remaining(&self) -> usize {
        N - self.used()
    }
}

impl<const N: usize> Default for BumpArena<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a, const N: usize> BufferAllocator<'a> for BumpArena<N> {
    fn allocate(&'a self, len: usize) -> Option<&'a mut [u8]> {
        let ptr = self.kmalloc(len)?;
        // SAFETY: the range was reserved by this call alone and lives as long as the arena.
        Some(unsafe { core::slice::from_raw_parts_mut(ptr.as_ptr(), len) })
    }
}

impl<const N: usize> core::fmt::Debug for BumpArena<N> {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        f.debug_struct("BumpArena")
            .field("used", &self.used())
            .field("capacity", &N)
            .finish()
    }
}
