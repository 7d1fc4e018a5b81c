pub mod address;
pub mod arena;
mod frames;
pub mod paging;

pub use address::*;
pub use arena::{KERNEL_ARENA, kfree, kmalloc};
pub use frames::*;

use crate::humanized_size;
use paging::KernelPaging;

/// Directory and first table, in `.bss`.
pub static KERNEL_PAGING: spin::Mutex<KernelPaging> = spin::Mutex::new(KernelPaging::new());

/// Sets up the frame pool and prepares the page tables.
///
/// With `load_paging` the page directory is also loaded into CR3.
pub fn init(load_paging: bool) {
    init_FRAME_ALLOCATOR(FrameAllocator::new());

    let (size, unit) = humanized_size((FRAME_COUNT as u32 * FRAME_SIZE) as u64);
    info!(
        "Frame Pool       : {:>7.*} {} at {}",
        3,
        size,
        unit,
        PhysAddr::new(FRAME_POOL_BASE)
    );

    let (size, unit) = humanized_size(KERNEL_ARENA.capacity() as u64);
    info!("Kernel Arena     : {:>7.*} {}", 3, size, unit);

    let mut paging = KERNEL_PAGING.lock();
    paging.prepare();
    let directory = paging.directory_address();
    debug!("Page Directory   : {}", directory);

    if load_paging {
        unsafe { crate::arch::load_page_directory(directory.as_u32()) };
        info!("CR3 loaded with {}", directory);
    }

    info!("Memory initialized.");
}
