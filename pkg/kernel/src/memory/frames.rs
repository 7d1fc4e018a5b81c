//! Physical page frame allocator over a fixed descriptor pool.

use super::{PAGE_SIZE, PhysAddr};

once_mutex!(pub FRAME_ALLOCATOR: FrameAllocator);

guard_access_fn! {
    pub get_frame_alloc(FRAME_ALLOCATOR: FrameAllocator)
}

/// Number of frames tracked.
pub const FRAME_COUNT: usize = 128;
/// Physical address of the first tracked frame.
pub const FRAME_POOL_BASE: u32 = 0x0040_0000;

/// Bookkeeping for one physical frame.
///
/// A descriptor is either on the free list (`is_free`, refcount 0) or part of
/// exactly one outstanding [`FrameChain`] (not free, refcount 1). Links are
/// indices into the allocator's descriptor array.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameDescriptor {
    pub frame_number: u32,
    pub physical_addr: PhysAddr,
    pub is_free: bool,
    pub refcount: u32,
    /// Next descriptor on the free list, or in the chain while allocated.
    pub next: Option<usize>,
    /// Reserved for a doubly linked free list. Never maintained: always `None`.
    pub prev: Option<usize>,
}

impl FrameDescriptor {
    const fn new(index: usize) -> Self {
        let physical_addr = PhysAddr::new(FRAME_POOL_BASE + index as u32 * PAGE_SIZE);
        Self {
            frame_number: physical_addr.frame_number(),
            physical_addr,
            is_free: true,
            refcount: 0,
            next: None,
            prev: None,
        }
    }
}

/// An outstanding allocation: a null-terminated run of descriptors linked
/// through `next`.
///
/// Only [`FrameAllocator::allocate_physical_pages`] creates chains and
/// [`FrameAllocator::free_physical_pages`] consumes them, so a chain cannot be
/// freed twice.
#[must_use]
#[derive(Debug, PartialEq, Eq)]
pub struct FrameChain {
    head: usize,
    len: usize,
}

impl FrameChain {
    /// Index of the first descriptor.
    pub fn head(&self) -> usize {
        self.head
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

pub struct FrameAllocator {
    descriptors: [FrameDescriptor; FRAME_COUNT],
    free_head: Option<usize>,
    free_count: usize,
}

impl FrameAllocator {
    /// A pool with every frame free.
    pub fn new() -> Self {
        let mut allocator = Self {
            descriptors: core::array::from_fn(FrameDescriptor::new),
            free_head: None,
            free_count: 0,
        };
        allocator.init_pfa_list();
        allocator
    }

    /// Puts every descriptor back on the free list in ascending order.
    ///
    /// Outstanding chains are forgotten; only call this at boot.
    pub fn init_pfa_list(&mut self) {
        for (index, descriptor) in self.descriptors.iter_mut().enumerate() {
            *descriptor = FrameDescriptor::new(index);
            descriptor.next = (index + 1 < FRAME_COUNT).then_some(index + 1);
        }
        self.free_head = Some(0);
        self.free_count = FRAME_COUNT;
    }

    /// Detaches `n` descriptors from the front of the free list.
    ///
    /// Returns `None` without touching any state when `n` is zero or fewer
    /// than `n` frames are free.
    pub fn allocate_physical_pages(&mut self, n: usize) -> Option<FrameChain> {
        if n == 0 || n > self.free_count {
            return None;
        }

        let head = self.free_head?;
        let mut last = head;
        for i in 0..n {
            let descriptor = &mut self.descriptors[last];
            descriptor.is_free = false;
            descriptor.refcount = 1;
            if i + 1 < n {
                last = descriptor.next?;
            }
        }

        self.free_head = self.descriptors[last].next.take();
        self.free_count -= n;

        trace!("Allocated {} frame(s) starting at {}", n, self.descriptors[head].physical_addr);
        Some(FrameChain { head, len: n })
    }

    /// Pushes every descriptor of `chain` onto the front of the free list.
    ///
    /// `None` is a no-op. The walk stops at a descriptor that is already free,
    /// which only happens to chains that outlived an [`init_pfa_list`](Self::init_pfa_list).
    pub fn free_physical_pages(&mut self, chain: Option<FrameChain>) {
        let Some(chain) = chain else {
            return;
        };

        let mut current = Some(chain.head);
        while let Some(index) = current {
            let descriptor = &mut self.descriptors[index];
            if descriptor.is_free {
                warn!("Frame {} is already free, stopping", descriptor.physical_addr);
                break;
            }

            current = descriptor.next;
            descriptor.is_free = true;
            descriptor.refcount = 0;
            descriptor.next = self.free_head;
            self.free_head = Some(index);
            self.free_count += 1;
        }
    }

    pub fn free_count(&self) -> usize {
        self.free_count
    }

    pub fn descriptors(&self) -> &[FrameDescriptor; FRAME_COUNT] {
        &self.descriptors
    }

    pub fn free_head(&self) -> Option<usize> {
        self.free_head
    }

    /// Descriptors of an outstanding chain, in chain order.
    pub fn chain<'a>(&'a self, chain: &FrameChain) -> Links<'a> {
        Links {
            descriptors: &self.descriptors,
            next: Some(chain.head),
        }
    }

    /// Descriptors on the free list, from the head.
    pub fn free_list(&self) -> Links<'_> {
        Links {
            descriptors: &self.descriptors,
            next: self.free_head,
        }
    }
}

impl Default for FrameAllocator {
    fn default() -> Self {
        Self::new()
    }
}

impl core::fmt::Debug for FrameAllocator {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        f.debug_struct("FrameAllocator")
            .field("free_head", &self.free_head)
            .field("free_count", &self.free_count)
            .finish()
    }
}

/// Follows `next` links through the descriptor array.
pub struct Links<'a> {
    descriptors: &'a [FrameDescriptor; FRAME_COUNT],
    next: Option<usize>,
}

impl<'a> Iterator for Links<'a> {
    type Item = (usize, &'a FrameDescriptor);

    fn next(&mut self) -> Option<Self::Item> {
        let index = self.next?;
        let descriptor = self.descriptors.get(index)?;
        self.next = descriptor.next;
        Some((index, descriptor))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn free_indices(allocator: &FrameAllocator) -> Vec<usize> {
        allocator.free_list().map(|(index, _)| index).collect()
    }

    fn chain_indices(allocator: &FrameAllocator, chain: &FrameChain) -> Vec<usize> {
        allocator.chain(chain).map(|(index, _)| index).collect()
    }

    /// Every descriptor is either free or in exactly one outstanding chain.
    fn assert_conserved(allocator: &FrameAllocator, chains: &[FrameChain]) {
        let mut seen = free_indices(allocator);
        assert!(allocator.free_list().all(|(_, d)| d.is_free && d.refcount == 0));
        for chain in chains {
            let indices = chain_indices(allocator, chain);
            assert_eq!(indices.len(), chain.len());
            assert!(allocator.chain(chain).all(|(_, d)| !d.is_free && d.refcount == 1));
            seen.extend(indices);
        }
        seen.sort_unstable();
        assert_eq!(seen, (0..FRAME_COUNT).collect::<Vec<_>>());
        assert_eq!(allocator.free_count(), free_indices(allocator).len());
    }

    #[test]
    fn test_init_orders_free_list() {
        let allocator = FrameAllocator::new();
        assert_eq!(allocator.free_head(), Some(0));
        assert_eq!(free_indices(&allocator), (0..FRAME_COUNT).collect::<Vec<_>>());

        let first = &allocator.descriptors()[0];
        assert_eq!(first.physical_addr, PhysAddr::new(FRAME_POOL_BASE));
        assert_eq!(first.frame_number, FRAME_POOL_BASE >> 12);
        assert_eq!(allocator.descriptors()[1].frame_number, first.frame_number + 1);
        assert!(allocator.descriptors().iter().all(|d| d.prev.is_none()));
    }

    #[test]
    fn test_boot_allocate_and_free() {
        let mut allocator = FrameAllocator::new();
        assert_eq!(allocator.free_count(), 128);

        let chain = allocator.allocate_physical_pages(3).unwrap();
        assert_eq!(allocator.free_count(), 125);
        assert_eq!(chain.len(), 3);
        assert_eq!(chain_indices(&allocator, &chain), [0, 1, 2]);
        assert!(allocator.chain(&chain).all(|(_, d)| !d.is_free));
        assert_eq!(allocator.descriptors()[2].next, None);
        assert_eq!(allocator.free_head(), Some(3));

        allocator.free_physical_pages(Some(chain));
        assert_eq!(allocator.free_count(), 128);
        // freed frames go to the front in reverse chain order
        assert_eq!(&free_indices(&allocator)[..4], &[2, 1, 0, 3]);
        assert_conserved(&allocator, &[]);
    }

    #[test]
    fn test_null_handling() {
        let mut allocator = FrameAllocator::new();
        assert!(allocator.allocate_physical_pages(0).is_none());
        allocator.free_physical_pages(None);
        assert_eq!(allocator.free_count(), FRAME_COUNT);
        assert_eq!(free_indices(&allocator), (0..FRAME_COUNT).collect::<Vec<_>>());
    }

    #[test]
    fn test_failed_allocation_leaves_state_untouched() {
        let mut allocator = FrameAllocator::new();
        let held = allocator.allocate_physical_pages(100).unwrap();

        let descriptors = *allocator.descriptors();
        let head = allocator.free_head();

        assert!(allocator.allocate_physical_pages(29).is_none());
        assert!(allocator.allocate_physical_pages(usize::MAX).is_none());
        assert_eq!(allocator.descriptors(), &descriptors);
        assert_eq!(allocator.free_head(), head);
        assert_eq!(allocator.free_count(), 28);

        let rest = allocator.allocate_physical_pages(28).unwrap();
        assert_eq!(allocator.free_count(), 0);
        assert_eq!(allocator.free_head(), None);
        assert!(allocator.allocate_physical_pages(1).is_none());
        assert_conserved(&allocator, &[held, rest]);
    }

    #[test]
    fn test_conservation_over_mixed_sequence() {
        let mut allocator = FrameAllocator::new();
        let mut live: Vec<FrameChain> = Vec::new();

        // deterministic pseudo-random walk of allocate/free requests
        let mut seed = 0x2545_F491u32;
        for _ in 0..500 {
            seed ^= seed << 13;
            seed ^= seed >> 17;
            seed ^= seed << 5;

            if seed % 3 == 0 && !live.is_empty() {
                let chain = live.swap_remove(seed as usize % live.len());
                allocator.free_physical_pages(Some(chain));
            } else {
                let n = (seed as usize >> 8) % 20;
                if let Some(chain) = allocator.allocate_physical_pages(n) {
                    assert_eq!(chain.len(), n);
                    live.push(chain);
                }
            }
            assert_conserved(&allocator, &live);
        }
    }

    #[test]
    fn test_reinit_forgets_allocations() {
        let mut allocator = FrameAllocator::new();
        let stale = allocator.allocate_physical_pages(5).unwrap();
        allocator.init_pfa_list();
        assert_eq!(allocator.free_count(), FRAME_COUNT);

        // the stale chain now points into the free list and is ignored
        allocator.free_physical_pages(Some(stale));
        assert_eq!(allocator.free_count(), FRAME_COUNT);
        assert_eq!(free_indices(&allocator), (0..FRAME_COUNT).collect::<Vec<_>>());
    }
}
