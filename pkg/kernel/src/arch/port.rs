//! Port-mapped I/O.
//!
//! Drivers talk to hardware through [`PortIo`] so that their register
//! protocols can run against an emulated device in host tests.

use core::sync::atomic::{Ordering, compiler_fence, fence};

/// Access to the x86 I/O port space.
pub trait PortIo {
    fn inb(&mut self, port: u16) -> u8;

    fn outb(&mut self, port: u16, value: u8);

    /// Reads `buf.len()` words from `port` into `buf` (`rep insw`).
    fn inw_rep(&mut self, port: u16, buf: &mut [u16]);
}

/// The real I/O port space.
#[derive(Debug)]
pub struct HardwarePorts(());

impl HardwarePorts {
    /// # Safety
    ///
    /// The caller must own the devices behind every port it later touches
    /// through this value.
    pub const unsafe fn new() -> Self {
        Self(())
    }
}

impl PortIo for HardwarePorts {
    #[inline]
    fn inb(&mut self, port: u16) -> u8 {
        unsafe { inb(port) }
    }

    #[inline]
    fn outb(&mut self, port: u16, value: u8) {
        unsafe { outb(port, value) }
    }

    #[inline]
    fn inw_rep(&mut self, port: u16, buf: &mut [u16]) {
        unsafe { inw_rep(port, buf.as_mut_ptr(), buf.len()) }
    }
}

/// Reads a byte from an I/O port.
///
/// # Safety
///
/// Reading a device register can change device state.
#[inline]
pub unsafe fn inb(port: u16) -> u8 {
    unsafe { x86::io::inb(port) }
}

/// Writes a byte to an I/O port.
///
/// # Safety
///
/// The caller must ensure the port and value are valid for the device.
#[inline]
pub unsafe fn outb(port: u16, value: u8) {
    unsafe { x86::io::outb(port, value) }
}

/// Reads `count` words from `port` into `dst` with a single `rep insw`.
///
/// # Safety
///
/// `dst` must be valid for `count` word writes.
#[inline]
pub unsafe fn inw_rep(port: u16, dst: *mut u16, count: usize) {
    unsafe {
        core::arch::asm!(
            "rep insw",
            in("dx") port,
            inout("di") dst => _,
            inout("cx") count => _,
            options(nostack, preserves_flags)
        );
    }
}

/// Full memory barrier: no load or store moves across it, in the compiler or the CPU.
#[inline]
pub fn barrier() {
    compiler_fence(Ordering::SeqCst);
    fence(Ordering::SeqCst);
}

/// Points CR3 at the page directory at physical address `phys`.
///
/// # Safety
///
/// `phys` must be the 4 KiB aligned physical address of a page directory
/// that stays alive while it is loaded, and it must map the running code if
/// paging is enabled.
pub unsafe fn load_page_directory(phys: u32) {
    barrier();
    unsafe { x86::controlregs::cr3_write(phys as u64) };
    barrier();
}
