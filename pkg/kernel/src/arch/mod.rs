//! x86 (i686) specifics: port I/O, control registers, boot glue.

pub mod boot;
mod port;

pub use port::*;

/// Current privilege level, read from the low two bits of CS.
pub fn current_privilege_level() -> u8 {
    x86::segmentation::cs().bits() as u8 & 0b11
}

/// Halts until the next interrupt.
#[inline]
pub fn halt() {
    #[cfg(target_os = "none")]
    unsafe {
        x86::halt()
    };
    #[cfg(not(target_os = "none"))]
    core::hint::spin_loop();
}
