//! Multiboot2 boot glue.
//!
//! reference: <https://www.gnu.org/software/grub/manual/multiboot2/multiboot.html>

use core::fmt;

/// Magic value at the start of the image header.
pub const HEADER_MAGIC: u32 = 0xE852_50D6;
/// Magic value the loader leaves in EAX.
pub const BOOTLOADER_MAGIC: u32 = 0x36D7_6289;

const HEADER_ARCH_I386: u32 = 0;
const HEADER_LENGTH: u32 = 16;

const TAG_END: u32 = 0;
const TAG_CMDLINE: u32 = 1;

/// The six-word image header placed in `.multiboot` by [`entry_point!`](crate::entry_point).
#[repr(C, align(8))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MultibootHeader([u32; 6]);

impl MultibootHeader {
    pub const fn new() -> Self {
        let checksum = 0u32.wrapping_sub(
            HEADER_MAGIC
                .wrapping_add(HEADER_ARCH_I386)
                .wrapping_add(HEADER_LENGTH),
        );
        Self([HEADER_MAGIC, HEADER_ARCH_I386, HEADER_LENGTH, checksum, 0, 12])
    }

    pub const fn words(&self) -> &[u32; 6] {
        &self.0
    }
}

impl Default for MultibootHeader {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BootError {
    /// EAX did not hold [`BOOTLOADER_MAGIC`].
    BadMagic(u32),
    /// The information structure or one of its tags overruns its declared size.
    Malformed,
}

impl fmt::Display for BootError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            BootError::BadMagic(magic) => write!(f, "bad multiboot2 magic {:#x}", magic),
            BootError::Malformed => write!(f, "malformed multiboot2 information"),
        }
    }
}

/// What the kernel keeps from the loader's boot information.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BootInfo<'a> {
    pub cmdline: Option<&'a str>,
    /// Total size of the information structure in bytes.
    pub total_size: u32,
}

impl<'a> BootInfo<'a> {
    /// Reads the structure the loader left at physical address `addr`.
    ///
    /// # Safety
    ///
    /// `addr` must be the address handed over in EBX by a multiboot2 loader,
    /// identity mapped and left untouched for `'a`.
    pub unsafe fn from_raw(magic: u32, addr: u32) -> Result<Self, BootError> {
        if magic != BOOTLOADER_MAGIC {
            return Err(BootError::BadMagic(magic));
        }
        if addr == 0 {
            return Err(BootError::Malformed);
        }

        let ptr = addr as usize as *const u8;
        let total_size = unsafe { (ptr as *const u32).read_unaligned() } as usize;
        let bytes = unsafe { core::slice::from_raw_parts(ptr, total_size) };
        Self::parse(bytes)
    }

    /// Walks the tag list of a boot information structure.
    pub fn parse(bytes: &'a [u8]) -> Result<Self, BootError> {
        let total_size = read_u32(bytes, 0).ok_or(BootError::Malformed)?;
        if total_size as usize > bytes.len() || total_size < 8 {
            return Err(BootError::Malformed);
        }
        let bytes = &bytes[..total_size as usize];

        let mut info = BootInfo {
            cmdline: None,
            total_size,
        };

        // tags start after the 8-byte fixed part and are 8-byte aligned
        let mut offset = 8;
        while offset + 8 <= bytes.len() {
            let ty = read_u32(bytes, offset).ok_or(BootError::Malformed)?;
            let size = read_u32(bytes, offset + 4).ok_or(BootError::Malformed)? as usize;
            if size < 8 {
                return Err(BootError::Malformed);
            }
            let end = offset.checked_add(size).ok_or(BootError::Malformed)?;
            let body = bytes.get(offset + 8..end).ok_or(BootError::Malformed)?;

            match ty {
                TAG_END => break,
                TAG_CMDLINE => {
                    let len = body.iter().position(|&b| b == 0).unwrap_or(body.len());
                    info.cmdline = core::str::from_utf8(&body[..len]).ok();
                }
                _ => trace!("Skipping multiboot2 tag {} ({} bytes)", ty, size),
            }

            offset = size
                .checked_next_multiple_of(8)
                .and_then(|step| offset.checked_add(step))
                .ok_or(BootError::Malformed)?;
        }

        Ok(info)
    }
}

fn read_u32(bytes: &[u8], offset: usize) -> Option<u32> {
    let raw = bytes.get(offset..offset + 4)?;
    Some(u32::from_le_bytes([raw[0], raw[1], raw[2], raw[3]]))
}

/// Size of the stack `_start` switches to.
pub const BOOT_STACK_SIZE: usize = 16 * 1024;

/// Declares the kernel entry: the multiboot2 header, the boot stack and
/// `_start`, which calls `$path` with the parsed boot information.
///
/// `$path` must have the signature `fn(&'static BootInfo<'static>) -> !`.
#[macro_export]
macro_rules! entry_point {
    ($path:path) => {
        #[used]
        #[unsafe(link_section = ".multiboot")]
        static __MULTIBOOT_HEADER: $crate::arch::boot::MultibootHeader =
            $crate::arch::boot::MultibootHeader::new();

        #[cfg(all(target_arch = "x86", target_os = "none"))]
        core::arch::global_asm!(
            ".section .bss",
            ".balign 16",
            "__boot_stack_bottom:",
            ".skip {stack_size}",
            "__boot_stack_top:",
            "",
            ".section .text",
            ".global _start",
            "_start:",
            "    mov esp, offset __boot_stack_top",
            "    push ebx",
            "    push eax",
            "    call __nucleus_entry",
            "2:",
            "    cli",
            "    hlt",
            "    jmp 2b",
            stack_size = const $crate::arch::boot::BOOT_STACK_SIZE,
        );

        #[unsafe(no_mangle)]
        pub extern "C" fn __nucleus_entry(magic: u32, info: u32) -> ! {
            // type check the given entry
            let f: fn(&'static $crate::arch::boot::BootInfo<'static>) -> ! = $path;

            static BOOT_INFO: spin::Once<$crate::arch::boot::BootInfo<'static>> = spin::Once::new();
            let boot_info = match unsafe { $crate::arch::boot::BootInfo::from_raw(magic, info) } {
                Ok(info) => info,
                // keep booting without a command line
                Err(_) => $crate::arch::boot::BootInfo::default(),
            };

            f(BOOT_INFO.call_once(|| boot_info))
        }
    };
}
