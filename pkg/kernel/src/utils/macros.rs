use crate::drivers::serial::SERIAL;
use core::fmt::*;

/// Declares `$fn`, which locks the `Once<Mutex<$ty>>` at `$mutex`.
///
/// The accessor never blocks: it yields `None` while the value is
/// uninitialized or held elsewhere.
#[macro_export]
macro_rules! guard_access_fn {
    ($(#[$meta:meta])* $v:vis $fn:ident ($mutex:path : $ty:ty)) => {
        $(#[$meta])*
        #[inline(never)]
        #[allow(dead_code)]
        $v fn $fn<'a>() -> Option<spin::MutexGuard<'a, $ty>> {
            $mutex.get().and_then(spin::Mutex::try_lock)
        }
    };
}

/// Declares a lazily set `static $v: Once<Mutex<$t>>` and its `init_$v`.
#[macro_export]
macro_rules! once_mutex {
    ($i:vis $v:ident: $t:ty) => {
        $i static $v: spin::Once<spin::Mutex<$t>> = spin::Once::new();

        paste::item! {
            #[allow(non_snake_case)]
            $i fn [<init_ $v>]([<val_ $v>]: $t) {
                $v.call_once(|| spin::Mutex::new([<val_ $v>]));
            }
        }
    };
}

/// Writes to the VGA console.
#[macro_export]
macro_rules! print {
    ($($arg:tt)*) => (
        $crate::utils::print_internal(format_args!($($arg)*))
    );
}

#[macro_export]
macro_rules! println {
    () => ($crate::print!("\n"));
    ($($arg:tt)*) => ($crate::print!("{}\n", format_args!($($arg)*)));
}

#[doc(hidden)]
pub fn print_internal(args: Arguments) {
    if let Some(mut console) = crate::drivers::vga::get_console() {
        // the console never fails a write
        let _ = console.write_fmt(args);
    }
}

#[allow(dead_code)]
#[cfg_attr(target_os = "none", panic_handler)]
fn panic(info: &core::panic::PanicInfo) -> ! {
    // force unlock serial for panic output
    if let Some(serial) = SERIAL.get() {
        unsafe { serial.force_unlock() };
    }

    error!("ERROR: panic!\n\n{:#?}", info);
    loop {
        crate::arch::halt();
    }
}
