pub mod ata;
pub mod filesystem;
pub mod keyboard;
pub mod serial;
pub mod uart16550;
pub mod vga;
