#![cfg_attr(not(test), no_std)]
#![allow(clippy::missing_safety_doc)]

#[macro_use]
extern crate log;
#[macro_use]
extern crate lazy_static;
#[macro_use]
extern crate bitflags;

#[macro_use]
pub mod utils;
pub use utils::*;

#[macro_use]
pub mod drivers;
pub use drivers::{ata::AtaDrive, *};

pub mod arch;
pub mod config;
pub mod memory;

pub use arch::boot::BootInfo;
pub use config::KernelConfig;
use log::LevelFilter;

/// Brings the machine up in dependency order and returns the parsed command line.
pub fn init(boot_info: &'static BootInfo<'static>) -> KernelConfig<'static> {
    vga::init(); // console for print!
    let serial_ok = serial::init(); // serial for log!
    logger::init(LevelFilter::Info);
    if !serial_ok {
        println!("COM1 failed its loopback test, kernel log disabled.");
    }

    let config = KernelConfig::parse(boot_info.cmdline.unwrap_or(""));
    log::set_max_level(config.log_level);
    debug!("Boot info: {:?}", boot_info);
    info!("Command line: {:?}", config);
    info!("Running at CPL {}", arch::current_privilege_level());

    memory::init(config.load_paging);

    if config.mount {
        if let Err(err) = filesystem::init() {
            error!("Failed to mount root filesystem: {}", err);
        }
    } else {
        info!("Filesystem mount skipped.");
    }

    info!("Nucleus initialized.");
    config
}

pub fn humanized_size(size: u64) -> (f64, &'static str) {
    const UNITS: [&str; 5] = ["B", "KB", "MB", "GB", "TB"];

    if size == 0 {
        return (0.0, UNITS[0]);
    }

    let index = libm::floor(libm::log(size as f64) / libm::log(1024.0)) as usize;
    let index = index.min(UNITS.len() - 1);

    let converted_size = size as f64 / libm::pow(1024.0, index as f64);

    (converted_size, UNITS[index])
}
