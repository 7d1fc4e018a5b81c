#![cfg_attr(target_os = "none", no_std)]
#![cfg_attr(target_os = "none", no_main)]

#[macro_use]
extern crate log;

use nucleus::*;
use nucleus::{print, println};
use nucleus_kernel as nucleus;

nucleus::entry_point!(kernel_main);

pub fn kernel_main(boot_info: &'static BootInfo<'static>) -> ! {
    let config = nucleus::init(boot_info);
    info!("Kernel initialized.");

    frame_pool_check();

    println!("Nucleus ready.");
    if config.mount {
        filesystem::ls();
        match filesystem::cat(config.open) {
            Ok(len) => println!("\n-- {} ({} bytes) --", config.open, len),
            Err(err) => warn!("Cannot show {}: {}", config.open, err),
        }
    }

    // SAFETY: the PS/2 controller is only ever polled from here
    let mut ports = unsafe { arch::HardwarePorts::new() };
    loop {
        match keyboard::poll_scancode(&mut ports) {
            Some(scancode) => {
                if let Some(c) = keyboard::decode(scancode) {
                    print!("{}", c);
                }
            }
            None => core::hint::spin_loop(),
        }
    }
}

/// Takes three frames from the pool and gives them back.
fn frame_pool_check() {
    let Some(mut frames) = memory::get_frame_alloc() else {
        warn!("Frame allocator unavailable");
        return;
    };

    let chain = frames.allocate_physical_pages(3);
    if let Some(chain) = &chain {
        for (_, frame) in frames.chain(chain) {
            debug!("Frame {:#x} at {}", frame.frame_number, frame.physical_addr);
        }
    }
    info!("Frames free after allocating 3: {}", frames.free_count());
    frames.free_physical_pages(chain);
    info!("Frames free after release     : {}", frames.free_count());
}

#[cfg(not(target_os = "none"))]
fn main() {
    eprintln!("nucleus only runs on the i686-nucleus target");
}
