use super::uart16550::SerialPort;
use crate::arch::HardwarePorts;

/// COM1.
const SERIAL_IO_PORT: u16 = 0x3F8;

pub type Serial = SerialPort<HardwarePorts>;

once_mutex!(pub SERIAL: Serial);

guard_access_fn! {
    pub get_serial(SERIAL: Serial)
}

/// Brings up COM1. Without a working UART the port stays uninitialized and
/// serial output is dropped.
pub fn init() -> bool {
    // SAFETY: COM1 is only ever driven through `SERIAL`
    let mut port = SerialPort::new(unsafe { HardwarePorts::new() }, SERIAL_IO_PORT);
    match port.init() {
        Ok(()) => {
            init_SERIAL(port);
            true
        }
        Err(_) => false,
    }
}
