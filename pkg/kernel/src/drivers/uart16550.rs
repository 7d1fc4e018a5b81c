//! 16550 UART in polled mode.
//!
//! reference: https://wiki.osdev.org/Serial_Ports

use crate::arch::PortIo;
use core::fmt;

const DATA: u16 = 0;
const INTERRUPT_ENABLE: u16 = 1;
const FIFO_CONTROL: u16 = 2;
const LINE_CONTROL: u16 = 3;
const MODEM_CONTROL: u16 = 4;
const LINE_STATUS: u16 = 5;

/// Byte the loopback self-test sends and expects back.
const LOOPBACK_PROBE: u8 = 0xAE;
/// Line status reads before `send` drops a byte.
const SEND_SPIN_LIMIT: usize = 100_000;

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    struct LineStatus: u8 {
        const DATA_READY = 0x01;
        const OUTPUT_EMPTY = 0x20;
    }
}

/// The loopback self-test read back something else.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoopbackFailed(pub u8);

/// A port-mapped UART 16550 serial interface.
pub struct SerialPort<P: PortIo> {
    ports: P,
    base: u16,
}

impl<P: PortIo> SerialPort<P> {
    pub const fn new(ports: P, base: u16) -> Self {
        Self { ports, base }
    }

    fn write_reg(&mut self, offset: u16, value: u8) {
        self.ports.outb(self.base + offset, value)
    }

    fn read_reg(&mut self, offset: u16) -> u8 {
        self.ports.inb(self.base + offset)
    }

    fn line_status(&mut self) -> LineStatus {
        LineStatus::from_bits_truncate(self.read_reg(LINE_STATUS))
    }

    /// Programs 38400 8N1 with FIFOs on, then runs the loopback self-test.
    ///
    /// Interrupts stay disabled: the kernel only ever polls.
    pub fn init(&mut self) -> Result<(), LoopbackFailed> {
        self.write_reg(INTERRUPT_ENABLE, 0x00);
        // DLAB on, divisor 3
        self.write_reg(LINE_CONTROL, 0x80);
        self.write_reg(DATA, 0x03);
        self.write_reg(INTERRUPT_ENABLE, 0x00);
        // 8 bits, no parity, one stop bit
        self.write_reg(LINE_CONTROL, 0x03);
        self.write_reg(FIFO_CONTROL, 0xC7);
        self.write_reg(MODEM_CONTROL, 0x0B);

        self.write_reg(MODEM_CONTROL, 0x1E);
        self.write_reg(DATA, LOOPBACK_PROBE);
        let received = self.read_reg(DATA);
        if received != LOOPBACK_PROBE {
            return Err(LoopbackFailed(received));
        }

        self.write_reg(MODEM_CONTROL, 0x0F);
        Ok(())
    }

    /// Sends a byte once the transmit holding register is empty.
    ///
    /// Gives up silently if it never empties.
    pub fn send(&mut self, data: u8) {
        for _ in 0..SEND_SPIN_LIMIT {
            if self.line_status().contains(LineStatus::OUTPUT_EMPTY) {
                self.write_reg(DATA, data);
                return;
            }
            core::hint::spin_loop();
        }
    }

    /// Receives a byte on the serial port no wait.
    pub fn receive(&mut self) -> Option<u8> {
        if self.line_status().contains(LineStatus::DATA_READY) {
            Some(self.read_reg(DATA))
        } else {
            None
        }
    }
}

impl<P: PortIo> fmt::Write for SerialPort<P> {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        for byte in s.bytes() {
            if byte == b'\n' {
                self.send(b'\r');
            }
            self.send(byte);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arch::mock::RegisterPorts;
    use core::fmt::Write;

    const COM1: u16 = 0x3F8;

    #[test]
    fn test_init_sequence() {
        let mut serial = SerialPort::new(RegisterPorts::new(0xFF), COM1);
        assert_eq!(serial.init(), Ok(()));

        let writes = &serial.ports.writes;
        assert_eq!(writes[1], (COM1 + 3, 0x80));
        assert_eq!(writes[2], (COM1, 0x03));
        assert_eq!(writes.last(), Some(&(COM1 + 4, 0x0F)));
        // interrupts never enabled
        assert!(writes.iter().all(|&(port, value)| port != COM1 + 1 || value == 0));
    }

    #[test]
    fn test_failed_loopback() {
        struct Deaf(RegisterPorts);

        impl PortIo for Deaf {
            fn inb(&mut self, _port: u16) -> u8 {
                0x00
            }
            fn outb(&mut self, port: u16, value: u8) {
                self.0.outb(port, value)
            }
            fn inw_rep(&mut self, _port: u16, buf: &mut [u16]) {
                buf.fill(0)
            }
        }

        let mut serial = SerialPort::new(Deaf(RegisterPorts::default()), COM1);
        assert_eq!(serial.init(), Err(LoopbackFailed(0x00)));

        // a transmitter that never empties drops the byte instead of hanging
        serial.send(b'x');
        assert!(!serial.ports.0.writes.contains(&(COM1, b'x')));
        assert_eq!(serial.receive(), None);
    }

    #[test]
    fn test_write_expands_newlines() {
        let mut serial = SerialPort::new(RegisterPorts::new(0xFF), COM1);
        serial.ports.writes.clear();
        write!(serial, "ok\n").unwrap();

        let sent: Vec<u8> = serial
            .ports
            .writes
            .iter()
            .filter(|&&(port, _)| port == COM1)
            .map(|&(_, value)| value)
            .collect();
        assert_eq!(sent, b"ok\r\n");
    }
}
