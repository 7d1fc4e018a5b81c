//! Polled PS/2 keyboard.
//!
//! The main loop reads raw scancodes from the controller and turns them into
//! characters with `pc-keyboard`.

use crate::arch::PortIo;
use pc_keyboard::{DecodedKey, HandleControl, Keyboard, ScancodeSet1, layouts};
use spin::Mutex;

const PS2_DATA: u16 = 0x60;
const PS2_STATUS: u16 = 0x64;
/// Status bit 0: the output buffer holds a byte for us.
const OUTPUT_FULL: u8 = 0x01;

/// Reads a pending scancode, if the controller has one.
pub fn poll_scancode<P: PortIo>(ports: &mut P) -> Option<u8> {
    if ports.inb(PS2_STATUS) & OUTPUT_FULL != 0 {
        Some(ports.inb(PS2_DATA))
    } else {
        None
    }
}

/// Scancode set 1 decoder with a US layout.
pub struct KeyDecoder {
    keyboard: Keyboard<layouts::Us104Key, ScancodeSet1>,
}

impl KeyDecoder {
    pub fn new() -> Self {
        Self {
            keyboard: Keyboard::new(
                ScancodeSet1::new(),
                layouts::Us104Key,
                HandleControl::Ignore,
            ),
        }
    }

    /// Feeds one scancode byte. Returns the character it completes, if any.
    ///
    /// Releases, modifiers and keys without a character yield `None`.
    pub fn decode(&mut self, scancode: u8) -> Option<char> {
        let event = self.keyboard.add_byte(scancode).ok().flatten()?;
        match self.keyboard.process_keyevent(event)? {
            DecodedKey::Unicode(c) => Some(c),
            DecodedKey::RawKey(key) => {
                trace!("Unmapped key: {:?}", key);
                None
            }
        }
    }
}

impl Default for KeyDecoder {
    fn default() -> Self {
        Self::new()
    }
}

lazy_static! {
    static ref DECODER: Mutex<KeyDecoder> = Mutex::new(KeyDecoder::new());
}

/// Decodes `scancode` with the kernel's shared keyboard state.
pub fn decode(scancode: u8) -> Option<char> {
    DECODER.lock().decode(scancode)
}
