//! VGA text-mode console.
//!
//! reference: https://wiki.osdev.org/Text_UI

use core::fmt;

/// Physical address of the colour text buffer.
pub const VGA_BUFFER: usize = 0xB8000;
pub const WIDTH: usize = 80;
pub const HEIGHT: usize = 25;
/// White on black.
pub const DEFAULT_ATTRIBUTE: u8 = 0x0F;
const TAB_WIDTH: usize = 4;
/// Drawn for characters outside code page 437's ASCII range.
const REPLACEMENT: u8 = 0xFE;

pub type Cells = [u16; WIDTH * HEIGHT];

#[allow(dead_code)]
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Color {
    Black = 0,
    Blue = 1,
    Green = 2,
    Cyan = 3,
    Red = 4,
    Magenta = 5,
    Brown = 6,
    LightGray = 7,
    DarkGray = 8,
    LightBlue = 9,
    LightGreen = 10,
    LightCyan = 11,
    LightRed = 12,
    Pink = 13,
    Yellow = 14,
    White = 15,
}

/// An 80x25 grid of character cells with a cursor.
///
/// Cell writes are volatile so the console can sit on the VGA buffer itself.
pub struct Console<'a> {
    cells: &'a mut Cells,
    column: usize,
    row: usize,
    attribute: u8,
}

impl<'a> Console<'a> {
    pub fn new(cells: &'a mut Cells) -> Self {
        Self {
            cells,
            column: 0,
            row: 0,
            attribute: DEFAULT_ATTRIBUTE,
        }
    }

    #[inline]
    fn blank(&self) -> u16 {
        (self.attribute as u16) << 8 | b' ' as u16
    }

    #[inline]
    fn store(&mut self, index: usize, value: u16) {
        // SAFETY: the reference is valid and `index` is bounds checked
        unsafe { core::ptr::write_volatile(&mut self.cells[index], value) }
    }

    #[inline]
    fn load(&self, index: usize) -> u16 {
        // SAFETY: as above
        unsafe { core::ptr::read_volatile(&self.cells[index]) }
    }

    /// Character and attribute at `(column, row)`.
    pub fn cell(&self, column: usize, row: usize) -> (u8, u8) {
        let value = self.load(row * WIDTH + column);
        (value as u8, (value >> 8) as u8)
    }

    pub fn cursor(&self) -> (usize, usize) {
        (self.column, self.row)
    }

    pub fn set_color(&mut self, foreground: Color, background: Color) {
        self.attribute = (background as u8) << 4 | foreground as u8;
    }

    pub fn attribute(&self) -> u8 {
        self.attribute
    }

    /// Blanks the screen and homes the cursor.
    pub fn clear(&mut self) {
        let blank = self.blank();
        for index in 0..WIDTH * HEIGHT {
            self.store(index, blank);
        }
        self.column = 0;
        self.row = 0;
    }

    fn scroll(&mut self) {
        for index in 0..WIDTH * (HEIGHT - 1) {
            let below = self.load(index + WIDTH);
            self.store(index, below);
        }
        let blank = self.blank();
        for index in WIDTH * (HEIGHT - 1)..WIDTH * HEIGHT {
            self.store(index, blank);
        }
        self.row = HEIGHT - 1;
    }

    /// Writes one code page 437 byte and moves the cursor.
    ///
    /// `\n` starts a new line, `\r` returns to column 0, `\t` advances to the
    /// next multiple of 4 and backspace erases the previous cell on the line.
    pub fn putchar(&mut self, byte: u8) {
        match byte {
            b'\n' => {
                self.column = 0;
                self.row += 1;
            }
            b'\r' => self.column = 0,
            b'\t' => self.column = (self.column + TAB_WIDTH) & !(TAB_WIDTH - 1),
            0x08 => {
                if self.column > 0 {
                    self.column -= 1;
                    let blank = self.blank();
                    self.store(self.row * WIDTH + self.column, blank);
                }
            }
            byte => {
                let value = (self.attribute as u16) << 8 | byte as u16;
                self.store(self.row * WIDTH + self.column, value);
                self.column += 1;
            }
        }

        if self.column >= WIDTH {
            self.column = 0;
            self.row += 1;
        }
        if self.row >= HEIGHT {
            self.scroll();
        }
    }
}

impl fmt::Write for Console<'_> {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        for c in s.chars() {
            let byte = if c.is_ascii() { c as u8 } else { REPLACEMENT };
            self.putchar(byte);
        }
        Ok(())
    }
}

once_mutex!(pub CONSOLE: Console<'static>);

guard_access_fn! {
    pub get_console(CONSOLE: Console<'static>)
}

/// Takes over the VGA text buffer and clears it.
pub fn init() {
    // SAFETY: the text buffer is identity mapped and only `CONSOLE` touches it
    let cells = unsafe { &mut *(VGA_BUFFER as *mut Cells) };
    let mut console = Console::new(cells);
    console.clear();
    init_CONSOLE(console);
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::fmt::Write;

    fn row_text(console: &Console, row: usize) -> String {
        (0..WIDTH)
            .map(|column| console.cell(column, row).0 as char)
            .collect::<String>()
            .trim_end()
            .to_string()
    }

    fn screen() -> Box<Cells> {
        Box::new([0; WIDTH * HEIGHT])
    }

    #[test]
    fn test_write_and_newline() {
        let mut cells = screen();
        let mut console = Console::new(&mut cells);
        console.clear();
        write!(console, "Hello\nWorld").unwrap();

        assert_eq!(row_text(&console, 0), "Hello");
        assert_eq!(row_text(&console, 1), "World");
        assert_eq!(console.cursor(), (5, 1));
        assert_eq!(console.cell(0, 0), (b'H', DEFAULT_ATTRIBUTE));
    }

    #[test]
    fn test_control_characters() {
        let mut cells = screen();
        let mut console = Console::new(&mut cells);
        console.clear();

        console.putchar(b'a');
        console.putchar(b'\t');
        assert_eq!(console.cursor(), (4, 0));
        console.putchar(b'\t');
        assert_eq!(console.cursor(), (8, 0));

        write!(console, "xyz\r").unwrap();
        assert_eq!(console.cursor(), (0, 0));

        write!(console, "\nab\x08").unwrap();
        assert_eq!(console.cursor(), (1, 1));
        assert_eq!(console.cell(1, 1).0, b' ');
        // backspace at column 0 stays put
        write!(console, "\x08\x08").unwrap();
        assert_eq!(console.cursor(), (0, 1));
    }

    #[test]
    fn test_wrap_and_scroll() {
        let mut cells = screen();
        let mut console = Console::new(&mut cells);
        console.clear();

        for _ in 0..WIDTH {
            console.putchar(b'#');
        }
        assert_eq!(console.cursor(), (0, 1));

        for row in 1..HEIGHT {
            write!(console, "line {}\n", row).unwrap();
        }
        // the row of hashes scrolled off the top
        assert_eq!(row_text(&console, 0), "line 1");
        assert_eq!(row_text(&console, HEIGHT - 2), "line 24");
        assert_eq!(row_text(&console, HEIGHT - 1), "");
        assert_eq!(console.cursor(), (0, HEIGHT - 1));
    }

    #[test]
    fn test_colors_and_replacement() {
        let mut cells = screen();
        let mut console = Console::new(&mut cells);
        console.set_color(Color::Yellow, Color::Blue);
        assert_eq!(console.attribute(), 0x1E);
        write!(console, "é").unwrap();
        assert_eq!(console.cell(0, 0), (0xFE, 0x1E));

        console.clear();
        assert_eq!(console.cell(79, 24), (b' ', 0x1E));
        assert_eq!(console.cursor(), (0, 0));
    }
}
