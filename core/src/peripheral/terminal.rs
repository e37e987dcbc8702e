use std::io::Write;
use std::net::TcpStream;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use crate::peripheral::Peripheral;

pub const COLUMNS: usize = 40;
pub const ROWS: usize = 24;

/// Character cell used for blanks.
const BLANK: u8 = b' ';

/// Display state guarded by one lock: the character grid, the cursor and
/// the running output capture.
struct Screen {
    grid: [[u8; COLUMNS]; ROWS],
    row: usize,
    col: usize,
    cursor_visible: bool,
    output: Vec<u8>,
}

impl Screen {
    fn new() -> Self {
        Self {
            grid: [[BLANK; COLUMNS]; ROWS],
            row: 0,
            col: 0,
            cursor_visible: true,
            output: Vec::new(),
        }
    }

    fn scroll_up(&mut self) {
        self.grid.copy_within(1.., 0);
        self.grid[ROWS - 1] = [BLANK; COLUMNS];
    }

    fn newline(&mut self) {
        self.col = 0;
        self.row += 1;
        if self.row == ROWS {
            self.scroll_up();
            self.row = ROWS - 1;
        }
    }

    fn put(&mut self, ch: u8) {
        self.grid[self.row][self.col] = ch;
        self.col += 1;
        if self.col == COLUMNS {
            self.newline();
        }
    }
}

/// A copy of the display state for host rendering.
#[derive(Clone)]
pub struct TerminalSnapshot {
    pub grid: [[u8; COLUMNS]; ROWS],
    pub cursor_row: usize,
    pub cursor_col: usize,
    pub cursor_visible: bool,
}

/// Video terminal on PIA port B.
///
/// Consumes bytes the CPU writes through the PIA and maintains a 40x24
/// character grid with a blinking cursor. A carriage return (low seven
/// bits 0x0D) moves the cursor to the start of the next row, scrolling the
/// grid when it runs off the bottom; printable bytes store at the cursor
/// and advance it.
///
/// The data register models the original ~60 characters-per-second link:
/// reads return 0 when the terminal is ready for another byte and 0x80
/// while it is busy, and every write asserts busy for a configurable
/// interval.
///
/// Every emitted character is appended to a running capture (for the host
/// shell) and fanned out to the registered network client sockets.
pub struct VideoTerminal {
    screen: Mutex<Screen>,
    sockets: Mutex<Vec<TcpStream>>,
    ready_at: Mutex<Instant>,
    busy_interval: Duration,
}

impl VideoTerminal {
    pub fn new() -> Self {
        // 60 cps
        Self::with_busy_interval(Duration::from_micros(16_667))
    }

    pub fn with_busy_interval(busy_interval: Duration) -> Self {
        Self {
            screen: Mutex::new(Screen::new()),
            sockets: Mutex::new(Vec::new()),
            ready_at: Mutex::new(Instant::now()),
            busy_interval,
        }
    }

    pub fn snapshot(&self) -> TerminalSnapshot {
        let screen = self.screen.lock().unwrap();
        TerminalSnapshot {
            grid: screen.grid,
            cursor_row: screen.row,
            cursor_col: screen.col,
            cursor_visible: screen.cursor_visible,
        }
    }

    /// Drain the capture of characters emitted since the last call.
    pub fn take_output(&self) -> Vec<u8> {
        std::mem::take(&mut self.screen.lock().unwrap().output)
    }

    /// Blank the grid and home the cursor.
    pub fn clear(&self) {
        let mut screen = self.screen.lock().unwrap();
        screen.grid = [[BLANK; COLUMNS]; ROWS];
        screen.row = 0;
        screen.col = 0;
    }

    /// Host timer tick: advances the cursor blink phase.
    pub fn timer(&self) {
        let mut screen = self.screen.lock().unwrap();
        screen.cursor_visible = !screen.cursor_visible;
    }

    /// Period at which the host should call [`timer`](Self::timer).
    pub fn timer_duration(&self) -> Duration {
        Duration::from_millis(500)
    }

    /// Register a network client to receive emitted characters.
    pub fn add_socket(&self, stream: TcpStream) {
        self.sockets.lock().unwrap().push(stream);
    }

    /// The guarded client socket list, shared with the network listener.
    pub fn sockets(&self) -> &Mutex<Vec<TcpStream>> {
        &self.sockets
    }

    /// Send one emitted byte to every connected client. A client whose
    /// socket errors is dropped; a client that cannot accept the byte
    /// right now misses it.
    fn fan_out(&self, byte: u8) {
        let mut sockets = self.sockets.lock().unwrap();
        sockets.retain_mut(|stream| match stream.write_all(&[byte]) {
            Ok(()) => true,
            Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => true,
            Err(e) => {
                log::warn!("dropping display client: {e}");
                false
            }
        });
    }
}

impl Default for VideoTerminal {
    fn default() -> Self {
        Self::new()
    }
}

impl Peripheral for VideoTerminal {
    /// Display status: 0 when ready for the next byte, 0x80 while busy.
    fn read(&self) -> u8 {
        if Instant::now() >= *self.ready_at.lock().unwrap() {
            0x00
        } else {
            0x80
        }
    }

    fn write(&self, value: u8) {
        *self.ready_at.lock().unwrap() = Instant::now() + self.busy_interval;

        let ch = value & 0x7F;
        match ch {
            0x0D => {
                let mut screen = self.screen.lock().unwrap();
                screen.newline();
                screen.output.push(b'\n');
                drop(screen);
                self.fan_out(b'\r');
                self.fan_out(b'\n');
            }
            0x20..=0x7E => {
                let mut screen = self.screen.lock().unwrap();
                screen.put(ch);
                screen.output.push(ch);
                drop(screen);
                self.fan_out(ch);
            }
            _ => {}
        }
    }

    fn interrupt1(&self) -> bool {
        false
    }

    fn interrupt2(&self) -> bool {
        false
    }
}
