use crossterm::{
    cursor::{Hide, MoveTo, Show},
    event::{poll, read, Event, KeyCode, KeyModifiers},
    execute, queue,
    style::{Attribute, Color, Print, ResetColor, SetAttribute, SetForegroundColor},
    terminal::{
        disable_raw_mode, enable_raw_mode, size, Clear, ClearType, EnterAlternateScreen,
        LeaveAlternateScreen,
    },
};
use std::fmt::Write as _;
use std::io::{self, stdout, Write};
use std::time::Duration;

/// Back-buffered terminal surface
pub struct Terminal {
    width: u16,
    height: u16,
    buffer: Vec<Vec<Cell>>,
    interactive: bool,
}

/// A single cell in the terminal buffer
#[derive(Clone, PartialEq, Debug)]
pub struct Cell {
    pub ch: char,
    pub fg: Option<Color>,
    pub bold: bool,
}

impl Default for Cell {
    fn default() -> Self {
        Self {
            ch: ' ',
            fg: None,
            bold: false,
        }
    }
}

impl Terminal {
    /// Take over the real terminal: raw mode, alternate screen, hidden cursor
    pub fn new() -> io::Result<Self> {
        let (width, height) = size()?;
        enable_raw_mode()?;
        execute!(stdout(), EnterAlternateScreen, Hide)?;

        Ok(Self {
            width,
            height,
            buffer: vec![vec![Cell::default(); width as usize]; height as usize],
            interactive: true,
        })
    }

    /// Off-screen buffer of fixed size, for print mode and tests
    pub fn headless(width: u16, height: u16) -> Self {
        Self {
            width,
            height,
            buffer: vec![vec![Cell::default(); width as usize]; height as usize],
            interactive: false,
        }
    }

    pub fn size(&self) -> (u16, u16) {
        (self.width, self.height)
    }

    /// Resize the back buffer, dropping its contents
    pub fn resize(&mut self, width: u16, height: u16) {
        self.width = width;
        self.height = height;
        self.buffer = vec![vec![Cell::default(); width as usize]; height as usize];
    }

    /// Pick up a changed window size; true if it changed
    pub fn sync_size(&mut self) -> io::Result<bool> {
        if !self.interactive {
            return Ok(false);
        }
        let (w, h) = size()?;
        if (w, h) == (self.width, self.height) {
            return Ok(false);
        }
        self.resize(w, h);
        execute!(stdout(), Clear(ClearType::All))?;
        Ok(true)
    }

    pub fn clear(&mut self) {
        for row in &mut self.buffer {
            row.fill(Cell::default());
        }
    }

    #[cfg(test)]
    pub fn get(&self, x: u16, y: u16) -> Option<&Cell> {
        self.buffer.get(y as usize)?.get(x as usize)
    }

    pub fn set(&mut self, x: i32, y: i32, ch: char, fg: Option<Color>, bold: bool) {
        if x >= 0 && x < self.width as i32 && y >= 0 && y < self.height as i32 {
            self.buffer[y as usize][x as usize] = Cell { ch, fg, bold };
        }
    }

    pub fn set_str(&mut self, x: i32, y: i32, s: &str, fg: Option<Color>, bold: bool) {
        for (i, ch) in s.chars().enumerate() {
            self.set(x + i as i32, y, ch, fg, bold);
        }
    }

    /// Row `y` as plain text
    #[cfg(test)]
    pub fn row_text(&self, y: u16) -> String {
        self.buffer
            .get(y as usize)
            .map(|row| row.iter().map(|c| c.ch).collect())
            .unwrap_or_default()
    }

    /// Flush the back buffer to the screen
    pub fn present(&self) -> io::Result<()> {
        let mut out = stdout();
        for (y, row) in self.buffer.iter().enumerate() {
            queue!(out, MoveTo(0, y as u16))?;
            for cell in row {
                if cell.bold {
                    queue!(out, SetAttribute(Attribute::Bold))?;
                }
                match cell.fg {
                    Some(color) => queue!(out, SetForegroundColor(color), Print(cell.ch), ResetColor)?,
                    None => queue!(out, Print(cell.ch))?,
                }
                if cell.bold {
                    queue!(out, SetAttribute(Attribute::Reset))?;
                }
            }
        }
        out.flush()
    }

    /// Check for keypress (non-blocking)
    pub fn check_key(&self) -> io::Result<Option<(KeyCode, KeyModifiers)>> {
        if poll(Duration::from_millis(0))? {
            if let Event::Key(key_event) = read()? {
                return Ok(Some((key_event.code, key_event.modifiers)));
            }
        }
        Ok(None)
    }

    /// The buffer as text with ANSI colors (for print mode)
    pub fn to_ansi(&self) -> String {
        let mut out = String::new();
        for row in &self.buffer {
            for cell in row {
                if cell.ch == ' ' {
                    out.push(' ');
                    continue;
                }
                if cell.bold {
                    out.push_str("\x1b[1m");
                }
                if let Some(code) = cell.fg.and_then(ansi_fg) {
                    out.push_str(&code);
                }
                out.push(cell.ch);
                out.push_str("\x1b[0m");
            }
            out.push('\n');
        }
        out
    }
}

fn ansi_fg(color: Color) -> Option<String> {
    let mut s = String::new();
    let written = match color {
        Color::Rgb { r, g, b } => write!(s, "\x1b[38;2;{};{};{}m", r, g, b),
        Color::AnsiValue(v) => write!(s, "\x1b[38;5;{}m", v),
        // Standard colors (0-7)
        Color::Black => write!(s, "\x1b[30m"),
        Color::DarkRed => write!(s, "\x1b[31m"),
        Color::DarkGreen => write!(s, "\x1b[32m"),
        Color::DarkYellow => write!(s, "\x1b[33m"),
        Color::DarkBlue => write!(s, "\x1b[34m"),
        Color::DarkMagenta => write!(s, "\x1b[35m"),
        Color::DarkCyan => write!(s, "\x1b[36m"),
        Color::Grey => write!(s, "\x1b[37m"),
        // Bright colors (8-15)
        Color::DarkGrey => write!(s, "\x1b[90m"),
        Color::Red => write!(s, "\x1b[91m"),
        Color::Green => write!(s, "\x1b[92m"),
        Color::Yellow => write!(s, "\x1b[93m"),
        Color::Blue => write!(s, "\x1b[94m"),
        Color::Magenta => write!(s, "\x1b[95m"),
        Color::Cyan => write!(s, "\x1b[96m"),
        Color::White => write!(s, "\x1b[97m"),
        _ => return None,
    };
    written.ok().map(|_| s)
}

impl Drop for Terminal {
    fn drop(&mut self) {
        if self.interactive {
            let _ = execute!(stdout(), Show, LeaveAlternateScreen);
            let _ = disable_raw_mode();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_clips_out_of_bounds() {
        let mut term = Terminal::headless(4, 2);
        term.set(-1, 0, 'x', None, false);
        term.set(4, 0, 'x', None, false);
        term.set(0, 2, 'x', None, false);
        term.set_str(2, 1, "abc", None, false);
        assert_eq!(term.row_text(0), "    ");
        assert_eq!(term.row_text(1), "  ab");
    }

    #[test]
    fn ansi_output_colors_cells() {
        let mut term = Terminal::headless(2, 1);
        term.set(0, 0, '#', Some(Color::Green), true);
        let text = term.to_ansi();
        assert_eq!(text, "\x1b[1m\x1b[92m#\x1b[0m \n");
    }

    #[test]
    fn resize_resets_buffer() {
        let mut term = Terminal::headless(2, 2);
        term.set(1, 1, 'x', None, false);
        term.resize(3, 1);
        assert_eq!(term.size(), (3, 1));
        assert_eq!(term.row_text(0), "   ");
        assert!(!term.sync_size().unwrap());
    }
}
