use crossterm::event::KeyCode;
use crossterm::style::Color;

/// Route line and arc color, as in the web version's `green`
pub const ROUTE: Color = Color::Green;
/// Anchor (headquarters) marker
pub const ANCHOR: Color = Color::Yellow;
/// Destination marker
pub const DESTINATION: Color = Color::Red;

/// Active color scheme, switched with Shift+digit
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ColorState {
    pub scheme: u8,
}

impl ColorState {
    pub fn new(default_scheme: u8) -> Self {
        Self { scheme: default_scheme.min(9) }
    }

    /// Handle color scheme key input. Returns true if key was handled.
    pub fn handle_key(&mut self, code: KeyCode) -> bool {
        let scheme = match code {
            KeyCode::Char(')') => 0,
            KeyCode::Char('!') => 1,
            KeyCode::Char('@') => 2,
            KeyCode::Char('#') => 3,
            KeyCode::Char('$') => 4,
            KeyCode::Char('%') => 5,
            KeyCode::Char('^') => 6,
            KeyCode::Char('&') => 7,
            KeyCode::Char('*') => 8,
            KeyCode::Char('(') => 9,
            _ => return false,
        };
        self.scheme = scheme;
        true
    }

    /// Scene color for an intensity level 0 (dim) to 3 (bright)
    pub fn shade(&self, intensity: u8) -> (Color, bool) {
        scheme_color(self.scheme, intensity)
    }

    pub fn status(&self, status: StatusColor) -> Color {
        status_to_scheme(self.scheme, status)
    }
}

// Four steps per scheme: dim, normal, bright, highlight
const SCHEMES: [[(Color, bool); 4]; 10] = [
    // green (matrix)
    [(Color::DarkGreen, false), (Color::Green, false), (Color::Green, true), (Color::AnsiValue(10), true)],
    // fire
    [(Color::DarkRed, false), (Color::Red, false), (Color::DarkYellow, true), (Color::Yellow, true)],
    // ice
    [(Color::DarkBlue, false), (Color::Blue, false), (Color::Cyan, true), (Color::Cyan, true)],
    // pink
    [(Color::DarkMagenta, false), (Color::Magenta, false), (Color::Magenta, true), (Color::AnsiValue(13), true)],
    // gold
    [(Color::DarkYellow, false), (Color::Yellow, false), (Color::Yellow, true), (Color::AnsiValue(11), true)],
    // electric
    [(Color::DarkCyan, false), (Color::Cyan, false), (Color::Cyan, true), (Color::AnsiValue(14), true)],
    // lava
    [(Color::DarkRed, false), (Color::Red, false), (Color::Magenta, true), (Color::AnsiValue(9), true)],
    // mono
    [(Color::DarkGrey, false), (Color::Grey, false), (Color::White, true), (Color::White, true)],
    // rainbow
    [(Color::Red, false), (Color::Yellow, false), (Color::Green, true), (Color::Cyan, true)],
    // neon
    [(Color::DarkBlue, false), (Color::Blue, false), (Color::Magenta, true), (Color::AnsiValue(13), true)],
];

/// Get color from scheme based on intensity (0-3)
pub fn scheme_color(scheme: u8, intensity: u8) -> (Color, bool) {
    let palette = &SCHEMES[(scheme as usize).min(SCHEMES.len() - 1)];
    palette[(intensity as usize).min(3)]
}

/// Map semantic status color to scheme color; mono mode keeps the semantic colors
pub fn status_to_scheme(scheme: u8, status: StatusColor) -> Color {
    if scheme == 7 {
        return match status {
            StatusColor::Good => Color::Green,
            StatusColor::Critical => Color::Red,
            StatusColor::Info => Color::Cyan,
            StatusColor::Muted => Color::DarkGrey,
        };
    }
    let intensity = match status {
        StatusColor::Muted => 0,
        StatusColor::Info => 1,
        StatusColor::Good => 2,
        StatusColor::Critical => 3,
    };
    scheme_color(scheme, intensity).0
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum StatusColor {
    Good,
    Critical,
    Info,
    Muted,
}
