//! Braille dot canvas: 2x4 dots per terminal cell

use crate::colors::{self, ColorState};
use crate::terminal::Terminal;

/// What a dot was drawn with; higher variants win when dots share a cell
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
#[repr(u8)]
pub enum Ink {
    Dim = 1,
    Normal = 2,
    Bright = 3,
    Route = 4,
    Anchor = 5,
    Destination = 6,
}

impl Ink {
    fn from_u8(v: u8) -> Option<Ink> {
        Some(match v {
            1 => Ink::Dim,
            2 => Ink::Normal,
            3 => Ink::Bright,
            4 => Ink::Route,
            5 => Ink::Anchor,
            6 => Ink::Destination,
            _ => return None,
        })
    }
}

// Bit for dot (dx, dy) inside a braille cell
const DOT_BITS: [[u8; 4]; 2] = [[0x01, 0x02, 0x04, 0x40], [0x08, 0x10, 0x20, 0x80]];

pub struct BrailleCanvas {
    width: usize,
    height: usize,
    dots: Vec<u8>,
}

impl BrailleCanvas {
    /// Canvas covering `cols` x `rows` terminal cells
    pub fn for_cells(cols: u16, rows: u16) -> Self {
        let width = cols as usize * 2;
        let height = rows as usize * 4;
        Self {
            width,
            height,
            dots: vec![0; width * height],
        }
    }

    /// Size in dots
    pub fn size(&self) -> (usize, usize) {
        (self.width, self.height)
    }

    pub fn clear(&mut self) {
        self.dots.fill(0);
    }

    #[cfg(test)]
    pub fn get(&self, x: i32, y: i32) -> Option<Ink> {
        if x < 0 || y < 0 || x as usize >= self.width || y as usize >= self.height {
            return None;
        }
        Ink::from_u8(self.dots[y as usize * self.width + x as usize])
    }

    /// Plot a dot; a stronger ink already there is kept
    pub fn plot(&mut self, x: i32, y: i32, ink: Ink) {
        if x < 0 || y < 0 || x as usize >= self.width || y as usize >= self.height {
            return;
        }
        let slot = &mut self.dots[y as usize * self.width + x as usize];
        *slot = (*slot).max(ink as u8);
    }

    /// Clip a segment to the canvas (Liang-Barsky); `None` if it misses
    fn clip(&self, (x0, y0): (i32, i32), (x1, y1): (i32, i32)) -> Option<((i32, i32), (i32, i32))> {
        if self.width == 0 || self.height == 0 {
            return None;
        }
        let (x0, y0) = (x0 as f64, y0 as f64);
        let (dx, dy) = (x1 as f64 - x0, y1 as f64 - y0);
        let (xmax, ymax) = (self.width as f64 - 1.0, self.height as f64 - 1.0);
        let (mut t0, mut t1) = (0.0f64, 1.0f64);
        for (p, q) in [(-dx, x0), (dx, xmax - x0), (-dy, y0), (dy, ymax - y0)] {
            if p == 0.0 {
                if q < 0.0 {
                    return None;
                }
                continue;
            }
            let r = q / p;
            if p < 0.0 {
                if r > t1 {
                    return None;
                }
                t0 = t0.max(r);
            } else {
                if r < t0 {
                    return None;
                }
                t1 = t1.min(r);
            }
        }
        let at = |t: f64| ((x0 + t * dx).round() as i32, (y0 + t * dy).round() as i32);
        Some((at(t0), at(t1)))
    }

    /// Bresenham line, clipped to the canvas
    pub fn line(&mut self, from: (i32, i32), to: (i32, i32), ink: Ink) {
        let Some(((x0, y0), (x1, y1))) = self.clip(from, to) else {
            return;
        };
        let dx = (x1 - x0).abs();
        let dy = -(y1 - y0).abs();
        let sx = if x0 < x1 { 1 } else { -1 };
        let sy = if y0 < y1 { 1 } else { -1 };
        let (mut x, mut y, mut err) = (x0, y0, dx + dy);
        loop {
            self.plot(x, y, ink);
            if x == x1 && y == y1 {
                break;
            }
            let e2 = 2 * err;
            if e2 >= dy {
                err += dy;
                x += sx;
            }
            if e2 <= dx {
                err += dx;
                y += sy;
            }
        }
    }

    /// Filled diamond of radius `r`, for markers
    pub fn diamond(&mut self, (cx, cy): (i32, i32), r: i32, ink: Ink) {
        for dy in -r..=r {
            for dx in -r..=r {
                if dx.abs() + dy.abs() <= r {
                    self.plot(cx + dx, cy + dy, ink);
                }
            }
        }
    }

    /// Copy onto the terminal with the cell at (`col`, `row`) as top-left
    pub fn blit(&self, term: &mut Terminal, col: u16, row: u16, colors: &ColorState) {
        let cols = self.width / 2;
        let rows = self.height / 4;
        for cy in 0..rows {
            for cx in 0..cols {
                let mut bits = 0u8;
                let mut strongest = 0u8;
                for (dx, column) in DOT_BITS.iter().enumerate() {
                    for (dy, bit) in column.iter().enumerate() {
                        let v = self.dots[(cy * 4 + dy) * self.width + cx * 2 + dx];
                        if v > 0 {
                            bits |= bit;
                            strongest = strongest.max(v);
                        }
                    }
                }
                let Some(ink) = Ink::from_u8(strongest) else {
                    continue;
                };
                let ch = char::from_u32(0x2800 + bits as u32).unwrap_or(' ');
                let (color, bold) = match ink {
                    Ink::Dim => colors.shade(0),
                    Ink::Normal => colors.shade(1),
                    Ink::Bright => colors.shade(2),
                    Ink::Route => (colors::ROUTE, true),
                    Ink::Anchor => (colors::ANCHOR, true),
                    Ink::Destination => (colors::DESTINATION, true),
                };
                term.set(col as i32 + cx as i32, row as i32 + cy as i32, ch, Some(color), bold);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stronger_ink_wins() {
        let mut c = BrailleCanvas::for_cells(1, 1);
        c.plot(0, 0, Ink::Route);
        c.plot(0, 0, Ink::Dim);
        assert_eq!(c.get(0, 0), Some(Ink::Route));
        c.plot(0, 0, Ink::Destination);
        assert_eq!(c.get(0, 0), Some(Ink::Destination));
        c.plot(5, 0, Ink::Dim);
        assert_eq!(c.get(5, 0), None);
    }

    #[test]
    fn line_hits_both_ends() {
        let mut c = BrailleCanvas::for_cells(10, 5);
        c.line((1, 1), (17, 13), Ink::Normal);
        assert_eq!(c.get(1, 1), Some(Ink::Normal));
        assert_eq!(c.get(17, 13), Some(Ink::Normal));
    }

    #[test]
    fn far_off_canvas_line_still_crosses() {
        let mut c = BrailleCanvas::for_cells(10, 5);
        c.line((-200_000, 5), (200_000, 5), Ink::Bright);
        assert_eq!(c.get(0, 5), Some(Ink::Bright));
        assert_eq!(c.get(19, 5), Some(Ink::Bright));

        c.line((-50_000, -50_000), (50_000, 50_000), Ink::Normal);
        assert_eq!(c.get(0, 0), Some(Ink::Normal));
        assert_eq!(c.get(19, 19), Some(Ink::Normal));
    }

    #[test]
    fn line_outside_canvas_draws_nothing() {
        let mut c = BrailleCanvas::for_cells(2, 1);
        c.line((-10, -10), (-1, 30), Ink::Normal);
        c.line((5, 2), (90, 2), Ink::Normal);
        assert!((0..4).all(|x| (0..4).all(|y| c.get(x, y).is_none())));
    }

    #[test]
    fn full_cell_is_full_braille() {
        let mut c = BrailleCanvas::for_cells(1, 1);
        for y in 0..4 {
            for x in 0..2 {
                c.plot(x, y, Ink::Normal);
            }
        }
        let mut term = Terminal::headless(1, 1);
        c.blit(&mut term, 0, 0, &ColorState::new(0));
        assert_eq!(term.row_text(0), "\u{28FF}");
    }

    #[test]
    fn top_left_dot_is_first_bit() {
        let mut c = BrailleCanvas::for_cells(2, 1);
        c.plot(2, 0, Ink::Anchor);
        let mut term = Terminal::headless(2, 1);
        c.blit(&mut term, 0, 0, &ColorState::new(0));
        assert_eq!(term.row_text(0), " \u{2801}");
        assert_eq!(term.get(1, 0).and_then(|cell| cell.fg), Some(colors::ANCHOR));
    }
}
