//! Scene presenters
//!
//! Each presenter owns the persistent state of one display mode, builds it
//! lazily on first use and updates it in place for every new order.

pub mod globe;
pub mod map;

use crate::braille::BrailleCanvas;
use crate::colors::ColorState;
use crate::error::ProjectionError;
use crate::geo::DisplayMode;
use crate::order::Order;
use crate::terminal::Terminal;
use std::time::Duration;

/// Screen area a scene draws into, in terminal cells
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Region {
    pub col: u16,
    pub row: u16,
    pub cols: u16,
    pub rows: u16,
}

impl Region {
    /// Size in braille dots
    pub fn dots(&self) -> (usize, usize) {
        (self.cols as usize * 2, self.rows as usize * 4)
    }
}

pub trait Presenter {
    /// Apply a new order to the scene, building the scene first if needed
    fn present(&mut self, order: &Order) -> Result<(), ProjectionError>;

    /// The drawing area changed size
    fn resize(&mut self, region: Region);

    /// Draw the current scene; `elapsed` drives animations
    fn render(&self, canvas: &mut BrailleCanvas, term: &mut Terminal, colors: &ColorState, elapsed: Duration);

    /// One-line description for the status bar
    fn caption(&self) -> String;
}

/// Shows at most one presenter at a time
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Stage {
    visible: Option<DisplayMode>,
}

impl Stage {
    pub fn show(&mut self, mode: DisplayMode) {
        self.visible = Some(mode);
    }

    pub fn visible(&self) -> Option<DisplayMode> {
        self.visible
    }

    #[cfg(test)]
    pub fn is_visible(&self, mode: DisplayMode) -> bool {
        self.visible == Some(mode)
    }
}
