//! Order summary panel and status line

use crate::colors::{ColorState, StatusColor};
use crate::geo::DisplayMode;
use crate::help::{draw_box, wrap};
use crate::order::Order;
use crate::terminal::Terminal;
use chrono::{DateTime, Local};
use crossterm::style::Color;

const TITLE: &str = "Order infos";

/// Columns reserved on the left for the panel
pub const PANEL_COLS: u16 = 30;

/// Panel strip width for a terminal `width` columns wide
pub fn panel_cols(width: u16) -> u16 {
    PANEL_COLS.min(width / 2)
}

/// What the panel shows; the last good order survives failed cycles
#[derive(Debug, Default)]
pub struct Panel {
    order: Option<Order>,
    updated_at: Option<DateTime<Local>>,
    cycle: u64,
    last_error: Option<String>,
}

impl Panel {
    pub fn update(&mut self, order: Order, cycle: u64, at: DateTime<Local>) {
        self.order = Some(order);
        self.updated_at = Some(at);
        self.cycle = cycle;
        self.last_error = None;
    }

    pub fn fail(&mut self, message: String, cycle: u64) {
        self.cycle = cycle;
        self.last_error = Some(message);
    }

    #[cfg(test)]
    pub fn order(&self) -> Option<&Order> {
        self.order.as_ref()
    }

    #[cfg(test)]
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Summary lines, title first
    pub fn lines(&self) -> Vec<String> {
        let mut lines = vec![TITLE.to_string()];
        match &self.order {
            Some(order) => lines.extend(summary_lines(order)),
            None => lines.push("waiting for first order…".to_string()),
        }
        lines
    }

    pub fn status_line(&self, mode: Option<DisplayMode>, caption: &str) -> String {
        let updated = self
            .updated_at
            .map(|t| t.format("%H:%M:%S").to_string())
            .unwrap_or_else(|| "--:--:--".to_string());
        let mode = mode.map(|m| m.label()).unwrap_or("idle");
        let mut line = format!(" #{} · updated {} · {} · {}", self.cycle, updated, mode, caption);
        if let Some(err) = &self.last_error {
            line.push_str(" · ");
            line.push_str(err);
        }
        line
    }

    pub fn render(&self, term: &mut Terminal, colors: &ColorState, mode: Option<DisplayMode>, caption: &str) {
        let (width, height) = term.size();
        // Box border and margins take six columns of the strip
        let inner = (panel_cols(width) as usize).saturating_sub(6).max(1);
        let lines: Vec<String> = self
            .lines()
            .iter()
            .flat_map(|line| wrap(line, inner))
            .map(|line| line.chars().take(inner).collect())
            .collect();
        draw_box(term, 1, 0, &lines, colors.status(StatusColor::Info), Color::White);

        if height == 0 {
            return;
        }
        let status = if self.last_error.is_some() {
            StatusColor::Critical
        } else if self.order.is_some() {
            StatusColor::Good
        } else {
            StatusColor::Muted
        };
        term.set_str(0, height as i32 - 1, &self.status_line(mode, caption), Some(colors.status(status)), false);
    }
}

/// Field lines shown for an order
pub fn summary_lines(order: &Order) -> Vec<String> {
    vec![
        format!("Amount: {} €", order.amount),
        format!("Eshop: {}", order.shop),
        format!("Customer type: {}", order.customer_type),
        format!("Location: {}", order.city),
        format!("Channel: {}", order.channel),
    ]
}
