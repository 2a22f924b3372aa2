use crate::terminal::Terminal;
use crossterm::style::Color;

/// Help text for the interactive view
pub const HELP: &str = "\
ORDERGLOBE
─────────────────
r       Refresh now
Space   Pause animation
!-()    Color scheme
?       Toggle help
q/Esc   Quit";

/// Size (columns, rows) of a box drawn around `lines`
pub fn box_size(lines: &[String]) -> (usize, usize) {
    let max_width = lines.iter().map(|l| l.chars().count()).max().unwrap_or(0);
    (max_width + 4, lines.len() + 2)
}

/// Draw `lines` framed by a single-line border with its top-left corner at (x, y)
pub fn draw_box(term: &mut Terminal, x: i32, y: i32, lines: &[String], border: Color, text: Color) {
    let (box_width, box_height) = box_size(lines);
    let inner = box_width - 4;
    let right = x + box_width as i32 - 1;
    let bottom = y + box_height as i32 - 1;

    term.set(x, y, '┌', Some(border), false);
    term.set(right, y, '┐', Some(border), false);
    term.set(x, bottom, '└', Some(border), false);
    term.set(right, bottom, '┘', Some(border), false);
    for cx in x + 1..right {
        term.set(cx, y, '─', Some(border), false);
        term.set(cx, bottom, '─', Some(border), false);
    }

    for (i, line) in lines.iter().enumerate() {
        let row = y + 1 + i as i32;
        term.set(x, row, '│', Some(border), false);
        let padding = inner.saturating_sub(line.chars().count());
        let padded = format!(" {}{} ", line, " ".repeat(padding));
        term.set_str(x + 1, row, &padded, Some(text), false);
        term.set(right, row, '│', Some(border), false);
    }
}

/// Render a centered help overlay box with the provided text.
pub fn render_help_overlay(term: &mut Terminal, help_text: &str) {
    if help_text.is_empty() {
        return;
    }
    let lines: Vec<String> = help_text.lines().map(str::to_string).collect();
    let (width, height) = term.size();
    let (box_width, box_height) = box_size(&lines);
    let x = (width as usize).saturating_sub(box_width) / 2;
    let y = (height as usize).saturating_sub(box_height) / 2;
    draw_box(term, x as i32, y as i32, &lines, Color::White, Color::Grey);
}

/// Greedy word wrap; words longer than `width` get a line of their own
pub fn wrap(text: &str, width: usize) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();
    for word in text.split_whitespace() {
        let needed = if current.is_empty() {
            word.chars().count()
        } else {
            current.chars().count() + 1 + word.chars().count()
        };
        if needed > width && !current.is_empty() {
            lines.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push(' ');
        }
        current.push_str(word);
    }
    if !current.is_empty() {
        lines.push(current);
    }
    lines
}
