//! Color constants for the terminal user interface.

use ratatui::style::Color;

use crate::fields::{Priority, Status};

/// Brand accent, same as the default project colour.
pub const ACCENT: Color = Color::Rgb(99, 102, 241);
pub const GREEN: Color = Color::Rgb(16, 185, 129);
pub const CYAN: Color = Color::Rgb(6, 182, 212);
pub const AMBER: Color = Color::Rgb(245, 158, 11);
pub const RED: Color = Color::Rgb(239, 68, 68);
/// Backdrop of the confirmation popup.
pub const DARK_RED: Color = Color::Rgb(114, 0, 0);

pub fn priority_color(p: Priority) -> Color {
    match p {
        Priority::Low => GREEN,
        Priority::Medium => CYAN,
        Priority::High => AMBER,
        Priority::Urgent => RED,
    }
}

pub fn status_color(s: Status) -> Color {
    match s {
        Status::Pending => Color::White,
        Status::InProgress => AMBER,
        Status::Completed => Color::DarkGray,
    }
}

/// Terminal colour for a `#rrggbb` project colour; [`ACCENT`] if malformed.
pub fn hex_to_color(hex: &str) -> Color {
    let Some(digits) = hex.strip_prefix('#').filter(|d| d.len() == 6) else {
        return ACCENT;
    };
    let channel = |i: usize| digits.get(i..i + 2).and_then(|h| u8::from_str_radix(h, 16).ok());
    match (channel(0), channel(2), channel(4)) {
        (Some(r), Some(g), Some(b)) => Color::Rgb(r, g, b),
        _ => ACCENT,
    }
}
