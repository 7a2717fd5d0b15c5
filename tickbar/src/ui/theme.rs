//! Shared UI theme constants.

use ratatui::style::Color;

use tickbar::stats::ArrowTone;

pub const ARROW_EARLY: Color = Color::Rgb(0, 128, 255);
pub const ARROW_LATE: Color = Color::Rgb(255, 0, 0);
pub const ARROW_PERFECT: Color = Color::Rgb(255, 255, 255);
pub const BAR_CENTER: Color = Color::Rgb(191, 0, 0);
pub const LINK_UP: Color = Color::Green;
pub const LINK_DOWN: Color = Color::DarkGray;

// Grade colors keyed by grade label
pub fn grade_color(label: &str) -> Color {
    match label {
        "300g" => Color::Rgb(255, 255, 255),
        "300" => Color::Rgb(50, 188, 231),
        "200" => Color::Rgb(160, 230, 90),
        "100" => Color::Rgb(87, 227, 19),
        "50" => Color::Rgb(218, 174, 70),
        "0" => Color::Rgb(240, 60, 60),
        _ => Color::DarkGray,
    }
}

pub fn arrow_color(tone: ArrowTone) -> Color {
    match tone {
        ArrowTone::Perfect => ARROW_PERFECT,
        ArrowTone::Early => ARROW_EARLY,
        ArrowTone::Late => ARROW_LATE,
    }
}
