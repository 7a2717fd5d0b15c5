//! Timing window legend.

use ratatui::{
    layout::Rect,
    style::Style,
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
};

use tickbar::timing::{Gamemode, ThresholdTable};

use crate::ui::theme::grade_color;

pub fn draw_windows(f: &mut ratatui::Frame<'_>, area: Rect, windows: &ThresholdTable, mode: Gamemode) {
    let lines: Vec<Line> = windows
        .iter()
        .map(|(grade, radius)| {
            Line::from(vec![
                Span::styled(
                    format!("{:>5}", grade.label()),
                    Style::default().fg(grade_color(grade.label())),
                ),
                Span::raw(format!("  ±{radius:.2} ms")),
            ])
        })
        .collect();
    let title = format!("Windows ({mode})");
    f.render_widget(
        Paragraph::new(lines).block(Block::default().borders(Borders::ALL).title(title)),
        area,
    );
}
