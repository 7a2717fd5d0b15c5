//! Average / median / standard deviation readout.

use ratatui::{
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
};

use tickbar::stats::{ArrowTone, Statistics};

use crate::ui::theme::arrow_color;

pub fn draw_stats(
    f: &mut ratatui::Frame<'_>,
    area: Rect,
    stats: &Statistics,
    perfect_threshold: f64,
    show_sd: bool,
) {
    let tone = ArrowTone::classify(stats.median, perfect_threshold);
    let mut spans = vec![
        Span::raw(format!("avg {:+7.2} ms  ", stats.average)),
        Span::styled(
            format!("median {:+7.2} ms", stats.median),
            Style::default()
                .fg(arrow_color(tone))
                .add_modifier(Modifier::BOLD),
        ),
    ];
    if show_sd {
        spans.push(Span::raw(format!("  sd {:6.2}", stats.standard_deviation)));
    }
    spans.push(Span::raw(format!("  live {}", stats.count)));

    let p = Paragraph::new(Line::from(spans))
        .block(Block::default().borders(Borders::ALL).title("Statistics"));
    f.render_widget(p, area);
}
