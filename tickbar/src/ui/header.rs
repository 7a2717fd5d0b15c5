//! Top header with gameplay state, play parameters and feed link lights.

use ratatui::{
    layout::Rect,
    style::Style,
    text::{Line, Span},
    widgets::{Block, Borders},
};

use tickbar::session::{GameState, Session};
use tickbar::ws::Endpoint;

use crate::ui::theme::{LINK_DOWN, LINK_UP};

pub fn draw_header(
    f: &mut ratatui::Frame<'_>,
    area: Rect,
    session: &Session,
    links: &[(Endpoint, bool)],
) {
    let play = match session.state() {
        GameState::Playing => {
            let rate = if (session.rate() - 1.0).abs() > f64::EPSILON {
                format!(" x{:.2}", session.rate())
            } else {
                String::new()
            };
            format!(
                "{} OD {:.1} {}{}",
                session.mode(),
                session.difficulty(),
                session.mods(),
                rate
            )
        }
        GameState::Idle if session.state_name().is_empty() => "connecting...".into(),
        GameState::Idle => session.state_name().to_string(),
    };

    let mut spans = vec![Span::raw(format!("tickbar — {play} | "))];
    for (endpoint, up) in links {
        let color = if *up { LINK_UP } else { LINK_DOWN };
        spans.push(Span::styled("● ", Style::default().fg(color)));
        spans.push(Span::raw(format!("{} ", endpoint.label())));
    }
    spans.push(Span::raw(" (press 'q' to quit)"));

    f.render_widget(
        Block::default()
            .title(Line::from(spans))
            .borders(Borders::BOTTOM),
        area,
    );
}
