//! Hit error bar: median arrow, tick lane and the timing window band.

use ratatui::{
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
};

use tickbar::backend::Frame;
use tickbar::config::Settings;
use tickbar::pool::TickTiming;
use tickbar::stats::ArrowTone;
use tickbar::timing::ThresholdTable;

use crate::ui::theme::{arrow_color, grade_color, BAR_CENTER};

// Half-width of the bar when no windows are known yet
const FALLBACK_HALF_MS: f64 = 200.0;

/// Maps milliseconds to columns; 0 ms is the middle column.
struct Lane {
    width: usize,
    half_ms: f64,
}

impl Lane {
    fn center(&self) -> f64 {
        (self.width - 1) as f64 / 2.0
    }

    fn column(&self, error_ms: f64) -> usize {
        let x = (error_ms / self.half_ms).clamp(-1.0, 1.0);
        let col = (self.center() + x * self.center()).round() as usize;
        col.min(self.width - 1)
    }

    fn ms_at(&self, col: usize) -> f64 {
        let c = self.center();
        if c == 0.0 {
            return 0.0;
        }
        (col as f64 - c) / c * self.half_ms
    }
}

pub fn draw_hit_bar(
    f: &mut ratatui::Frame<'_>,
    area: Rect,
    frame: &Frame,
    windows: &ThresholdTable,
    settings: &Settings,
    visible: bool,
) {
    let block = Block::default().borders(Borders::ALL).title("Hit error");
    let inner = block.inner(area);
    f.render_widget(block, area);
    if inner.width < 3 || inner.height < 3 {
        return;
    }
    if !visible {
        let msg = Paragraph::new("waiting for gameplay...")
            .centered()
            .style(Style::default().fg(Color::DarkGray));
        f.render_widget(msg, inner);
        return;
    }

    let scale = TickTiming::from_settings(settings).scale;
    let lane = Lane {
        width: inner.width as usize,
        half_ms: windows
            .loosest()
            .filter(|r| *r > 0.0)
            .unwrap_or(FALLBACK_HALF_MS),
    };

    let mut lines = Vec::with_capacity(inner.height as usize);
    lines.push(arrow_line(&lane, frame, settings));
    let tick_line = tick_line(&lane, frame, scale);
    for _ in 0..inner.height.saturating_sub(2) {
        lines.push(tick_line.clone());
    }
    lines.push(window_line(&lane, windows));

    f.render_widget(Paragraph::new(lines), inner);
}

fn arrow_line(lane: &Lane, frame: &Frame, settings: &Settings) -> Line<'static> {
    let mut spans = vec![Span::raw(" "); lane.width];
    if frame.stats.count > 0 {
        let tone = ArrowTone::classify(frame.stats.median, settings.perfect_arrow_threshold);
        spans[lane.column(frame.stats.median)] =
            Span::styled("▼", Style::default().fg(arrow_color(tone)));
    }
    Line::from(spans)
}

fn tick_line(lane: &Lane, frame: &Frame, scale: f64) -> Line<'static> {
    // Per column: (grade, fading). Solid ticks win over fading ones.
    let mut cells: Vec<Option<(&'static str, bool)>> = vec![None; lane.width];
    for t in frame.ticks.iter().filter(|t| t.active) {
        let col = lane.column(t.position / scale);
        let replace = match cells[col] {
            None => true,
            Some((_, fading)) => fading || !t.fading,
        };
        if replace {
            cells[col] = Some((t.grade, t.fading));
        }
    }

    let center = lane.column(0.0);
    let spans = cells
        .into_iter()
        .enumerate()
        .map(|(col, cell)| match cell {
            Some((grade, false)) => Span::styled("┃", Style::default().fg(grade_color(grade))),
            Some((grade, true)) => Span::styled(
                "╏",
                Style::default()
                    .fg(grade_color(grade))
                    .add_modifier(Modifier::DIM),
            ),
            None if col == center => Span::styled("│", Style::default().fg(BAR_CENTER)),
            None => Span::raw(" "),
        })
        .collect::<Vec<_>>();
    Line::from(spans)
}

fn window_line(lane: &Lane, windows: &ThresholdTable) -> Line<'static> {
    let spans = (0..lane.width)
        .map(|col| {
            let grade = windows.classify(lane.ms_at(col));
            Span::styled("▀", Style::default().fg(grade_color(grade.label())))
        })
        .collect::<Vec<_>>();
    Line::from(spans)
}
