//! App state and main loop: telemetry intake, timers, input handling and drawing.

use std::{
    io,
    time::{Duration, Instant},
};

use anyhow::Result;
use crossterm::{
    event::{self, Event, KeyCode},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout},
    Terminal,
};
use tokio::{
    sync::mpsc,
    time::{interval, MissedTickBehavior},
};
use tracing::{debug, info, warn};

use tickbar::config::{requested_host, Settings};
use tickbar::pool::TickTiming;
use tickbar::session::{Session, SessionSettingsError};
use tickbar::timing::{thresholds_for, Gamemode, Mods};
use tickbar::worker::WorkerPool;
use tickbar::ws::{Endpoint, Feed, Telemetry};

use crate::ui::{
    bar::draw_hit_bar, header::draw_header, stats::draw_stats, windows::draw_windows,
};

// ~30 fps
const FRAME_INTERVAL: Duration = Duration::from_millis(33);

pub struct App {
    session: Session,
    feed: Option<Feed>,
    links: Vec<(Endpoint, bool)>,
    should_quit: bool,
}

impl App {
    /// Must be called from inside a tokio runtime when the pool is offloaded.
    pub fn new(settings: Settings) -> Self {
        let session = if settings.offload_pool {
            let timing = TickTiming::from_settings(&settings);
            let windows = thresholds_for(Gamemode::Osu, 0.0, &Mods::default(), &settings);
            let worker = WorkerPool::spawn(settings.pool_capacity, windows, timing);
            info!("tick pool running on worker task");
            Session::new(settings, Box::new(worker))
        } else {
            Session::inline(settings)
        };
        Self::with_session(session)
    }

    pub fn with_session(session: Session) -> Self {
        Self {
            session,
            feed: None,
            links: Endpoint::ALL.into_iter().map(|e| (e, false)).collect(),
            should_quit: false,
        }
    }

    pub async fn run(&mut self, host: &str, counter_path: &str) -> Result<()> {
        let (feed, mut rx) = Feed::open(host, counter_path);
        self.feed = Some(feed);

        // Terminal setup
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen)?;
        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend)?;
        terminal.clear()?;

        let res = self.event_loop(&mut terminal, &mut rx).await;

        // Teardown
        if let Some(feed) = self.feed.take() {
            feed.close();
        }
        disable_raw_mode()?;
        execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
        terminal.show_cursor()?;

        res
    }

    async fn event_loop<B: ratatui::backend::Backend>(
        &mut self,
        terminal: &mut Terminal<B>,
        rx: &mut mpsc::Receiver<Telemetry>,
    ) -> Result<()> {
        let mut ticker = interval(FRAME_INTERVAL);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut dirty = true;

        loop {
            tokio::select! {
                msg = rx.recv() => match msg {
                    Some(t) => dirty |= self.handle_telemetry(t, Instant::now())?,
                    None => {
                        warn!("telemetry channel closed");
                        break;
                    }
                },
                _ = ticker.tick() => {
                    // Input (non-blocking)
                    while event::poll(Duration::ZERO)? {
                        match event::read()? {
                            Event::Key(k)
                                if matches!(
                                    k.code,
                                    KeyCode::Char('q') | KeyCode::Char('Q') | KeyCode::Esc
                                ) =>
                            {
                                self.should_quit = true;
                            }
                            Event::Resize(_, _) => dirty = true,
                            _ => {}
                        }
                    }
                    if self.should_quit {
                        break;
                    }

                    dirty |= self.session.poll(Instant::now())?;
                    if self.session.take_reset_notice() {
                        debug!(generation = self.session.generation(), "bar cleared");
                        dirty = true;
                    }
                    if dirty {
                        terminal.draw(|f| self.draw(f))?;
                        dirty = false;
                    }
                }
            }
        }
        Ok(())
    }

    /// Feed one telemetry item into the session. Returns whether a redraw is due.
    pub fn handle_telemetry(&mut self, t: Telemetry, now: Instant) -> Result<bool> {
        let changed = match t {
            Telemetry::State(update) => {
                let event = self.session.on_state(&update, now)?;
                debug!(?event, state = update.state.name.as_str(), "state update");
                true
            }
            Telemetry::Precise(update) => self.session.on_precise(update, now)?,
            Telemetry::Settings(patch) => {
                if let (Some(host), Some(feed)) = (requested_host(&patch), self.feed.as_mut()) {
                    feed.switch_host(host);
                }
                match self.session.on_settings(&patch) {
                    Ok(changed) => changed,
                    Err(SessionSettingsError::Config(e)) => {
                        warn!(error = %e, "ignoring settings update");
                        false
                    }
                    Err(SessionSettingsError::Worker(e)) => return Err(e.into()),
                }
            }
            Telemetry::Link { endpoint, up } => {
                if let Some(slot) = self.links.iter_mut().find(|(e, _)| *e == endpoint) {
                    slot.1 = up;
                }
                true
            }
        };
        Ok(changed)
    }

    pub fn draw(&self, f: &mut ratatui::Frame<'_>) {
        let area = f.area();

        // Root rows: header, hit bar, bottom (stats + windows)
        let rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(1), // header
                Constraint::Min(6),    // hit bar
                Constraint::Length(8), // stats + windows legend
            ])
            .split(area);

        draw_header(f, rows[0], &self.session, &self.links);

        let settings = self.session.settings();
        draw_hit_bar(
            f,
            rows[1],
            self.session.frame(),
            self.session.windows(),
            settings,
            self.session.is_visible(),
        );

        let bottom = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
            .split(rows[2]);
        draw_stats(
            f,
            bottom[0],
            &self.session.frame().stats,
            settings.perfect_arrow_threshold,
            settings.show_sd,
        );
        draw_windows(f, bottom[1], self.session.windows(), self.session.mode());
    }
}
