//! Synthetic telemetry server shaped like the game's memory-reader bridge.

pub mod args;
pub mod sampler;
pub mod state;
pub mod types;
pub mod ws;

use std::time::Duration;

use tokio::net::TcpListener;

use crate::args::FeedArgs;
use crate::sampler::{spawn_sampler, Simulator};

pub const SAMPLE_PERIOD: Duration = Duration::from_millis(50);

/// Serve all endpoints on `listener` until the process ends.
pub async fn serve(listener: TcpListener, args: &FeedArgs) -> std::io::Result<()> {
    let (publisher, state) = state::channel();
    let sim = Simulator::new(args.seed, args.play_secs);
    let _sampler = spawn_sampler(sim, publisher, SAMPLE_PERIOD);
    axum::serve(listener, ws::router(state)).await
}
