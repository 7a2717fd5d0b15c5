//! Offloaded tick pool: frames come back tagged with their generation.

use std::time::{Duration, Instant};

use tickbar::backend::{Frame, InlinePool, TickBackend};
use tickbar::config::Settings;
use tickbar::pool::TickTiming;
use tickbar::session::Session;
use tickbar::timing::{compute_thresholds, Gamemode, Mods, ThresholdTable};
use tickbar::worker::{WorkerError, WorkerPool};

fn windows() -> ThresholdTable {
    compute_thresholds(Gamemode::Osu, 5.0, &Mods::default())
}

/// Poll the worker until `done` holds for the latest frame.
async fn wait_for<F>(pool: &mut WorkerPool, done: F) -> Frame
where
    F: Fn(&Frame) -> bool,
{
    for _ in 0..200 {
        pool.drain().expect("worker alive");
        if done(pool.frame()) {
            return pool.frame().clone();
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("worker never produced the expected frame: {:?}", pool.frame());
}

#[tokio::test]
async fn worker_matches_inline_pool() {
    let timing = TickTiming::default();
    let now = Instant::now();
    let samples = [12.0, -30.0, 75.0, 4.0];

    let mut inline = InlinePool::new(8, windows(), timing);
    inline.reset(1, 8, 0, &windows(), timing).unwrap();
    inline.update(&samples[..2], 1.0, now).unwrap();
    inline.update(&samples, 1.0, now).unwrap();
    assert_eq!(inline.pool().processed(), 4);

    let mut worker = WorkerPool::spawn(8, windows(), timing);
    worker.reset(1, 8, 0, &windows(), timing).unwrap();
    worker.update(&samples[..2], 1.0, now).unwrap();
    worker.update(&samples, 1.0, now).unwrap();

    let frame = wait_for(&mut worker, |f| f.stats.count == 4).await;
    assert_eq!(&frame, inline.frame());
}

#[tokio::test]
async fn frames_from_an_old_generation_are_dropped() {
    let timing = TickTiming::default();
    let now = Instant::now();
    let mut worker = WorkerPool::spawn(8, windows(), timing);

    worker.reset(1, 8, 0, &windows(), timing).unwrap();
    worker.update(&[1.0, 2.0, 3.0], 1.0, now).unwrap();
    // Reset before the worker's answer for generation 1 is read
    worker.reset(2, 8, 0, &windows(), timing).unwrap();
    assert_eq!(worker.frame().generation, 2);
    assert_eq!(worker.frame().stats.count, 0);

    worker.update(&[9.0], 1.0, now).unwrap();
    let frame = wait_for(&mut worker, |f| f.stats.count > 0).await;
    assert_eq!(frame.generation, 2);
    assert_eq!(frame.stats.count, 1);
    assert_eq!(frame.stats.average, 9.0);
}

#[tokio::test]
async fn worker_reset_can_resume_mid_stream() {
    let timing = TickTiming::default();
    let now = Instant::now();
    let mut worker = WorkerPool::spawn(8, windows(), timing);
    worker.reset(1, 8, 0, &windows(), timing).unwrap();
    worker.update(&[1.0, 2.0, 3.0], 1.0, now).unwrap();

    // Rebuild past the three entries already shown
    worker.reset(2, 4, 3, &windows(), timing).unwrap();
    worker.update(&[1.0, 2.0, 3.0, 8.0], 1.0, now).unwrap();

    let frame = wait_for(&mut worker, |f| f.stats.count > 0).await;
    assert_eq!(frame.generation, 2);
    assert_eq!(frame.ticks.len(), 4);
    assert_eq!(frame.stats.count, 1);
    assert_eq!(frame.stats.average, 8.0);
}

#[tokio::test]
async fn aborted_worker_reports_lost() {
    let mut worker = WorkerPool::spawn(4, windows(), TickTiming::default());
    worker.abort();
    tokio::time::sleep(Duration::from_millis(50)).await;
    let err = worker.update(&[1.0], 1.0, Instant::now()).unwrap_err();
    assert!(matches!(err, WorkerError::Lost));
}

#[tokio::test]
async fn session_runs_on_worker_backend() {
    let settings = Settings {
        offload_pool: true,
        ..Settings::default()
    };
    let timing = TickTiming::from_settings(&settings);
    let worker = WorkerPool::spawn(settings.pool_capacity, windows(), timing);
    let mut session = Session::new(settings, Box::new(worker));

    let state = serde_json::from_value(serde_json::json!({
        "state": { "name": "play" },
        "play": { "mode": { "name": "osu" }, "mods": { "name": "", "rate": 1.0 } },
        "beatmap": { "stats": { "od": { "original": 5.0 } }, "time": { "firstObject": 0.0 } }
    }))
    .unwrap();
    let now = Instant::now();
    session.on_state(&state, now).unwrap();
    session
        .on_precise(
            tickbar::types::PreciseUpdate {
                hit_errors: vec![2.0, 6.0],
                current_time: 1000.0,
            },
            now,
        )
        .unwrap();

    for _ in 0..200 {
        session.poll(now).unwrap();
        if session.frame().stats.count == 2 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    assert_eq!(session.frame().stats.count, 2);
    assert_eq!(session.frame().stats.average, 4.0);
    assert_eq!(session.frame().generation, session.generation());
}
