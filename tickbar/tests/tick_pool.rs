//! Tick pool ingestion, aging and grading.

use std::time::{Duration, Instant};

use tickbar::pool::{TickPhase, TickPool, TickTiming};
use tickbar::timing::{compute_thresholds, Gamemode, Mods, ThresholdTable};

fn windows() -> ThresholdTable {
    // 50 / 100 / 150
    compute_thresholds(Gamemode::Osu, 5.0, &Mods::default())
}

fn timing() -> TickTiming {
    TickTiming {
        tick: Duration::from_millis(500),
        fade_out: Duration::from_millis(800),
        scale: 2.0,
    }
}

fn ms(n: u64) -> Duration {
    Duration::from_millis(n)
}

#[test]
fn same_stream_twice_is_a_no_op() {
    let mut pool = TickPool::new(8);
    let now = Instant::now();
    let samples = [3.0, -7.5, 12.0];
    assert!(pool.ingest(&samples, &windows(), &timing(), now));
    let before: Vec<_> = pool.ticks().to_vec();
    assert!(!pool.ingest(&samples, &windows(), &timing(), now));
    assert_eq!(pool.processed(), 3);
    for (a, b) in before.iter().zip(pool.ticks()) {
        assert_eq!(a.sample_index, b.sample_index);
        assert_eq!(a.position, b.position);
    }
}

#[test]
fn batching_does_not_change_the_result() {
    let now = Instant::now();
    let full = [1.0, 2.0, 3.0, 4.0, 5.0];

    let mut stepwise = TickPool::new(4);
    stepwise.ingest(&full[..2], &windows(), &timing(), now);
    stepwise.ingest(&full, &windows(), &timing(), now);

    let mut once = TickPool::new(4);
    once.ingest(&full, &windows(), &timing(), now);

    assert_eq!(stepwise.processed(), once.processed());
    assert_eq!(stepwise.active_count(), once.active_count());
    for (a, b) in stepwise.ticks().iter().zip(once.ticks()) {
        assert_eq!(a.sample_index, b.sample_index);
        assert_eq!(a.position, b.position);
        assert_eq!(a.grade, b.grade);
    }
}

#[test]
fn positions_are_scaled_and_graded() {
    let mut pool = TickPool::new(8);
    pool.ingest(&[10.0, -60.0, 120.0, 200.0], &windows(), &timing(), Instant::now());
    let labels: Vec<_> = pool.ticks()[..4].iter().map(|t| t.grade_label()).collect();
    assert_eq!(labels, vec!["300", "100", "50", "0"]);
    assert_eq!(pool.ticks()[1].position, -120.0);
    assert_eq!(pool.ticks()[4].grade_label(), "inactive");
}

#[test]
fn grade_never_improves_as_error_grows() {
    let mut pool = TickPool::new(64);
    let samples: Vec<f64> = (0..60).map(|i| i as f64 * 3.0).collect();
    pool.ingest(&samples, &windows(), &timing(), Instant::now());
    let grades: Vec<_> = pool.ticks()[..60].iter().filter_map(|t| t.grade).collect();
    assert!(grades.windows(2).all(|w| w[0] <= w[1]));
}

#[test]
fn aging_boundaries() {
    let mut pool = TickPool::new(4);
    let t0 = Instant::now();
    pool.ingest(&[5.0], &windows(), &timing(), t0);
    assert_eq!(pool.ticks()[0].phase, TickPhase::Active);

    pool.ingest(&[5.0], &windows(), &timing(), t0 + ms(500));
    assert_eq!(pool.ticks()[0].phase, TickPhase::Active);

    assert!(pool.ingest(&[5.0], &windows(), &timing(), t0 + ms(501)));
    assert_eq!(pool.ticks()[0].phase, TickPhase::Fading);
    assert_eq!(pool.active_count(), 1);

    pool.ingest(&[5.0], &windows(), &timing(), t0 + ms(1300));
    assert_eq!(pool.ticks()[0].phase, TickPhase::Fading);

    assert!(pool.ingest(&[5.0], &windows(), &timing(), t0 + ms(1301)));
    assert_eq!(pool.ticks()[0].phase, TickPhase::Inactive);
    assert_eq!(pool.active_count(), 0);
    assert_eq!(pool.ticks()[0].grade_label(), "inactive");
}

#[test]
fn zero_fade_goes_straight_to_inactive() {
    let timing = TickTiming {
        fade_out: Duration::ZERO,
        ..timing()
    };
    let mut pool = TickPool::new(2);
    let t0 = Instant::now();
    pool.ingest(&[5.0], &windows(), &timing, t0);
    pool.ingest(&[5.0], &windows(), &timing, t0 + ms(501));
    assert_eq!(pool.ticks()[0].phase, TickPhase::Inactive);
}

#[test]
fn aging_runs_before_new_samples_land() {
    let mut pool = TickPool::new(1);
    let t0 = Instant::now();
    pool.ingest(&[5.0], &windows(), &timing(), t0);
    // Slot 0 expires and is immediately refilled by the new sample
    pool.ingest(&[5.0, 8.0], &windows(), &timing(), t0 + ms(2000));
    let t = &pool.ticks()[0];
    assert_eq!(t.phase, TickPhase::Active);
    assert_eq!(t.sample_index, Some(1));
    assert_eq!(pool.active_count(), 1);
}

#[test]
fn wraparound_keeps_only_the_last_lap() {
    let cap = 4;
    let mut pool = TickPool::new(cap);
    let samples: Vec<f64> = (0..2 * cap + 3).map(|i| i as f64).collect();
    pool.ingest(&samples, &windows(), &timing(), Instant::now());
    assert_eq!(pool.processed(), 2 * cap + 3);
    assert_eq!(pool.active_count(), cap);
    for (slot, t) in pool.ticks().iter().enumerate() {
        let idx = t.sample_index.expect("slot filled");
        assert_eq!(idx % cap, slot);
        assert!(idx >= cap + 3);
        assert_eq!(t.position, idx as f64 * 2.0);
    }
}

#[test]
fn shrinking_stream_resets_the_pool() {
    let mut pool = TickPool::new(4);
    let now = Instant::now();
    pool.ingest(&[1.0, 2.0, 3.0], &windows(), &timing(), now);
    assert!(pool.ingest(&[9.0], &windows(), &timing(), now));
    assert_eq!(pool.processed(), 1);
    assert_eq!(pool.active_count(), 1);
    assert_eq!(pool.ticks()[0].position, 18.0);
    assert!(!pool.ticks()[1].is_active());
}

#[test]
fn non_finite_samples_are_skipped() {
    let mut pool = TickPool::new(4);
    pool.ingest(
        &[1.0, f64::NAN, 3.0, f64::INFINITY],
        &windows(),
        &timing(),
        Instant::now(),
    );
    assert_eq!(pool.processed(), 4);
    assert_eq!(pool.active_count(), 2);
    assert!(!pool.ticks()[1].is_active());
    assert!(!pool.ticks()[3].is_active());
}

#[test]
fn non_finite_newest_sample_clears_its_slot_in_any_batching() {
    let now = Instant::now();
    // Slot 1 gets 2.0 first, then NaN one lap later
    let samples = [1.0, 2.0, 3.0, 4.0, 5.0, f64::NAN];

    let mut batched = TickPool::new(4);
    batched.ingest(&samples, &windows(), &timing(), now);

    let mut stepwise = TickPool::new(4);
    for n in 1..=samples.len() {
        stepwise.ingest(&samples[..n], &windows(), &timing(), now);
    }

    assert!(!stepwise.ticks()[1].is_active());
    assert_eq!(stepwise.active_count(), 3);
    assert_eq!(batched.active_count(), stepwise.active_count());
    for (a, b) in batched.ticks().iter().zip(stepwise.ticks()) {
        assert_eq!(a.is_active(), b.is_active());
        assert_eq!(a.position, b.position);
    }
}

#[test]
fn reset_from_skips_consumed_entries() {
    let now = Instant::now();
    let mut pool = TickPool::new(4);
    pool.ingest(&[1.0, 2.0, 3.0], &windows(), &timing(), now);

    pool.reset_from(3);
    assert_eq!(pool.processed(), 3);
    assert_eq!(pool.active_count(), 0);
    assert!(!pool.ingest(&[1.0, 2.0, 3.0], &windows(), &timing(), now));

    pool.ingest(&[1.0, 2.0, 3.0, 7.0], &windows(), &timing(), now);
    assert_eq!(pool.active_count(), 1);
    assert_eq!(pool.ticks()[3].position, 14.0);
}

#[test]
fn regrade_keeps_positions() {
    let mut pool = TickPool::new(4);
    pool.ingest(&[40.0], &windows(), &timing(), Instant::now());
    assert_eq!(pool.ticks()[0].grade_label(), "300");

    let tight = compute_thresholds(Gamemode::Osu, 10.0, &Mods::default()); // 20 / 60 / 100
    pool.regrade(&tight, 2.0);
    assert_eq!(pool.ticks()[0].grade_label(), "100");
    assert_eq!(pool.ticks()[0].position, 80.0);
}

#[test]
fn reset_and_live_errors() {
    let mut pool = TickPool::new(4);
    pool.ingest(&[4.0, -6.0], &windows(), &timing(), Instant::now());
    let mut errors = Vec::new();
    pool.live_errors_into(&mut errors, 2.0);
    errors.sort_by(f64::total_cmp);
    assert_eq!(errors, vec![-6.0, 4.0]);

    pool.reset();
    assert_eq!(pool.processed(), 0);
    assert_eq!(pool.active_count(), 0);
    pool.live_errors_into(&mut errors, 2.0);
    assert!(errors.is_empty());
}

#[test]
fn capacity_is_at_least_one() {
    let pool = TickPool::new(0);
    assert_eq!(pool.capacity(), 1);
}
