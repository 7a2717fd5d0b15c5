//! Timing window formulas per gamemode and mod combination.

use tickbar::config::Settings;
use tickbar::timing::{
    compute_thresholds, thresholds_for, Gamemode, Grade, Mods, OdModifier, ThresholdTable,
};

fn radii(t: &ThresholdTable) -> Vec<f64> {
    t.iter().map(|(_, r)| r).collect()
}

fn assert_radii(t: &ThresholdTable, expected: &[f64]) {
    let got = radii(t);
    assert_eq!(got.len(), expected.len(), "{got:?} vs {expected:?}");
    for (g, e) in got.iter().zip(expected) {
        assert!((g - e).abs() < 1e-9, "{got:?} vs {expected:?}");
    }
}

#[test]
fn osu_plain_and_modded() {
    let t = compute_thresholds(Gamemode::Osu, 5.0, &Mods::default());
    assert_radii(&t, &[50.0, 100.0, 150.0]);
    let grades: Vec<Grade> = t.iter().map(|(g, _)| g).collect();
    assert_eq!(grades, vec![Grade::Great, Grade::Ok, Grade::Meh]);

    // HR scales by 1.4 and caps at 10
    let hr = compute_thresholds(Gamemode::Osu, 8.0, &Mods::parse("HR"));
    assert_radii(&hr, &[20.0, 60.0, 100.0]);

    let ez = compute_thresholds(Gamemode::Osu, 8.0, &Mods::parse("EZ"));
    assert_radii(&ez, &[56.0, 108.0, 160.0]);
}

#[test]
fn osu_od8_great_window() {
    let t = compute_thresholds(Gamemode::Osu, 8.0, &Mods::default());
    assert_eq!(t.radius(Grade::Great), Some(32.0));
    let hr = compute_thresholds(Gamemode::Osu, 8.0, &Mods::parse("HR"));
    assert_eq!(hr.radius(Grade::Great), Some(20.0));
}

#[test]
fn easy_wins_over_hard_rock() {
    let both = Mods::parse("HREZ");
    assert_eq!(both.od_modifier(), OdModifier::Easy);
    assert_eq!(
        compute_thresholds(Gamemode::Osu, 8.0, &both),
        compute_thresholds(Gamemode::Osu, 8.0, &Mods::parse("EZ"))
    );
}

#[test]
fn fruits_uses_osu_formula() {
    assert_eq!(
        radii(&compute_thresholds(Gamemode::Fruits, 7.0, &Mods::default())),
        radii(&compute_thresholds(Gamemode::Osu, 7.0, &Mods::default()))
    );
}

#[test]
fn taiko_branches_on_adjusted_od() {
    assert_radii(
        &compute_thresholds(Gamemode::Taiko, 5.0, &Mods::default()),
        &[35.0, 80.0, 95.0],
    );
    assert_radii(
        &compute_thresholds(Gamemode::Taiko, 4.0, &Mods::default()),
        &[38.0, 86.0, 100.0],
    );
    // 4 * 1.4 = 5.6 takes the upper branch
    assert_radii(
        &compute_thresholds(Gamemode::Taiko, 4.0, &Mods::parse("HR")),
        &[33.2, 75.2, 90.2],
    );
}

#[test]
fn mania_constant_perfect_and_hard_rock_divisor() {
    let plain = compute_thresholds(Gamemode::Mania, 8.0, &Mods::default());
    assert_radii(&plain, &[16.5, 40.0, 73.0, 103.0, 127.0]);
    assert_eq!(plain.radius(Grade::Perfect), Some(16.5));

    let ez = compute_thresholds(Gamemode::Mania, 8.0, &Mods::parse("EZ"));
    assert_radii(&ez, &[22.5, 52.0, 85.0, 115.0, 139.0]);

    let hr = compute_thresholds(Gamemode::Mania, 8.0, &Mods::parse("HDHR"));
    assert_radii(
        &hr,
        &[11.43, 40.0 / 1.4, 73.0 / 1.4, 103.0 / 1.4, 127.0 / 1.4],
    );
}

#[test]
fn invalid_difficulty_is_zero_and_radii_clamp() {
    let zero = compute_thresholds(Gamemode::Osu, 0.0, &Mods::default());
    assert_eq!(compute_thresholds(Gamemode::Osu, f64::NAN, &Mods::default()), zero);
    assert_eq!(compute_thresholds(Gamemode::Osu, -3.0, &Mods::default()), zero);
    assert_radii(&zero, &[80.0, 140.0, 200.0]);

    let huge = compute_thresholds(Gamemode::Osu, 20.0, &Mods::default());
    assert!(radii(&huge).iter().all(|r| *r >= 0.0));
}

#[test]
fn windows_are_ordered_tightest_first() {
    for mode in [Gamemode::Osu, Gamemode::Taiko, Gamemode::Fruits, Gamemode::Mania] {
        for od in [0.0, 3.5, 5.0, 8.0, 10.0] {
            for mods in ["", "HR", "EZ"] {
                let t = compute_thresholds(mode, od, &Mods::parse(mods));
                assert!(t.is_monotonic(), "{mode} od {od} {mods}: {t:?}");
                assert_eq!(t.len(), mode.grades().len());
            }
        }
    }
}

#[test]
fn classify_is_inclusive_and_symmetric() {
    let t = compute_thresholds(Gamemode::Osu, 5.0, &Mods::default());
    assert_eq!(t.classify(0.0), Grade::Great);
    assert_eq!(t.classify(50.0), Grade::Great);
    assert_eq!(t.classify(-50.0), Grade::Great);
    assert_eq!(t.classify(50.01), Grade::Ok);
    assert_eq!(t.classify(-150.0), Grade::Meh);
    assert_eq!(t.classify(150.5), Grade::Miss);
    assert_eq!(Grade::Miss.label(), "0");
    assert_eq!(t.loosest(), Some(150.0));
}

#[test]
fn override_assigns_by_position_and_skips_bad_tokens() {
    let t = ThresholdTable::from_override(Gamemode::Osu, "20, abc ,60,99,100");
    assert_eq!(t.radius(Grade::Great), Some(20.0));
    assert_eq!(t.radius(Grade::Ok), None);
    assert_eq!(t.radius(Grade::Meh), Some(60.0));
    assert_eq!(t.len(), 2);

    // Taken as given even when out of order
    let odd = ThresholdTable::from_override(Gamemode::Osu, "90,40,100");
    assert!(!odd.is_monotonic());
    assert_eq!(odd.classify(30.0), Grade::Great);
}

#[test]
fn override_bypasses_mods_when_enabled() {
    let settings = Settings {
        use_custom_timing_windows: true,
        ..Settings::default()
    };
    let t = thresholds_for(Gamemode::Mania, 9.0, &Mods::parse("HR"), &settings);
    assert_radii(&t, &[16.5, 64.0, 97.0, 127.0, 151.0]);

    let off = thresholds_for(Gamemode::Mania, 9.0, &Mods::parse("HR"), &Settings::default());
    assert_eq!(off, compute_thresholds(Gamemode::Mania, 9.0, &Mods::parse("HR")));
}

#[test]
fn mode_and_mod_parsing() {
    assert_eq!(Gamemode::parse("mania"), Gamemode::Mania);
    assert_eq!(Gamemode::parse("Taiko"), Gamemode::Taiko);
    assert_eq!(Gamemode::parse("something else"), Gamemode::Osu);

    let mods = Mods::parse("HDDTHR");
    assert!(mods.contains("HD") && mods.contains("DT") && mods.contains("HR"));
    assert_eq!(mods.od_modifier(), OdModifier::Hard);
    assert_eq!(Mods::parse("").to_string(), "NM");
}
