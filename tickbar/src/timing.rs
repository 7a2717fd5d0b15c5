//! Timing windows: maps (gamemode, OD, mods) to the ordered grade radii used to
//! color ticks.
//!
//! Tables are ordered tightest radius first. A hit error is graded by the first
//! radius it fits within; anything wider than every radius is a miss.

use std::collections::BTreeSet;
use std::fmt;

use tracing::warn;

use crate::config::Settings;

/// Hard rock caps the scaled OD at this value.
const MAX_OD: f64 = 10.0;
const HARD_OD_SCALE: f64 = 1.4;
const EASY_OD_SCALE: f64 = 0.5;
/// Mania divides its windows by this under hard rock instead of scaling OD.
const MANIA_HARD_DIVISOR: f64 = 1.4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Gamemode {
    #[default]
    Osu,
    Taiko,
    Fruits,
    Mania,
}

impl Gamemode {
    /// Parse the mode name reported by the telemetry bridge. Unknown names fall
    /// back to osu with a warning rather than failing.
    pub fn parse(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "osu" | "standard" => Gamemode::Osu,
            "taiko" => Gamemode::Taiko,
            "fruits" | "catch" | "ctb" => Gamemode::Fruits,
            "mania" => Gamemode::Mania,
            other => {
                warn!(gamemode = other, "unknown gamemode, using osu timing windows");
                Gamemode::Osu
            }
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Gamemode::Osu => "osu",
            Gamemode::Taiko => "taiko",
            Gamemode::Fruits => "fruits",
            Gamemode::Mania => "mania",
        }
    }

    /// Grades judged by this mode, tightest first. The miss grade is implicit.
    pub fn grades(self) -> &'static [Grade] {
        match self {
            Gamemode::Mania => &[Grade::Perfect, Grade::Great, Grade::Good, Grade::Ok, Grade::Meh],
            Gamemode::Osu | Gamemode::Taiko | Gamemode::Fruits => {
                &[Grade::Great, Grade::Ok, Grade::Meh]
            }
        }
    }
}

impl fmt::Display for Gamemode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Accuracy bucket, named after the judgement it represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Grade {
    /// 300g (mania only)
    Perfect,
    Great,
    Good,
    Ok,
    Meh,
    Miss,
}

impl Grade {
    pub fn label(self) -> &'static str {
        match self {
            Grade::Perfect => "300g",
            Grade::Great => "300",
            Grade::Good => "200",
            Grade::Ok => "100",
            Grade::Meh => "50",
            Grade::Miss => "0",
        }
    }
}

impl fmt::Display for Grade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Which OD-altering mod applies to a play.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OdModifier {
    None,
    Hard,
    Easy,
}

/// Set of two-letter mod acronyms, parsed from the concatenated form the
/// bridge reports ("HDHR", "EZDT").
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Mods {
    acronyms: BTreeSet<String>,
}

impl Mods {
    pub fn parse(name: &str) -> Self {
        let letters: Vec<char> = name
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .map(|c| c.to_ascii_uppercase())
            .collect();
        let acronyms = letters
            .chunks(2)
            .filter(|pair| pair.len() == 2)
            .map(|pair| pair.iter().collect::<String>())
            .collect();
        Self { acronyms }
    }

    pub fn contains(&self, acronym: &str) -> bool {
        self.acronyms.contains(acronym)
    }

    pub fn is_empty(&self) -> bool {
        self.acronyms.is_empty()
    }

    /// Easy takes precedence when a play somehow carries both EZ and HR.
    pub fn od_modifier(&self) -> OdModifier {
        if self.contains("EZ") {
            OdModifier::Easy
        } else if self.contains("HR") {
            OdModifier::Hard
        } else {
            OdModifier::None
        }
    }
}

impl fmt::Display for Mods {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.acronyms.is_empty() {
            return f.write_str("NM");
        }
        for a in &self.acronyms {
            f.write_str(a)?;
        }
        Ok(())
    }
}

/// Ordered grade -> radius (ms) table.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ThresholdTable {
    entries: Vec<(Grade, f64)>,
}

impl ThresholdTable {
    pub fn new(entries: Vec<(Grade, f64)>) -> Self {
        Self { entries }
    }

    /// Build a table from a comma-separated list of radii, assigned to the
    /// mode's grades by position. Tokens that do not parse leave their grade
    /// out of the table; surplus values are ignored.
    pub fn from_override(mode: Gamemode, raw: &str) -> Self {
        let mut entries = Vec::with_capacity(mode.grades().len());
        for (grade, token) in mode.grades().iter().zip(raw.split(',')) {
            match token.trim().parse::<f64>() {
                Ok(v) if v.is_finite() => entries.push((*grade, v.max(0.0))),
                _ => warn!(token = token.trim(), grade = %grade, "skipping bad timing window value"),
            }
        }
        let table = Self { entries };
        if !table.is_monotonic() {
            warn!(windows = raw, "custom timing windows are not ordered tightest first");
        }
        table
    }

    pub fn iter(&self) -> impl Iterator<Item = (Grade, f64)> + '_ {
        self.entries.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn radius(&self, grade: Grade) -> Option<f64> {
        self.entries.iter().find(|(g, _)| *g == grade).map(|(_, r)| *r)
    }

    /// Widest radius in the table, used to size the bar.
    pub fn loosest(&self) -> Option<f64> {
        self.entries.iter().map(|(_, r)| *r).reduce(f64::max)
    }

    pub fn is_monotonic(&self) -> bool {
        self.entries.windows(2).all(|w| w[0].1 <= w[1].1)
    }

    /// Grade for an absolute hit error in milliseconds.
    pub fn classify(&self, hit_error: f64) -> Grade {
        let e = hit_error.abs();
        self.entries
            .iter()
            .find(|(_, radius)| e <= *radius)
            .map(|(grade, _)| *grade)
            .unwrap_or(Grade::Miss)
    }
}

/// Compute the timing windows for a play.
pub fn compute_thresholds(mode: Gamemode, difficulty: f64, mods: &Mods) -> ThresholdTable {
    let od = if difficulty.is_finite() && difficulty >= 0.0 {
        difficulty
    } else {
        warn!(difficulty, "invalid overall difficulty, using 0");
        0.0
    };
    let modifier = mods.od_modifier();
    let radii: Vec<f64> = match mode {
        Gamemode::Osu | Gamemode::Fruits => {
            let d = adjusted_od(od, modifier);
            vec![80.0 - 6.0 * d, 140.0 - 8.0 * d, 200.0 - 10.0 * d]
        }
        Gamemode::Taiko => {
            let d = adjusted_od(od, modifier);
            if d >= 5.0 {
                vec![50.0 - 3.0 * d, 120.0 - 8.0 * d, 135.0 - 8.0 * d]
            } else {
                vec![50.0 - 3.0 * d, 110.0 - 6.0 * d, 120.0 - 5.0 * d]
            }
        }
        Gamemode::Mania => mania_radii(od, modifier),
    };
    let entries = mode
        .grades()
        .iter()
        .copied()
        .zip(radii.into_iter().map(|r| r.max(0.0)))
        .collect();
    ThresholdTable::new(entries)
}

/// Windows for a play, honouring the custom override when enabled.
pub fn thresholds_for(
    mode: Gamemode,
    difficulty: f64,
    mods: &Mods,
    settings: &Settings,
) -> ThresholdTable {
    if settings.use_custom_timing_windows {
        ThresholdTable::from_override(mode, &settings.custom_timing_windows)
    } else {
        compute_thresholds(mode, difficulty, mods)
    }
}

fn adjusted_od(od: f64, modifier: OdModifier) -> f64 {
    match modifier {
        OdModifier::Hard => (od * HARD_OD_SCALE).min(MAX_OD),
        OdModifier::Easy => od * EASY_OD_SCALE,
        OdModifier::None => od,
    }
}

fn mania_radii(od: f64, modifier: OdModifier) -> Vec<f64> {
    let base = |d: f64| [64.0 - 3.0 * d, 97.0 - 3.0 * d, 127.0 - 3.0 * d, 151.0 - 3.0 * d];
    let (perfect, rest) = match modifier {
        OdModifier::None => (16.5, base(od)),
        OdModifier::Easy => (22.5, base(od * EASY_OD_SCALE)),
        OdModifier::Hard => (11.43, base(od).map(|r| r / MANIA_HARD_DIVISOR)),
    };
    std::iter::once(perfect).chain(rest).collect()
}
