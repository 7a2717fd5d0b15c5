//! Summary statistics over the live hit errors.

/// Mean, median and population standard deviation, in milliseconds.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Statistics {
    pub average: f64,
    pub median: f64,
    pub standard_deviation: f64,
    pub count: usize,
}

impl Statistics {
    /// `scratch` is reused for the median sort so repeated calls don't allocate.
    pub fn compute(errors: &[f64], scratch: &mut Vec<f64>) -> Self {
        scratch.clear();
        scratch.extend_from_slice(errors);
        Self {
            average: average(errors),
            median: median(scratch),
            standard_deviation: standard_deviation(errors),
            count: errors.len(),
        }
    }
}

pub fn average(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Sorts `values` in place.
pub fn median(values: &mut [f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.sort_unstable_by(f64::total_cmp);
    let mid = values.len() / 2;
    if values.len() % 2 == 0 {
        (values[mid - 1] + values[mid]) / 2.0
    } else {
        values[mid]
    }
}

/// Population standard deviation (divides by N).
pub fn standard_deviation(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let avg = average(values);
    let var = values.iter().map(|v| (v - avg) * (v - avg)).sum::<f64>() / values.len() as f64;
    var.sqrt()
}

/// Color bucket for the median arrow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArrowTone {
    Perfect,
    Early,
    Late,
}

impl ArrowTone {
    pub fn classify(median: f64, perfect_threshold: f64) -> Self {
        if median.abs() <= perfect_threshold {
            ArrowTone::Perfect
        } else if median < 0.0 {
            ArrowTone::Early
        } else {
            ArrowTone::Late
        }
    }
}
