//! Label-free per-dimension weighting.
//!
//! A dimension whose historical raw scores sit at or above their own mean more
//! often is treated as more discriminating and receives proportionally more
//! weight. The candidate document is never part of its own history.

use fakecheck_common::{Dimension, DimensionMap};

/// Raw coefficient used for a dimension that has no history yet.
pub const NEUTRAL_PRIOR: f64 = 1.0;

/// Fraction of historical scores that are at or above the historical mean.
pub fn raw_coefficient(history: &[f64]) -> f64 {
    if history.is_empty() {
        return NEUTRAL_PRIOR;
    }
    let mean = mean(history);
    let at_or_above = history.iter().filter(|&&score| score >= mean).count();
    at_or_above as f64 / history.len() as f64
}

/// Raw coefficients for every dimension, normalized to sum to 1.
pub fn calibrate(history: &DimensionMap<Vec<f64>>) -> DimensionMap<f64> {
    let raw = history.map(|_, scores| raw_coefficient(scores));
    normalize(&raw)
}

/// Divide every coefficient by the sum of all coefficients.
///
/// Each raw coefficient is either the neutral prior or at least `1/len` (the
/// maximum of a non-empty history is always >= its mean), so the sum is positive.
pub fn normalize(raw: &DimensionMap<f64>) -> DimensionMap<f64> {
    let sum: f64 = raw.values().sum();
    if sum <= 0.0 {
        return DimensionMap::filled(1.0 / Dimension::COUNT as f64);
    }
    raw.map(|_, c| c / sum)
}

pub(crate) fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}
