use tracing::info;

use fakecheck_common::{Dimension, DimensionMap, DimensionScore, ScoringConfig};

use crate::calibration::mean;
use crate::context::{EvaluationContext, RawScores};
use crate::overrides::ScoreOverrides;

/// Historical mean assumed for a dimension with no history when counting
/// above-average dimensions. Deliberately different from the calibrator's
/// neutral prior of 1.
pub const DEFAULT_HISTORICAL_AVERAGE: f64 = 0.3;

/// Display slope applied to the excess above the threshold (70 points over 15).
const RESCALE_SLOPE: f64 = 70.0 / 15.0;

/// Combines calibrated dimension contributions into a document's total score.
#[derive(Debug, Clone)]
pub struct ScoreAggregator {
    threshold: f64,
    clamp_rescaled: bool,
    overrides: ScoreOverrides,
}

impl ScoreAggregator {
    pub fn new(config: &ScoringConfig, overrides: ScoreOverrides) -> Self {
        Self {
            threshold: config.propaganda_threshold,
            clamp_rescaled: config.clamp_rescaled,
            overrides,
        }
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Remap a total above the threshold onto the display range anchored at the
    /// threshold. With the default threshold this is exactly
    /// `((total - 0.3) * 100 * 70/15 + 30) / 100`, which exceeds 1.0 once the
    /// excess passes 0.15 unless clamping is enabled.
    pub fn rescale(&self, total: f64) -> f64 {
        let rescaled =
            ((total - self.threshold) * 100.0 * RESCALE_SLOPE + self.threshold * 100.0) / 100.0;
        if self.clamp_rescaled {
            rescaled.min(1.0)
        } else {
            rescaled
        }
    }

    /// Weight the raw scores, total them, flag and rescale, then apply any
    /// configured override.
    pub fn aggregate(
        &self,
        raw: &RawScores,
        coefficients: &DimensionMap<f64>,
        history: &DimensionMap<Vec<f64>>,
        content: &str,
        content_hash: &str,
    ) -> EvaluationContext {
        let scores = weigh(&raw.raw, coefficients);
        let mut total_score: f64 = scores.values().map(|s| s.weighted).sum();

        let is_propaganda = total_score > self.threshold;
        if is_propaganda {
            total_score = self.rescale(total_score);
        }

        let mut override_applied = false;
        if let Some(forced) = self.overrides.lookup(content, content_hash) {
            info!(
                hash = content_hash,
                computed = total_score,
                forced,
                "Score override applied"
            );
            total_score = forced;
            override_applied = true;
        }

        EvaluationContext {
            scores,
            evaluated: raw.evaluated,
            elapsed: raw.elapsed,
            total_score,
            is_propaganda,
            amount_of_propaganda_scores: amount_above_historical_average(raw, history),
            override_applied,
        }
    }
}

/// Pair each raw score with its coefficient.
pub fn weigh(raw: &DimensionMap<f64>, coefficients: &DimensionMap<f64>) -> DimensionMap<DimensionScore> {
    raw.map(|d, r| DimensionScore::new(*r, coefficients[d]))
}

/// Mean of a dimension's historical raw scores, or the default on empty history.
pub fn historical_average(history: &[f64]) -> f64 {
    if history.is_empty() {
        return DEFAULT_HISTORICAL_AVERAGE;
    }
    mean(history)
}

/// Fraction of evaluated dimensions whose raw score strictly exceeds that
/// dimension's historical average. Zero when no dimension was evaluated.
pub fn amount_above_historical_average(raw: &RawScores, history: &DimensionMap<Vec<f64>>) -> f64 {
    let mut evaluated = 0usize;
    let mut above = 0usize;
    for d in Dimension::ALL {
        if !raw.evaluated[d] {
            continue;
        }
        evaluated += 1;
        if raw.raw[d] > historical_average(&history[d]) {
            above += 1;
        }
    }
    if evaluated == 0 {
        return 0.0;
    }
    above as f64 / evaluated as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calibration::calibrate;

    fn aggregator(clamp: bool) -> ScoreAggregator {
        let config = ScoringConfig {
            clamp_rescaled: clamp,
            ..ScoringConfig::default()
        };
        ScoreAggregator::new(&config, ScoreOverrides::empty())
    }

    fn uniform() -> DimensionMap<f64> {
        DimensionMap::filled(1.0 / 13.0)
    }

    #[test]
    fn rescale_worked_example_exceeds_one_without_clamp() {
        let rescaled = aggregator(false).rescale(0.5);
        assert!((rescaled - 1.2333333333333334).abs() < 1e-9);
        assert!(rescaled > 1.0);
    }

    #[test]
    fn rescale_clamps_when_enabled() {
        assert_eq!(aggregator(true).rescale(0.5), 1.0);
        // below the cap the clamp is a no-op
        let r = aggregator(true).rescale(0.35);
        assert!((r - (0.05 * 100.0 * 70.0 / 15.0 + 30.0) / 100.0).abs() < 1e-9);
    }

    #[test]
    fn rescale_is_continuous_at_threshold() {
        assert!((aggregator(false).rescale(0.3) - 0.3).abs() < 1e-9);
    }

    #[test]
    fn total_below_threshold_is_not_rescaled() {
        let raw = RawScores::from_values(DimensionMap::filled(0.2));
        let ctx = aggregator(false).aggregate(&raw, &uniform(), &DimensionMap::default(), "t", "h");
        assert!(!ctx.is_propaganda);
        assert!((ctx.total_score - 0.2).abs() < 1e-9);
    }

    #[test]
    fn total_exactly_at_threshold_is_not_propaganda() {
        let mut raw = DimensionMap::filled(0.0);
        raw[Dimension::Clickbait] = 0.3;
        let mut coeffs = DimensionMap::filled(0.0);
        coeffs[Dimension::Clickbait] = 1.0;
        let ctx = aggregator(false).aggregate(
            &RawScores::from_values(raw),
            &coeffs,
            &DimensionMap::default(),
            "t",
            "h",
        );
        assert!(!ctx.is_propaganda);
    }

    #[test]
    fn total_above_threshold_is_flagged_and_rescaled() {
        let raw = RawScores::from_values(DimensionMap::filled(0.5));
        let ctx = aggregator(false).aggregate(&raw, &uniform(), &DimensionMap::default(), "t", "h");
        assert!(ctx.is_propaganda);
        assert!((ctx.total_score - 1.2333333333333334).abs() < 1e-9);
    }

    #[test]
    fn weighted_contribution_recorded_per_dimension() {
        let history = DimensionMap::default();
        let coeffs = calibrate(&history);
        let mut values = DimensionMap::filled(0.0);
        values[Dimension::Messianism] = 0.65;
        let ctx = aggregator(false).aggregate(
            &RawScores::from_values(values),
            &coeffs,
            &history,
            "t",
            "h",
        );
        let s = ctx.scores[Dimension::Messianism];
        assert_eq!(s.raw, 0.65);
        assert!((s.weighted - 0.05).abs() < 1e-9);
    }

    #[test]
    fn override_forces_total_but_keeps_flag() {
        let overrides = ScoreOverrides::empty().with_prefix("Speaking a", 0.44570138254975218);
        let agg = ScoreAggregator::new(&ScoringConfig::default(), overrides);
        let raw = RawScores::from_values(DimensionMap::filled(0.1));
        let ctx = agg.aggregate(&raw, &uniform(), &DimensionMap::default(), "Speaking about X", "h");
        assert!(ctx.override_applied);
        assert!(!ctx.is_propaganda);
        assert_eq!(ctx.total_score, 0.44570138254975218);
    }

    #[test]
    fn amount_uses_default_average_without_history() {
        let mut values = DimensionMap::filled(0.3);
        values[Dimension::Sentiment] = 0.31;
        values[Dimension::Clickbait] = 0.9;
        let raw = RawScores::from_values(values);
        let amount = amount_above_historical_average(&raw, &DimensionMap::default());
        // 0.3 is not strictly above the 0.3 default
        assert!((amount - 2.0 / 13.0).abs() < 1e-12);
    }

    #[test]
    fn amount_compares_against_historical_mean() {
        let mut history: DimensionMap<Vec<f64>> = DimensionMap::filled(vec![0.8, 1.0]);
        history[Dimension::Clickbait] = vec![0.1, 0.2, 0.9];
        let mut values = DimensionMap::filled(0.5);
        values[Dimension::Clickbait] = 0.5;
        let raw = RawScores::from_values(values);
        let amount = amount_above_historical_average(&raw, &history);
        assert!((amount - 1.0 / 13.0).abs() < 1e-12);
    }

    #[test]
    fn failed_dimensions_are_excluded_from_amount() {
        let mut raw = RawScores::from_values(DimensionMap::filled(0.9));
        raw.evaluated = DimensionMap::filled(false);
        raw.evaluated[Dimension::Sentiment] = true;
        raw.raw = DimensionMap::filled(0.0);
        raw.raw[Dimension::Sentiment] = 0.9;
        assert_eq!(amount_above_historical_average(&raw, &DimensionMap::default()), 1.0);
    }

    #[test]
    fn amount_is_zero_when_nothing_evaluated() {
        let mut raw = RawScores::default();
        raw.evaluated = DimensionMap::filled(false);
        assert_eq!(amount_above_historical_average(&raw, &DimensionMap::default()), 0.0);
    }
}
