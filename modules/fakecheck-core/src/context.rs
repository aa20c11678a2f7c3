use std::time::Duration;

use fakecheck_common::{Dimension, DimensionMap, DimensionScore};

/// Raw evaluator output for one document, before calibration.
#[derive(Debug, Clone, Default)]
pub struct RawScores {
    pub raw: DimensionMap<f64>,
    /// `false` when the evaluator failed and `raw` holds the neutral 0.
    pub evaluated: DimensionMap<bool>,
    pub elapsed: DimensionMap<Duration>,
}

impl RawScores {
    /// Scores for a document where every evaluator succeeded.
    pub fn from_values(raw: DimensionMap<f64>) -> Self {
        Self {
            raw,
            evaluated: DimensionMap::filled(true),
            elapsed: DimensionMap::default(),
        }
    }

    pub fn failed_dimensions(&self) -> Vec<Dimension> {
        self.evaluated
            .iter()
            .filter(|(_, ok)| !**ok)
            .map(|(d, _)| d)
            .collect()
    }

    pub fn total_elapsed(&self) -> Duration {
        self.elapsed.values().sum()
    }
}

/// Everything derived for a single ingestion request. Short-lived: it is
/// mapped into a `NewNote` and dropped.
#[derive(Debug, Clone)]
pub struct EvaluationContext {
    pub scores: DimensionMap<DimensionScore>,
    pub evaluated: DimensionMap<bool>,
    pub elapsed: DimensionMap<Duration>,
    pub total_score: f64,
    pub is_propaganda: bool,
    /// Fraction of evaluated dimensions whose raw score beats its historical mean.
    pub amount_of_propaganda_scores: f64,
    pub override_applied: bool,
}

impl EvaluationContext {
    pub fn coefficients(&self) -> DimensionMap<f64> {
        self.scores.map(|_, s| s.coefficient)
    }
}
