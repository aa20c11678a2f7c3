//! Fehner consistency classification.
//!
//! Two running series are carried through the corpus in insertion order: the
//! document's internal sentence similarity and its total score. Each document is
//! classified against the running averages that include it, using the totals
//! stored on its immediate predecessor.

mod uniqueness;

pub use uniqueness::{split_sentences, uniqueness_score};

use fakecheck_common::{FehnerState, FehnerType, RunningTotals};

/// Signed deviations of a document from both series' running averages.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Deviation {
    pub uniqueness: f64,
    pub score: f64,
}

impl Deviation {
    /// Type A whenever the score deviation is non-negative. The uniqueness
    /// branch is kept as two explicit arms so the asymmetry stays visible.
    #[allow(clippy::nonminimal_bool)]
    pub fn fehner_type(self) -> FehnerType {
        let u_up = self.uniqueness >= 0.0;
        let s_up = self.score >= 0.0;
        if (u_up && s_up) || (!u_up && s_up) {
            FehnerType::A
        } else {
            FehnerType::B
        }
    }
}

/// Classify a document given its own uniqueness and total score and the
/// running totals stored on the previous document (`None` for the first one).
pub fn classify(uniqueness: f64, total_score: f64, previous: Option<&RunningTotals>) -> FehnerState {
    let Some(prev) = previous else {
        return FehnerState {
            uniqueness,
            totals: RunningTotals {
                uniqueness_sum: uniqueness,
                uniqueness_count: 1,
                score_sum: total_score,
                score_count: 1,
            },
            fehner_type: None,
        };
    };

    let totals = RunningTotals {
        uniqueness_sum: prev.uniqueness_sum + uniqueness,
        uniqueness_count: prev.uniqueness_count + 1,
        score_sum: prev.score_sum + total_score,
        score_count: prev.score_count + 1,
    };
    let deviation = Deviation {
        uniqueness: uniqueness - totals.uniqueness_average(),
        score: total_score - totals.score_average(),
    };

    FehnerState {
        uniqueness,
        totals,
        fehner_type: Some(deviation.fehner_type()),
    }
}

/// Fraction of documents classified A. Unclassified documents count in the
/// denominator; an empty corpus scores 0.
pub fn fehner_score<I>(types: I) -> f64
where
    I: IntoIterator<Item = Option<FehnerType>>,
{
    let mut total = 0usize;
    let mut type_a = 0usize;
    for t in types {
        total += 1;
        if t == Some(FehnerType::A) {
            type_a += 1;
        }
    }
    if total == 0 {
        return 0.0;
    }
    type_a as f64 / total as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_document_bootstraps_without_type() {
        let state = classify(0.4, 0.2, None);
        assert_eq!(state.fehner_type, None);
        assert_eq!(state.totals.uniqueness_sum, 0.4);
        assert_eq!(state.totals.uniqueness_count, 1);
        assert_eq!(state.totals.score_sum, 0.2);
        assert_eq!(state.totals.score_count, 1);
    }

    #[test]
    fn series_grow_by_one_per_document() {
        let first = classify(0.4, 0.2, None);
        let second = classify(0.1, 0.6, Some(&first.totals));
        assert_eq!(second.totals.uniqueness_count, 2);
        assert_eq!(second.totals.score_count, 2);
        assert!((second.totals.uniqueness_sum - 0.5).abs() < 1e-12);
        assert!((second.totals.score_sum - 0.8).abs() < 1e-12);
    }

    #[test]
    fn score_above_average_is_type_a_regardless_of_uniqueness() {
        let prev = classify(0.4, 0.2, None).totals;
        // uniqueness falls, score rises
        assert_eq!(classify(0.1, 0.6, Some(&prev)).fehner_type, Some(FehnerType::A));
        // both rise
        assert_eq!(classify(0.9, 0.6, Some(&prev)).fehner_type, Some(FehnerType::A));
    }

    #[test]
    fn score_below_average_is_type_b() {
        let prev = classify(0.4, 0.6, None).totals;
        assert_eq!(classify(0.9, 0.1, Some(&prev)).fehner_type, Some(FehnerType::B));
        assert_eq!(classify(0.1, 0.1, Some(&prev)).fehner_type, Some(FehnerType::B));
    }

    #[test]
    fn equal_to_average_counts_as_non_negative() {
        let prev = classify(0.3, 0.5, None).totals;
        assert_eq!(classify(0.3, 0.5, Some(&prev)).fehner_type, Some(FehnerType::A));
    }

    #[test]
    fn fehner_score_is_fraction_of_type_a() {
        let types = [None, Some(FehnerType::A), Some(FehnerType::B), Some(FehnerType::A)];
        assert_eq!(fehner_score(types), 0.5);
    }

    #[test]
    fn fehner_score_of_empty_corpus_is_zero() {
        assert_eq!(fehner_score(Vec::<Option<FehnerType>>::new()), 0.0);
    }
}
