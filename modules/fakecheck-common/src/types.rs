use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::dimension::{Dimension, DimensionMap};

pub type NoteId = i64;
pub type SourceId = i64;

// --- Scores ---

/// One dimension's contribution to a document's total score.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct DimensionScore {
    /// Unweighted evaluator output.
    pub raw: f64,
    /// Normalized calibration weight applied to `raw`.
    pub coefficient: f64,
    /// `raw * coefficient`
    pub weighted: f64,
}

impl DimensionScore {
    pub fn new(raw: f64, coefficient: f64) -> Self {
        Self {
            raw,
            coefficient,
            weighted: raw * coefficient,
        }
    }
}

// --- Consistency ---

/// Fehner consistency type of a document relative to its predecessor's running averages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FehnerType {
    A,
    B,
}

impl FehnerType {
    pub fn as_str(self) -> &'static str {
        match self {
            FehnerType::A => "A",
            FehnerType::B => "B",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "A" => Some(FehnerType::A),
            "B" => Some(FehnerType::B),
            _ => None,
        }
    }
}

impl std::fmt::Display for FehnerType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Cumulative sums and counts of both Fehner series up to and including a document.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct RunningTotals {
    pub uniqueness_sum: f64,
    pub uniqueness_count: i64,
    pub score_sum: f64,
    pub score_count: i64,
}

impl RunningTotals {
    pub fn uniqueness_average(&self) -> f64 {
        if self.uniqueness_count == 0 {
            return 0.0;
        }
        self.uniqueness_sum / self.uniqueness_count as f64
    }

    pub fn score_average(&self) -> f64 {
        if self.score_count == 0 {
            return 0.0;
        }
        self.score_sum / self.score_count as f64
    }
}

/// Per-document consistency bookkeeping.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct FehnerState {
    /// Mean off-diagonal sentence similarity of the document itself.
    pub uniqueness: f64,
    pub totals: RunningTotals,
    /// `None` only for the first document of the corpus.
    pub fehner_type: Option<FehnerType>,
}

// --- Notes ---

/// A scored document ready to be persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewNote {
    pub title: Option<String>,
    pub content: String,
    pub content_hash: String,
    pub scores: DimensionMap<DimensionScore>,
    pub total_score: f64,
    pub is_propaganda: bool,
    pub amount_of_propaganda_scores: f64,
    pub fehner: FehnerState,
    pub source_id: SourceId,
    pub reposted_from_source_id: Option<SourceId>,
}

impl NewNote {
    pub fn into_note(self, id: NoteId, created_at: DateTime<Utc>) -> Note {
        Note {
            id,
            title: self.title,
            content: self.content,
            content_hash: self.content_hash,
            scores: self.scores,
            total_score: self.total_score,
            is_propaganda: self.is_propaganda,
            amount_of_propaganda_scores: self.amount_of_propaganda_scores,
            fehner: self.fehner,
            source_id: self.source_id,
            reposted_from_source_id: self.reposted_from_source_id,
            created_at,
        }
    }
}

/// A persisted, immutable scored document. Ids grow with insertion order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Note {
    pub id: NoteId,
    pub title: Option<String>,
    pub content: String,
    pub content_hash: String,
    pub scores: DimensionMap<DimensionScore>,
    pub total_score: f64,
    pub is_propaganda: bool,
    pub amount_of_propaganda_scores: f64,
    pub fehner: FehnerState,
    pub source_id: SourceId,
    pub reposted_from_source_id: Option<SourceId>,
    pub created_at: DateTime<Utc>,
}

impl Note {
    pub fn raw(&self, dimension: Dimension) -> f64 {
        self.scores[dimension].raw
    }

    pub fn fehner_type(&self) -> Option<FehnerType> {
        self.fehner.fehner_type
    }

    pub fn word_count(&self) -> usize {
        self.content.split_whitespace().count()
    }
}

// --- Sources ---

/// A publishing entity (channel, outlet, account).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Source {
    pub id: SourceId,
    pub external_id: String,
    pub name: String,
    pub platform: String,
    pub is_hidden: bool,
    pub rating: Option<f64>,
}

/// A source as submitted by a client, before it has an id. Upserted by `external_id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewSource {
    pub external_id: String,
    pub name: String,
    pub platform: String,
    pub is_hidden: bool,
}

impl NewSource {
    pub fn new(external_id: impl Into<String>, name: impl Into<String>, platform: impl Into<String>) -> Self {
        Self {
            external_id: external_id.into(),
            name: name.into(),
            platform: platform.into(),
            is_hidden: false,
        }
    }

    pub fn hidden(mut self) -> Self {
        self.is_hidden = true;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dimension_score_weights_raw_value() {
        let s = DimensionScore::new(0.5, 0.2);
        assert!((s.weighted - 0.1).abs() < 1e-12);
    }

    #[test]
    fn running_totals_average_guards_zero_count() {
        let t = RunningTotals::default();
        assert_eq!(t.uniqueness_average(), 0.0);
        assert_eq!(t.score_average(), 0.0);
    }

    #[test]
    fn fehner_type_parses_its_own_output() {
        for t in [FehnerType::A, FehnerType::B] {
            assert_eq!(FehnerType::parse(t.as_str()), Some(t));
        }
        assert_eq!(FehnerType::parse("C"), None);
    }
}
