use std::ops::{Index, IndexMut};

use serde::{Deserialize, Serialize};

/// One of the 13 independent propaganda signals scored per document.
///
/// The declaration order is the canonical order used for storage columns,
/// graph properties and every `DimensionMap`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Dimension {
    Sentiment,
    TriggerKeywords,
    TriggerTopics,
    SimplicityDeviation,
    ConfidenceFactor,
    Clickbait,
    Subjectivity,
    CallToAction,
    RepeatedTake,
    RepeatedNote,
    Messianism,
    OppositionToOpponents,
    GeneralizationOfOpponents,
}

impl Dimension {
    pub const COUNT: usize = 13;

    pub const ALL: [Dimension; Dimension::COUNT] = [
        Dimension::Sentiment,
        Dimension::TriggerKeywords,
        Dimension::TriggerTopics,
        Dimension::SimplicityDeviation,
        Dimension::ConfidenceFactor,
        Dimension::Clickbait,
        Dimension::Subjectivity,
        Dimension::CallToAction,
        Dimension::RepeatedTake,
        Dimension::RepeatedNote,
        Dimension::Messianism,
        Dimension::OppositionToOpponents,
        Dimension::GeneralizationOfOpponents,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    /// Stable snake_case key. Used as the column / property prefix in both stores.
    pub fn key(self) -> &'static str {
        match self {
            Dimension::Sentiment => "sentiment",
            Dimension::TriggerKeywords => "trigger_keywords",
            Dimension::TriggerTopics => "trigger_topics",
            Dimension::SimplicityDeviation => "simplicity_deviation",
            Dimension::ConfidenceFactor => "confidence_factor",
            Dimension::Clickbait => "clickbait",
            Dimension::Subjectivity => "subjectivity",
            Dimension::CallToAction => "call_to_action",
            Dimension::RepeatedTake => "repeated_take",
            Dimension::RepeatedNote => "repeated_note",
            Dimension::Messianism => "messianism",
            Dimension::OppositionToOpponents => "opposition_to_opponents",
            Dimension::GeneralizationOfOpponents => "generalization_of_opponents",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Dimension::Sentiment => "Sentiment",
            Dimension::TriggerKeywords => "Trigger keywords",
            Dimension::TriggerTopics => "Trigger topics",
            Dimension::SimplicityDeviation => "Simplicity deviation",
            Dimension::ConfidenceFactor => "Confidence factor",
            Dimension::Clickbait => "Clickbait",
            Dimension::Subjectivity => "Subjectivity",
            Dimension::CallToAction => "Call to action",
            Dimension::RepeatedTake => "Repeated take",
            Dimension::RepeatedNote => "Repeated note",
            Dimension::Messianism => "Messianism",
            Dimension::OppositionToOpponents => "Opposition to opponents",
            Dimension::GeneralizationOfOpponents => "Generalization of opponents",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|d| d.key() == key)
    }
}

impl std::fmt::Display for Dimension {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.key())
    }
}

/// A value for every dimension, stored densely in canonical order.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DimensionMap<T>([T; Dimension::COUNT]);

impl<T> DimensionMap<T> {
    pub fn from_fn(mut f: impl FnMut(Dimension) -> T) -> Self {
        Self(std::array::from_fn(|i| f(Dimension::ALL[i])))
    }

    pub fn get(&self, dimension: Dimension) -> &T {
        &self.0[dimension.index()]
    }

    pub fn get_mut(&mut self, dimension: Dimension) -> &mut T {
        &mut self.0[dimension.index()]
    }

    pub fn iter(&self) -> impl Iterator<Item = (Dimension, &T)> {
        Dimension::ALL.into_iter().zip(self.0.iter())
    }

    pub fn values(&self) -> impl Iterator<Item = &T> {
        self.0.iter()
    }

    pub fn map<U>(&self, mut f: impl FnMut(Dimension, &T) -> U) -> DimensionMap<U> {
        DimensionMap::from_fn(|d| f(d, &self.0[d.index()]))
    }
}

impl<T: Clone> DimensionMap<T> {
    pub fn filled(value: T) -> Self {
        Self::from_fn(|_| value.clone())
    }
}

impl<T: Default> Default for DimensionMap<T> {
    fn default() -> Self {
        Self::from_fn(|_| T::default())
    }
}

impl<T> Index<Dimension> for DimensionMap<T> {
    type Output = T;

    fn index(&self, dimension: Dimension) -> &T {
        self.get(dimension)
    }
}

impl<T> IndexMut<Dimension> for DimensionMap<T> {
    fn index_mut(&mut self, dimension: Dimension) -> &mut T {
        self.get_mut(dimension)
    }
}
