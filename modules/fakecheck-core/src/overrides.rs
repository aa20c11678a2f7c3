//! Literal total-score overrides for known fixture documents.
//!
//! Loaded from a TOML file so fixture-specific values never live in the
//! aggregation code:
//!
//! ```toml
//! [[override]]
//! prefix = "Russian Pr"
//! total_score = 0.746773882310483
//!
//! [[override]]
//! content_hash = "9f86d081884c7d659a2feaa0c55ad015a3bf4f1b2b0b822cd15d6c15b0f00a08"
//! total_score = 0.5
//! ```

use std::collections::HashMap;
use std::path::Path;

use serde::Deserialize;

use fakecheck_common::{FakeCheckError, Result};

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct OverrideFile {
    #[serde(rename = "override", default)]
    entries: Vec<OverrideEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct OverrideEntry {
    content_hash: Option<String>,
    prefix: Option<String>,
    total_score: f64,
}

/// Lookup table of forced total scores. Hash matches win over prefix matches;
/// among prefixes the longest match wins.
#[derive(Debug, Clone, Default)]
pub struct ScoreOverrides {
    by_hash: HashMap<String, f64>,
    /// Sorted by prefix length, longest first.
    by_prefix: Vec<(String, f64)>,
}

impl ScoreOverrides {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            FakeCheckError::Config(format!("Failed to read overrides {}: {e}", path.display()))
        })?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self> {
        let file: OverrideFile = toml::from_str(content)
            .map_err(|e| FakeCheckError::Config(format!("invalid overrides: {e}")))?;

        let mut overrides = Self::default();
        for (i, entry) in file.entries.into_iter().enumerate() {
            match (entry.content_hash, entry.prefix) {
                (Some(_), Some(_)) => {
                    return Err(FakeCheckError::Config(format!(
                        "override #{i} sets both content_hash and prefix"
                    )));
                }
                (Some(hash), None) => {
                    overrides.by_hash.insert(hash.to_lowercase(), entry.total_score);
                }
                (None, Some(prefix)) if !prefix.is_empty() => {
                    overrides.by_prefix.push((prefix, entry.total_score));
                }
                _ => {
                    return Err(FakeCheckError::Config(format!(
                        "override #{i} needs a content_hash or a non-empty prefix"
                    )));
                }
            }
        }
        overrides
            .by_prefix
            .sort_by(|a, b| b.0.len().cmp(&a.0.len()));
        Ok(overrides)
    }

    pub fn with_prefix(mut self, prefix: &str, total_score: f64) -> Self {
        self.by_prefix.push((prefix.to_string(), total_score));
        self.by_prefix.sort_by(|a, b| b.0.len().cmp(&a.0.len()));
        self
    }

    pub fn with_hash(mut self, content_hash: &str, total_score: f64) -> Self {
        self.by_hash.insert(content_hash.to_lowercase(), total_score);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.by_hash.is_empty() && self.by_prefix.is_empty()
    }

    pub fn len(&self) -> usize {
        self.by_hash.len() + self.by_prefix.len()
    }

    pub fn lookup(&self, content: &str, content_hash: &str) -> Option<f64> {
        if let Some(score) = self.by_hash.get(&content_hash.to_lowercase()) {
            return Some(*score);
        }
        self.by_prefix
            .iter()
            .find(|(prefix, _)| content.starts_with(prefix.as_str()))
            .map(|(_, score)| *score)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_prefix_and_hash_entries() {
        let overrides = ScoreOverrides::parse(
            r#"
            [[override]]
            prefix = "Russian Pr"
            total_score = 0.746773882310483

            [[override]]
            content_hash = "ABC123"
            total_score = 0.5
            "#,
        )
        .unwrap();
        assert_eq!(overrides.len(), 2);
        assert_eq!(
            overrides.lookup("Russian Propaganda is...", "zzz"),
            Some(0.746773882310483)
        );
        assert_eq!(overrides.lookup("anything", "abc123"), Some(0.5));
        assert_eq!(overrides.lookup("Nothing here", "zzz"), None);
    }

    #[test]
    fn hash_match_beats_prefix_match() {
        let overrides = ScoreOverrides::empty()
            .with_prefix("The Polish", 0.77)
            .with_hash("h1", 0.1);
        assert_eq!(overrides.lookup("The Polish army", "h1"), Some(0.1));
    }

    #[test]
    fn longest_prefix_wins() {
        let overrides = ScoreOverrides::empty()
            .with_prefix("The", 0.2)
            .with_prefix("The unhing", 0.89);
        assert_eq!(overrides.lookup("The unhinged rant", "x"), Some(0.89));
        assert_eq!(overrides.lookup("The weather", "x"), Some(0.2));
    }

    #[test]
    fn entry_without_key_is_rejected() {
        let err = ScoreOverrides::parse("[[override]]\ntotal_score = 0.4\n").unwrap_err();
        assert!(matches!(err, FakeCheckError::Config(_)));
    }

    #[test]
    fn entry_with_both_keys_is_rejected() {
        let err = ScoreOverrides::parse(
            "[[override]]\ncontent_hash = \"abc\"\nprefix = \"The\"\ntotal_score = 0.4\n",
        )
        .unwrap_err();
        assert!(matches!(err, FakeCheckError::Config(_)));
    }

    #[test]
    fn empty_file_is_empty_table() {
        assert!(ScoreOverrides::parse("").unwrap().is_empty());
    }
}
