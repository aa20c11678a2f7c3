//! Corpus-level summaries read back from a `CorpusStore`.

use std::collections::HashMap;

use serde::Serialize;

use fakecheck_common::{Result, Source, SourceId};

use crate::consistency::fehner_score;
use crate::traits::CorpusStore;

/// Mean total score of one source's notes.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SourceRating {
    pub source: Source,
    pub rating: f64,
    pub notes: usize,
}

/// Sources not flagged hidden.
pub async fn visible_sources(store: &dyn CorpusStore) -> Result<Vec<Source>> {
    Ok(store
        .sources()
        .await?
        .into_iter()
        .filter(|s| !s.is_hidden)
        .collect())
}

/// Ratings of every visible source that has at least one note, highest first.
pub async fn source_ratings(store: &dyn CorpusStore) -> Result<Vec<SourceRating>> {
    let mut totals: HashMap<SourceId, (f64, usize)> = HashMap::new();
    for note in store.all_notes().await? {
        let entry = totals.entry(note.source_id).or_insert((0.0, 0));
        entry.0 += note.total_score;
        entry.1 += 1;
    }

    let mut ratings: Vec<SourceRating> = visible_sources(store)
        .await?
        .into_iter()
        .filter_map(|source| {
            let (sum, count) = totals.get(&source.id).copied()?;
            Some(SourceRating {
                rating: sum / count as f64,
                notes: count,
                source: Source {
                    rating: Some(sum / count as f64),
                    ..source
                },
            })
        })
        .collect();
    ratings.sort_by(|a, b| b.rating.total_cmp(&a.rating).then(a.source.id.cmp(&b.source.id)));
    Ok(ratings)
}

/// Fraction of persisted notes classified as Fehner type A.
pub async fn corpus_fehner_score(store: &dyn CorpusStore) -> Result<f64> {
    let notes = store.all_notes().await?;
    Ok(fehner_score(notes.iter().map(|n| n.fehner_type())))
}
