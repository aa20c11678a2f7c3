use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::Utc;

use fakecheck_common::{
    Dimension, DimensionMap, NewNote, NewSource, Note, NoteId, Result, Source, SourceId,
};

use crate::traits::{CorpusStore, SaveOutcome};

#[derive(Default)]
struct Corpus {
    notes: Vec<Note>,
    by_hash: HashMap<String, usize>,
    sources: Vec<Source>,
}

/// In-process corpus with the same semantics as the postgres store. Ids are
/// assigned from 1 in insertion order.
#[derive(Default)]
pub struct MemoryCorpusStore {
    corpus: Mutex<Corpus>,
}

impl MemoryCorpusStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn corpus(&self) -> MutexGuard<'_, Corpus> {
        self.corpus.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn note_count(&self) -> usize {
        self.corpus().notes.len()
    }
}

#[async_trait]
impl CorpusStore for MemoryCorpusStore {
    async fn note_by_hash(&self, content_hash: &str) -> Result<Option<Note>> {
        let corpus = self.corpus();
        Ok(corpus
            .by_hash
            .get(content_hash)
            .map(|&i| corpus.notes[i].clone()))
    }

    async fn note(&self, id: NoteId) -> Result<Option<Note>> {
        Ok(self.corpus().notes.iter().find(|n| n.id == id).cloned())
    }

    async fn notes_by_source(&self, source_id: SourceId) -> Result<Vec<Note>> {
        Ok(self
            .corpus()
            .notes
            .iter()
            .filter(|n| n.source_id == source_id)
            .cloned()
            .collect())
    }

    async fn raw_scores(&self, dimension: Dimension) -> Result<Vec<f64>> {
        Ok(self.corpus().notes.iter().map(|n| n.raw(dimension)).collect())
    }

    async fn history(&self) -> Result<DimensionMap<Vec<f64>>> {
        let corpus = self.corpus();
        Ok(DimensionMap::from_fn(|d| {
            corpus.notes.iter().map(|n| n.raw(d)).collect()
        }))
    }

    async fn last_note(&self) -> Result<Option<Note>> {
        Ok(self.corpus().notes.last().cloned())
    }

    async fn save_note(&self, note: NewNote) -> Result<SaveOutcome> {
        let mut corpus = self.corpus();
        if let Some(&i) = corpus.by_hash.get(&note.content_hash) {
            return Ok(SaveOutcome::Existing(corpus.notes[i].clone()));
        }
        let id = corpus.notes.len() as NoteId + 1;
        let note = note.into_note(id, Utc::now());
        let index = corpus.notes.len();
        corpus.by_hash.insert(note.content_hash.clone(), index);
        corpus.notes.push(note.clone());
        Ok(SaveOutcome::Inserted(note))
    }

    async fn all_notes(&self) -> Result<Vec<Note>> {
        Ok(self.corpus().notes.clone())
    }

    async fn source(&self, id: SourceId) -> Result<Option<Source>> {
        Ok(self.corpus().sources.iter().find(|s| s.id == id).cloned())
    }

    async fn sources(&self) -> Result<Vec<Source>> {
        Ok(self.corpus().sources.clone())
    }

    async fn upsert_source(&self, source: NewSource) -> Result<Source> {
        let mut corpus = self.corpus();
        if let Some(existing) = corpus
            .sources
            .iter_mut()
            .find(|s| s.external_id == source.external_id)
        {
            existing.name = source.name;
            existing.platform = source.platform;
            existing.is_hidden = source.is_hidden;
            return Ok(existing.clone());
        }
        let created = Source {
            id: corpus.sources.len() as SourceId + 1,
            external_id: source.external_id,
            name: source.name,
            platform: source.platform,
            is_hidden: source.is_hidden,
            rating: None,
        };
        corpus.sources.push(created.clone());
        Ok(created)
    }
}
