// Trait boundaries between the scoring pipeline and persistence.
//
// CorpusStore is the relational corpus: implemented by PgCorpusStore (postgres)
// and MemoryCorpusStore (tests, embedding). GraphSink is the best-effort graph
// materialization; ingestion never fails because of it.

use async_trait::async_trait;

use fakecheck_common::{
    Dimension, DimensionMap, NewNote, NewSource, Note, NoteId, Result, Source, SourceId,
};

/// Result of saving a note keyed by its content hash.
#[derive(Debug, Clone, PartialEq)]
pub enum SaveOutcome {
    Inserted(Note),
    /// Another writer persisted the same content first.
    Existing(Note),
}

impl SaveOutcome {
    pub fn note(&self) -> &Note {
        match self {
            SaveOutcome::Inserted(n) | SaveOutcome::Existing(n) => n,
        }
    }

    pub fn into_note(self) -> Note {
        match self {
            SaveOutcome::Inserted(n) | SaveOutcome::Existing(n) => n,
        }
    }

    pub fn is_inserted(&self) -> bool {
        matches!(self, SaveOutcome::Inserted(_))
    }
}

#[async_trait]
pub trait CorpusStore: Send + Sync {
    async fn note_by_hash(&self, content_hash: &str) -> Result<Option<Note>>;

    async fn note(&self, id: NoteId) -> Result<Option<Note>>;

    /// Notes of one source, oldest first.
    async fn notes_by_source(&self, source_id: SourceId) -> Result<Vec<Note>>;

    /// Every persisted raw score of one dimension, in insertion order.
    async fn raw_scores(&self, dimension: Dimension) -> Result<Vec<f64>>;

    /// Raw score history of all dimensions. Stores that can read it as one
    /// consistent snapshot should override this.
    async fn history(&self) -> Result<DimensionMap<Vec<f64>>> {
        let mut history: DimensionMap<Vec<f64>> = DimensionMap::default();
        for d in Dimension::ALL {
            history[d] = self.raw_scores(d).await?;
        }
        Ok(history)
    }

    /// Most recently inserted note.
    async fn last_note(&self) -> Result<Option<Note>>;

    /// Insert unless the content hash already exists, in which case the stored
    /// note is returned untouched.
    async fn save_note(&self, note: NewNote) -> Result<SaveOutcome>;

    /// All notes, oldest first.
    async fn all_notes(&self) -> Result<Vec<Note>>;

    async fn source(&self, id: SourceId) -> Result<Option<Source>>;

    async fn sources(&self) -> Result<Vec<Source>>;

    async fn upsert_source(&self, source: NewSource) -> Result<Source>;
}

#[async_trait]
pub trait GraphSink: Send + Sync {
    /// Materialize a freshly persisted note, its source, and its repost links.
    async fn publish(&self, note: &Note, source: &Source) -> Result<()>;
}
