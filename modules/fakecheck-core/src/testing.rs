// Test doubles for the scoring pipeline.
//
// - FixedEvaluator / CountingEvaluator / FailingEvaluator / KeywordEvaluator (Evaluator)
// - RecordingGraphSink (GraphSink): records published notes, optionally fails
//
// Plus helpers for building evaluator sets and seeded stores.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use fakecheck_common::{FakeCheckError, NewSource, Note, NoteId, Result, Source, SourceId};

use crate::evaluator::{EvaluationInput, Evaluator, EvaluatorSet};
use crate::memory_store::MemoryCorpusStore;
use crate::traits::{CorpusStore, GraphSink};

/// Always returns the same score.
pub struct FixedEvaluator(pub f64);

impl Evaluator for FixedEvaluator {
    fn evaluate(&self, _input: &EvaluationInput) -> anyhow::Result<f64> {
        Ok(self.0)
    }
}

/// Fixed score plus a call counter shared across clones of the `Arc`.
pub struct CountingEvaluator {
    value: f64,
    calls: AtomicUsize,
}

impl CountingEvaluator {
    pub fn new(value: f64) -> Arc<Self> {
        Arc::new(Self {
            value,
            calls: AtomicUsize::new(0),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Evaluator for CountingEvaluator {
    fn evaluate(&self, _input: &EvaluationInput) -> anyhow::Result<f64> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.value)
    }
}

pub struct FailingEvaluator;

impl Evaluator for FailingEvaluator {
    fn evaluate(&self, _input: &EvaluationInput) -> anyhow::Result<f64> {
        anyhow::bail!("FailingEvaluator: always fails")
    }
}

/// Fraction of the keywords present in the lowercased text. Deterministic,
/// and lets tests produce different scores for different documents.
pub struct KeywordEvaluator {
    keywords: Vec<String>,
}

impl KeywordEvaluator {
    pub fn new(keywords: &[&str]) -> Self {
        Self {
            keywords: keywords.iter().map(|k| k.to_lowercase()).collect(),
        }
    }
}

impl Evaluator for KeywordEvaluator {
    fn evaluate(&self, input: &EvaluationInput) -> anyhow::Result<f64> {
        if self.keywords.is_empty() {
            return Ok(0.0);
        }
        let text = input.text.to_lowercase();
        let hits = self.keywords.iter().filter(|k| text.contains(k.as_str())).count();
        Ok(hits as f64 / self.keywords.len() as f64)
    }
}

pub fn uniform_set(evaluator: Arc<dyn Evaluator>) -> EvaluatorSet {
    EvaluatorSet::uniform(evaluator)
}

/// Records `(note id, source id)` of every publish.
#[derive(Default)]
pub struct RecordingGraphSink {
    published: Mutex<Vec<(NoteId, SourceId)>>,
    fail: bool,
}

impl RecordingGraphSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// A sink whose every publish errors, as if the graph were unreachable.
    pub fn failing() -> Self {
        Self {
            published: Mutex::new(Vec::new()),
            fail: true,
        }
    }

    pub fn published(&self) -> Vec<(NoteId, SourceId)> {
        self.published.lock().unwrap().clone()
    }
}

#[async_trait]
impl GraphSink for RecordingGraphSink {
    async fn publish(&self, note: &Note, source: &Source) -> Result<()> {
        if self.fail {
            return Err(FakeCheckError::Graph("RecordingGraphSink: unreachable".into()));
        }
        self.published.lock().unwrap().push((note.id, source.id));
        Ok(())
    }
}

/// A memory store with `n` visible sources named `source-1..=n`.
pub async fn store_with_sources(n: usize) -> Arc<MemoryCorpusStore> {
    let store = Arc::new(MemoryCorpusStore::new());
    for i in 1..=n {
        store
            .upsert_source(NewSource::new(format!("ext-{i}"), format!("source-{i}"), "telegram"))
            .await
            .unwrap();
    }
    store
}
