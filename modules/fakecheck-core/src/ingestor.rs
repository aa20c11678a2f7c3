use std::sync::{Arc, Mutex as StdMutex};
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{info, warn};

use fakecheck_common::{FakeCheckError, NewNote, Note, Result, SourceId};

use crate::aggregate::ScoreAggregator;
use crate::calibration::calibrate;
use crate::consistency::{classify, uniqueness_score};
use crate::context::EvaluationContext;
use crate::dedup::{content_hash, Deduplicator};
use crate::evaluator::{EvaluationInput, EvaluatorSet};
use crate::memo::EvaluatorCaches;
use crate::traits::{CorpusStore, GraphSink, SaveOutcome};

/// A document submitted for scoring.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Submission {
    pub title: Option<String>,
    pub content: String,
    pub source_id: SourceId,
    #[serde(default)]
    pub reposted_from_source_id: Option<SourceId>,
}

impl Submission {
    pub fn new(content: impl Into<String>, source_id: SourceId) -> Self {
        Self {
            title: None,
            content: content.into(),
            source_id,
            reposted_from_source_id: None,
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn reposted_from(mut self, source_id: SourceId) -> Self {
        self.reposted_from_source_id = Some(source_id);
        self
    }
}

#[derive(Debug, Clone)]
pub enum IngestOutcome {
    Created {
        note: Note,
        context: EvaluationContext,
        elapsed: Duration,
    },
    /// Content already in the corpus; nothing was evaluated.
    Duplicate(Note),
}

impl IngestOutcome {
    pub fn note(&self) -> &Note {
        match self {
            IngestOutcome::Created { note, .. } | IngestOutcome::Duplicate(note) => note,
        }
    }

    pub fn is_duplicate(&self) -> bool {
        matches!(self, IngestOutcome::Duplicate(_))
    }
}

/// Running counters over everything this ingestor has processed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct ProcessingStats {
    pub documents: u64,
    pub words: u64,
    pub total_elapsed: Duration,
    pub duplicates_skipped: u64,
}

impl ProcessingStats {
    pub fn average_elapsed(&self) -> Duration {
        if self.documents == 0 {
            return Duration::ZERO;
        }
        Duration::from_secs_f64(self.total_elapsed.as_secs_f64() / self.documents as f64)
    }
}

/// The scoring pipeline: dedup, evaluate, calibrate, aggregate, classify, save,
/// then publish to the graph.
pub struct Ingestor {
    store: Arc<dyn CorpusStore>,
    evaluators: EvaluatorSet,
    aggregator: ScoreAggregator,
    caches: Arc<EvaluatorCaches>,
    graph: Option<Arc<dyn GraphSink>>,
    dedup: Deduplicator,
    /// Serializes history snapshot through save so calibration and running
    /// totals follow commit order.
    commit: Mutex<()>,
    stats: StdMutex<ProcessingStats>,
}

impl Ingestor {
    pub fn new(
        store: Arc<dyn CorpusStore>,
        evaluators: EvaluatorSet,
        aggregator: ScoreAggregator,
        caches: Arc<EvaluatorCaches>,
    ) -> Self {
        Self {
            store,
            evaluators,
            aggregator,
            caches,
            graph: None,
            dedup: Deduplicator::new(),
            commit: Mutex::new(()),
            stats: StdMutex::new(ProcessingStats::default()),
        }
    }

    pub fn with_graph(mut self, graph: Arc<dyn GraphSink>) -> Self {
        self.graph = Some(graph);
        self
    }

    pub fn store(&self) -> &Arc<dyn CorpusStore> {
        &self.store
    }

    pub fn caches(&self) -> &Arc<EvaluatorCaches> {
        &self.caches
    }

    pub fn stats(&self) -> ProcessingStats {
        *self.stats.lock().unwrap_or_else(|p| p.into_inner())
    }

    fn record(&self, f: impl FnOnce(&mut ProcessingStats)) {
        let mut stats = self.stats.lock().unwrap_or_else(|p| p.into_inner());
        f(&mut stats);
    }

    pub async fn ingest(&self, submission: Submission) -> Result<IngestOutcome> {
        let started = Instant::now();
        if submission.content.trim().is_empty() {
            return Err(FakeCheckError::Validation("content is empty".into()));
        }

        let hash = content_hash(&submission.content);
        let _guard = self.dedup.lock(&hash).await;

        if let Some(existing) = self.dedup.lookup(self.store.as_ref(), &hash).await? {
            info!(hash = %hash, note_id = existing.id, "Duplicate content, returning existing note");
            self.record(|s| s.duplicates_skipped += 1);
            return Ok(IngestOutcome::Duplicate(existing));
        }

        let source = self
            .store
            .source(submission.source_id)
            .await?
            .ok_or_else(|| {
                FakeCheckError::Validation(format!("unknown source {}", submission.source_id))
            })?;
        if let Some(original) = submission.reposted_from_source_id {
            if self.store.source(original).await?.is_none() {
                return Err(FakeCheckError::Validation(format!(
                    "unknown reposted-from source {original}"
                )));
            }
        }

        let prior_notes = if self.evaluators.needs_source_history() {
            self.store.notes_by_source(source.id).await?
        } else {
            Vec::new()
        };
        let input = Arc::new(EvaluationInput {
            text: submission.content.clone(),
            title: submission.title.clone(),
            source_id: source.id,
            prior_notes,
            caches: Arc::clone(&self.caches),
        });
        let raw = self.evaluators.run(input).await;
        let uniqueness = uniqueness_score(&submission.content);

        let (outcome, context) = {
            let _commit = self.commit.lock().await;

            let history = self.store.history().await?;
            let coefficients = calibrate(&history);
            let context =
                self.aggregator
                    .aggregate(&raw, &coefficients, &history, &submission.content, &hash);

            let previous = self.store.last_note().await?;
            let fehner = classify(
                uniqueness,
                context.total_score,
                previous.as_ref().map(|n| &n.fehner.totals),
            );

            let new_note = NewNote {
                title: submission.title,
                content: submission.content,
                content_hash: hash.clone(),
                scores: context.scores,
                total_score: context.total_score,
                is_propaganda: context.is_propaganda,
                amount_of_propaganda_scores: context.amount_of_propaganda_scores,
                fehner,
                source_id: source.id,
                reposted_from_source_id: submission.reposted_from_source_id,
            };
            (self.store.save_note(new_note).await?, context)
        };

        let note = match outcome {
            SaveOutcome::Inserted(note) => note,
            SaveOutcome::Existing(note) => {
                info!(hash = %hash, note_id = note.id, "Content saved concurrently elsewhere, returning existing note");
                self.record(|s| s.duplicates_skipped += 1);
                return Ok(IngestOutcome::Duplicate(note));
            }
        };

        if let Some(graph) = &self.graph {
            if let Err(e) = graph.publish(&note, &source).await {
                warn!(note_id = note.id, error = %e, "Graph publish failed, continuing");
            }
        }

        let elapsed = started.elapsed();
        let words = note.word_count() as u64;
        self.record(|s| {
            s.documents += 1;
            s.words += words;
            s.total_elapsed += elapsed;
        });

        info!(
            note_id = note.id,
            source_id = note.source_id,
            total_score = note.total_score,
            is_propaganda = note.is_propaganda,
            fehner_type = note.fehner_type().map(|t| t.as_str()).unwrap_or("-"),
            failed_evaluators = raw.failed_dimensions().len(),
            elapsed_ms = elapsed.as_millis() as u64,
            "Note scored"
        );

        Ok(IngestOutcome::Created {
            note,
            context,
            elapsed,
        })
    }

    /// Ingest sequentially, one result per submission in order.
    pub async fn process_batch(&self, submissions: Vec<Submission>) -> Vec<Result<IngestOutcome>> {
        let mut results = Vec::with_capacity(submissions.len());
        for submission in submissions {
            let result = self.ingest(submission).await;
            if let Err(e) = &result {
                warn!(error = %e, "Batch item failed");
            }
            results.push(result);
        }
        results
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn average_elapsed_divides_without_truncating_count() {
        let stats = ProcessingStats {
            documents: u64::from(u32::MAX) + 2,
            total_elapsed: Duration::from_secs(u64::from(u32::MAX) + 2),
            ..Default::default()
        };
        let avg = stats.average_elapsed().as_secs_f64();
        assert!((avg - 1.0).abs() < 1e-6, "{avg}");
    }

    #[test]
    fn average_elapsed_is_zero_without_documents() {
        assert_eq!(ProcessingStats::default().average_elapsed(), Duration::ZERO);
    }
}
