use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::future::join_all;
use tracing::warn;

use fakecheck_common::{Dimension, DimensionMap, Note, SourceId};

use crate::context::RawScores;
use crate::memo::EvaluatorCaches;

/// Everything an evaluator may look at for one document.
#[derive(Clone)]
pub struct EvaluationInput {
    pub text: String,
    pub title: Option<String>,
    pub source_id: SourceId,
    /// Earlier notes of the same source, oldest first. Only populated when some
    /// evaluator asks for it.
    pub prior_notes: Vec<Note>,
    pub caches: Arc<EvaluatorCaches>,
}

/// One scoring signal. Implementations are blocking (model inference, remote
/// calls) and are run off the async runtime.
pub trait Evaluator: Send + Sync {
    fn evaluate(&self, input: &EvaluationInput) -> anyhow::Result<f64>;

    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }

    /// Whether `EvaluationInput::prior_notes` must be loaded for this evaluator.
    fn needs_source_history(&self) -> bool {
        false
    }
}

/// Exactly one evaluator per dimension, built once at startup.
#[derive(Clone)]
pub struct EvaluatorSet(DimensionMap<Arc<dyn Evaluator>>);

impl EvaluatorSet {
    pub fn new(evaluators: DimensionMap<Arc<dyn Evaluator>>) -> Self {
        Self(evaluators)
    }

    pub fn from_fn(f: impl FnMut(Dimension) -> Arc<dyn Evaluator>) -> Self {
        Self(DimensionMap::from_fn(f))
    }

    /// The same evaluator for every dimension.
    pub fn uniform(evaluator: Arc<dyn Evaluator>) -> Self {
        Self::from_fn(|_| Arc::clone(&evaluator))
    }

    pub fn with(mut self, dimension: Dimension, evaluator: Arc<dyn Evaluator>) -> Self {
        self.0[dimension] = evaluator;
        self
    }

    pub fn get(&self, dimension: Dimension) -> &Arc<dyn Evaluator> {
        &self.0[dimension]
    }

    pub fn needs_source_history(&self) -> bool {
        self.0.values().any(|e| e.needs_source_history())
    }

    /// Run all evaluators concurrently on the blocking pool. A failing,
    /// panicking, or non-finite evaluator yields raw 0 and is marked as not
    /// evaluated; it never aborts the others.
    pub async fn run(&self, input: Arc<EvaluationInput>) -> RawScores {
        let tasks = Dimension::ALL.map(|d| {
            let evaluator = Arc::clone(&self.0[d]);
            let input = Arc::clone(&input);
            tokio::task::spawn_blocking(move || {
                let started = Instant::now();
                let result = evaluator.evaluate(&input);
                (result, started.elapsed())
            })
        });

        let mut scores = RawScores {
            evaluated: DimensionMap::filled(false),
            ..RawScores::default()
        };

        for (d, joined) in Dimension::ALL.into_iter().zip(join_all(tasks).await) {
            let (result, elapsed) = match joined {
                Ok((result, elapsed)) => (result, elapsed),
                Err(e) => (Err(anyhow::anyhow!("evaluator task panicked: {e}")), Duration::ZERO),
            };
            scores.elapsed[d] = elapsed;
            match result {
                Ok(value) if value.is_finite() => {
                    scores.raw[d] = value;
                    scores.evaluated[d] = true;
                }
                Ok(value) => {
                    warn!(dimension = %d, evaluator = self.0[d].name(), value, "Evaluator returned a non-finite score");
                }
                Err(e) => {
                    warn!(dimension = %d, evaluator = self.0[d].name(), error = %e, "Evaluator failed");
                }
            }
        }
        scores
    }
}
