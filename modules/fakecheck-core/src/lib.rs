pub mod aggregate;
pub mod calibration;
pub mod consistency;
pub mod context;
pub mod corpus;
pub mod dedup;
pub mod evaluator;
pub mod ingestor;
pub mod memo;
pub mod memory_store;
pub mod overrides;
pub mod traits;

#[cfg(any(test, feature = "test-support"))]
pub mod testing;

pub use aggregate::ScoreAggregator;
pub use calibration::calibrate;
pub use consistency::{classify, fehner_score, uniqueness_score};
pub use context::{EvaluationContext, RawScores};
pub use corpus::{corpus_fehner_score, source_ratings, visible_sources, SourceRating};
pub use dedup::{content_hash, Deduplicator};
pub use evaluator::{EvaluationInput, Evaluator, EvaluatorSet};
pub use ingestor::{IngestOutcome, Ingestor, ProcessingStats, Submission};
pub use memo::{CacheStats, EvaluatorCaches, TimedCache};
pub use memory_store::MemoryCorpusStore;
pub use overrides::ScoreOverrides;
pub use traits::{CorpusStore, GraphSink, SaveOutcome};
