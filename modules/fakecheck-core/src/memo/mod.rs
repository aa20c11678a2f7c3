mod registry;
mod timed_cache;

pub use registry::{memo_key, EvaluatorCaches};
pub use timed_cache::{CacheStats, TimedCache};
