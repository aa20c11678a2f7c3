use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use sha2::{Digest, Sha256};

use fakecheck_common::CacheConfig;

use super::{CacheStats, TimedCache};

/// Cache key for a function name plus its text arguments. Parts are
/// length-prefixed so `("ab", "c")` and `("a", "bc")` never collide.
pub fn memo_key(function_name: &str, parts: &[&str]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(function_name.as_bytes());
    for part in parts {
        hasher.update((part.len() as u64).to_le_bytes());
        hasher.update(part.as_bytes());
    }
    hex::encode(hasher.finalize())
}

/// Shared caches handed to evaluators. Built once by the owner and passed
/// around as `Arc<EvaluatorCaches>`.
pub struct EvaluatorCaches {
    /// Expensive text embeddings.
    pub embeddings: TimedCache<String, Arc<[f32]>>,
    /// Pairwise similarity between two texts.
    pub similarity: TimedCache<String, f64>,
    /// Cheap per-call results such as classifier scores.
    pub per_call: TimedCache<String, f64>,
}

impl EvaluatorCaches {
    pub fn new(config: &CacheConfig) -> Self {
        let ttl = |secs: Option<u64>| secs.map(Duration::from_secs);
        Self {
            embeddings: TimedCache::named(
                "embeddings",
                config.embedding_max_entries,
                ttl(config.embedding_ttl_secs),
            ),
            similarity: TimedCache::named(
                "similarity",
                config.similarity_max_entries,
                ttl(config.similarity_ttl_secs),
            ),
            per_call: TimedCache::named(
                "per_call",
                config.per_call_max_entries,
                ttl(config.per_call_ttl_secs),
            ),
        }
    }

    pub fn cached_embedding<F>(&self, text: &str, f: F) -> anyhow::Result<Arc<[f32]>>
    where
        F: FnOnce(&str) -> anyhow::Result<Vec<f32>>,
    {
        let key = memo_key("embedding", &[text]);
        self.embeddings
            .try_get_or_insert_with(key, || f(text).map(Arc::from))
    }

    /// Order-insensitive: `(a, b)` and `(b, a)` share one entry.
    pub fn cached_similarity<F>(&self, a: &str, b: &str, f: F) -> anyhow::Result<f64>
    where
        F: FnOnce(&str, &str) -> anyhow::Result<f64>,
    {
        let (first, second) = if a <= b { (a, b) } else { (b, a) };
        let key = memo_key("similarity", &[first, second]);
        self.similarity.try_get_or_insert_with(key, || f(a, b))
    }

    pub fn cached_score<F>(&self, namespace: &str, text: &str, f: F) -> anyhow::Result<f64>
    where
        F: FnOnce(&str) -> anyhow::Result<f64>,
    {
        let key = memo_key(namespace, &[text]);
        self.per_call.try_get_or_insert_with(key, || f(text))
    }

    pub fn stats(&self) -> BTreeMap<&'static str, CacheStats> {
        BTreeMap::from([
            (self.embeddings.name(), self.embeddings.stats()),
            (self.similarity.name(), self.similarity.stats()),
            (self.per_call.name(), self.per_call.stats()),
        ])
    }

    pub fn clear_all(&self) {
        self.embeddings.clear();
        self.similarity.clear();
        self.per_call.clear();
    }
}

impl Default for EvaluatorCaches {
    fn default() -> Self {
        Self::new(&CacheConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn default_sizes_and_ttls() {
        let caches = EvaluatorCaches::default();
        assert_eq!(caches.embeddings.max_size(), 500);
        assert_eq!(caches.embeddings.ttl(), Some(Duration::from_secs(3600)));
        assert_eq!(caches.similarity.max_size(), 1000);
        assert_eq!(caches.similarity.ttl(), Some(Duration::from_secs(600)));
        assert_eq!(caches.per_call.max_size(), 2000);
        assert_eq!(caches.per_call.ttl(), Some(Duration::from_secs(300)));
    }

    #[test]
    fn similarity_key_is_symmetric() {
        let caches = EvaluatorCaches::default();
        let calls = Cell::new(0);
        let sim = |_: &str, _: &str| {
            calls.set(calls.get() + 1);
            Ok(0.75)
        };
        assert_eq!(caches.cached_similarity("alpha", "beta", sim).unwrap(), 0.75);
        assert_eq!(caches.cached_similarity("beta", "alpha", sim).unwrap(), 0.75);
        assert_eq!(calls.get(), 1);
        assert_eq!(caches.similarity.stats().hits, 1);
    }

    #[test]
    fn score_namespaces_do_not_collide() {
        let caches = EvaluatorCaches::default();
        caches.cached_score("clickbait", "text", |_| Ok(0.1)).unwrap();
        let other = caches.cached_score("subjectivity", "text", |_| Ok(0.9)).unwrap();
        assert_eq!(other, 0.9);
    }

    #[test]
    fn memo_key_separates_parts() {
        assert_ne!(memo_key("f", &["ab", "c"]), memo_key("f", &["a", "bc"]));
        assert_eq!(memo_key("f", &["x"]), memo_key("f", &["x"]));
    }

    #[test]
    fn embedding_errors_propagate_and_are_not_cached() {
        let caches = EvaluatorCaches::default();
        assert!(caches
            .cached_embedding("t", |_| Err(anyhow::anyhow!("model offline")))
            .is_err());
        let v = caches.cached_embedding("t", |_| Ok(vec![1.0, 2.0])).unwrap();
        assert_eq!(&*v, &[1.0, 2.0]);
    }

    #[test]
    fn clear_all_empties_every_cache() {
        let caches = EvaluatorCaches::default();
        caches.cached_score("n", "t", |_| Ok(1.0)).unwrap();
        caches.clear_all();
        assert!(caches.stats().values().all(|s| s.entries == 0));
    }
}
