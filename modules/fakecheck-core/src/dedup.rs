use std::collections::HashMap;
use std::sync::{Arc, Mutex as StdMutex, MutexGuard};

use sha2::{Digest, Sha256};
use tokio::sync::{Mutex, OwnedMutexGuard};

use fakecheck_common::{Note, Result};

use crate::traits::CorpusStore;

/// Collapse every run of Unicode whitespace to one space and trim the ends.
pub fn normalize_content(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// SHA-256 hex digest of the normalized text. Stable across runs and platforms.
pub fn content_hash(text: &str) -> String {
    hex::encode(Sha256::digest(normalize_content(text).as_bytes()))
}

type LockTable = Arc<StdMutex<HashMap<String, Arc<Mutex<()>>>>>;

/// Content-hash gate in front of evaluation.
///
/// `lock` serializes submissions of the same content so the second one finds the
/// first one's record instead of racing past the lookup.
#[derive(Clone, Default)]
pub struct Deduplicator {
    locks: LockTable,
}

/// Held while a submission is checked, evaluated and saved. Dropping the last
/// guard for a hash removes its table entry.
pub struct DedupGuard {
    hash: String,
    table: LockTable,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for DedupGuard {
    fn drop(&mut self) {
        let Some(guard) = self.guard.take() else {
            return;
        };
        let mut table = lock_table(&self.table);
        // one reference in the table plus the one inside our guard
        if Arc::strong_count(OwnedMutexGuard::mutex(&guard)) <= 2 {
            table.remove(&self.hash);
        }
        drop(guard);
    }
}

fn lock_table(table: &LockTable) -> MutexGuard<'_, HashMap<String, Arc<Mutex<()>>>> {
    table.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl Deduplicator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Existing record for this hash, if any.
    pub async fn lookup(&self, store: &dyn CorpusStore, hash: &str) -> Result<Option<Note>> {
        store.note_by_hash(hash).await
    }

    pub async fn lock(&self, hash: &str) -> DedupGuard {
        let mutex = {
            let mut table = lock_table(&self.locks);
            Arc::clone(table.entry(hash.to_string()).or_default())
        };
        let guard = mutex.lock_owned().await;
        DedupGuard {
            hash: hash.to_string(),
            table: Arc::clone(&self.locks),
            guard: Some(guard),
        }
    }

    /// Number of hashes currently locked or awaited.
    pub fn in_flight(&self) -> usize {
        lock_table(&self.locks).len()
    }
}
