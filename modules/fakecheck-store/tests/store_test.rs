//! Integration tests for PgCorpusStore.
//! Requires a Postgres instance. Set DATABASE_TEST_URL or these tests are skipped.

use std::sync::Arc;

use fakecheck_common::{
    Dimension, DimensionMap, DimensionScore, FehnerState, FehnerType, NewNote, NewSource,
    RunningTotals, ScoringConfig,
};
use fakecheck_core::testing::{uniform_set, CountingEvaluator};
use fakecheck_core::{
    content_hash, CorpusStore, EvaluatorCaches, Ingestor, SaveOutcome, ScoreAggregator,
    ScoreOverrides, Submission,
};
use fakecheck_store::PgCorpusStore;
use sqlx::PgPool;

/// Get a migrated, empty store, or skip if no test DB is available.
async fn test_store() -> Option<PgCorpusStore> {
    let url = std::env::var("DATABASE_TEST_URL").ok()?;
    let pool = PgPool::connect(&url).await.ok()?;
    let store = PgCorpusStore::new(pool);
    store.migrate().await.ok()?;

    // Clean slate for each test
    sqlx::query("TRUNCATE notes, sources RESTART IDENTITY CASCADE")
        .execute(store.pool())
        .await
        .ok()?;

    Some(store)
}

fn new_note(content: &str, source_id: i64, raw: f64) -> NewNote {
    NewNote {
        title: Some("title".into()),
        content: content.into(),
        content_hash: content_hash(content),
        scores: DimensionMap::filled(DimensionScore::new(raw, 1.0 / 13.0)),
        total_score: raw,
        is_propaganda: false,
        amount_of_propaganda_scores: 0.0,
        fehner: FehnerState {
            uniqueness: 0.0,
            totals: RunningTotals {
                uniqueness_sum: 0.0,
                uniqueness_count: 1,
                score_sum: raw,
                score_count: 1,
            },
            fehner_type: Some(FehnerType::B),
        },
        source_id,
        reposted_from_source_id: None,
    }
}

#[tokio::test]
async fn save_then_read_back_every_column() {
    let Some(store) = test_store().await else {
        return;
    };
    let source = store
        .upsert_source(NewSource::new("chan-1", "Channel", "telegram"))
        .await
        .unwrap();

    let mut note = new_note("Some content.", source.id, 0.4);
    note.scores[Dimension::Messianism] = DimensionScore::new(0.9, 0.2);
    let saved = store.save_note(note).await.unwrap();
    assert!(saved.is_inserted());

    let read = store.note_by_hash(&content_hash("Some content.")).await.unwrap().unwrap();
    assert_eq!(read.id, saved.note().id);
    assert_eq!(read.scores[Dimension::Messianism], DimensionScore::new(0.9, 0.2));
    assert_eq!(read.fehner_type(), Some(FehnerType::B));
    assert_eq!(read.title.as_deref(), Some("title"));
}

#[tokio::test]
async fn duplicate_hash_returns_existing_row() {
    let Some(store) = test_store().await else {
        return;
    };
    let source = store
        .upsert_source(NewSource::new("chan-1", "Channel", "telegram"))
        .await
        .unwrap();

    let first = store.save_note(new_note("Same.", source.id, 0.1)).await.unwrap();
    let second = store.save_note(new_note("Same.", source.id, 0.9)).await.unwrap();

    assert!(matches!(second, SaveOutcome::Existing(_)));
    assert_eq!(first.note().id, second.note().id);
    assert_eq!(second.note().total_score, 0.1);
    assert_eq!(store.all_notes().await.unwrap().len(), 1);
}

#[tokio::test]
async fn history_is_in_insertion_order() {
    let Some(store) = test_store().await else {
        return;
    };
    let source = store
        .upsert_source(NewSource::new("chan-1", "Channel", "telegram"))
        .await
        .unwrap();
    for (i, raw) in [0.1, 0.2, 0.9].into_iter().enumerate() {
        store
            .save_note(new_note(&format!("Doc {i}."), source.id, raw))
            .await
            .unwrap();
    }

    let history = store.history().await.unwrap();
    assert_eq!(history[Dimension::Clickbait], vec![0.1, 0.2, 0.9]);
    assert_eq!(
        store.raw_scores(Dimension::Sentiment).await.unwrap(),
        vec![0.1, 0.2, 0.9]
    );
    assert_eq!(store.last_note().await.unwrap().unwrap().total_score, 0.9);
}

#[tokio::test]
async fn upsert_source_updates_by_external_id() {
    let Some(store) = test_store().await else {
        return;
    };
    let a = store
        .upsert_source(NewSource::new("chan-1", "Old", "telegram"))
        .await
        .unwrap();
    let b = store
        .upsert_source(NewSource::new("chan-1", "New", "telegram").hidden())
        .await
        .unwrap();
    assert_eq!(a.id, b.id);
    assert_eq!(b.name, "New");
    assert!(b.is_hidden);
    assert_eq!(store.sources().await.unwrap().len(), 1);
}

#[tokio::test]
async fn ingestion_against_postgres_deduplicates() {
    let Some(store) = test_store().await else {
        return;
    };
    let store = Arc::new(store);
    let source = store
        .upsert_source(NewSource::new("chan-1", "Channel", "telegram"))
        .await
        .unwrap();

    let counter = CountingEvaluator::new(0.2);
    let ingestor = Ingestor::new(
        store.clone(),
        uniform_set(counter.clone()),
        ScoreAggregator::new(&ScoringConfig::default(), ScoreOverrides::empty()),
        Arc::new(EvaluatorCaches::default()),
    );

    let a = ingestor.ingest(Submission::new("Once.", source.id)).await.unwrap();
    let b = ingestor.ingest(Submission::new("Once.", source.id)).await.unwrap();
    assert_eq!(a.note().id, b.note().id);
    assert_eq!(counter.calls(), 13);
}
