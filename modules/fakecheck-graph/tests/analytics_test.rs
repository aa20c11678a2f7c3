//! Analytics over a corpus ingested into the in-memory store.

use std::sync::Arc;

use async_trait::async_trait;

use fakecheck_common::{FakeCheckError, GraphConfig, ScoringConfig};
use fakecheck_core::testing::{store_with_sources, uniform_set, FixedEvaluator};
use fakecheck_core::{
    CorpusStore, EvaluatorCaches, Ingestor, MemoryCorpusStore, ScoreAggregator, ScoreOverrides,
    Submission,
};
use fakecheck_graph::{
    CorpusGraphStore, GraphAnalytics, GraphSnapshot, GraphStore, SnapshotEdge,
};

struct UnreachableStore;

#[async_trait]
impl GraphStore for UnreachableStore {
    async fn snapshot(&self) -> fakecheck_common::Result<GraphSnapshot> {
        Err(FakeCheckError::Graph("connection refused".into()))
    }
}

/// Source 1 publishes originals; 2 and 3 repost from 1; 4 reposts from 3.
async fn seeded_corpus() -> Arc<MemoryCorpusStore> {
    let store = store_with_sources(4).await;
    let ingestor = Ingestor::new(
        store.clone(),
        uniform_set(Arc::new(FixedEvaluator(0.2))),
        ScoreAggregator::new(&ScoringConfig::default(), ScoreOverrides::empty()),
        Arc::new(EvaluatorCaches::default()),
    );

    let submissions = vec![
        Submission::new("Original claim about the border.", 1),
        Submission::new("Reposting the border claim.", 2).reposted_from(1),
        Submission::new("Border claim, shared again.", 3).reposted_from(1),
        Submission::new("Second original from the first channel.", 1),
        Submission::new("Repost of the second original.", 2).reposted_from(1),
        Submission::new("Passing on what channel three said.", 4).reposted_from(3),
    ];
    for s in submissions {
        ingestor.ingest(s).await.unwrap();
    }
    store
}

fn analytics(store: Arc<MemoryCorpusStore>) -> GraphAnalytics {
    GraphAnalytics::new(Arc::new(CorpusGraphStore::new(store)), GraphConfig::default())
}

#[tokio::test]
async fn snapshot_references_latest_earlier_note_of_original_source() {
    let store = seeded_corpus().await;
    let snapshot = CorpusGraphStore::new(store).snapshot().await.unwrap();

    let references: Vec<(i64, i64)> = snapshot
        .edges
        .iter()
        .filter_map(|e| match e {
            SnapshotEdge::References { from, to } => Some((*from, *to)),
            _ => None,
        })
        .collect();
    assert_eq!(references, vec![(2, 1), (3, 1), (5, 4), (6, 3)]);
}

#[tokio::test]
async fn cascades_follow_reposts_back_to_the_origin() {
    let analytics = analytics(seeded_corpus().await);
    let cascades = analytics.cascades(5).await.unwrap();

    assert_eq!(cascades[0].origin(), Some(6));
    let chain: Vec<i64> = cascades[0].hops.iter().map(|h| h.note_id).collect();
    assert_eq!(chain, vec![6, 3, 1]);
    assert_eq!(cascades[0].hops[2].source_name, "source-1");
}

#[tokio::test]
async fn the_most_reposted_source_ranks_highest() {
    let analytics = analytics(seeded_corpus().await);

    let influence = analytics.influence().await.unwrap();
    assert_eq!(influence.ranked()[0].0, 1);
    assert!(influence.centrality[&3] > 0.0);

    let top = analytics.most_influential_sources(1).await.unwrap();
    assert_eq!(top[0].source_id, 1);
    assert_eq!(top[0].repost_count, 3);
}

#[tokio::test]
async fn communities_cover_every_reposting_source() {
    let analytics = analytics(seeded_corpus().await);
    let communities = analytics.communities().await.unwrap();

    assert_eq!(communities.len(), 4);
    assert_eq!(communities[&1], 0);
}

#[tokio::test]
async fn report_uses_configured_cascade_depth() {
    let store = seeded_corpus().await;
    let config = GraphConfig {
        cascade_max_depth: 1,
        ..GraphConfig::default()
    };
    let analytics = GraphAnalytics::new(Arc::new(CorpusGraphStore::new(store)), config);
    let report = analytics.report(10).await.unwrap();

    assert!(report.cascades.iter().all(|c| c.len() <= 1));
    assert_eq!(report.source_statistics.len(), 4);
    assert!(report.communities.is_some());
}

#[tokio::test]
async fn empty_or_unreachable_store_yields_none() {
    let empty = analytics(Arc::new(MemoryCorpusStore::new()));
    assert!(empty.communities().await.is_none());
    assert!(empty.cascades(5).await.is_none());

    let no_reposts = store_with_sources(1).await;
    no_reposts
        .upsert_source(fakecheck_common::NewSource::new("x", "X", "web"))
        .await
        .unwrap();
    assert!(analytics(no_reposts).influence().await.is_none());

    let down = GraphAnalytics::new(Arc::new(UnreachableStore), GraphConfig::default());
    assert!(down.influence().await.is_none());
    assert!(down.report(10).await.is_none());
}
