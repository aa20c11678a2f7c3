use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use neo4rs::query;
use tracing::info;

use fakecheck_common::{FakeCheckError, FehnerType};
use fakecheck_core::CorpusStore;

use crate::snapshot::{GraphSnapshot, SnapshotEdge, SnapshotNote, SnapshotSource};
use crate::GraphClient;

/// Anything that can produce a fresh snapshot of the corpus graph.
#[async_trait]
pub trait GraphStore: Send + Sync {
    async fn snapshot(&self) -> fakecheck_common::Result<GraphSnapshot>;
}

/// Reads the materialized graph back out of Neo4j.
pub struct GraphReader {
    client: GraphClient,
}

impl GraphReader {
    pub fn new(client: GraphClient) -> Self {
        Self { client }
    }

    pub async fn load_snapshot(&self) -> Result<GraphSnapshot, neo4rs::Error> {
        let start = std::time::Instant::now();
        let g = &self.client.graph;

        let (sources, notes, reposts, references) = tokio::join!(
            load_sources(g),
            load_notes(g),
            load_reposts(g),
            load_references(g),
        );
        let sources = sources?;
        let notes = notes?;

        let mut edges: Vec<SnapshotEdge> = notes
            .iter()
            .map(|n| SnapshotEdge::Published {
                source: n.source_id,
                note: n.id,
            })
            .collect();
        edges.extend(reposts?);
        edges.extend(references?);

        info!(
            sources = sources.len(),
            notes = notes.len(),
            edges = edges.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Graph snapshot loaded"
        );
        Ok(GraphSnapshot {
            sources,
            notes,
            edges,
        })
    }
}

#[async_trait]
impl GraphStore for GraphReader {
    async fn snapshot(&self) -> fakecheck_common::Result<GraphSnapshot> {
        self.load_snapshot()
            .await
            .map_err(|e| FakeCheckError::Graph(e.to_string()))
    }
}

async fn load_sources(g: &neo4rs::Graph) -> Result<Vec<SnapshotSource>, neo4rs::Error> {
    let q = query(
        "MATCH (s:Source)
         RETURN s.postgres_id AS id,
                coalesce(s.name, '') AS name,
                coalesce(s.platform, '') AS platform
         ORDER BY id",
    );
    let mut out = Vec::new();
    let mut stream = g.execute(q).await?;
    while let Some(row) = stream.next().await? {
        out.push(SnapshotSource {
            id: row.get("id").unwrap_or_default(),
            name: row.get("name").unwrap_or_default(),
            platform: row.get("platform").unwrap_or_default(),
        });
    }
    Ok(out)
}

async fn load_notes(g: &neo4rs::Graph) -> Result<Vec<SnapshotNote>, neo4rs::Error> {
    let q = query(
        "MATCH (s:Source)-[:PUBLISHED]->(n:Note)
         RETURN n.postgres_id AS id,
                s.postgres_id AS source_id,
                coalesce(n.title, '') AS title,
                coalesce(n.total_score, 0.0) AS total_score,
                coalesce(n.fehner_type, '') AS fehner_type,
                toString(n.created_at) AS created_at
         ORDER BY id",
    );
    let mut out = Vec::new();
    let mut stream = g.execute(q).await?;
    while let Some(row) = stream.next().await? {
        let title: String = row.get("title").unwrap_or_default();
        let fehner_type: String = row.get("fehner_type").unwrap_or_default();
        let created_at: String = row.get("created_at").unwrap_or_default();
        out.push(SnapshotNote {
            id: row.get("id").unwrap_or_default(),
            source_id: row.get("source_id").unwrap_or_default(),
            title: Some(title).filter(|t| !t.is_empty()),
            total_score: row.get("total_score").unwrap_or_default(),
            fehner_type: FehnerType::parse(&fehner_type),
            created_at: parse_datetime(&created_at),
        });
    }
    Ok(out)
}

async fn load_reposts(g: &neo4rs::Graph) -> Result<Vec<SnapshotEdge>, neo4rs::Error> {
    let q = query(
        "MATCH (n:Note)-[:REPOSTS_FROM]->(s:Source)
         RETURN n.postgres_id AS note_id, s.postgres_id AS source_id",
    );
    let mut out = Vec::new();
    let mut stream = g.execute(q).await?;
    while let Some(row) = stream.next().await? {
        out.push(SnapshotEdge::RepostsFrom {
            note: row.get("note_id").unwrap_or_default(),
            source: row.get("source_id").unwrap_or_default(),
        });
    }
    Ok(out)
}

async fn load_references(g: &neo4rs::Graph) -> Result<Vec<SnapshotEdge>, neo4rs::Error> {
    let q = query(
        "MATCH (a:Note)-[:REFERENCES]->(b:Note)
         RETURN a.postgres_id AS from_id, b.postgres_id AS to_id",
    );
    let mut out = Vec::new();
    let mut stream = g.execute(q).await?;
    while let Some(row) = stream.next().await? {
        out.push(SnapshotEdge::References {
            from: row.get("from_id").unwrap_or_default(),
            to: row.get("to_id").unwrap_or_default(),
        });
    }
    Ok(out)
}

/// Writer stores "%Y-%m-%dT%H:%M:%S%.6f" (implicitly UTC); RFC 3339 is also accepted.
fn parse_datetime(s: &str) -> DateTime<Utc> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return dt.with_timezone(&Utc);
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f") {
        return naive.and_utc();
    }
    DateTime::<Utc>::UNIX_EPOCH
}

/// Derives the graph from a corpus store, for deployments without Neo4j.
pub struct CorpusGraphStore {
    store: Arc<dyn CorpusStore>,
}

impl CorpusGraphStore {
    pub fn new(store: Arc<dyn CorpusStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl GraphStore for CorpusGraphStore {
    async fn snapshot(&self) -> fakecheck_common::Result<GraphSnapshot> {
        let (sources, notes) = tokio::join!(self.store.sources(), self.store.all_notes());
        Ok(GraphSnapshot::from_corpus(&sources?, &notes?))
    }
}
