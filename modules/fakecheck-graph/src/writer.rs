use async_trait::async_trait;
use chrono::{DateTime, Utc};
use neo4rs::query;
use tracing::debug;

use fakecheck_common::{Dimension, FakeCheckError, Note, Source, SourceId};
use fakecheck_core::GraphSink;

use crate::GraphClient;

/// Materializes persisted notes and sources into Neo4j. Nodes are keyed by
/// their postgres id so republishing is idempotent.
pub struct GraphWriter {
    client: GraphClient,
    note_cypher: String,
}

impl GraphWriter {
    pub fn new(client: GraphClient) -> Self {
        Self {
            client,
            note_cypher: upsert_note_cypher(),
        }
    }

    pub async fn upsert_source(&self, source: &Source) -> Result<(), neo4rs::Error> {
        let q = query(
            "MERGE (s:Source {postgres_id: $id})
             ON CREATE SET s.created_at = $now
             SET s.external_id = $external_id,
                 s.name = $name,
                 s.platform = $platform,
                 s.is_hidden = $is_hidden",
        )
        .param("id", source.id)
        .param("now", format_datetime(&Utc::now()))
        .param("external_id", source.external_id.as_str())
        .param("name", source.name.as_str())
        .param("platform", source.platform.as_str())
        .param("is_hidden", source.is_hidden);

        self.client.graph.run(q).await?;
        Ok(())
    }

    /// Upsert the note and its PUBLISHED edge from the owning source.
    pub async fn upsert_note(&self, note: &Note) -> Result<(), neo4rs::Error> {
        let mut q = query(&self.note_cypher)
            .param("id", note.id)
            .param("created_at", format_datetime(&note.created_at))
            .param("hash", note.content_hash.as_str())
            .param("title", note.title.clone().unwrap_or_default())
            .param("total_score", note.total_score)
            .param("is_propaganda", note.is_propaganda)
            .param("amount_of_propaganda_scores", note.amount_of_propaganda_scores)
            .param("uniqueness", note.fehner.uniqueness)
            .param(
                "fehner_type",
                note.fehner_type().map(|t| t.as_str()).unwrap_or_default(),
            )
            .param("source_id", note.source_id);
        for d in Dimension::ALL {
            let score = note.scores[d];
            let key = d.key();
            q = q
                .param(key, score.weighted)
                .param(format!("{key}_raw").as_str(), score.raw)
                .param(format!("{key}_coeff").as_str(), score.coefficient);
        }

        self.client.graph.run(q).await?;
        Ok(())
    }

    /// Link a reposted note to the source it came from and to that source's
    /// most recent earlier note.
    pub async fn link_repost(
        &self,
        note: &Note,
        original_source: SourceId,
    ) -> Result<(), neo4rs::Error> {
        let repost = query(
            "MATCH (n:Note {postgres_id: $note_id})
             MERGE (s:Source {postgres_id: $source_id})
             MERGE (n)-[r:REPOSTS_FROM]->(s)
             ON CREATE SET r.created_at = $now",
        )
        .param("note_id", note.id)
        .param("source_id", original_source)
        .param("now", format_datetime(&Utc::now()));
        self.client.graph.run(repost).await?;

        let reference = query(
            "MATCH (n:Note {postgres_id: $note_id})
             MATCH (:Source {postgres_id: $source_id})-[:PUBLISHED]->(old:Note)
             WHERE old.postgres_id < $note_id
             WITH n, old ORDER BY old.postgres_id DESC LIMIT 1
             MERGE (n)-[:REFERENCES]->(old)",
        )
        .param("note_id", note.id)
        .param("source_id", original_source);
        self.client.graph.run(reference).await?;
        Ok(())
    }
}

#[async_trait]
impl GraphSink for GraphWriter {
    async fn publish(&self, note: &Note, source: &Source) -> fakecheck_common::Result<()> {
        let graph_err = |e: neo4rs::Error| FakeCheckError::Graph(e.to_string());

        self.upsert_source(source).await.map_err(graph_err)?;
        self.upsert_note(note).await.map_err(graph_err)?;
        if let Some(original) = note.reposted_from_source_id {
            self.link_repost(note, original).await.map_err(graph_err)?;
        }
        debug!(note_id = note.id, source_id = source.id, "Note published to graph");
        Ok(())
    }
}

fn upsert_note_cypher() -> String {
    let mut sets = vec![
        "n.hash = $hash".to_string(),
        "n.title = $title".to_string(),
        "n.total_score = $total_score".to_string(),
        "n.is_propaganda = $is_propaganda".to_string(),
        "n.amount_of_propaganda_scores = $amount_of_propaganda_scores".to_string(),
        "n.uniqueness = $uniqueness".to_string(),
        "n.fehner_type = $fehner_type".to_string(),
    ];
    for d in Dimension::ALL {
        let k = d.key();
        sets.push(format!("n.{k} = ${k}"));
        sets.push(format!("n.{k}_raw = ${k}_raw"));
        sets.push(format!("n.{k}_coeff = ${k}_coeff"));
    }
    format!(
        "MERGE (n:Note {{postgres_id: $id}})
         ON CREATE SET n.created_at = $created_at
         SET {}
         WITH n
         MATCH (s:Source {{postgres_id: $source_id}})
         MERGE (s)-[:PUBLISHED]->(n)",
        sets.join(",\n             ")
    )
}

pub(crate) fn format_datetime(dt: &DateTime<Utc>) -> String {
    dt.format("%Y-%m-%dT%H:%M:%S%.6f").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn note_cypher_sets_every_dimension() {
        let cypher = upsert_note_cypher();
        for d in Dimension::ALL {
            assert!(cypher.contains(&format!("n.{0}_raw = ${0}_raw", d.key())));
            assert!(cypher.contains(&format!("n.{0}_coeff = ${0}_coeff", d.key())));
        }
        assert!(cypher.contains("MERGE (s)-[:PUBLISHED]->(n)"));
    }

    #[test]
    fn datetimes_have_microsecond_precision() {
        let dt = DateTime::parse_from_rfc3339("2025-03-01T10:20:30.123456Z")
            .unwrap()
            .with_timezone(&Utc);
        assert_eq!(format_datetime(&dt), "2025-03-01T10:20:30.123456");
    }
}
