//! Plain-data view of the materialized corpus graph.
//!
//! A snapshot is read in one go (from Neo4j or derived from a corpus store)
//! and handed to the in-memory analytics; nothing here talks to a database.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use fakecheck_common::{FehnerType, Note, NoteId, Source, SourceId};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotSource {
    pub id: SourceId,
    pub name: String,
    pub platform: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotNote {
    pub id: NoteId,
    pub source_id: SourceId,
    pub title: Option<String>,
    pub total_score: f64,
    pub fehner_type: Option<FehnerType>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SnapshotEdge {
    /// Source published the note.
    Published { source: SourceId, note: NoteId },
    /// Note was reposted from the source.
    RepostsFrom { note: NoteId, source: SourceId },
    /// Reposted note points at the original it was taken from.
    References { from: NoteId, to: NoteId },
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphSnapshot {
    pub sources: Vec<SnapshotSource>,
    pub notes: Vec<SnapshotNote>,
    pub edges: Vec<SnapshotEdge>,
}

impl GraphSnapshot {
    pub fn is_empty(&self) -> bool {
        self.sources.is_empty() && self.notes.is_empty()
    }

    /// Derive the graph the writer would have materialized for this corpus.
    ///
    /// A reposted note references the original source's most recent note
    /// inserted before it, if there is one.
    pub fn from_corpus(sources: &[Source], notes: &[Note]) -> Self {
        let mut ordered: Vec<&Note> = notes.iter().collect();
        ordered.sort_by_key(|n| n.id);

        let mut latest_by_source: HashMap<SourceId, NoteId> = HashMap::new();
        let mut edges = Vec::with_capacity(ordered.len());
        for note in &ordered {
            edges.push(SnapshotEdge::Published {
                source: note.source_id,
                note: note.id,
            });
            if let Some(original) = note.reposted_from_source_id {
                edges.push(SnapshotEdge::RepostsFrom {
                    note: note.id,
                    source: original,
                });
                if let Some(&to) = latest_by_source.get(&original) {
                    edges.push(SnapshotEdge::References { from: note.id, to });
                }
            }
            latest_by_source.insert(note.source_id, note.id);
        }

        Self {
            sources: sources
                .iter()
                .map(|s| SnapshotSource {
                    id: s.id,
                    name: s.name.clone(),
                    platform: s.platform.clone(),
                })
                .collect(),
            notes: ordered
                .iter()
                .map(|n| SnapshotNote {
                    id: n.id,
                    source_id: n.source_id,
                    title: n.title.clone(),
                    total_score: n.total_score,
                    fehner_type: n.fehner_type(),
                    created_at: n.created_at,
                })
                .collect(),
            edges,
        }
    }
}
