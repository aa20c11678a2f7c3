//! Information cascades: chains of notes linked by REFERENCES.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::Serialize;

use fakecheck_common::{NoteId, SourceId};

use crate::corpus_graph::CorpusGraph;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CascadeHop {
    /// 0 for the note the chain starts from.
    pub depth: usize,
    pub note_id: NoteId,
    pub source_id: SourceId,
    pub source_name: String,
    pub title: Option<String>,
    pub total_score: f64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Cascade {
    pub hops: Vec<CascadeHop>,
}

impl Cascade {
    pub fn origin(&self) -> Option<NoteId> {
        self.hops.first().map(|h| h.note_id)
    }

    /// Number of REFERENCES edges followed.
    pub fn len(&self) -> usize {
        self.hops.len().saturating_sub(1)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Follow REFERENCES from every note that has one, up to `max_depth` hops.
///
/// When a note references several others the most recent one is followed.
/// A chain stops at the first note it has already visited. Result is sorted by
/// chain length, longest first, then by starting note id.
pub fn trace_cascades(graph: &CorpusGraph, max_depth: usize) -> Vec<Cascade> {
    let mut cascades = Vec::new();

    for note in graph.notes() {
        if graph.references_from(note.id).is_empty() {
            continue;
        }

        let mut hops = Vec::new();
        let mut visited = HashSet::from([note.id]);
        if let Some(hop) = hop(graph, note.id, 0) {
            hops.push(hop);
        }

        let mut current = note.id;
        for depth in 1..=max_depth {
            let Some(&next) = graph.references_from(current).last() else {
                break;
            };
            if !visited.insert(next) {
                break;
            }
            let Some(h) = hop(graph, next, depth) else {
                break;
            };
            hops.push(h);
            current = next;
        }

        cascades.push(Cascade { hops });
    }

    cascades.sort_by(|a, b| b.len().cmp(&a.len()).then(a.origin().cmp(&b.origin())));
    cascades
}

fn hop(graph: &CorpusGraph, note_id: NoteId, depth: usize) -> Option<CascadeHop> {
    let note = graph.note(note_id)?;
    let source_id = graph.publisher(note_id).unwrap_or(note.source_id);
    let source_name = graph
        .source(source_id)
        .map(|s| s.name.clone())
        .unwrap_or_default();
    Some(CascadeHop {
        depth,
        note_id,
        source_id,
        source_name,
        title: note.title.clone(),
        total_score: note.total_score,
        created_at: note.created_at,
    })
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::snapshot::{GraphSnapshot, SnapshotEdge, SnapshotNote, SnapshotSource};

    fn snapshot(notes: &[(NoteId, SourceId)], refs: &[(NoteId, NoteId)]) -> GraphSnapshot {
        let mut sources: Vec<SourceId> = notes.iter().map(|n| n.1).collect();
        sources.sort_unstable();
        sources.dedup();
        GraphSnapshot {
            sources: sources
                .into_iter()
                .map(|id| SnapshotSource {
                    id,
                    name: format!("src{id}"),
                    platform: "web".into(),
                })
                .collect(),
            notes: notes
                .iter()
                .map(|&(id, source_id)| SnapshotNote {
                    id,
                    source_id,
                    title: Some(format!("note {id}")),
                    total_score: id as f64 / 10.0,
                    fehner_type: None,
                    created_at: Utc::now(),
                })
                .collect(),
            edges: refs
                .iter()
                .map(|&(from, to)| SnapshotEdge::References { from, to })
                .collect(),
        }
    }

    #[test]
    fn chains_are_sorted_longest_first() {
        // 4 -> 3 -> 2 -> 1, and 6 -> 5
        let snap = snapshot(
            &[(1, 1), (2, 2), (3, 3), (4, 4), (5, 1), (6, 2)],
            &[(2, 1), (3, 2), (4, 3), (6, 5)],
        );
        let graph = CorpusGraph::from_snapshot(&snap);
        let cascades = trace_cascades(&graph, 5);

        assert_eq!(cascades.len(), 4);
        assert_eq!(cascades[0].origin(), Some(4));
        assert_eq!(cascades[0].len(), 3);
        let ids: Vec<NoteId> = cascades[0].hops.iter().map(|h| h.note_id).collect();
        assert_eq!(ids, vec![4, 3, 2, 1]);
        assert_eq!(cascades[0].hops[1].source_name, "src3");
        assert_eq!(cascades[0].hops[3].depth, 3);
        assert!(cascades.windows(2).all(|w| w[0].len() >= w[1].len()));
    }

    #[test]
    fn depth_is_bounded() {
        let snap = snapshot(&[(1, 1), (2, 1), (3, 1), (4, 1)], &[(2, 1), (3, 2), (4, 3)]);
        let graph = CorpusGraph::from_snapshot(&snap);
        let cascades = trace_cascades(&graph, 2);
        assert!(cascades.iter().all(|c| c.len() <= 2));
        assert_eq!(cascades[0].len(), 2);
    }

    #[test]
    fn cycles_terminate() {
        let snap = snapshot(&[(1, 1), (2, 2), (3, 3)], &[(1, 2), (2, 3), (3, 1)]);
        let graph = CorpusGraph::from_snapshot(&snap);
        let cascades = trace_cascades(&graph, 10);

        assert_eq!(cascades.len(), 3);
        for c in &cascades {
            assert_eq!(c.len(), 2);
        }
    }

    #[test]
    fn notes_without_references_start_no_chain() {
        let snap = snapshot(&[(1, 1), (2, 2)], &[]);
        let graph = CorpusGraph::from_snapshot(&snap);
        assert!(trace_cascades(&graph, 5).is_empty());
    }
}
