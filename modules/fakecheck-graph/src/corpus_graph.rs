//! In-memory corpus graph built from a snapshot.

use std::collections::{BTreeMap, HashMap};

use petgraph::graph::DiGraph;
use petgraph::stable_graph::{NodeIndex, StableDiGraph};
use petgraph::visit::EdgeRef;
use petgraph::Direction;
use tracing::debug;

use fakecheck_common::{NoteId, SourceId};

use crate::snapshot::{GraphSnapshot, SnapshotEdge, SnapshotNote, SnapshotSource};

#[derive(Debug, Clone)]
pub enum GraphNode {
    Source(SnapshotSource),
    Note(SnapshotNote),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GraphEdge {
    Published,
    RepostsFrom,
    References,
}

pub struct CorpusGraph {
    pub graph: StableDiGraph<GraphNode, GraphEdge>,
    sources: HashMap<SourceId, NodeIndex>,
    notes: HashMap<NoteId, NodeIndex>,
}

impl CorpusGraph {
    /// Edges whose endpoints are missing from the snapshot are dropped.
    pub fn from_snapshot(snapshot: &GraphSnapshot) -> Self {
        let mut graph = StableDiGraph::new();
        let mut sources = HashMap::with_capacity(snapshot.sources.len());
        let mut notes = HashMap::with_capacity(snapshot.notes.len());

        for s in &snapshot.sources {
            let idx = graph.add_node(GraphNode::Source(s.clone()));
            sources.insert(s.id, idx);
        }
        for n in &snapshot.notes {
            let idx = graph.add_node(GraphNode::Note(n.clone()));
            notes.insert(n.id, idx);
        }

        let mut dropped = 0usize;
        for edge in &snapshot.edges {
            let endpoints = match *edge {
                SnapshotEdge::Published { source, note } => sources
                    .get(&source)
                    .zip(notes.get(&note))
                    .map(|(a, b)| (*a, *b, GraphEdge::Published)),
                SnapshotEdge::RepostsFrom { note, source } => notes
                    .get(&note)
                    .zip(sources.get(&source))
                    .map(|(a, b)| (*a, *b, GraphEdge::RepostsFrom)),
                SnapshotEdge::References { from, to } => notes
                    .get(&from)
                    .zip(notes.get(&to))
                    .map(|(a, b)| (*a, *b, GraphEdge::References)),
            };
            match endpoints {
                Some((a, b, kind)) => {
                    graph.add_edge(a, b, kind);
                }
                None => dropped += 1,
            }
        }
        if dropped > 0 {
            debug!(dropped, "Skipped snapshot edges with unknown endpoints");
        }

        Self {
            graph,
            sources,
            notes,
        }
    }

    pub fn source_count(&self) -> usize {
        self.sources.len()
    }

    pub fn note_count(&self) -> usize {
        self.notes.len()
    }

    pub fn source(&self, id: SourceId) -> Option<&SnapshotSource> {
        match self.graph.node_weight(*self.sources.get(&id)?)? {
            GraphNode::Source(s) => Some(s),
            GraphNode::Note(_) => None,
        }
    }

    pub fn note(&self, id: NoteId) -> Option<&SnapshotNote> {
        match self.graph.node_weight(*self.notes.get(&id)?)? {
            GraphNode::Note(n) => Some(n),
            GraphNode::Source(_) => None,
        }
    }

    /// All sources, ascending by id.
    pub fn sources(&self) -> Vec<&SnapshotSource> {
        let mut out: Vec<&SnapshotSource> = self
            .graph
            .node_weights()
            .filter_map(|n| match n {
                GraphNode::Source(s) => Some(s),
                GraphNode::Note(_) => None,
            })
            .collect();
        out.sort_by_key(|s| s.id);
        out
    }

    /// All notes, ascending by id.
    pub fn notes(&self) -> Vec<&SnapshotNote> {
        let mut out: Vec<&SnapshotNote> = self
            .graph
            .node_weights()
            .filter_map(|n| match n {
                GraphNode::Note(n) => Some(n),
                GraphNode::Source(_) => None,
            })
            .collect();
        out.sort_by_key(|n| n.id);
        out
    }

    /// Notes the given note references, ascending by id.
    pub fn references_from(&self, note: NoteId) -> Vec<NoteId> {
        self.note_neighbors(note, Direction::Outgoing, GraphEdge::References)
    }

    /// Notes that reference the given note, ascending by id.
    pub fn referenced_by(&self, note: NoteId) -> Vec<NoteId> {
        self.note_neighbors(note, Direction::Incoming, GraphEdge::References)
    }

    fn note_neighbors(&self, note: NoteId, dir: Direction, kind: GraphEdge) -> Vec<NoteId> {
        let Some(&idx) = self.notes.get(&note) else {
            return Vec::new();
        };
        let mut out: Vec<NoteId> = self
            .graph
            .edges_directed(idx, dir)
            .filter(|e| *e.weight() == kind)
            .filter_map(|e| {
                let other = if dir == Direction::Outgoing { e.target() } else { e.source() };
                match self.graph.node_weight(other)? {
                    GraphNode::Note(n) => Some(n.id),
                    GraphNode::Source(_) => None,
                }
            })
            .collect();
        out.sort_unstable();
        out.dedup();
        out
    }

    /// Publisher of a note: the PUBLISHED edge if present, else the note's own field.
    pub fn publisher(&self, note: NoteId) -> Option<SourceId> {
        let idx = *self.notes.get(&note)?;
        let via_edge = self
            .graph
            .edges_directed(idx, Direction::Incoming)
            .filter(|e| *e.weight() == GraphEdge::Published)
            .find_map(|e| match self.graph.node_weight(e.source())? {
                GraphNode::Source(s) => Some(s.id),
                GraphNode::Note(_) => None,
            });
        via_edge.or_else(|| self.note(note).map(|n| n.source_id))
    }

    /// Sources a note was reposted from.
    pub fn reposted_from(&self, note: NoteId) -> Vec<SourceId> {
        let Some(&idx) = self.notes.get(&note) else {
            return Vec::new();
        };
        self.graph
            .edges_directed(idx, Direction::Outgoing)
            .filter(|e| *e.weight() == GraphEdge::RepostsFrom)
            .filter_map(|e| match self.graph.node_weight(e.target())? {
                GraphNode::Source(s) => Some(s.id),
                GraphNode::Note(_) => None,
            })
            .collect()
    }

    /// Source-level repost network: `publisher -> original`, weighted by the
    /// number of reposting notes. Self-reposts are left out.
    pub fn repost_network(&self) -> RepostNetwork {
        let mut weights: BTreeMap<(SourceId, SourceId), f64> = BTreeMap::new();
        for note in self.notes() {
            let Some(publisher) = self.publisher(note.id) else {
                continue;
            };
            for original in self.reposted_from(note.id) {
                if original != publisher {
                    *weights.entry((publisher, original)).or_insert(0.0) += 1.0;
                }
            }
        }
        RepostNetwork::from_weights(&weights)
    }
}

/// Directed, weighted source network. Node indices follow ascending source id
/// and only sources with at least one repost edge are present.
#[derive(Debug, Clone, Default)]
pub struct RepostNetwork {
    pub graph: DiGraph<SourceId, f64>,
}

impl RepostNetwork {
    pub fn from_weights(weights: &BTreeMap<(SourceId, SourceId), f64>) -> Self {
        let mut ids: Vec<SourceId> = weights.keys().flat_map(|&(a, b)| [a, b]).collect();
        ids.sort_unstable();
        ids.dedup();

        let mut graph = DiGraph::with_capacity(ids.len(), weights.len());
        let index: HashMap<SourceId, petgraph::graph::NodeIndex> =
            ids.iter().map(|&id| (id, graph.add_node(id))).collect();
        for (&(from, to), &w) in weights {
            graph.add_edge(index[&from], index[&to], w);
        }
        Self { graph }
    }

    pub fn is_empty(&self) -> bool {
        self.graph.edge_count() == 0
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    /// Source ids in node-index order.
    pub fn source_ids(&self) -> Vec<SourceId> {
        self.graph.node_weights().copied().collect()
    }

    /// `(from, to, weight)` by node index.
    pub fn weighted_edges(&self) -> impl Iterator<Item = (usize, usize, f64)> + '_ {
        self.graph
            .edge_references()
            .map(|e| (e.source().index(), e.target().index(), *e.weight()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn source(id: SourceId) -> SnapshotSource {
        SnapshotSource {
            id,
            name: format!("source-{id}"),
            platform: "telegram".into(),
        }
    }

    fn note(id: NoteId, source_id: SourceId) -> SnapshotNote {
        SnapshotNote {
            id,
            source_id,
            title: None,
            total_score: 0.5,
            fehner_type: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn repost_network_counts_reposting_notes() {
        let snapshot = GraphSnapshot {
            sources: vec![source(1), source(2), source(3)],
            notes: vec![note(10, 1), note(11, 2), note(12, 2), note(13, 3)],
            edges: vec![
                SnapshotEdge::Published { source: 1, note: 10 },
                SnapshotEdge::Published { source: 2, note: 11 },
                SnapshotEdge::Published { source: 2, note: 12 },
                SnapshotEdge::Published { source: 3, note: 13 },
                SnapshotEdge::RepostsFrom { note: 11, source: 1 },
                SnapshotEdge::RepostsFrom { note: 12, source: 1 },
                SnapshotEdge::RepostsFrom { note: 13, source: 3 },
            ],
        };
        let network = CorpusGraph::from_snapshot(&snapshot).repost_network();

        assert_eq!(network.source_ids(), vec![1, 2]);
        let edges: Vec<_> = network.weighted_edges().collect();
        assert_eq!(edges, vec![(1, 0, 2.0)]);
    }

    #[test]
    fn dangling_edges_are_dropped() {
        let snapshot = GraphSnapshot {
            sources: vec![source(1)],
            notes: vec![note(10, 1)],
            edges: vec![
                SnapshotEdge::Published { source: 1, note: 10 },
                SnapshotEdge::References { from: 10, to: 99 },
            ],
        };
        let graph = CorpusGraph::from_snapshot(&snapshot);
        assert_eq!(graph.graph.edge_count(), 1);
        assert!(graph.references_from(10).is_empty());
    }

    #[test]
    fn publisher_falls_back_to_note_field() {
        let snapshot = GraphSnapshot {
            sources: vec![source(1)],
            notes: vec![note(10, 1)],
            edges: vec![],
        };
        let graph = CorpusGraph::from_snapshot(&snapshot);
        assert_eq!(graph.publisher(10), Some(1));
        assert_eq!(graph.publisher(11), None);
    }
}
