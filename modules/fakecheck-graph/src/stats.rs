use std::collections::{HashMap, HashSet};

use serde::Serialize;

use fakecheck_common::{NoteId, SourceId};

use crate::corpus_graph::CorpusGraph;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SourceStatistics {
    pub source_id: SourceId,
    pub name: String,
    pub platform: String,
    pub note_count: usize,
    /// Mean total score of published notes, 0 when there are none.
    pub avg_score: f64,
    /// Distinct notes that reposted from this source.
    pub repost_count: usize,
}

impl SourceStatistics {
    pub fn total_connections(&self) -> usize {
        self.note_count + self.repost_count
    }
}

/// Per-source counts, most prolific first.
pub fn source_statistics(graph: &CorpusGraph) -> Vec<SourceStatistics> {
    let mut published: HashMap<SourceId, (usize, f64)> = HashMap::new();
    let mut reposted: HashMap<SourceId, HashSet<NoteId>> = HashMap::new();

    for note in graph.notes() {
        if let Some(publisher) = graph.publisher(note.id) {
            let entry = published.entry(publisher).or_insert((0, 0.0));
            entry.0 += 1;
            entry.1 += note.total_score;
        }
        for original in graph.reposted_from(note.id) {
            reposted.entry(original).or_default().insert(note.id);
        }
    }

    let mut stats: Vec<SourceStatistics> = graph
        .sources()
        .into_iter()
        .map(|s| {
            let (note_count, score_sum) = published.get(&s.id).copied().unwrap_or((0, 0.0));
            SourceStatistics {
                source_id: s.id,
                name: s.name.clone(),
                platform: s.platform.clone(),
                note_count,
                avg_score: if note_count == 0 {
                    0.0
                } else {
                    score_sum / note_count as f64
                },
                repost_count: reposted.get(&s.id).map_or(0, HashSet::len),
            }
        })
        .collect();

    stats.sort_by(|a, b| b.note_count.cmp(&a.note_count).then(a.source_id.cmp(&b.source_id)));
    stats
}

/// Sources ranked by published plus reposted-from count.
pub fn most_influential_sources(graph: &CorpusGraph, limit: usize) -> Vec<SourceStatistics> {
    let mut stats = source_statistics(graph);
    stats.sort_by(|a, b| {
        b.total_connections()
            .cmp(&a.total_connections())
            .then(a.source_id.cmp(&b.source_id))
    });
    stats.truncate(limit);
    stats
}
