use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;
use tracing::{info, warn};

use fakecheck_common::{GraphConfig, SourceId};

use crate::cascade::{trace_cascades, Cascade};
use crate::community::louvain;
use crate::corpus_graph::CorpusGraph;
use crate::influence::InfluenceScores;
use crate::reader::GraphStore;
use crate::stats::{most_influential_sources, source_statistics, SourceStatistics};

const LOUVAIN_RESOLUTION: f64 = 1.0;

/// Everything the analytics compute, from one snapshot.
#[derive(Debug, Clone, Serialize)]
pub struct AnalyticsReport {
    pub communities: Option<HashMap<SourceId, usize>>,
    pub influence: Option<InfluenceScores>,
    pub cascades: Vec<Cascade>,
    pub source_statistics: Vec<SourceStatistics>,
    pub most_influential: Vec<SourceStatistics>,
}

/// Read-only analytics over the corpus graph. Every call reads a fresh
/// snapshot; an empty or unreachable store yields `None`.
pub struct GraphAnalytics {
    store: Arc<dyn GraphStore>,
    config: GraphConfig,
}

impl GraphAnalytics {
    pub fn new(store: Arc<dyn GraphStore>, config: GraphConfig) -> Self {
        Self { store, config }
    }

    pub fn config(&self) -> &GraphConfig {
        &self.config
    }

    async fn load(&self) -> Option<CorpusGraph> {
        let snapshot = match self.store.snapshot().await {
            Ok(s) => s,
            Err(e) => {
                warn!(error = %e, "Graph store unavailable, skipping analytics");
                return None;
            }
        };
        if snapshot.is_empty() {
            info!("Graph is empty, nothing to analyze");
            return None;
        }
        Some(CorpusGraph::from_snapshot(&snapshot))
    }

    /// Source id to dense community index.
    pub async fn communities(&self) -> Option<HashMap<SourceId, usize>> {
        let graph = self.load().await?;
        louvain(&graph.repost_network(), LOUVAIN_RESOLUTION)
    }

    pub async fn influence(&self) -> Option<InfluenceScores> {
        let graph = self.load().await?;
        InfluenceScores::compute(&graph.repost_network(), self.config.pagerank_damping)
    }

    pub async fn cascades(&self, max_depth: usize) -> Option<Vec<Cascade>> {
        let graph = self.load().await?;
        Some(trace_cascades(&graph, max_depth))
    }

    pub async fn source_statistics(&self) -> Option<Vec<SourceStatistics>> {
        let graph = self.load().await?;
        Some(source_statistics(&graph))
    }

    pub async fn most_influential_sources(&self, limit: usize) -> Option<Vec<SourceStatistics>> {
        let graph = self.load().await?;
        Some(most_influential_sources(&graph, limit))
    }

    /// All analyses over a single snapshot.
    pub async fn report(&self, influential_limit: usize) -> Option<AnalyticsReport> {
        let graph = self.load().await?;
        let network = graph.repost_network();

        let report = AnalyticsReport {
            communities: louvain(&network, LOUVAIN_RESOLUTION),
            influence: InfluenceScores::compute(&network, self.config.pagerank_damping),
            cascades: trace_cascades(&graph, self.config.cascade_max_depth),
            source_statistics: source_statistics(&graph),
            most_influential: most_influential_sources(&graph, influential_limit),
        };
        info!(
            sources = graph.source_count(),
            notes = graph.note_count(),
            cascades = report.cascades.len(),
            "Graph analytics computed"
        );
        Some(report)
    }
}
