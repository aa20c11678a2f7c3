pub mod analytics;
pub mod cascade;
pub mod client;
pub mod community;
pub mod corpus_graph;
pub mod influence;
pub mod migrate;
pub mod reader;
pub mod snapshot;
pub mod stats;
pub mod writer;

#[cfg(feature = "test-utils")]
pub mod testutil;

pub use analytics::{AnalyticsReport, GraphAnalytics};
pub use cascade::{Cascade, CascadeHop};
pub use client::GraphClient;
pub use corpus_graph::{CorpusGraph, RepostNetwork};
pub use influence::InfluenceScores;
pub use reader::{CorpusGraphStore, GraphReader, GraphStore};
pub use snapshot::{GraphSnapshot, SnapshotEdge, SnapshotNote, SnapshotSource};
pub use stats::SourceStatistics;
pub use writer::GraphWriter;
