//! Startup wiring. Neo4j is optional: when it is unset or unreachable the
//! pipeline runs without graph publication and analytics read the corpus.

use std::sync::Arc;
use std::time::Duration;

use tracing::warn;

use fakecheck_common::{Config, FileConfig};
use fakecheck_core::{CorpusStore, EvaluatorCaches, EvaluatorSet, Ingestor, ScoreAggregator, ScoreOverrides};
use fakecheck_graph::{
    migrate::migrate, CorpusGraphStore, GraphClient, GraphReader, GraphStore, GraphWriter,
};

/// Connect and migrate within `timeout`. Any failure is logged and yields `None`.
pub async fn connect_graph(config: &Config, timeout: Duration) -> Option<GraphClient> {
    let uri = config.neo4j_uri.as_deref()?;
    let attempt = async {
        let client = GraphClient::connect(uri, &config.neo4j_user, &config.neo4j_password).await?;
        migrate(&client).await?;
        Ok::<_, neo4rs::Error>(client)
    };
    match tokio::time::timeout(timeout, attempt).await {
        Ok(Ok(client)) => Some(client),
        Ok(Err(e)) => {
            warn!(uri, error = %e, "Neo4j unavailable, continuing without graph");
            None
        }
        Err(_) => {
            warn!(uri, timeout_secs = timeout.as_secs(), "Neo4j connect timed out, continuing without graph");
            None
        }
    }
}

pub fn build_ingestor(
    store: Arc<dyn CorpusStore>,
    evaluators: EvaluatorSet,
    file_config: &FileConfig,
    overrides: ScoreOverrides,
    caches: Arc<EvaluatorCaches>,
    graph: Option<&GraphClient>,
) -> Ingestor {
    let ingestor = Ingestor::new(
        store,
        evaluators,
        ScoreAggregator::new(&file_config.scoring, overrides),
        caches,
    );
    match graph {
        Some(client) => ingestor.with_graph(Arc::new(GraphWriter::new(client.clone()))),
        None => ingestor,
    }
}

/// Neo4j when connected, otherwise a snapshot derived from the corpus store.
pub fn graph_store(graph: Option<GraphClient>, store: Arc<dyn CorpusStore>) -> Arc<dyn GraphStore> {
    match graph {
        Some(client) => Arc::new(GraphReader::new(client)),
        None => Arc::new(CorpusGraphStore::new(store)),
    }
}
