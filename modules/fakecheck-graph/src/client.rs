use neo4rs::{ConfigBuilder, Graph};
use tracing::info;

/// Thin wrapper around neo4rs::Graph providing connection setup.
#[derive(Clone)]
pub struct GraphClient {
    pub(crate) graph: Graph,
}

impl GraphClient {
    /// Connect to Neo4j with the given credentials.
    pub async fn connect(uri: &str, user: &str, password: &str) -> Result<Self, neo4rs::Error> {
        let config = ConfigBuilder::default()
            .uri(uri)
            .user(user)
            .password(password)
            .fetch_size(500)
            .max_connections(10)
            .build()?;
        let graph = Graph::connect(config).await?;
        info!(uri, "Connected to Neo4j");
        Ok(Self { graph })
    }

    pub fn inner(&self) -> &Graph {
        &self.graph
    }
}
