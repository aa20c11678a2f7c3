use neo4rs::query;
use tracing::{info, warn};

use crate::GraphClient;

/// Idempotent schema setup: one node per postgres row, plus a hash index for
/// repost lookups.
pub async fn migrate(client: &GraphClient) -> Result<(), neo4rs::Error> {
    let g = &client.graph;

    info!("Running graph schema migrations...");

    let constraints = [
        "CREATE CONSTRAINT source_postgres_id IF NOT EXISTS FOR (s:Source) REQUIRE s.postgres_id IS UNIQUE",
        "CREATE CONSTRAINT note_postgres_id IF NOT EXISTS FOR (n:Note) REQUIRE n.postgres_id IS UNIQUE",
    ];
    for c in &constraints {
        run_ignoring_exists(g, c).await?;
    }

    run_ignoring_exists(g, "CREATE INDEX note_hash IF NOT EXISTS FOR (n:Note) ON (n.hash)").await?;

    info!("Graph schema ready");
    Ok(())
}

async fn run_ignoring_exists(g: &neo4rs::Graph, cypher: &str) -> Result<(), neo4rs::Error> {
    match g.run(query(cypher)).await {
        Ok(_) => Ok(()),
        Err(e) => {
            let msg = e.to_string().to_lowercase();
            if msg.contains("already exists") || msg.contains("equivalent") {
                warn!("Already exists (skipped): {}", cypher.chars().take(80).collect::<String>());
                Ok(())
            } else {
                Err(e)
            }
        }
    }
}
