use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Result};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use fakecheck_common::{Config, NewSource};
use fakecheck_core::{corpus_fehner_score, source_ratings, CorpusStore, EvaluatorCaches, ScoreOverrides};
use fakecheck_graph::GraphAnalytics;
use fakecheck_ingest::{
    build_ingestor, connect_graph, default_export_path, export_corpus, graph_store,
    http_evaluator_set, run_cold_start,
};
use fakecheck_store::PgCorpusStore;

#[derive(Parser)]
#[command(name = "fakecheck-ingest", about = "Score and analyze a propaganda corpus")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Register or update a source by its external id
    AddSource {
        external_id: String,
        name: String,
        platform: String,
        #[arg(long)]
        hidden: bool,
    },
    /// Ingest every *.json document in a directory
    Coldstart { dir: PathBuf },
    /// Share of documents classified as Fehner type A
    Fehner,
    /// Mean total score per visible source
    Ratings,
    /// Communities, influence, cascades and source statistics as JSON
    Analytics {
        #[arg(long, default_value_t = 10)]
        limit: usize,
    },
    /// Write every note and its dimension scores to a CSV file
    Export {
        /// Defaults to propaganda_results_<timestamp>.csv
        #[arg(long)]
        out: Option<PathBuf>,
    },
}

fn init_tracing() -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info"))
        .add_directive("fakecheck=info".parse()?);
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    if std::env::var("LOG_FORMAT").as_deref() == Ok("json") {
        builder.json().init();
    } else {
        builder.init();
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing()?;
    let cli = Cli::parse();

    let config = Config::from_env()?;
    config.log_redacted();
    let file_config = config.file_config()?;

    let store = Arc::new(PgCorpusStore::connect(&config.database_url).await?);
    store.migrate().await?;

    let graph_client = connect_graph(
        &config,
        Duration::from_secs(file_config.graph.connect_timeout_secs),
    )
    .await;

    match cli.command {
        Command::AddSource {
            external_id,
            name,
            platform,
            hidden,
        } => {
            let mut source = NewSource::new(external_id, name, platform);
            if hidden {
                source = source.hidden();
            }
            let source = store.upsert_source(source).await?;
            info!(source_id = source.id, name = source.name.as_str(), "Source saved");
            println!("{}", serde_json::to_string_pretty(&source)?);
        }
        Command::Coldstart { dir } => {
            let evaluator_url = config
                .evaluator_url
                .as_deref()
                .ok_or_else(|| anyhow!("EVALUATOR_URL is required for ingestion"))?;
            let overrides = match &file_config.scoring.overrides_path {
                Some(path) => ScoreOverrides::load(path)?,
                None => ScoreOverrides::empty(),
            };
            info!(overrides = overrides.len(), "Score overrides loaded");

            let caches = Arc::new(EvaluatorCaches::new(&file_config.cache));
            let ingestor = build_ingestor(
                store.clone(),
                http_evaluator_set(evaluator_url)?,
                &file_config,
                overrides,
                caches.clone(),
                graph_client.as_ref(),
            );

            let summary = run_cold_start(&ingestor, &dir).await?;
            let stats = ingestor.stats();
            info!(
                documents = stats.documents,
                words = stats.words,
                avg_ms = stats.average_elapsed().as_millis() as u64,
                "Processing stats"
            );
            println!(
                "{}",
                serde_json::to_string_pretty(&serde_json::json!({
                    "summary": summary,
                    "stats": stats,
                    "caches": caches.stats(),
                }))?
            );
        }
        Command::Fehner => {
            let score = corpus_fehner_score(store.as_ref()).await?;
            println!("{score:.4}");
        }
        Command::Ratings => {
            for r in source_ratings(store.as_ref()).await? {
                println!("{:>8.4}  {:>5}  {}", r.rating, r.notes, r.source.name);
            }
        }
        Command::Analytics { limit } => {
            let analytics = GraphAnalytics::new(
                graph_store(graph_client, store.clone()),
                file_config.graph.clone(),
            );
            match analytics.report(limit).await {
                Some(report) => println!("{}", serde_json::to_string_pretty(&report)?),
                None => info!("No graph data to analyze"),
            }
        }
        Command::Export { out } => {
            let path = out.unwrap_or_else(|| default_export_path(chrono::Local::now()));
            let rows = export_corpus(store.as_ref(), &path).await?;
            println!("Exported {rows} notes to {}", path.display());
        }
    }

    Ok(())
}
