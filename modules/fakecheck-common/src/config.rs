use std::env;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::info;

use crate::error::{FakeCheckError, Result};

/// Application configuration loaded from environment variables.
/// Contains only connection strings and secrets; tuning lives in the TOML `FileConfig`.
#[derive(Debug, Clone)]
pub struct Config {
    // Postgres
    pub database_url: String,

    // Neo4j (optional: graph materialization and analytics are skipped without it)
    pub neo4j_uri: Option<String>,
    pub neo4j_user: String,
    pub neo4j_password: String,

    // Remote evaluator service
    pub evaluator_url: Option<String>,

    // Tuning
    pub file_config_path: Option<PathBuf>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        Ok(Self {
            database_url: required_env("DATABASE_URL")?,
            neo4j_uri: env::var("NEO4J_URI").ok().filter(|s| !s.is_empty()),
            neo4j_user: env::var("NEO4J_USER").unwrap_or_else(|_| "neo4j".to_string()),
            neo4j_password: env::var("NEO4J_PASSWORD").unwrap_or_default(),
            evaluator_url: env::var("EVALUATOR_URL").ok().filter(|s| !s.is_empty()),
            file_config_path: env::var("FAKECHECK_CONFIG").ok().map(PathBuf::from),
        })
    }

    /// Load the TOML tuning file if one is configured, otherwise defaults.
    pub fn file_config(&self) -> Result<FileConfig> {
        match &self.file_config_path {
            Some(path) => FileConfig::load(path),
            None => Ok(FileConfig::default()),
        }
    }

    /// Log which settings are present without printing secret values.
    pub fn log_redacted(&self) {
        info!(
            database_url = %redact_url(&self.database_url),
            neo4j = self.neo4j_uri.as_deref().unwrap_or("disabled"),
            neo4j_password_set = !self.neo4j_password.is_empty(),
            evaluator_url = self.evaluator_url.as_deref().unwrap_or("unset"),
            file_config = ?self.file_config_path,
            "Configuration loaded"
        );
    }
}

fn required_env(key: &str) -> Result<String> {
    env::var(key).map_err(|_| FakeCheckError::Config(format!("{key} environment variable is required")))
}

/// Strip the userinfo part of a connection URL.
fn redact_url(url: &str) -> String {
    match (url.find("://"), url.rfind('@')) {
        (Some(scheme_end), Some(at)) if at > scheme_end => {
            format!("{}://***{}", &url[..scheme_end], &url[at..])
        }
        _ => url.to_string(),
    }
}

/// TOML-backed tuning loaded from disk. Every section and field has a default.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct FileConfig {
    pub scoring: ScoringConfig,
    pub cache: CacheConfig,
    pub graph: GraphConfig,
}

impl FileConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            FakeCheckError::Config(format!("Failed to read config file {}: {e}", path.display()))
        })?;
        Self::parse(&content).map_err(|e| match e {
            FakeCheckError::Config(msg) => {
                FakeCheckError::Config(format!("{}: {msg}", path.display()))
            }
            other => other,
        })
    }

    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| FakeCheckError::Config(format!("invalid config: {e}")))
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct ScoringConfig {
    /// Totals strictly above this are flagged as propaganda and rescaled.
    pub propaganda_threshold: f64,
    /// Cap the rescaled total at 1.0.
    pub clamp_rescaled: bool,
    /// TOML table of literal total-score overrides.
    pub overrides_path: Option<PathBuf>,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            propaganda_threshold: 0.3,
            clamp_rescaled: false,
            overrides_path: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct CacheConfig {
    pub embedding_max_entries: usize,
    pub embedding_ttl_secs: Option<u64>,
    pub similarity_max_entries: usize,
    pub similarity_ttl_secs: Option<u64>,
    pub per_call_max_entries: usize,
    pub per_call_ttl_secs: Option<u64>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            embedding_max_entries: 500,
            embedding_ttl_secs: Some(3600),
            similarity_max_entries: 1000,
            similarity_ttl_secs: Some(600),
            per_call_max_entries: 2000,
            per_call_ttl_secs: Some(300),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct GraphConfig {
    pub cascade_max_depth: usize,
    pub pagerank_damping: f64,
    /// Upper bound on connecting to Neo4j and running its migrations at startup.
    pub connect_timeout_secs: u64,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            cascade_max_depth: 5,
            pagerank_damping: 0.85,
            connect_timeout_secs: 10,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_uses_defaults() {
        let config = FileConfig::parse("").unwrap();
        assert_eq!(config.scoring.propaganda_threshold, 0.3);
        assert!(!config.scoring.clamp_rescaled);
        assert_eq!(config.cache.embedding_max_entries, 500);
        assert_eq!(config.cache.similarity_ttl_secs, Some(600));
        assert_eq!(config.graph.cascade_max_depth, 5);
    }

    #[test]
    fn partial_sections_merge_with_defaults() {
        let config = FileConfig::parse(
            r#"
            [scoring]
            clamp_rescaled = true

            [cache]
            per_call_max_entries = 10
            "#,
        )
        .unwrap();
        assert!(config.scoring.clamp_rescaled);
        assert_eq!(config.scoring.propaganda_threshold, 0.3);
        assert_eq!(config.cache.per_call_max_entries, 10);
        assert_eq!(config.cache.per_call_ttl_secs, Some(300));
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let err = FileConfig::parse("[scoring]\nthreshold = 0.4\n").unwrap_err();
        assert!(matches!(err, FakeCheckError::Config(_)));
    }

    #[test]
    fn load_reads_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fakecheck.toml");
        std::fs::write(&path, "[graph]\ncascade_max_depth = 3\n").unwrap();
        let config = FileConfig::load(&path).unwrap();
        assert_eq!(config.graph.cascade_max_depth, 3);
    }

    #[test]
    fn redact_url_hides_credentials() {
        assert_eq!(
            redact_url("postgres://user:pw@localhost:5432/db"),
            "postgres://***@localhost:5432/db"
        );
        assert_eq!(redact_url("postgres://localhost/db"), "postgres://localhost/db");
    }
}
