//! Bulk ingestion of a directory of JSON documents, used to seed an empty corpus.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use fakecheck_common::SourceId;
use fakecheck_core::{Ingestor, Submission};

/// One cold-start file.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ColdStartDocument {
    #[serde(default)]
    pub title: Option<String>,
    pub content: String,
    pub source_id: SourceId,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub reposted_from_source_id: Option<SourceId>,
}

impl ColdStartDocument {
    pub fn is_english(&self) -> bool {
        match self.language.as_deref() {
            None => true,
            Some(lang) => matches!(lang.to_ascii_lowercase().as_str(), "english" | "en"),
        }
    }

    fn into_submission(self) -> Submission {
        let mut submission = Submission::new(self.content, self.source_id);
        if let Some(title) = self.title {
            submission = submission.with_title(title);
        }
        if let Some(original) = self.reposted_from_source_id {
            submission = submission.reposted_from(original);
        }
        submission
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct ColdStartSummary {
    pub ingested: usize,
    pub duplicates: usize,
    pub failed: usize,
}

/// `*.json` files in `dir`, sorted by file name.
pub fn list_documents(dir: &Path) -> Result<Vec<PathBuf>> {
    let entries = std::fs::read_dir(dir)
        .with_context(|| format!("Failed to read cold-start directory {}", dir.display()))?;

    let mut paths = Vec::new();
    for entry in entries {
        let path = entry?.path();
        if path.is_file() && path.extension().is_some_and(|ext| ext == "json") {
            paths.push(path);
        }
    }
    paths.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    Ok(paths)
}

/// Parse every document in `dir`. Unreadable files are returned as errors in place.
pub fn load_documents(dir: &Path) -> Result<Vec<(PathBuf, Result<ColdStartDocument>)>> {
    Ok(list_documents(dir)?
        .into_iter()
        .map(|path| {
            let doc = read_document(&path);
            (path, doc)
        })
        .collect())
}

fn read_document(path: &Path) -> Result<ColdStartDocument> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("Invalid document {}", path.display()))
}

/// Ingest every document in `dir` in file-name order. Per-file failures are
/// logged and counted, never fatal.
pub async fn run_cold_start(ingestor: &Ingestor, dir: &Path) -> Result<ColdStartSummary> {
    let documents = load_documents(dir)?;
    info!(dir = %dir.display(), files = documents.len(), "Starting cold start");

    let mut summary = ColdStartSummary::default();
    for (path, doc) in documents {
        let file = path.file_name().map(|f| f.to_string_lossy().into_owned()).unwrap_or_default();
        let doc = match doc {
            Ok(doc) => doc,
            Err(e) => {
                warn!(file, error = %e, "Skipping unreadable cold-start file");
                summary.failed += 1;
                continue;
            }
        };
        if !doc.is_english() {
            warn!(
                file,
                language = doc.language.as_deref().unwrap_or_default(),
                "Document is not English, ingesting untranslated"
            );
        }

        match ingestor.ingest(doc.into_submission()).await {
            Ok(outcome) if outcome.is_duplicate() => summary.duplicates += 1,
            Ok(outcome) => {
                info!(file, note_id = outcome.note().id, "Processed cold-start file");
                summary.ingested += 1;
            }
            Err(e) => {
                warn!(file, error = %e, "Failed to ingest cold-start file");
                summary.failed += 1;
            }
        }
    }

    info!(
        ingested = summary.ingested,
        duplicates = summary.duplicates,
        failed = summary.failed,
        "Cold start complete"
    );
    Ok(summary)
}
