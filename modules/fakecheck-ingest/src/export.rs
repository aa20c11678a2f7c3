//! CSV export of scored notes, one row per note with every dimension's
//! weighted score.

use std::collections::HashMap;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use tracing::info;

use fakecheck_common::{Dimension, Note, Source};
use fakecheck_core::CorpusStore;

const FIXED_COLUMNS: [&str; 10] = [
    "note_id",
    "source_id",
    "source_name",
    "title",
    "total_score",
    "is_propaganda",
    "amount_of_propaganda_scores",
    "fehner_type",
    "reposted_from_source_id",
    "created_at",
];

/// `propaganda_results_YYYYMMDD_HHMMSS.csv`
pub fn default_export_path(now: DateTime<Local>) -> PathBuf {
    PathBuf::from(format!("propaganda_results_{}.csv", now.format("%Y%m%d_%H%M%S")))
}

pub fn header() -> Vec<&'static str> {
    FIXED_COLUMNS
        .iter()
        .copied()
        .chain(Dimension::ALL.iter().map(|d| d.key()))
        .collect()
}

/// Write `notes` in id order. Returns the number of data rows.
pub fn write_notes_csv<W: Write>(writer: W, notes: &[Note], sources: &[Source]) -> Result<usize> {
    let names: HashMap<_, _> = sources.iter().map(|s| (s.id, s.name.as_str())).collect();
    let mut ordered: Vec<&Note> = notes.iter().collect();
    ordered.sort_by_key(|n| n.id);

    let mut wtr = csv::Writer::from_writer(writer);
    wtr.write_record(header())?;
    for note in &ordered {
        let mut record = vec![
            note.id.to_string(),
            note.source_id.to_string(),
            names.get(&note.source_id).copied().unwrap_or_default().to_string(),
            note.title.clone().unwrap_or_default(),
            note.total_score.to_string(),
            note.is_propaganda.to_string(),
            note.amount_of_propaganda_scores.to_string(),
            note.fehner_type().map(|t| t.as_str()).unwrap_or_default().to_string(),
            note.reposted_from_source_id.map(|id| id.to_string()).unwrap_or_default(),
            note.created_at.to_rfc3339(),
        ];
        record.extend(note.scores.values().map(|s| s.weighted.to_string()));
        wtr.write_record(&record)?;
    }
    wtr.flush()?;
    Ok(ordered.len())
}

/// Export the whole corpus to `path`.
pub async fn export_corpus(store: &dyn CorpusStore, path: &Path) -> Result<usize> {
    let (notes, sources) = tokio::try_join!(store.all_notes(), store.sources())?;
    let file = std::fs::File::create(path)
        .with_context(|| format!("Failed to create {}", path.display()))?;
    let rows = write_notes_csv(file, &notes, &sources)?;
    info!(path = %path.display(), rows, "CSV exported");
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use fakecheck_core::testing::{store_with_sources, uniform_set, FixedEvaluator};
    use fakecheck_core::{EvaluatorCaches, Ingestor, ScoreAggregator, ScoreOverrides, Submission};
    use fakecheck_common::ScoringConfig;
    use std::sync::Arc;

    use super::*;

    #[test]
    fn default_path_carries_timestamp() {
        let now = Local.with_ymd_and_hms(2024, 3, 9, 14, 5, 7).unwrap();
        assert_eq!(
            default_export_path(now),
            PathBuf::from("propaganda_results_20240309_140507.csv")
        );
    }

    #[test]
    fn header_lists_every_dimension() {
        let header = header();
        assert_eq!(header.len(), FIXED_COLUMNS.len() + Dimension::COUNT);
        assert_eq!(header[0], "note_id");
        assert_eq!(header[FIXED_COLUMNS.len()], Dimension::ALL[0].key());
    }

    #[tokio::test]
    async fn exports_one_row_per_note_in_id_order() {
        let store = store_with_sources(2).await;
        let ingestor = Ingestor::new(
            store.clone(),
            uniform_set(Arc::new(FixedEvaluator(0.2))),
            ScoreAggregator::new(&ScoringConfig::default(), ScoreOverrides::empty()),
            Arc::new(EvaluatorCaches::default()),
        );
        ingestor
            .ingest(Submission::new("First, with a comma.", 1).with_title("One"))
            .await
            .unwrap();
        ingestor
            .ingest(Submission::new("Second one.", 2).reposted_from(1))
            .await
            .unwrap();

        let notes = store.all_notes().await.unwrap();
        let sources = store.sources().await.unwrap();
        let mut buf = Vec::new();
        let rows = write_notes_csv(&mut buf, &notes, &sources).unwrap();
        assert_eq!(rows, 2);

        let mut rdr = csv::Reader::from_reader(buf.as_slice());
        let records: Vec<csv::StringRecord> = rdr.records().map(|r| r.unwrap()).collect();
        assert_eq!(records.len(), 2);
        assert_eq!(&records[0][0], "1");
        assert_eq!(&records[0][2], "source-1");
        assert_eq!(&records[0][3], "One");
        assert_eq!(&records[1][8], "1");
        assert_eq!(records[1].len(), FIXED_COLUMNS.len() + Dimension::COUNT);
    }

    #[tokio::test]
    async fn export_corpus_writes_file() {
        let store = store_with_sources(1).await;
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.csv");
        let rows = export_corpus(store.as_ref(), &path).await.unwrap();
        assert_eq!(rows, 0);
        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.starts_with("note_id,source_id,"));
    }
}
