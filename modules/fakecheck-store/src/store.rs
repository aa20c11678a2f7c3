// Postgres corpus store. Notes are immutable once inserted; content_hash is
// UNIQUE so concurrent writers of the same content converge on one row.

use async_trait::async_trait;
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{PgPool, Row};
use tracing::{debug, info};

use fakecheck_common::{
    Dimension, DimensionMap, NewNote, NewSource, Note, NoteId, Source, SourceId,
};
use fakecheck_core::{CorpusStore, SaveOutcome};

use crate::error::Result;
use crate::rows::{note_from_row, raw_column, score_columns, SourceRow};

pub struct PgCorpusStore {
    pool: PgPool,
    insert_note_sql: String,
    history_sql: String,
}

impl PgCorpusStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            insert_note_sql: insert_note_sql(),
            history_sql: history_sql(),
        }
    }

    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .connect(database_url)
            .await?;
        info!("Connected to Postgres");
        Ok(Self::new(pool))
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Run the embedded SQL migrations.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }

    async fn fetch_note_by_hash(&self, content_hash: &str) -> Result<Option<Note>> {
        let row = sqlx::query("SELECT * FROM notes WHERE content_hash = $1")
            .bind(content_hash)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(note_from_row).transpose()
    }

    async fn insert_note(&self, note: NewNote) -> Result<SaveOutcome> {
        let mut query = sqlx::query(&self.insert_note_sql)
            .bind(&note.title)
            .bind(&note.content)
            .bind(&note.content_hash);
        for d in Dimension::ALL {
            let s = note.scores[d];
            query = query.bind(s.raw).bind(s.coefficient).bind(s.weighted);
        }
        let totals = note.fehner.totals;
        let inserted = query
            .bind(note.total_score)
            .bind(note.is_propaganda)
            .bind(note.amount_of_propaganda_scores)
            .bind(note.fehner.uniqueness)
            .bind(totals.uniqueness_sum)
            .bind(totals.uniqueness_count)
            .bind(totals.score_sum)
            .bind(totals.score_count)
            .bind(note.fehner.fehner_type.map(|t| t.as_str()))
            .bind(note.source_id)
            .bind(note.reposted_from_source_id)
            .fetch_optional(&self.pool)
            .await?;

        if let Some(row) = inserted {
            return Ok(SaveOutcome::Inserted(note_from_row(&row)?));
        }

        debug!(hash = %note.content_hash, "Insert conflicted on content_hash");
        let existing = self.fetch_note_by_hash(&note.content_hash).await?.ok_or_else(|| {
            sqlx::Error::RowNotFound
        })?;
        Ok(SaveOutcome::Existing(existing))
    }

    /// All 13 raw series read in one REPEATABLE READ transaction.
    async fn read_history(&self) -> Result<DimensionMap<Vec<f64>>> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("SET TRANSACTION ISOLATION LEVEL REPEATABLE READ, READ ONLY")
            .execute(&mut *tx)
            .await?;
        let rows = sqlx::query(&self.history_sql).fetch_all(&mut *tx).await?;
        tx.commit().await?;

        let mut history: DimensionMap<Vec<f64>> =
            DimensionMap::from_fn(|_| Vec::with_capacity(rows.len()));
        for row in &rows {
            for d in Dimension::ALL {
                history[d].push(row.try_get::<f64, _>(raw_column(d).as_str())?);
            }
        }
        Ok(history)
    }
}

fn notes_from_rows(rows: &[PgRow]) -> Result<Vec<Note>> {
    rows.iter().map(note_from_row).collect()
}

fn insert_note_sql() -> String {
    let mut columns = vec![
        "title".to_string(),
        "content".to_string(),
        "content_hash".to_string(),
    ];
    columns.extend(score_columns());
    columns.extend(
        [
            "total_score",
            "is_propaganda",
            "amount_of_propaganda_scores",
            "uniqueness",
            "uniqueness_sum",
            "uniqueness_count",
            "score_sum",
            "score_count",
            "fehner_type",
            "source_id",
            "reposted_from_source_id",
        ]
        .map(String::from),
    );
    let placeholders: Vec<String> = (1..=columns.len()).map(|i| format!("${i}")).collect();
    format!(
        "INSERT INTO notes ({}) VALUES ({}) ON CONFLICT (content_hash) DO NOTHING RETURNING *",
        columns.join(", "),
        placeholders.join(", ")
    )
}

fn history_sql() -> String {
    let columns: Vec<String> = Dimension::ALL.iter().map(|d| raw_column(*d)).collect();
    format!("SELECT {} FROM notes ORDER BY id", columns.join(", "))
}

#[async_trait]
impl CorpusStore for PgCorpusStore {
    async fn note_by_hash(&self, content_hash: &str) -> fakecheck_common::Result<Option<Note>> {
        Ok(self.fetch_note_by_hash(content_hash).await?)
    }

    async fn note(&self, id: NoteId) -> fakecheck_common::Result<Option<Note>> {
        let row = sqlx::query("SELECT * FROM notes WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(crate::StoreError::from)?;
        Ok(row.as_ref().map(note_from_row).transpose()?)
    }

    async fn notes_by_source(&self, source_id: SourceId) -> fakecheck_common::Result<Vec<Note>> {
        let rows = sqlx::query("SELECT * FROM notes WHERE source_id = $1 ORDER BY id")
            .bind(source_id)
            .fetch_all(&self.pool)
            .await
            .map_err(crate::StoreError::from)?;
        Ok(notes_from_rows(&rows)?)
    }

    async fn raw_scores(&self, dimension: Dimension) -> fakecheck_common::Result<Vec<f64>> {
        let sql = format!("SELECT {} FROM notes ORDER BY id", raw_column(dimension));
        let scores = sqlx::query_scalar::<_, f64>(&sql)
            .fetch_all(&self.pool)
            .await
            .map_err(crate::StoreError::from)?;
        Ok(scores)
    }

    async fn history(&self) -> fakecheck_common::Result<DimensionMap<Vec<f64>>> {
        Ok(self.read_history().await?)
    }

    async fn last_note(&self) -> fakecheck_common::Result<Option<Note>> {
        let row = sqlx::query("SELECT * FROM notes ORDER BY id DESC LIMIT 1")
            .fetch_optional(&self.pool)
            .await
            .map_err(crate::StoreError::from)?;
        Ok(row.as_ref().map(note_from_row).transpose()?)
    }

    async fn save_note(&self, note: NewNote) -> fakecheck_common::Result<SaveOutcome> {
        Ok(self.insert_note(note).await?)
    }

    async fn all_notes(&self) -> fakecheck_common::Result<Vec<Note>> {
        let rows = sqlx::query("SELECT * FROM notes ORDER BY id")
            .fetch_all(&self.pool)
            .await
            .map_err(crate::StoreError::from)?;
        Ok(notes_from_rows(&rows)?)
    }

    async fn source(&self, id: SourceId) -> fakecheck_common::Result<Option<Source>> {
        let row = sqlx::query_as::<_, SourceRow>("SELECT * FROM sources WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(crate::StoreError::from)?;
        Ok(row.map(Source::from))
    }

    async fn sources(&self) -> fakecheck_common::Result<Vec<Source>> {
        let rows = sqlx::query_as::<_, SourceRow>("SELECT * FROM sources ORDER BY id")
            .fetch_all(&self.pool)
            .await
            .map_err(crate::StoreError::from)?;
        Ok(rows.into_iter().map(Source::from).collect())
    }

    async fn upsert_source(&self, source: NewSource) -> fakecheck_common::Result<Source> {
        let row = sqlx::query_as::<_, SourceRow>(
            r#"
            INSERT INTO sources (external_id, name, platform, is_hidden)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (external_id) DO UPDATE
                SET name = EXCLUDED.name,
                    platform = EXCLUDED.platform,
                    is_hidden = EXCLUDED.is_hidden
            RETURNING *
            "#,
        )
        .bind(&source.external_id)
        .bind(&source.name)
        .bind(&source.platform)
        .bind(source.is_hidden)
        .fetch_one(&self.pool)
        .await
        .map_err(crate::StoreError::from)?;
        Ok(row.into())
    }
}
