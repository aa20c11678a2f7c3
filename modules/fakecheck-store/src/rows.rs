use chrono::{DateTime, Utc};
use sqlx::postgres::PgRow;
use sqlx::Row;

use fakecheck_common::{
    Dimension, DimensionMap, DimensionScore, FehnerState, FehnerType, Note, RunningTotals, Source,
};

use crate::error::{Result, StoreError};

#[derive(Debug, Clone, sqlx::FromRow)]
pub(crate) struct SourceRow {
    pub id: i64,
    pub external_id: String,
    pub name: String,
    pub platform: String,
    pub is_hidden: bool,
    pub rating: Option<f64>,
}

impl From<SourceRow> for Source {
    fn from(row: SourceRow) -> Self {
        Source {
            id: row.id,
            external_id: row.external_id,
            name: row.name,
            platform: row.platform,
            is_hidden: row.is_hidden,
            rating: row.rating,
        }
    }
}

pub(crate) fn raw_column(d: Dimension) -> String {
    format!("{}_raw", d.key())
}

/// `<dim>_raw, <dim>_coeff, <dim>_weighted` for every dimension, in order.
pub(crate) fn score_columns() -> Vec<String> {
    Dimension::ALL
        .iter()
        .flat_map(|d| {
            let k = d.key();
            [format!("{k}_raw"), format!("{k}_coeff"), format!("{k}_weighted")]
        })
        .collect()
}

pub(crate) fn note_from_row(row: &PgRow) -> Result<Note> {
    let mut scores: DimensionMap<DimensionScore> = DimensionMap::default();
    for d in Dimension::ALL {
        let k = d.key();
        scores[d] = DimensionScore {
            raw: row.try_get(format!("{k}_raw").as_str())?,
            coefficient: row.try_get(format!("{k}_coeff").as_str())?,
            weighted: row.try_get(format!("{k}_weighted").as_str())?,
        };
    }

    let fehner_type = match row.try_get::<Option<String>, _>("fehner_type")? {
        None => None,
        Some(s) => Some(
            FehnerType::parse(&s)
                .ok_or_else(|| StoreError::Decode(format!("unknown fehner_type {s:?}")))?,
        ),
    };

    Ok(Note {
        id: row.try_get("id")?,
        title: row.try_get("title")?,
        content: row.try_get("content")?,
        content_hash: row.try_get("content_hash")?,
        scores,
        total_score: row.try_get("total_score")?,
        is_propaganda: row.try_get("is_propaganda")?,
        amount_of_propaganda_scores: row.try_get("amount_of_propaganda_scores")?,
        fehner: FehnerState {
            uniqueness: row.try_get("uniqueness")?,
            totals: RunningTotals {
                uniqueness_sum: row.try_get("uniqueness_sum")?,
                uniqueness_count: row.try_get("uniqueness_count")?,
                score_sum: row.try_get("score_sum")?,
                score_count: row.try_get("score_count")?,
            },
            fehner_type,
        },
        source_id: row.try_get("source_id")?,
        reposted_from_source_id: row.try_get("reposted_from_source_id")?,
        created_at: row.try_get::<DateTime<Utc>, _>("created_at")?,
    })
}
