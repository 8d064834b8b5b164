use chrono::{DateTime, SecondsFormat, Utc};
use sqlx::Row;

use ecosim_core::domain::record::{
    CanonicalRecord, Period, RecordBreakdown, RecordDocument, RecordId, RecordOrigin,
};

use super::{RecordRepository, RepositoryError};
use crate::DbPool;

pub struct SqlRecordRepository {
    pool: DbPool,
}

impl SqlRecordRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

/// Fixed-width UTC timestamps so that text ordering matches time ordering.
pub(crate) fn encode_timestamp(value: &DateTime<Utc>) -> String {
    value.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

pub(crate) fn decode_timestamp(field: &str, raw: &str) -> Result<DateTime<Utc>, RepositoryError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|value| value.with_timezone(&Utc))
        .map_err(|error| RepositoryError::Decode(format!("{field} `{raw}`: {error}")))
}

fn decode_err(error: sqlx::Error) -> RepositoryError {
    RepositoryError::Decode(error.to_string())
}

fn row_to_document(row: &sqlx::sqlite::SqliteRow) -> Result<RecordDocument, RepositoryError> {
    let id: String = row.try_get("id").map_err(decode_err)?;
    let generated_at: String = row.try_get("generated_at").map_err(decode_err)?;
    let period: String = row.try_get("period").map_err(decode_err)?;
    let total: Option<f64> = row.try_get("total").map_err(decode_err)?;
    let mobility: f64 = row.try_get("breakdown_mobility").map_err(decode_err)?;
    let energy: f64 = row.try_get("breakdown_energy").map_err(decode_err)?;
    let other: f64 = row.try_get("breakdown_other").map_err(decode_err)?;
    let score: f64 = row.try_get("score").map_err(decode_err)?;
    let origin: String = row.try_get("origin").map_err(decode_err)?;

    Ok(RecordDocument {
        id: RecordId(id),
        generated_at: decode_timestamp("generated_at", &generated_at)?,
        period: Period::parse(&period)
            .ok_or_else(|| RepositoryError::Decode(format!("unknown period `{period}`")))?,
        total,
        breakdown: RecordBreakdown { mobility, energy, other },
        score,
        origin: RecordOrigin::parse(&origin)
            .ok_or_else(|| RepositoryError::Decode(format!("unknown origin `{origin}`")))?,
    })
}

#[async_trait::async_trait]
impl RecordRepository for SqlRecordRepository {
    async fn find_latest(&self) -> Result<Option<RecordDocument>, RepositoryError> {
        let row = sqlx::query(
            "SELECT id, generated_at, period, total, breakdown_mobility, breakdown_energy,
                    breakdown_other, score, origin
             FROM canonical_record
             ORDER BY julianday(generated_at) DESC, rowid DESC
             LIMIT 1",
        )
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(row_to_document).transpose()
    }

    async fn insert(&self, record: CanonicalRecord) -> Result<CanonicalRecord, RepositoryError> {
        sqlx::query(
            "INSERT INTO canonical_record (id, generated_at, period, total, breakdown_mobility,
                                           breakdown_energy, breakdown_other, score, origin)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&record.id.0)
        .bind(encode_timestamp(&record.generated_at))
        .bind(record.period.as_str())
        .bind(record.total)
        .bind(record.breakdown.mobility)
        .bind(record.breakdown.energy)
        .bind(record.breakdown.other)
        .bind(record.score)
        .bind(record.origin.as_str())
        .execute(&self.pool)
        .await?;

        Ok(record)
    }
}
