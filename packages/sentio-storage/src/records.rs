use sqlx::PgExecutor;
use time::OffsetDateTime;

use sentio_domain::record::SentimentRecord;

use crate::{Error, Result, models::SentimentRecordRow};

const SELECT_COLUMNS: &str = "\
SELECT
	record_id,
	user_id,
	text,
	sentiment,
	confidence,
	emotions,
	intensity,
	analysis,
	causes,
	suggestions,
	created_at
FROM sentiment_records";

/// Appends a record. Records are never updated afterwards.
pub async fn insert_record(executor: impl PgExecutor<'_>, record: &SentimentRecord) -> Result<()> {
	let emotions = serde_json::to_value(&record.emotions)
		.map_err(|err| Error::InvalidArgument(format!("emotions are not serializable: {err}")))?;

	sqlx::query(
		"\
INSERT INTO sentiment_records (
	record_id,
	user_id,
	text,
	sentiment,
	confidence,
	emotions,
	intensity,
	analysis,
	causes,
	suggestions,
	created_at
)
VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)",
	)
	.bind(record.id)
	.bind(record.user_id.as_str())
	.bind(record.text.as_str())
	.bind(record.sentiment.as_str())
	.bind(record.confidence)
	.bind(emotions)
	.bind(record.intensity)
	.bind(record.analysis.as_str())
	.bind(record.causes.as_str())
	.bind(record.suggestions.as_str())
	.bind(record.created_at)
	.execute(executor)
	.await?;

	Ok(())
}

/// Records for a user created at or after `since`, oldest first.
pub async fn records_since(
	executor: impl PgExecutor<'_>,
	user_id: &str,
	since: Option<OffsetDateTime>,
) -> Result<Vec<SentimentRecord>> {
	let sql = format!(
		"{SELECT_COLUMNS}
WHERE user_id = $1
	AND ($2::timestamptz IS NULL OR created_at >= $2)
ORDER BY created_at ASC, record_id ASC"
	);
	let rows: Vec<SentimentRecordRow> =
		sqlx::query_as(&sql).bind(user_id).bind(since).fetch_all(executor).await?;

	rows.into_iter().map(SentimentRecord::try_from).collect()
}

/// The newest `limit` records for a user, newest first.
pub async fn recent_records(
	executor: impl PgExecutor<'_>,
	user_id: &str,
	limit: u32,
) -> Result<Vec<SentimentRecord>> {
	let sql = format!(
		"{SELECT_COLUMNS}
WHERE user_id = $1
ORDER BY created_at DESC, record_id DESC
LIMIT $2"
	);
	let rows: Vec<SentimentRecordRow> = sqlx::query_as(&sql)
		.bind(user_id)
		.bind(i64::from(limit))
		.fetch_all(executor)
		.await?;

	rows.into_iter().map(SentimentRecord::try_from).collect()
}
