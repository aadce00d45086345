use serde_json::Value;
use time::OffsetDateTime;
use uuid::Uuid;

use sentio_domain::record::{EmotionScore, Sentiment, SentimentRecord};

use crate::{Error, Result};

#[derive(Debug, sqlx::FromRow)]
pub struct SentimentRecordRow {
	pub record_id: Uuid,
	pub user_id: String,
	pub text: String,
	pub sentiment: String,
	pub confidence: f32,
	pub emotions: Value,
	pub intensity: f32,
	pub analysis: String,
	pub causes: String,
	pub suggestions: String,
	pub created_at: OffsetDateTime,
}
impl TryFrom<SentimentRecordRow> for SentimentRecord {
	type Error = Error;

	fn try_from(row: SentimentRecordRow) -> Result<Self> {
		let sentiment: Sentiment = row.sentiment.parse().map_err(|err| {
			Error::CorruptRow(format!("record {}: {err}", row.record_id))
		})?;
		let emotions: Vec<EmotionScore> = serde_json::from_value(row.emotions).map_err(|err| {
			Error::CorruptRow(format!("record {} emotions: {err}", row.record_id))
		})?;

		Ok(Self {
			id: row.record_id,
			user_id: row.user_id,
			text: row.text,
			sentiment,
			confidence: row.confidence,
			emotions,
			intensity: row.intensity,
			analysis: row.analysis,
			causes: row.causes,
			suggestions: row.suggestions,
			created_at: row.created_at,
		})
	}
}
