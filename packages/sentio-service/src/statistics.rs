use std::{collections::BTreeMap, sync::Arc};

use time::{Date, Duration, OffsetDateTime, UtcOffset};

use sentio_domain::{
	record::{Sentiment, SentimentRecord},
	statistics::{DailyTrend, EmotionFrequency, UserStatistics},
};

use crate::{BoxFuture, RecordStore, Result};

const TOP_EMOTIONS: usize = 5;

pub trait StatisticsSource
where
	Self: Send + Sync,
{
	fn compute_statistics<'a>(
		&'a self,
		user_id: &'a str,
		window_days: u32,
	) -> BoxFuture<'a, Result<UserStatistics>>;
}

pub struct StatisticsEngine {
	store: Arc<dyn RecordStore>,
	offset: UtcOffset,
}
impl StatisticsEngine {
	/// `utc_offset_minutes` fixes the calendar used for daily grouping.
	pub fn new(store: Arc<dyn RecordStore>, utc_offset_minutes: i32) -> Self {
		let offset =
			UtcOffset::from_whole_seconds(utc_offset_minutes.saturating_mul(60)).unwrap_or(UtcOffset::UTC);

		Self { store, offset }
	}

	async fn compute(&self, user_id: &str, window_days: u32) -> Result<UserStatistics> {
		let since = window_start(OffsetDateTime::now_utc(), window_days);
		let records = self.store.query(user_id, Some(since)).await?;

		Ok(aggregate(&records, since, self.offset))
	}
}

impl StatisticsSource for StatisticsEngine {
	fn compute_statistics<'a>(
		&'a self,
		user_id: &'a str,
		window_days: u32,
	) -> BoxFuture<'a, Result<UserStatistics>> {
		Box::pin(self.compute(user_id, window_days))
	}
}

pub fn window_start(now: OffsetDateTime, window_days: u32) -> OffsetDateTime {
	now - Duration::days(i64::from(window_days))
}

#[derive(Default)]
struct EmotionAccumulator {
	count: u64,
	intensity_sum: f64,
}

#[derive(Default)]
struct DayAccumulator {
	score_sum: f64,
	records: u64,
	emotion_counts: BTreeMap<String, u64>,
	emotion_entries: u64,
}

/// Aggregates the records created at or after `since`.
///
/// Output order depends only on the input values: emotions are ranked by count, then average
/// intensity, then name; days ascend.
pub fn aggregate(records: &[SentimentRecord], since: OffsetDateTime, offset: UtcOffset) -> UserStatistics {
	let mut stats = UserStatistics::empty();
	let mut intensity_sum = 0.0_f64;
	let mut emotions: BTreeMap<&str, EmotionAccumulator> = BTreeMap::new();
	let mut days: BTreeMap<Date, DayAccumulator> = BTreeMap::new();

	for record in records.iter().filter(|record| record.created_at >= since) {
		stats.total_records += 1;

		match record.sentiment {
			Sentiment::Positive => stats.positive_count += 1,
			Sentiment::Negative => stats.negative_count += 1,
			Sentiment::Neutral => stats.neutral_count += 1,
		}

		intensity_sum += f64::from(record.intensity);

		let day = days.entry(record.created_at.to_offset(offset).date()).or_default();

		day.score_sum += record.sentiment.score();
		day.records += 1;

		for emotion in &record.emotions {
			let acc = emotions.entry(emotion.name()).or_default();

			acc.count += 1;
			acc.intensity_sum += f64::from(emotion.intensity());

			*day.emotion_counts.entry(emotion.name().to_string()).or_default() += 1;
			day.emotion_entries += 1;
		}
	}

	if stats.total_records > 0 {
		stats.average_intensity = (intensity_sum / stats.total_records as f64) as f32;
	}

	stats.top_emotions = rank_emotions(emotions);
	stats.daily_trend = days
		.into_iter()
		.map(|(date, day)| DailyTrend {
			date,
			sentiment_score: (day.score_sum / day.records as f64).clamp(-1.0, 1.0) as f32,
			emotion_distribution: day
				.emotion_counts
				.into_iter()
				.map(|(name, count)| (name, (count as f64 / day.emotion_entries as f64) as f32))
				.collect(),
		})
		.collect();

	stats
}

fn rank_emotions(emotions: BTreeMap<&str, EmotionAccumulator>) -> Vec<EmotionFrequency> {
	let mut ranked: Vec<EmotionFrequency> = emotions
		.into_iter()
		.map(|(name, acc)| EmotionFrequency {
			name: name.to_string(),
			count: acc.count,
			average_intensity: (acc.intensity_sum / acc.count as f64) as f32,
		})
		.collect();

	ranked.sort_by(|a, b| {
		b.count
			.cmp(&a.count)
			.then_with(|| b.average_intensity.total_cmp(&a.average_intensity))
			.then_with(|| a.name.cmp(&b.name))
	});
	ranked.truncate(TOP_EMOTIONS);

	ranked
}

#[cfg(test)]
mod tests {
	use super::*;
	use sentio_domain::record::EmotionScore;
	use time::macros::{datetime, offset};
	use uuid::Uuid;

	fn record(created_at: OffsetDateTime, sentiment: Sentiment, emotions: &[(&str, f32)]) -> SentimentRecord {
		SentimentRecord {
			id: Uuid::new_v4(),
			user_id: "u1".to_string(),
			text: "t".to_string(),
			sentiment,
			confidence: 0.8,
			emotions: emotions
				.iter()
				.map(|(name, intensity)| EmotionScore::new(*name, *intensity).expect("emotion"))
				.collect(),
			intensity: 0.5,
			analysis: String::new(),
			causes: String::new(),
			suggestions: String::new(),
			created_at,
		}
	}

	#[test]
	fn empty_window_has_zero_average_intensity() {
		let stats = aggregate(&[], datetime!(2024-01-01 0:00 UTC), UtcOffset::UTC);

		assert_eq!(stats.total_records, 0);
		assert_eq!(stats.average_intensity, 0.0);
		assert!(stats.daily_trend.is_empty());
	}

	#[test]
	fn records_before_window_are_excluded() {
		let records = vec![
			record(datetime!(2023-12-31 23:59 UTC), Sentiment::Negative, &[("悲伤", 0.9)]),
			record(datetime!(2024-01-01 8:00 UTC), Sentiment::Positive, &[("快乐", 0.7)]),
		];
		let stats = aggregate(&records, datetime!(2024-01-01 0:00 UTC), UtcOffset::UTC);

		assert_eq!(stats.total_records, 1);
		assert_eq!(stats.positive_count, 1);
		assert_eq!(stats.top_emotions.len(), 1);
	}

	#[test]
	fn emotion_ties_break_by_average_intensity_then_name() {
		let records = vec![
			record(datetime!(2024-01-01 8:00 UTC), Sentiment::Negative, &[("b", 0.4), ("a", 0.4), ("c", 0.9)]),
			record(datetime!(2024-01-01 9:00 UTC), Sentiment::Negative, &[("d", 0.1), ("d", 0.3)]),
		];
		let stats = aggregate(&records, datetime!(2024-01-01 0:00 UTC), UtcOffset::UTC);
		let names: Vec<&str> = stats.top_emotions.iter().map(|e| e.name.as_str()).collect();

		assert_eq!(names, vec!["d", "c", "a", "b"]);
		assert_eq!(stats.top_emotions[0].count, 2);
	}

	#[test]
	fn daily_grouping_uses_configured_offset() {
		let records = vec![
			record(datetime!(2024-01-01 20:00 UTC), Sentiment::Positive, &[("快乐", 0.5)]),
			record(datetime!(2024-01-01 10:00 UTC), Sentiment::Negative, &[("焦虑", 0.5), ("压力", 0.5)]),
		];
		let stats = aggregate(&records, datetime!(2024-01-01 0:00 UTC), offset!(+8));

		assert_eq!(stats.daily_trend.len(), 2);
		assert_eq!(stats.daily_trend[0].date, time::macros::date!(2024-01-01));
		assert_eq!(stats.daily_trend[0].sentiment_score, -1.0);
		assert_eq!(stats.daily_trend[0].emotion_distribution.get("焦虑"), Some(&0.5));
		assert_eq!(stats.daily_trend[1].date, time::macros::date!(2024-01-02));
		assert_eq!(stats.daily_trend[1].sentiment_score, 1.0);
	}
}
