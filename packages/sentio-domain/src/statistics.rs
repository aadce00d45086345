use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use time::Date;

/// Aggregate view over a user's records inside a trailing window.
///
/// `positive_count + negative_count + neutral_count == total_records` always holds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserStatistics {
	pub total_records: u64,
	pub positive_count: u64,
	pub negative_count: u64,
	pub neutral_count: u64,
	pub average_intensity: f32,
	pub top_emotions: Vec<EmotionFrequency>,
	pub daily_trend: Vec<DailyTrend>,
}
impl UserStatistics {
	pub fn empty() -> Self {
		Self {
			total_records: 0,
			positive_count: 0,
			negative_count: 0,
			neutral_count: 0,
			average_intensity: 0.0,
			top_emotions: Vec::new(),
			daily_trend: Vec::new(),
		}
	}

	pub fn ratio(&self, count: u64) -> f32 {
		if self.total_records == 0 { 0.0 } else { count as f32 / self.total_records as f32 }
	}
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmotionFrequency {
	pub name: String,
	pub count: u64,
	pub average_intensity: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyTrend {
	#[serde(with = "crate::time_serde::date")]
	pub date: Date,
	/// Mean polarity of the day's records, in `[-1, 1]`.
	pub sentiment_score: f32,
	/// Share of the day's emotion entries carrying each name; values sum to 1.
	pub emotion_distribution: BTreeMap<String, f32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrendDirection {
	Improving,
	Declining,
	Stable,
	InsufficientData,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrendPattern {
	WeeklyImprovement,
	ConsecutiveNegative,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendSummary {
	pub direction: TrendDirection,
	pub stability_score: f32,
	pub emotional_volatility: f32,
	pub improvement_rate: f32,
	pub patterns: Vec<TrendPattern>,
}
