use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sentiment {
	Positive,
	Negative,
	Neutral,
}
impl Sentiment {
	pub fn as_str(self) -> &'static str {
		match self {
			Self::Positive => "positive",
			Self::Negative => "negative",
			Self::Neutral => "neutral",
		}
	}

	/// Polarity used by daily trends: positive → +1, neutral → 0, negative → −1.
	pub fn score(self) -> f64 {
		match self {
			Self::Positive => 1.0,
			Self::Neutral => 0.0,
			Self::Negative => -1.0,
		}
	}
}
impl FromStr for Sentiment {
	type Err = Error;

	fn from_str(raw: &str) -> Result<Self> {
		match raw.trim().to_ascii_lowercase().as_str() {
			"positive" => Ok(Self::Positive),
			"negative" => Ok(Self::Negative),
			"neutral" => Ok(Self::Neutral),
			_ => Err(Error::UnknownSentiment(raw.to_string())),
		}
	}
}
impl fmt::Display for Sentiment {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

/// A named emotion with an intensity in `[0, 1]`.
///
/// The name vocabulary is open; only the intensity bound is enforced, on construction and on
/// deserialization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawEmotionScore")]
pub struct EmotionScore {
	name: String,
	intensity: f32,
}
impl EmotionScore {
	pub fn new(name: impl Into<String>, intensity: f32) -> Result<Self> {
		let name = name.into().trim().to_string();

		if name.is_empty() {
			return Err(Error::EmptyEmotionName);
		}
		if !intensity.is_finite() || !(0.0..=1.0).contains(&intensity) {
			return Err(Error::IntensityOutOfRange { name, intensity });
		}

		Ok(Self { name, intensity })
	}

	pub fn name(&self) -> &str {
		&self.name
	}

	pub fn intensity(&self) -> f32 {
		self.intensity
	}
}
impl TryFrom<RawEmotionScore> for EmotionScore {
	type Error = Error;

	fn try_from(raw: RawEmotionScore) -> Result<Self> {
		Self::new(raw.name, raw.intensity)
	}
}

#[derive(Deserialize)]
struct RawEmotionScore {
	name: String,
	intensity: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SentimentRecord {
	pub id: Uuid,
	pub user_id: String,
	pub text: String,
	pub sentiment: Sentiment,
	pub confidence: f32,
	pub emotions: Vec<EmotionScore>,
	pub intensity: f32,
	pub analysis: String,
	pub causes: String,
	pub suggestions: String,
	#[serde(with = "crate::time_serde")]
	pub created_at: OffsetDateTime,
}

/// The strongest emotion, ties resolved in favor of the first one listed.
pub fn dominant_emotion(emotions: &[EmotionScore]) -> Option<&EmotionScore> {
	let mut best: Option<&EmotionScore> = None;

	for emotion in emotions {
		match best {
			Some(current) if emotion.intensity <= current.intensity => {},
			_ => best = Some(emotion),
		}
	}

	best
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn rejects_intensity_outside_unit_range() {
		assert!(EmotionScore::new("anxiety", 1.2).is_err());
		assert!(EmotionScore::new("anxiety", -0.1).is_err());
		assert!(EmotionScore::new("anxiety", f32::NAN).is_err());
		assert!(EmotionScore::new("  ", 0.5).is_err());
		assert!(EmotionScore::new("anxiety", 1.0).is_ok());
		assert!(EmotionScore::new("anxiety", 0.0).is_ok());
	}

	#[test]
	fn dominant_emotion_prefers_first_on_ties() {
		let emotions = vec![
			EmotionScore::new("stress", 0.8).expect("valid"),
			EmotionScore::new("anxiety", 0.8).expect("valid"),
			EmotionScore::new("fatigue", 0.3).expect("valid"),
		];
		let dominant = dominant_emotion(&emotions).expect("non-empty");

		assert_eq!(dominant.name(), "stress");
	}

	#[test]
	fn parses_sentiment_labels_case_insensitively() {
		assert_eq!("Negative".parse::<Sentiment>(), Ok(Sentiment::Negative));
		assert!("mixed".parse::<Sentiment>().is_err());
	}
}
