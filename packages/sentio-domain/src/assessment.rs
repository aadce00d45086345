use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
	Low,
	Medium,
	High,
}
impl RiskLevel {
	pub fn as_str(self) -> &'static str {
		match self {
			Self::Low => "low",
			Self::Medium => "medium",
			Self::High => "high",
		}
	}
}
impl FromStr for RiskLevel {
	type Err = Error;

	/// Exact match only; anything else is rejected rather than coerced.
	fn from_str(raw: &str) -> Result<Self> {
		match raw {
			"low" => Ok(Self::Low),
			"medium" => Ok(Self::Medium),
			"high" => Ok(Self::High),
			_ => Err(Error::UnknownRiskLevel(raw.to_string())),
		}
	}
}
impl fmt::Display for RiskLevel {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthAssessment {
	/// Clamped to `[0, 100]`.
	pub overall_score: f32,
	pub risk_level: RiskLevel,
	pub key_concerns: Vec<String>,
	pub recommendations: Vec<String>,
	pub detailed_analysis: String,
}
impl HealthAssessment {
	/// Returned when the window holds no records. Produced without any model call.
	pub fn insufficient_data() -> Self {
		Self {
			overall_score: 50.0,
			risk_level: RiskLevel::Medium,
			key_concerns: vec!["数据不足，无法准确评估".to_string()],
			recommendations: vec!["请提供更多情感数据以便进行准确评估".to_string()],
			detailed_analysis: "暂无足够的历史数据来进行心理健康评估。建议先进行几次情感分析。"
				.to_string(),
		}
	}

	pub fn clamp_score(score: f64) -> f32 {
		if score.is_nan() { 0.0 } else { score.clamp(0.0, 100.0) as f32 }
	}
}
