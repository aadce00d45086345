use std::sync::Arc;

use serde_json::Value;
use time::OffsetDateTime;

use sentio_config::{Config, LlmProviderConfig, SamplingConfig};
use sentio_domain::assessment::{HealthAssessment, RiskLevel};
use sentio_providers::chat;

use crate::{
	Error, ModelProvider, RecordStore, Result, Stage, prompts,
	statistics::{self, StatisticsSource},
	with_timeout,
};

/// Risk assessment over a trailing window: statistics plus recent excerpts, one model call.
pub struct HealthAssessor {
	llm: LlmProviderConfig,
	sampling: SamplingConfig,
	recent_excerpts: u32,
	model: Arc<dyn ModelProvider>,
	statistics: Arc<dyn StatisticsSource>,
	store: Arc<dyn RecordStore>,
}
impl HealthAssessor {
	pub fn new(
		cfg: &Config,
		model: Arc<dyn ModelProvider>,
		statistics: Arc<dyn StatisticsSource>,
		store: Arc<dyn RecordStore>,
	) -> Self {
		Self {
			llm: cfg.providers.llm.clone(),
			sampling: cfg.sampling.assessment,
			recent_excerpts: cfg.assessment.recent_excerpts,
			model,
			statistics,
			store,
		}
	}

	pub async fn assess(&self, user_id: &str, window_days: u32) -> Result<HealthAssessment> {
		let stats = self.statistics.compute_statistics(user_id, window_days).await?;

		if stats.total_records == 0 {
			tracing::debug!(user_id, window_days, "No records in window. Skipping model call.");

			return Ok(HealthAssessment::insufficient_data());
		}

		let since = statistics::window_start(OffsetDateTime::now_utc(), window_days);
		let mut excerpts = self.store.recent(user_id, self.recent_excerpts).await?;

		excerpts.retain(|record| record.created_at >= since);

		let messages = prompts::assessment_messages(&stats, &excerpts);
		let timeout_ms = self.llm.timeout_ms;
		let content = with_timeout(Stage::Assessment, timeout_ms, async {
			self.model
				.complete(&self.llm, &self.sampling, &messages)
				.await
				.map_err(|err| Error::provider(Stage::Assessment, err, timeout_ms))
		})
		.await?;
		let assessment = parse_assessment(&content)?;

		tracing::info!(
			user_id,
			window_days,
			overall_score = assessment.overall_score,
			risk_level = assessment.risk_level.as_str(),
			"Health assessment completed."
		);

		Ok(assessment)
	}
}

/// Strict parse: every field is required and `risk_level` must be an exact label.
/// Only `overall_score` is normalized, by clamping into `[0, 100]`.
pub fn parse_assessment(content: &str) -> Result<HealthAssessment> {
	let json = chat::parse_json_object(content)
		.map_err(|err| Error::malformed(Stage::Assessment, err.to_string()))?;
	let overall_score = json
		.get("overall_score")
		.and_then(Value::as_f64)
		.ok_or_else(|| Error::malformed(Stage::Assessment, "Missing numeric overall_score."))?;
	let risk_level = json
		.get("risk_level")
		.and_then(Value::as_str)
		.ok_or_else(|| Error::malformed(Stage::Assessment, "Missing risk_level."))?
		.parse::<RiskLevel>()
		.map_err(|err| Error::malformed(Stage::Assessment, err.to_string()))?;
	let key_concerns = string_list(&json, "key_concerns")?;
	let recommendations = string_list(&json, "recommendations")?;
	let detailed_analysis = json
		.get("detailed_analysis")
		.and_then(Value::as_str)
		.ok_or_else(|| Error::malformed(Stage::Assessment, "Missing detailed_analysis."))?
		.to_string();

	Ok(HealthAssessment {
		overall_score: HealthAssessment::clamp_score(overall_score),
		risk_level,
		key_concerns,
		recommendations,
		detailed_analysis,
	})
}

fn string_list(json: &Value, field: &str) -> Result<Vec<String>> {
	let items = json
		.get(field)
		.and_then(Value::as_array)
		.ok_or_else(|| Error::malformed(Stage::Assessment, format!("Missing {field} array.")))?;

	items
		.iter()
		.map(|item| {
			item.as_str().map(str::to_string).ok_or_else(|| {
				Error::malformed(Stage::Assessment, format!("{field} must contain only strings."))
			})
		})
		.collect()
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn clamps_score_and_keeps_exact_risk_level() {
		let content = r#"{"overall_score":130,"risk_level":"high","key_concerns":["失眠"],"recommendations":["规律作息"],"detailed_analysis":"持续焦虑"}"#;
		let assessment = parse_assessment(content).expect("assessment");

		assert_eq!(assessment.overall_score, 100.0);
		assert_eq!(assessment.risk_level, RiskLevel::High);
		assert_eq!(assessment.key_concerns, vec!["失眠".to_string()]);
	}

	#[test]
	fn rejects_non_exact_risk_level() {
		for risk in ["High", "severe", ""] {
			let content = format!(
				r#"{{"overall_score":40,"risk_level":"{risk}","key_concerns":[],"recommendations":[],"detailed_analysis":"x"}}"#
			);
			let err = parse_assessment(&content).expect_err("malformed");

			assert!(matches!(err, Error::MalformedResponse { stage: Stage::Assessment, .. }));
		}
	}

	#[test]
	fn rejects_missing_fields() {
		let content = r#"{"overall_score":40,"risk_level":"low","key_concerns":[]}"#;

		assert!(parse_assessment(content).is_err());
	}
}
