use std::{collections::BTreeSet, sync::Arc};

use serde_json::Value;
use time::OffsetDateTime;
use uuid::Uuid;

use sentio_config::{Config, LlmProviderConfig, Pipeline, Sampling, SamplingConfig};
use sentio_domain::{
	gate,
	knowledge::{self, Category, KnowledgeSnippet},
	record::{self, EmotionScore, Sentiment, SentimentRecord},
};
use sentio_providers::chat;

use crate::{
	Error, ModelProvider, Result, Stage,
	knowledge::{RetrievalRequest, Retrieve},
	preview, prompts, with_timeout,
};

/// Stage 1 output.
#[derive(Debug, Clone, PartialEq)]
pub struct Classification {
	pub sentiment: Sentiment,
	pub confidence: f32,
	pub emotions: Vec<EmotionScore>,
	pub intensity: f32,
	pub analysis: String,
}

#[derive(Debug, Clone)]
pub struct AnalysisOutput {
	pub record: SentimentRecord,
	pub concern_categories: BTreeSet<Category>,
	pub knowledge: Vec<KnowledgeSnippet>,
	/// Set when retrieval failed and synthesis ran without knowledge.
	pub knowledge_degraded: bool,
}

/// Text-to-record transformation: classification, cause extraction, knowledge retrieval and
/// suggestion synthesis, strictly in that order.
pub struct AnalysisPipeline {
	llm: LlmProviderConfig,
	sampling: Sampling,
	settings: Pipeline,
	model: Arc<dyn ModelProvider>,
	retriever: Arc<dyn Retrieve>,
}
impl AnalysisPipeline {
	pub fn new(cfg: &Config, model: Arc<dyn ModelProvider>, retriever: Arc<dyn Retrieve>) -> Self {
		Self {
			llm: cfg.providers.llm.clone(),
			sampling: cfg.sampling.clone(),
			settings: cfg.pipeline.clone(),
			model,
			retriever,
		}
	}

	/// Produces a complete record without persisting it. `history` is newest first.
	pub async fn analyze(
		&self,
		text: &str,
		user_id: &str,
		history: &[SentimentRecord],
	) -> Result<AnalysisOutput> {
		gate::analysis_gate(text, user_id, self.settings.max_text_chars)
			.map_err(|code| Error::Validation { message: code.as_str().to_string() })?;

		let classification = self.classify(text).await?;
		let causes = self.extract_causes(text, &classification).await?;
		let concern_categories = record::dominant_emotion(&classification.emotions)
			.map(|emotion| knowledge::concern_categories(emotion.name()))
			.unwrap_or_else(|| BTreeSet::from([Category::General]));
		let (knowledge, knowledge_degraded) = self.retrieve_knowledge(&concern_categories).await;
		let history_limit = self.settings.history_limit as usize;
		let recent = &history[..history.len().min(history_limit)];
		let suggestions = self.synthesize(&classification, &causes, &knowledge, recent).await?;
		let Classification { sentiment, confidence, emotions, intensity, analysis } = classification;
		let record = SentimentRecord {
			id: Uuid::new_v4(),
			user_id: user_id.to_string(),
			text: text.to_string(),
			sentiment,
			confidence,
			emotions,
			intensity,
			analysis,
			causes,
			suggestions,
			created_at: OffsetDateTime::now_utc(),
		};

		Ok(AnalysisOutput { record, concern_categories, knowledge, knowledge_degraded })
	}

	async fn classify(&self, text: &str) -> Result<Classification> {
		let messages = prompts::classification_messages(text, false);
		let content = self.call(Stage::Classification, &self.sampling.classification, &messages).await?;

		match parse_classification(&content) {
			Ok(classification) => Ok(classification),
			Err(err @ Error::MalformedResponse { .. }) if self.settings.classification_retry => {
				tracing::warn!(
					error = %err,
					text_preview = %preview(text),
					"Classification reply was malformed. Retrying with a stricter prompt."
				);

				let messages = prompts::classification_messages(text, true);
				let content =
					self.call(Stage::Classification, &self.sampling.classification, &messages).await?;

				parse_classification(&content)
			},
			Err(err) => Err(err),
		}
	}

	async fn extract_causes(&self, text: &str, classification: &Classification) -> Result<String> {
		let messages = prompts::causes_messages(text, classification);
		let content = self.call(Stage::Causes, &self.sampling.classification, &messages).await?;

		non_empty(Stage::Causes, content)
	}

	async fn retrieve_knowledge(
		&self,
		categories: &BTreeSet<Category>,
	) -> (Vec<KnowledgeSnippet>, bool) {
		let request = RetrievalRequest::new(categories.clone(), self.settings.knowledge_top_k);

		match self.retriever.retrieve(&request).await {
			Ok(snippets) => (snippets, false),
			Err(err) => {
				tracing::warn!(
					error = %err,
					categories = ?categories,
					"Knowledge retrieval failed. Continuing without knowledge."
				);

				(Vec::new(), true)
			},
		}
	}

	async fn synthesize(
		&self,
		classification: &Classification,
		causes: &str,
		knowledge: &[KnowledgeSnippet],
		history: &[SentimentRecord],
	) -> Result<String> {
		let messages = prompts::synthesis_messages(classification, causes, knowledge, history);
		let content = self.call(Stage::Synthesis, &self.sampling.synthesis, &messages).await?;

		non_empty(Stage::Synthesis, content)
	}

	async fn call(&self, stage: Stage, sampling: &SamplingConfig, messages: &[Value]) -> Result<String> {
		let timeout_ms = self.llm.timeout_ms;

		with_timeout(stage, timeout_ms, async {
			self.model
				.complete(&self.llm, sampling, messages)
				.await
				.map_err(|err| Error::provider(stage, err, timeout_ms))
		})
		.await
	}
}

/// Parses a classification reply. Out-of-range scores and an empty emotion list are malformed.
pub fn parse_classification(content: &str) -> Result<Classification> {
	let malformed = |message: String| Error::malformed(Stage::Classification, message);
	let json = chat::parse_json_object(content).map_err(|err| malformed(err.to_string()))?;
	let sentiment = json
		.get("sentiment")
		.and_then(Value::as_str)
		.ok_or_else(|| malformed("Missing sentiment.".to_string()))?
		.parse::<Sentiment>()
		.map_err(|err| malformed(err.to_string()))?;
	let confidence = unit_interval(&json, "confidence").map_err(malformed)?;
	let intensity = unit_interval(&json, "intensity").map_err(malformed)?;
	let raw_emotions = json
		.get("emotions")
		.and_then(Value::as_array)
		.ok_or_else(|| malformed("Missing emotions array.".to_string()))?;
	let mut emotions = Vec::with_capacity(raw_emotions.len());

	for raw in raw_emotions {
		let name = raw
			.get("name")
			.and_then(Value::as_str)
			.ok_or_else(|| malformed("Emotion is missing a name.".to_string()))?;
		let value = raw
			.get("intensity")
			.and_then(Value::as_f64)
			.ok_or_else(|| malformed(format!("Emotion {name} is missing an intensity.")))?;

		emotions.push(EmotionScore::new(name, value as f32).map_err(|err| malformed(err.to_string()))?);
	}

	if emotions.is_empty() {
		return Err(malformed("Emotion list is empty.".to_string()));
	}

	let analysis =
		json.get("analysis").and_then(Value::as_str).map(str::trim).unwrap_or_default().to_string();

	Ok(Classification { sentiment, confidence, emotions, intensity, analysis })
}

fn unit_interval(json: &Value, field: &str) -> std::result::Result<f32, String> {
	let value = json
		.get(field)
		.and_then(Value::as_f64)
		.ok_or_else(|| format!("Missing numeric {field}."))?;

	if !(0.0..=1.0).contains(&value) {
		return Err(format!("{field} {value} is outside [0, 1]."));
	}

	Ok(value as f32)
}

fn non_empty(stage: Stage, content: String) -> Result<String> {
	let trimmed = content.trim();

	if trimmed.is_empty() {
		return Err(Error::malformed(stage, "Completion is empty."));
	}

	Ok(trimmed.to_string())
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn parses_fenced_classification() {
		let content = "```json\n{\"sentiment\":\"Negative\",\"confidence\":0.9,\"emotions\":[{\"name\":\"焦虑\",\"intensity\":0.8}],\"intensity\":0.7,\"analysis\":\"压力大\"}\n```";
		let parsed = parse_classification(content).expect("classification");

		assert_eq!(parsed.sentiment, Sentiment::Negative);
		assert_eq!(parsed.emotions.len(), 1);
		assert_eq!(parsed.analysis, "压力大");
	}

	#[test]
	fn rejects_out_of_range_and_empty_emotions() {
		let too_confident = r#"{"sentiment":"positive","confidence":1.2,"emotions":[{"name":"快乐","intensity":0.5}],"intensity":0.5}"#;
		let no_emotions = r#"{"sentiment":"positive","confidence":0.5,"emotions":[],"intensity":0.5}"#;
		let bad_emotion = r#"{"sentiment":"positive","confidence":0.5,"emotions":[{"name":"快乐","intensity":1.5}],"intensity":0.5}"#;

		for content in [too_confident, no_emotions, bad_emotion, "not json"] {
			let err = parse_classification(content).expect_err("malformed");

			assert!(matches!(err, Error::MalformedResponse { stage: Stage::Classification, .. }));
		}
	}

	#[test]
	fn rejects_unknown_sentiment() {
		let content = r#"{"sentiment":"mixed","confidence":0.5,"emotions":[{"name":"a","intensity":0.5}],"intensity":0.5}"#;

		assert!(parse_classification(content).is_err());
	}
}
