use serde::{Deserialize, Serialize};

use sentio_domain::{gate, knowledge::KnowledgeSnippet, record::SentimentRecord};

use crate::{Error, Result, SentioService, preview};

const MAX_BATCH_TEXTS: usize = 50;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyzeRequest {
	pub user_id: String,
	pub text: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyzeResponse {
	pub record: SentimentRecord,
	pub knowledge: Vec<KnowledgeSnippet>,
	pub knowledge_degraded: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyzeBatchRequest {
	pub user_id: String,
	pub texts: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchFailure {
	pub index: usize,
	pub error_code: String,
	pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyzeBatchResponse {
	pub results: Vec<AnalyzeResponse>,
	pub failures: Vec<BatchFailure>,
}

impl SentioService {
	/// Runs the pipeline and appends the record. Nothing is persisted unless every fatal stage
	/// succeeded.
	pub async fn analyze(&self, req: AnalyzeRequest) -> Result<AnalyzeResponse> {
		gate::analysis_gate(&req.text, &req.user_id, self.cfg.pipeline.max_text_chars)
			.map_err(|code| Error::Validation { message: code.as_str().to_string() })?;

		let history = self.store.recent(&req.user_id, self.cfg.pipeline.history_limit).await?;
		let output = match self.pipeline.analyze(&req.text, &req.user_id, &history).await {
			Ok(output) => output,
			Err(err) => {
				if err.is_upstream() || matches!(err, Error::MalformedResponse { .. }) {
					tracing::error!(
						error = %err,
						user_id = %req.user_id,
						text_preview = %preview(&req.text),
						"Analysis failed."
					);
				}

				return Err(err);
			},
		};

		self.store.append(&output.record).await?;

		if let Some(cache) = &self.statistics_cache {
			cache.invalidate_all();
		}

		tracing::info!(
			user_id = %output.record.user_id,
			record_id = %output.record.id,
			sentiment = output.record.sentiment.as_str(),
			confidence = output.record.confidence,
			knowledge = output.knowledge.len(),
			knowledge_degraded = output.knowledge_degraded,
			"Analysis completed."
		);

		Ok(AnalyzeResponse {
			record: output.record,
			knowledge: output.knowledge,
			knowledge_degraded: output.knowledge_degraded,
		})
	}

	/// Analyzes each text independently. Failed items are reported by index and skipped.
	pub async fn analyze_batch(&self, req: AnalyzeBatchRequest) -> Result<AnalyzeBatchResponse> {
		gate::user_id_gate(&req.user_id)
			.map_err(|code| Error::Validation { message: code.as_str().to_string() })?;

		if req.texts.is_empty() {
			return Err(Error::Validation { message: "texts must not be empty.".to_string() });
		}
		if req.texts.len() > MAX_BATCH_TEXTS {
			return Err(Error::Validation {
				message: format!("texts must contain at most {MAX_BATCH_TEXTS} items."),
			});
		}

		let mut results = Vec::with_capacity(req.texts.len());
		let mut failures = Vec::new();

		for (index, text) in req.texts.into_iter().enumerate() {
			let item = AnalyzeRequest { user_id: req.user_id.clone(), text };

			match self.analyze(item).await {
				Ok(response) => results.push(response),
				Err(err) => {
					tracing::warn!(index, error = %err, "Skipping failed batch item.");

					failures.push(BatchFailure {
						index,
						error_code: err.code().to_string(),
						message: err.to_string(),
					});
				},
			}
		}

		Ok(AnalyzeBatchResponse { results, failures })
	}
}
