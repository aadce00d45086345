use serde::{Deserialize, Serialize};
use uuid::Uuid;

use sentio_domain::{
	assessment::HealthAssessment,
	gate,
	knowledge::{self, Category, KnowledgeSnippet},
	record::SentimentRecord,
	statistics::{TrendSummary, UserStatistics},
};

use crate::{Error, KnowledgeRetriever, Result, RetrievalRequest, SentioService, trends};

pub const DEFAULT_HISTORY_LIMIT: u32 = 50;
pub const MAX_HISTORY_LIMIT: u32 = 200;
pub const MAX_WINDOW_DAYS: u32 = 365;

const SEARCH_TOP_K: u32 = 5;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct KnowledgeSearchRequest {
	pub emotion: Option<String>,
	pub query: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddKnowledgeRequest {
	pub content: String,
	pub category: String,
	pub technique: String,
	pub id: Option<String>,
}

impl SentioService {
	/// Most recent records first. `limit` is clamped to `[1, 200]`.
	pub async fn history(&self, user_id: &str, limit: Option<u32>) -> Result<Vec<SentimentRecord>> {
		validate_user_id(user_id)?;

		let limit = limit.unwrap_or(DEFAULT_HISTORY_LIMIT).clamp(1, MAX_HISTORY_LIMIT);

		self.store.recent(user_id, limit).await
	}

	pub async fn statistics(&self, user_id: &str, days: Option<u32>) -> Result<UserStatistics> {
		validate_user_id(user_id)?;

		let days = self.window_days(days)?;

		self.statistics.compute_statistics(user_id, days).await
	}

	pub async fn trend_summary(&self, user_id: &str, days: Option<u32>) -> Result<TrendSummary> {
		let stats = self.statistics(user_id, days).await?;
		let summary = trends::summarize(&stats.daily_trend);

		tracing::debug!(
			user_id,
			direction = ?summary.direction,
			stability_score = summary.stability_score,
			"Trend summary computed."
		);

		Ok(summary)
	}

	pub async fn assessment(&self, user_id: &str, days: Option<u32>) -> Result<HealthAssessment> {
		validate_user_id(user_id)?;

		let days = self.window_days(days)?;

		self.health.assess(user_id, days).await
	}

	/// Searches by emotion (its concern categories plus `general`) or by free-form query.
	pub async fn knowledge_search(&self, req: KnowledgeSearchRequest) -> Result<Vec<KnowledgeSnippet>> {
		let emotion = non_blank(req.emotion.as_deref());
		let query = non_blank(req.query.as_deref());
		let request = match (emotion, query) {
			(Some(emotion), query) => {
				let mut categories = knowledge::concern_categories(emotion);

				categories.insert(Category::General);

				RetrievalRequest::new(categories, SEARCH_TOP_K)
					.with_query(query.map_or_else(|| format!("如何应对{emotion}"), str::to_string))
			},
			(None, Some(query)) => RetrievalRequest::new(Default::default(), SEARCH_TOP_K).with_query(query),
			(None, None) => {
				return Err(Error::Validation {
					message: "Either emotion or query is required.".to_string(),
				});
			},
		};

		self.retriever.retrieve(&request).await
	}

	/// Embeds and indexes a snippet. Cached retrievals are dropped afterwards.
	pub async fn add_knowledge(&self, req: AddKnowledgeRequest) -> Result<KnowledgeSnippet> {
		let content = req.content.trim();

		if content.is_empty() {
			return Err(Error::Validation { message: "content must not be empty.".to_string() });
		}

		let id = match non_blank(req.id.as_deref()) {
			Some(id) => id.to_string(),
			None => format!("custom_{}", &Uuid::new_v4().simple().to_string()[..8]),
		};
		let technique = non_blank(Some(req.technique.as_str())).unwrap_or("general").to_string();
		let snippet = KnowledgeSnippet {
			id,
			content: content.to_string(),
			category: Category::from_label(&req.category),
			technique,
			distance: 0.0,
		};
		let indexer = KnowledgeRetriever::new(
			self.cfg.providers.embedding.clone(),
			self.providers.embedding.clone(),
			self.index.clone(),
		);

		indexer.index_snippet(&snippet).await?;

		if let Some(cache) = &self.retrieval_cache {
			cache.invalidate_all();
		}

		tracing::info!(
			snippet_id = %snippet.id,
			category = snippet.category.as_str(),
			"Knowledge snippet indexed."
		);

		Ok(snippet)
	}

	fn window_days(&self, days: Option<u32>) -> Result<u32> {
		let days = days.unwrap_or(self.cfg.assessment.default_window_days);

		if days == 0 || days > MAX_WINDOW_DAYS {
			return Err(Error::Validation {
				message: format!("days must be between 1 and {MAX_WINDOW_DAYS}."),
			});
		}

		Ok(days)
	}
}

fn validate_user_id(user_id: &str) -> Result<()> {
	gate::user_id_gate(user_id).map_err(|code| Error::Validation { message: code.as_str().to_string() })
}

fn non_blank(value: Option<&str>) -> Option<&str> {
	value.map(str::trim).filter(|value| !value.is_empty())
}
