use std::{collections::BTreeSet, sync::Arc};

use serde_json::Value;

use sentio_config::EmbeddingProviderConfig;
use sentio_domain::knowledge::{self, Category, KnowledgeSnippet};

use crate::{BoxFuture, EmbeddingProvider, Error, KnowledgeIndex, Result, Stage, with_timeout};

/// What to look up. An empty `categories` set disables the category filter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetrievalRequest {
	pub categories: BTreeSet<Category>,
	pub query: Option<String>,
	pub top_k: u32,
}
impl RetrievalRequest {
	pub fn new(categories: BTreeSet<Category>, top_k: u32) -> Self {
		Self { categories, query: None, top_k }
	}

	/// Builds a request from free-form labels. Unknown labels behave like `general`.
	pub fn from_labels<'a, I>(labels: I, top_k: u32) -> Self
	where
		I: IntoIterator<Item = &'a str>,
	{
		Self::new(knowledge::categories_from_labels(labels), top_k)
	}

	pub fn with_query(mut self, query: impl Into<String>) -> Self {
		self.query = Some(query.into());

		self
	}

	/// The text that gets embedded when no explicit query is given.
	pub fn effective_query(&self) -> String {
		if let Some(query) = self.query.as_deref().map(str::trim).filter(|query| !query.is_empty())
		{
			return query.to_string();
		}

		let labels: Vec<&str> = self.categories.iter().map(|category| category.as_str()).collect();

		if labels.is_empty() {
			"如何应对情绪困扰".to_string()
		} else {
			format!("如何应对{}", labels.join("、"))
		}
	}

	pub(crate) fn fingerprint(&self) -> Value {
		let categories: Vec<&str> =
			self.categories.iter().map(|category| category.as_str()).collect();

		serde_json::json!({
			"categories": categories,
			"query": self.effective_query(),
			"top_k": self.top_k,
		})
	}
}

pub trait Retrieve
where
	Self: Send + Sync,
{
	/// Snippets ranked by ascending distance, at most `request.top_k`.
	fn retrieve<'a>(
		&'a self,
		request: &'a RetrievalRequest,
	) -> BoxFuture<'a, Result<Vec<KnowledgeSnippet>>>;
}

pub struct KnowledgeRetriever {
	cfg: EmbeddingProviderConfig,
	embedding: Arc<dyn EmbeddingProvider>,
	index: Arc<dyn KnowledgeIndex>,
}
impl KnowledgeRetriever {
	pub fn new(
		cfg: EmbeddingProviderConfig,
		embedding: Arc<dyn EmbeddingProvider>,
		index: Arc<dyn KnowledgeIndex>,
	) -> Self {
		Self { cfg, embedding, index }
	}

	pub async fn embed_one(&self, text: &str) -> Result<Vec<f32>> {
		let texts = vec![text.to_string()];
		let timeout_ms = self.cfg.timeout_ms;
		let mut vectors = with_timeout(Stage::Retrieval, timeout_ms, async {
			self.embedding
				.embed(&self.cfg, &texts)
				.await
				.map_err(|err| Error::provider(Stage::Retrieval, err, timeout_ms))
		})
		.await?;

		if vectors.len() != 1 {
			return Err(Error::malformed(
				Stage::Retrieval,
				format!("Expected one embedding vector, got {}.", vectors.len()),
			));
		}

		let vector = vectors.remove(0);

		if vector.len() != self.cfg.dimensions as usize {
			return Err(Error::malformed(
				Stage::Retrieval,
				format!(
					"Embedding dimension mismatch: expected {}, got {}.",
					self.cfg.dimensions,
					vector.len()
				),
			));
		}

		Ok(vector)
	}

	/// Embeds the snippet content and writes it to the index.
	pub async fn index_snippet(&self, snippet: &KnowledgeSnippet) -> Result<()> {
		let vector = self.embed_one(&snippet.content).await?;

		with_timeout(Stage::Retrieval, self.cfg.timeout_ms, self.index.upsert(snippet, vector)).await
	}

	async fn retrieve_inner(&self, request: &RetrievalRequest) -> Result<Vec<KnowledgeSnippet>> {
		if request.top_k == 0 {
			return Ok(Vec::new());
		}

		let query = request.effective_query();
		let vector = self.embed_one(&query).await?;
		let categories: Vec<Category> = request.categories.iter().copied().collect();
		let candidates = with_timeout(
			Stage::Retrieval,
			self.cfg.timeout_ms,
			self.index.query(vector, &categories, request.top_k),
		)
		.await?;

		Ok(rank_snippets(candidates, &request.categories, request.top_k))
	}
}

impl Retrieve for KnowledgeRetriever {
	fn retrieve<'a>(
		&'a self,
		request: &'a RetrievalRequest,
	) -> BoxFuture<'a, Result<Vec<KnowledgeSnippet>>> {
		Box::pin(self.retrieve_inner(request))
	}
}

/// Filters by category membership, orders by ascending distance, then truncates.
/// Ties keep the index's order.
pub fn rank_snippets(
	mut snippets: Vec<KnowledgeSnippet>,
	categories: &BTreeSet<Category>,
	top_k: u32,
) -> Vec<KnowledgeSnippet> {
	if !categories.is_empty() {
		snippets.retain(|snippet| categories.contains(&snippet.category));
	}

	snippets.sort_by(|a, b| a.distance.total_cmp(&b.distance));
	snippets.truncate(top_k as usize);

	snippets
}

#[cfg(test)]
mod tests {
	use super::*;

	fn snippet(id: &str, category: Category, distance: f32) -> KnowledgeSnippet {
		KnowledgeSnippet {
			id: id.to_string(),
			content: format!("content {id}"),
			category,
			technique: "t".to_string(),
			distance,
		}
	}

	#[test]
	fn ranks_by_distance_after_filtering() {
		let ranked = rank_snippets(
			vec![
				snippet("a", Category::Anxiety, 0.4),
				snippet("b", Category::Anger, 0.1),
				snippet("c", Category::Stress, 0.2),
				snippet("d", Category::Anxiety, 0.3),
			],
			&BTreeSet::from([Category::Anxiety, Category::Stress]),
			2,
		);
		let ids: Vec<&str> = ranked.iter().map(|snippet| snippet.id.as_str()).collect();

		assert_eq!(ids, vec!["c", "d"]);
	}

	#[test]
	fn empty_category_set_is_unfiltered() {
		let ranked = rank_snippets(
			vec![snippet("a", Category::Anger, 0.5), snippet("b", Category::Crisis, 0.2)],
			&BTreeSet::new(),
			5,
		);

		assert_eq!(ranked.len(), 2);
		assert_eq!(ranked[0].id, "b");
	}

	#[test]
	fn unknown_labels_produce_the_same_request_as_general() {
		let unknown = RetrievalRequest::from_labels(["mystery"], 3);
		let general = RetrievalRequest::from_labels(["general"], 3);

		assert_eq!(unknown, general);
		assert_eq!(unknown.fingerprint(), general.fingerprint());
	}

	#[test]
	fn explicit_query_overrides_category_query() {
		let request = RetrievalRequest::from_labels(["stress"], 3);

		assert_eq!(request.effective_query(), "如何应对stress");
		assert_eq!(request.with_query("失眠怎么办").effective_query(), "失眠怎么办");
	}
}
