pub mod analyze;
pub mod cache;
pub mod health;
pub mod knowledge;
pub mod pipeline;
pub mod queries;
pub mod statistics;
pub mod store;
pub mod trends;

mod error;
mod prompts;

pub use analyze::{
	AnalyzeBatchRequest, AnalyzeBatchResponse, AnalyzeRequest, AnalyzeResponse, BatchFailure,
};
pub use cache::{Cached, ResultCache, cache_key};
pub use error::{Error, Result, Stage};
pub use health::HealthAssessor;
pub use knowledge::{KnowledgeRetriever, Retrieve, RetrievalRequest};
pub use pipeline::{AnalysisOutput, AnalysisPipeline};
pub use queries::{AddKnowledgeRequest, KnowledgeSearchRequest};
pub use statistics::{StatisticsEngine, StatisticsSource};

use std::{future::Future, pin::Pin, sync::Arc, time::Duration};

use serde_json::Value;
use time::OffsetDateTime;

use sentio_config::{Config, EmbeddingProviderConfig, LlmProviderConfig, SamplingConfig};
use sentio_domain::{
	knowledge::{Category, KnowledgeSnippet},
	record::SentimentRecord,
	statistics::UserStatistics,
};
use sentio_providers::{chat, embedding};

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Chat-completion collaborator. Returns the raw completion text.
pub trait ModelProvider
where
	Self: Send + Sync,
{
	fn complete<'a>(
		&'a self,
		cfg: &'a LlmProviderConfig,
		sampling: &'a SamplingConfig,
		messages: &'a [Value],
	) -> BoxFuture<'a, sentio_providers::Result<String>>;
}

pub trait EmbeddingProvider
where
	Self: Send + Sync,
{
	fn embed<'a>(
		&'a self,
		cfg: &'a EmbeddingProviderConfig,
		texts: &'a [String],
	) -> BoxFuture<'a, sentio_providers::Result<Vec<Vec<f32>>>>;
}

/// Semantic index over the knowledge corpus.
pub trait KnowledgeIndex
where
	Self: Send + Sync,
{
	/// Nearest snippets to `vector`. An empty `categories` slice means no category filter.
	fn query<'a>(
		&'a self,
		vector: Vec<f32>,
		categories: &'a [Category],
		top_k: u32,
	) -> BoxFuture<'a, Result<Vec<KnowledgeSnippet>>>;

	fn upsert<'a>(
		&'a self,
		snippet: &'a KnowledgeSnippet,
		vector: Vec<f32>,
	) -> BoxFuture<'a, Result<()>>;
}

/// Append-only store of sentiment records.
pub trait RecordStore
where
	Self: Send + Sync,
{
	fn append<'a>(&'a self, record: &'a SentimentRecord) -> BoxFuture<'a, Result<()>>;

	/// Records created at or after `since`, oldest first.
	fn query<'a>(
		&'a self,
		user_id: &'a str,
		since: Option<OffsetDateTime>,
	) -> BoxFuture<'a, Result<Vec<SentimentRecord>>>;

	/// The newest `limit` records, newest first.
	fn recent<'a>(
		&'a self,
		user_id: &'a str,
		limit: u32,
	) -> BoxFuture<'a, Result<Vec<SentimentRecord>>>;
}

#[derive(Clone)]
pub struct Providers {
	pub model: Arc<dyn ModelProvider>,
	pub embedding: Arc<dyn EmbeddingProvider>,
}

/// Everything the service talks to, constructed by the caller.
#[derive(Clone)]
pub struct Collaborators {
	pub providers: Providers,
	pub index: Arc<dyn KnowledgeIndex>,
	pub store: Arc<dyn RecordStore>,
}

pub struct SentioService {
	pub cfg: Config,
	pub store: Arc<dyn RecordStore>,
	pub pipeline: AnalysisPipeline,
	pub retriever: Arc<dyn Retrieve>,
	pub statistics: Arc<dyn StatisticsSource>,
	pub health: HealthAssessor,
	pub(crate) providers: Providers,
	pub(crate) index: Arc<dyn KnowledgeIndex>,
	pub(crate) retrieval_cache: Option<Arc<ResultCache<Vec<KnowledgeSnippet>>>>,
	pub(crate) statistics_cache: Option<Arc<ResultCache<UserStatistics>>>,
}

struct DefaultProviders;

impl ModelProvider for DefaultProviders {
	fn complete<'a>(
		&'a self,
		cfg: &'a LlmProviderConfig,
		sampling: &'a SamplingConfig,
		messages: &'a [Value],
	) -> BoxFuture<'a, sentio_providers::Result<String>> {
		Box::pin(chat::complete(cfg, sampling, messages))
	}
}

impl EmbeddingProvider for DefaultProviders {
	fn embed<'a>(
		&'a self,
		cfg: &'a EmbeddingProviderConfig,
		texts: &'a [String],
	) -> BoxFuture<'a, sentio_providers::Result<Vec<Vec<f32>>>> {
		Box::pin(embedding::embed(cfg, texts))
	}
}

impl Providers {
	pub fn new(model: Arc<dyn ModelProvider>, embedding: Arc<dyn EmbeddingProvider>) -> Self {
		Self { model, embedding }
	}
}

impl Default for Providers {
	fn default() -> Self {
		let provider = Arc::new(DefaultProviders);

		Self { model: provider.clone(), embedding: provider }
	}
}

impl SentioService {
	pub fn new(cfg: Config, collaborators: Collaborators) -> Self {
		let Collaborators { providers, index, store } = collaborators;
		let ttl = Duration::from_secs(cfg.cache.ttl_secs);
		let base_retriever = KnowledgeRetriever::new(
			cfg.providers.embedding.clone(),
			providers.embedding.clone(),
			index.clone(),
		);
		let base_statistics =
			StatisticsEngine::new(store.clone(), cfg.statistics.utc_offset_minutes);
		let retrieval_cache: Option<Arc<ResultCache<Vec<KnowledgeSnippet>>>> =
			cfg.cache.enabled.then(|| Arc::new(ResultCache::new(ttl, cfg.cache.capacity)));
		let statistics_cache: Option<Arc<ResultCache<UserStatistics>>> =
			cfg.cache.enabled.then(|| Arc::new(ResultCache::new(ttl, cfg.cache.capacity)));
		let retriever: Arc<dyn Retrieve> = match &retrieval_cache {
			Some(cache) => Arc::new(Cached::new(base_retriever, cache.clone())),
			None => Arc::new(base_retriever),
		};
		let statistics: Arc<dyn StatisticsSource> = match &statistics_cache {
			Some(cache) => Arc::new(Cached::new(base_statistics, cache.clone())),
			None => Arc::new(base_statistics),
		};
		let pipeline = AnalysisPipeline::new(&cfg, providers.model.clone(), retriever.clone());
		let health = HealthAssessor::new(
			&cfg,
			providers.model.clone(),
			statistics.clone(),
			store.clone(),
		);

		Self {
			cfg,
			store,
			pipeline,
			retriever,
			statistics,
			health,
			providers,
			index,
			retrieval_cache,
			statistics_cache,
		}
	}
}

/// Bounds an external call by `timeout_ms`, reporting expiry against `stage`.
pub(crate) async fn with_timeout<T, F>(stage: Stage, timeout_ms: u64, fut: F) -> Result<T>
where
	F: Future<Output = Result<T>>,
{
	match tokio::time::timeout(Duration::from_millis(timeout_ms), fut).await {
		Ok(result) => result,
		Err(_) => Err(Error::Timeout { stage, timeout_ms }),
	}
}

pub(crate) fn preview(text: &str) -> String {
	const PREVIEW_CHARS: usize = 50;

	let mut out: String = text.chars().take(PREVIEW_CHARS).collect();

	if text.chars().nth(PREVIEW_CHARS).is_some() {
		out.push_str("...");
	}

	out
}
