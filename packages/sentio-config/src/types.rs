use serde::Deserialize;
use serde_json::{Map, Value};

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
	pub service: Service,
	pub storage: Storage,
	pub providers: Providers,
	#[serde(default)]
	pub sampling: Sampling,
	#[serde(default)]
	pub pipeline: Pipeline,
	#[serde(default)]
	pub cache: Cache,
	#[serde(default)]
	pub statistics: Statistics,
	#[serde(default)]
	pub assessment: Assessment,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Service {
	pub http_bind: String,
	pub log_level: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Storage {
	pub postgres: Postgres,
	pub qdrant: Qdrant,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Postgres {
	pub dsn: String,
	pub pool_max_conns: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Qdrant {
	pub url: String,
	pub collection: String,
	pub vector_dim: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Providers {
	pub llm: LlmProviderConfig,
	pub embedding: EmbeddingProviderConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LlmProviderConfig {
	pub provider_id: String,
	pub api_base: String,
	pub api_key: String,
	pub path: String,
	pub model: String,
	#[serde(default = "default_timeout_ms")]
	pub timeout_ms: u64,
	#[serde(default)]
	pub default_headers: Map<String, Value>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EmbeddingProviderConfig {
	pub provider_id: String,
	pub api_base: String,
	pub api_key: String,
	pub path: String,
	pub model: String,
	pub dimensions: u32,
	#[serde(default = "default_timeout_ms")]
	pub timeout_ms: u64,
	#[serde(default)]
	pub default_headers: Map<String, Value>,
}

/// Static sampling settings per model-call site.
///
/// Classification and assessment favor determinism, synthesis favors diversity.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Sampling {
	pub classification: SamplingConfig,
	pub synthesis: SamplingConfig,
	pub assessment: SamplingConfig,
}
impl Default for Sampling {
	fn default() -> Self {
		Self {
			classification: SamplingConfig { temperature: 0.3, max_tokens: 2_000 },
			synthesis: SamplingConfig { temperature: 0.7, max_tokens: 2_000 },
			assessment: SamplingConfig { temperature: 0.3, max_tokens: 2_000 },
		}
	}
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct SamplingConfig {
	pub temperature: f32,
	pub max_tokens: u32,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Pipeline {
	pub max_text_chars: u32,
	pub knowledge_top_k: u32,
	pub history_limit: u32,
	pub classification_retry: bool,
}
impl Default for Pipeline {
	fn default() -> Self {
		Self {
			max_text_chars: 5_000,
			knowledge_top_k: 3,
			history_limit: 10,
			classification_retry: true,
		}
	}
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Cache {
	pub enabled: bool,
	pub ttl_secs: u64,
	pub capacity: usize,
}
impl Default for Cache {
	fn default() -> Self {
		Self { enabled: true, ttl_secs: 300, capacity: 100 }
	}
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Statistics {
	/// Offset applied to `created_at` before grouping records by calendar date.
	pub utc_offset_minutes: i32,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Assessment {
	pub recent_excerpts: u32,
	pub default_window_days: u32,
}
impl Default for Assessment {
	fn default() -> Self {
		Self { recent_excerpts: 5, default_window_days: 30 }
	}
}

fn default_timeout_ms() -> u64 {
	30_000
}
