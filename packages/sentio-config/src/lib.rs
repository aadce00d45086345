mod error;
mod types;

pub use error::{Error, Result};
pub use types::{
	Assessment, Cache, Config, EmbeddingProviderConfig, LlmProviderConfig, Pipeline, Postgres,
	Providers, Qdrant, Sampling, SamplingConfig, Service, Statistics, Storage,
};

use std::{fs, path::Path};

const MAX_UTC_OFFSET_MINUTES: i32 = 18 * 60;

pub fn load(path: &Path) -> Result<Config> {
	let raw = fs::read_to_string(path)
		.map_err(|err| Error::ReadConfig { path: path.to_path_buf(), source: err })?;
	let mut cfg: Config = toml::from_str(&raw)
		.map_err(|err| Error::ParseConfig { path: path.to_path_buf(), source: err })?;

	normalize(&mut cfg);

	validate(&cfg)?;

	Ok(cfg)
}

pub fn validate(cfg: &Config) -> Result<()> {
	if cfg.service.http_bind.trim().is_empty() {
		return Err(Error::Validation {
			message: "service.http_bind must be non-empty.".to_string(),
		});
	}
	if cfg.providers.embedding.dimensions == 0 {
		return Err(Error::Validation {
			message: "providers.embedding.dimensions must be greater than zero.".to_string(),
		});
	}
	if cfg.providers.embedding.dimensions != cfg.storage.qdrant.vector_dim {
		return Err(Error::Validation {
			message: "providers.embedding.dimensions must match storage.qdrant.vector_dim."
				.to_string(),
		});
	}

	for (label, key) in
		[("llm", &cfg.providers.llm.api_key), ("embedding", &cfg.providers.embedding.api_key)]
	{
		if key.trim().is_empty() {
			return Err(Error::Validation {
				message: format!("Provider {label} api_key must be non-empty."),
			});
		}
	}
	for (label, timeout_ms) in [
		("llm", cfg.providers.llm.timeout_ms),
		("embedding", cfg.providers.embedding.timeout_ms),
	] {
		if timeout_ms == 0 {
			return Err(Error::Validation {
				message: format!("providers.{label}.timeout_ms must be greater than zero."),
			});
		}
	}
	for (label, sampling) in [
		("classification", &cfg.sampling.classification),
		("synthesis", &cfg.sampling.synthesis),
		("assessment", &cfg.sampling.assessment),
	] {
		if !sampling.temperature.is_finite() || !(0.0..=2.0).contains(&sampling.temperature) {
			return Err(Error::Validation {
				message: format!("sampling.{label}.temperature must be in the range 0.0-2.0."),
			});
		}
		if sampling.max_tokens == 0 {
			return Err(Error::Validation {
				message: format!("sampling.{label}.max_tokens must be greater than zero."),
			});
		}
	}

	if cfg.pipeline.max_text_chars == 0 {
		return Err(Error::Validation {
			message: "pipeline.max_text_chars must be greater than zero.".to_string(),
		});
	}
	if cfg.pipeline.knowledge_top_k == 0 {
		return Err(Error::Validation {
			message: "pipeline.knowledge_top_k must be greater than zero.".to_string(),
		});
	}
	if cfg.cache.ttl_secs == 0 {
		return Err(Error::Validation {
			message: "cache.ttl_secs must be greater than zero.".to_string(),
		});
	}
	if cfg.cache.capacity == 0 {
		return Err(Error::Validation {
			message: "cache.capacity must be greater than zero.".to_string(),
		});
	}
	if cfg.statistics.utc_offset_minutes.abs() > MAX_UTC_OFFSET_MINUTES {
		return Err(Error::Validation {
			message: "statistics.utc_offset_minutes must be within +/-1080.".to_string(),
		});
	}
	if cfg.assessment.recent_excerpts == 0 {
		return Err(Error::Validation {
			message: "assessment.recent_excerpts must be greater than zero.".to_string(),
		});
	}
	if cfg.assessment.default_window_days == 0 {
		return Err(Error::Validation {
			message: "assessment.default_window_days must be greater than zero.".to_string(),
		});
	}

	Ok(())
}

fn normalize(cfg: &mut Config) {
	for api_base in [&mut cfg.providers.llm.api_base, &mut cfg.providers.embedding.api_base] {
		while api_base.ends_with('/') {
			api_base.pop();
		}
	}

	if cfg.service.log_level.trim().is_empty() {
		cfg.service.log_level = "info".to_string();
	}
}
