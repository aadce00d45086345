use std::{sync::LazyLock, time::Duration};

use regex::Regex;
use reqwest::Client;
use serde_json::Value;

use sentio_config::{LlmProviderConfig, SamplingConfig};

use crate::{Error, Result};

static CODE_FENCE: LazyLock<Regex> = LazyLock::new(|| {
	Regex::new(r"(?s)```[A-Za-z]*\s*(.*?)```").expect("code fence pattern must compile")
});

/// Sends one chat-completion request and returns the assistant message content.
pub async fn complete(
	cfg: &LlmProviderConfig,
	sampling: &SamplingConfig,
	messages: &[Value],
) -> Result<String> {
	let client = Client::builder().timeout(Duration::from_millis(cfg.timeout_ms)).build()?;
	let url = format!("{}{}", cfg.api_base, cfg.path);
	let body = serde_json::json!({
		"model": cfg.model,
		"temperature": sampling.temperature,
		"max_tokens": sampling.max_tokens,
		"messages": messages,
	});
	let res = client
		.post(&url)
		.headers(crate::auth_headers(&cfg.api_key, &cfg.default_headers)?)
		.json(&body)
		.send()
		.await?;
	let json: Value = res.error_for_status()?.json().await?;

	parse_completion_content(&json)
}

fn parse_completion_content(json: &Value) -> Result<String> {
	json.get("choices")
		.and_then(|v| v.as_array())
		.and_then(|arr| arr.first())
		.and_then(|choice| choice.get("message"))
		.and_then(|msg| msg.get("content"))
		.and_then(|c| c.as_str())
		.map(|content| content.trim().to_string())
		.ok_or_else(|| Error::InvalidResponse {
			message: "Completion response is missing message content.".to_string(),
		})
}

/// Strips an optional Markdown code fence around a completion.
pub fn strip_code_fence(content: &str) -> &str {
	match CODE_FENCE.captures(content).and_then(|caps| caps.get(1)) {
		Some(inner) => inner.as_str().trim(),
		None => content.trim(),
	}
}

/// Parses a completion that is expected to hold a single JSON object.
pub fn parse_json_object(content: &str) -> Result<Value> {
	let parsed: Value = serde_json::from_str(strip_code_fence(content)).map_err(|err| {
		Error::InvalidResponse { message: format!("Completion is not valid JSON: {err}.") }
	})?;

	if !parsed.is_object() {
		return Err(Error::InvalidResponse {
			message: "Completion JSON must be an object.".to_string(),
		});
	}

	Ok(parsed)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn parses_choice_content() {
		let json = serde_json::json!({
			"choices": [
				{ "message": { "content": "  hello  " } }
			]
		});

		assert_eq!(parse_completion_content(&json).expect("parse failed"), "hello");
	}

	#[test]
	fn missing_content_is_invalid_response() {
		let json = serde_json::json!({ "choices": [] });

		assert!(matches!(parse_completion_content(&json), Err(Error::InvalidResponse { .. })));
	}

	#[test]
	fn strips_json_code_fences() {
		let fenced = "Here you go:\n```json\n{\"sentiment\": \"negative\"}\n```";
		let parsed = parse_json_object(fenced).expect("parse failed");

		assert_eq!(parsed["sentiment"], "negative");

		let bare = "```\n{\"a\": 1}\n```";

		assert_eq!(parse_json_object(bare).expect("parse failed")["a"], 1);
	}

	#[test]
	fn rejects_non_object_json() {
		assert!(parse_json_object("[1, 2]").is_err());
		assert!(parse_json_object("not json").is_err());
	}
}
