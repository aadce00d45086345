use std::fmt;

use serde::Serialize;

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// The external call a failure is attributed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
	Classification,
	Causes,
	Retrieval,
	Synthesis,
	Assessment,
}
impl Stage {
	pub fn as_str(self) -> &'static str {
		match self {
			Self::Classification => "classification",
			Self::Causes => "causes",
			Self::Retrieval => "retrieval",
			Self::Synthesis => "synthesis",
			Self::Assessment => "assessment",
		}
	}
}
impl fmt::Display for Stage {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("Invalid request: {message}")]
	Validation { message: String },
	#[error("Upstream error during {stage}: {message}")]
	Upstream { stage: Stage, message: String },
	#[error("Upstream call timed out during {stage} after {timeout_ms} ms.")]
	Timeout { stage: Stage, timeout_ms: u64 },
	#[error("Malformed response during {stage}: {message}")]
	MalformedResponse { stage: Stage, message: String },
	#[error("Storage error: {message}")]
	Storage { message: String },
	#[error("Cache corruption: {message}")]
	CacheCorruption { message: String },
}
impl Error {
	/// Timeouts count as upstream failures.
	pub fn is_upstream(&self) -> bool {
		matches!(self, Self::Upstream { .. } | Self::Timeout { .. })
	}

	/// Stable machine-readable code for transports.
	pub fn code(&self) -> &'static str {
		match self {
			Self::Validation { .. } => "INVALID_REQUEST",
			Self::Upstream { .. } => "UPSTREAM_ERROR",
			Self::Timeout { .. } => "UPSTREAM_TIMEOUT",
			Self::MalformedResponse { .. } => "MALFORMED_RESPONSE",
			Self::Storage { .. } => "STORAGE_ERROR",
			Self::CacheCorruption { .. } => "CACHE_CORRUPTION",
		}
	}

	pub fn stage(&self) -> Option<Stage> {
		match self {
			Self::Upstream { stage, .. }
			| Self::Timeout { stage, .. }
			| Self::MalformedResponse { stage, .. } => Some(*stage),
			_ => None,
		}
	}

	pub(crate) fn provider(stage: Stage, err: sentio_providers::Error, timeout_ms: u64) -> Self {
		match err {
			sentio_providers::Error::Timeout => Self::Timeout { stage, timeout_ms },
			sentio_providers::Error::InvalidResponse { message } =>
				Self::MalformedResponse { stage, message },
			other => Self::Upstream { stage, message: other.to_string() },
		}
	}

	pub(crate) fn malformed(stage: Stage, message: impl Into<String>) -> Self {
		Self::MalformedResponse { stage, message: message.into() }
	}
}

impl From<sentio_storage::Error> for Error {
	fn from(err: sentio_storage::Error) -> Self {
		match err {
			sentio_storage::Error::InvalidArgument(message) => Self::Validation { message },
			other => Self::Storage { message: other.to_string() },
		}
	}
}
