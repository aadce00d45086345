pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("Provider request timed out.")]
	Timeout,
	#[error("Provider rate limited the request.")]
	RateLimited,
	#[error("Provider returned status {status}.")]
	Status { status: u16 },
	#[error(transparent)]
	Reqwest(reqwest::Error),
	#[error(transparent)]
	InvalidHeaderName(#[from] reqwest::header::InvalidHeaderName),
	#[error(transparent)]
	InvalidHeaderValue(#[from] reqwest::header::InvalidHeaderValue),
	#[error("{message}")]
	InvalidConfig { message: String },
	#[error("{message}")]
	InvalidResponse { message: String },
}
impl From<reqwest::Error> for Error {
	fn from(err: reqwest::Error) -> Self {
		if err.is_timeout() {
			return Self::Timeout;
		}

		match err.status() {
			Some(status) if status.as_u16() == 429 => Self::RateLimited,
			Some(status) => Self::Status { status: status.as_u16() },
			None => Self::Reqwest(err),
		}
	}
}
