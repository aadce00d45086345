pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum Error {
	#[error("Emotion {name:?} has intensity {intensity} outside 0.0-1.0.")]
	IntensityOutOfRange { name: String, intensity: f32 },
	#[error("Emotion name must be non-empty.")]
	EmptyEmotionName,
	#[error("Unknown sentiment label {0:?}.")]
	UnknownSentiment(String),
	#[error("Unknown risk level {0:?}.")]
	UnknownRiskLevel(String),
}
