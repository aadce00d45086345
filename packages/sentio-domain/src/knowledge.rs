use std::{collections::BTreeSet, fmt};

use serde::{Deserialize, Serialize};

/// Coarse buckets used to filter the knowledge corpus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
	Anxiety,
	Sadness,
	Stress,
	Anger,
	Loneliness,
	General,
	Crisis,
}
impl Category {
	pub const ALL: [Self; 7] = [
		Self::Anxiety,
		Self::Sadness,
		Self::Stress,
		Self::Anger,
		Self::Loneliness,
		Self::General,
		Self::Crisis,
	];

	/// Unknown labels fold into [`Category::General`].
	pub fn from_label(label: &str) -> Self {
		match label.trim().to_ascii_lowercase().as_str() {
			"anxiety" => Self::Anxiety,
			"sadness" => Self::Sadness,
			"stress" => Self::Stress,
			"anger" => Self::Anger,
			"loneliness" => Self::Loneliness,
			"crisis" => Self::Crisis,
			_ => Self::General,
		}
	}

	pub fn as_str(self) -> &'static str {
		match self {
			Self::Anxiety => "anxiety",
			Self::Sadness => "sadness",
			Self::Stress => "stress",
			Self::Anger => "anger",
			Self::Loneliness => "loneliness",
			Self::General => "general",
			Self::Crisis => "crisis",
		}
	}
}
impl fmt::Display for Category {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KnowledgeSnippet {
	pub id: String,
	pub content: String,
	pub category: Category,
	pub technique: String,
	/// Semantic distance to the query; lower is closer.
	pub distance: f32,
}

const CONCERN_TABLE: &[(&[&str], &[Category])] = &[
	(
		&["anxiety", "anxious", "worry", "worried", "nervous", "fear", "panic", "焦虑", "担心", "紧张", "恐惧", "害怕", "不安"],
		&[Category::Anxiety, Category::Stress],
	),
	(
		&["stress", "stressed", "overwhelmed", "exhaustion", "exhausted", "fatigue", "tired", "压力", "疲惫", "疲劳", "累", "烦躁"],
		&[Category::Stress, Category::Anxiety],
	),
	(
		&["sadness", "sad", "depression", "depressed", "disappointment", "grief", "悲伤", "难过", "抑郁", "失望", "沮丧", "伤心"],
		&[Category::Sadness],
	),
	(
		&["loneliness", "lonely", "isolation", "孤独", "寂寞", "孤单"],
		&[Category::Loneliness, Category::Sadness],
	),
	(
		&["anger", "angry", "frustration", "frustrated", "irritation", "rage", "愤怒", "生气", "挫败", "恼火"],
		&[Category::Anger, Category::Stress],
	),
	(
		&["hopelessness", "hopeless", "despair", "self-harm", "suicidal", "绝望", "轻生", "自残"],
		&[Category::Crisis, Category::Sadness],
	),
];

/// Concern categories implied by an emotion name. Unmapped names yield `{general}`.
pub fn concern_categories(emotion: &str) -> BTreeSet<Category> {
	let normalized = emotion.trim().to_lowercase();

	for (names, categories) in CONCERN_TABLE {
		if names.iter().any(|name| *name == normalized) {
			return categories.iter().copied().collect();
		}
	}

	BTreeSet::from([Category::General])
}

/// Parses a list of category labels, folding unknown labels into `general`.
pub fn categories_from_labels<'a, I>(labels: I) -> BTreeSet<Category>
where
	I: IntoIterator<Item = &'a str>,
{
	labels.into_iter().map(Category::from_label).collect()
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn unknown_labels_fold_into_general() {
		assert_eq!(Category::from_label("positive"), Category::General);
		assert_eq!(Category::from_label(""), Category::General);
		assert_eq!(Category::from_label(" Anxiety "), Category::Anxiety);
	}

	#[test]
	fn anxiety_and_fatigue_map_to_stress_and_anxiety() {
		let expected = BTreeSet::from([Category::Anxiety, Category::Stress]);

		assert_eq!(concern_categories("焦虑"), expected);
		assert_eq!(concern_categories("疲惫"), expected);
		assert_eq!(concern_categories("Anxiety"), expected);
	}

	#[test]
	fn unmapped_emotions_map_to_general() {
		assert_eq!(concern_categories("快乐"), BTreeSet::from([Category::General]));
	}
}
