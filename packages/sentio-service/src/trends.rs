use sentio_domain::statistics::{DailyTrend, TrendDirection, TrendPattern, TrendSummary};

const MIN_DAYS_FOR_DIRECTION: usize = 7;
const MIN_DAYS_FOR_SPREAD: usize = 3;
const DIRECTION_THRESHOLD: f64 = 0.1;
const NEGATIVE_DAY_THRESHOLD: f64 = -0.2;
const CONSECUTIVE_NEGATIVE_DAYS: usize = 3;
const WEEKLY_IMPROVEMENT_SHARE: f64 = 0.3;

/// Derives the trend summary from an ascending daily trend.
pub fn summarize(daily: &[DailyTrend]) -> TrendSummary {
	let scores: Vec<f64> = daily.iter().map(|day| f64::from(day.sentiment_score)).collect();

	TrendSummary {
		direction: direction(&scores),
		stability_score: stability(&scores) as f32,
		emotional_volatility: volatility(&scores) as f32,
		improvement_rate: improvement_rate(&scores) as f32,
		patterns: patterns(&scores),
	}
}

fn direction(scores: &[f64]) -> TrendDirection {
	if scores.len() < MIN_DAYS_FOR_DIRECTION {
		return TrendDirection::InsufficientData;
	}

	let (first, second) = scores.split_at(scores.len() / 2);
	let diff = mean(second) - mean(first);

	if diff > DIRECTION_THRESHOLD {
		TrendDirection::Improving
	} else if diff < -DIRECTION_THRESHOLD {
		TrendDirection::Declining
	} else {
		TrendDirection::Stable
	}
}

/// `1 - variance`, floored at 0.
fn stability(scores: &[f64]) -> f64 {
	if scores.len() < MIN_DAYS_FOR_SPREAD {
		return 0.0;
	}

	let mean = mean(scores);
	let variance = scores.iter().map(|score| (score - mean).powi(2)).sum::<f64>() / scores.len() as f64;

	(1.0 - variance).max(0.0)
}

/// Mean absolute change between consecutive days.
fn volatility(scores: &[f64]) -> f64 {
	if scores.len() < MIN_DAYS_FOR_SPREAD {
		return 0.0;
	}

	let deltas: Vec<f64> = scores.windows(2).map(|pair| (pair[1] - pair[0]).abs()).collect();

	mean(&deltas)
}

/// Least-squares slope of score against day index.
fn improvement_rate(scores: &[f64]) -> f64 {
	if scores.len() < MIN_DAYS_FOR_DIRECTION {
		return 0.0;
	}

	let n = scores.len() as f64;
	let x_mean = (n - 1.0) / 2.0;
	let y_mean = mean(scores);
	let (numerator, denominator) =
		scores.iter().enumerate().fold((0.0, 0.0), |(num, den), (i, y)| {
			let dx = i as f64 - x_mean;

			(num + dx * (y - y_mean), den + dx * dx)
		});

	if denominator == 0.0 { 0.0 } else { numerator / denominator }
}

fn patterns(scores: &[f64]) -> Vec<TrendPattern> {
	let mut patterns = Vec::new();

	if scores.len() < MIN_DAYS_FOR_DIRECTION {
		return patterns;
	}

	let weekly_improvements =
		(MIN_DAYS_FOR_DIRECTION..scores.len()).filter(|&i| scores[i] > scores[i - 7]).count();

	if weekly_improvements as f64 > scores.len() as f64 * WEEKLY_IMPROVEMENT_SHARE {
		patterns.push(TrendPattern::WeeklyImprovement);
	}

	let mut run = 0;
	let mut longest = 0;

	for score in scores {
		if *score < NEGATIVE_DAY_THRESHOLD {
			run += 1;
			longest = longest.max(run);
		} else {
			run = 0;
		}
	}

	if longest >= CONSECUTIVE_NEGATIVE_DAYS {
		patterns.push(TrendPattern::ConsecutiveNegative);
	}

	patterns
}

fn mean(values: &[f64]) -> f64 {
	if values.is_empty() { 0.0 } else { values.iter().sum::<f64>() / values.len() as f64 }
}

#[cfg(test)]
mod tests {
	use super::*;
	use time::{Date, Duration, macros::date};

	fn trend(scores: &[f32]) -> Vec<DailyTrend> {
		let start: Date = date!(2024 - 01 - 01);

		scores
			.iter()
			.enumerate()
			.map(|(i, score)| DailyTrend {
				date: start + Duration::days(i as i64),
				sentiment_score: *score,
				emotion_distribution: Default::default(),
			})
			.collect()
	}

	#[test]
	fn short_series_reports_insufficient_data() {
		let summary = summarize(&trend(&[0.5, -0.5]));

		assert_eq!(summary.direction, TrendDirection::InsufficientData);
		assert_eq!(summary.stability_score, 0.0);
		assert_eq!(summary.emotional_volatility, 0.0);
		assert_eq!(summary.improvement_rate, 0.0);
		assert!(summary.patterns.is_empty());
	}

	#[test]
	fn rising_scores_are_improving() {
		let summary = summarize(&trend(&[-1.0, -1.0, -1.0, 0.0, 1.0, 1.0, 1.0]));

		assert_eq!(summary.direction, TrendDirection::Improving);
		assert!(summary.improvement_rate > 0.0);
		assert!(summary.patterns.contains(&TrendPattern::ConsecutiveNegative));
	}

	#[test]
	fn flat_series_is_stable_and_fully_stable() {
		let summary = summarize(&trend(&[0.0; 8]));

		assert_eq!(summary.direction, TrendDirection::Stable);
		assert_eq!(summary.stability_score, 1.0);
		assert_eq!(summary.emotional_volatility, 0.0);
		assert!(summary.patterns.is_empty());
	}

	#[test]
	fn volatility_is_mean_absolute_delta() {
		let summary = summarize(&trend(&[1.0, -1.0, 1.0]));

		assert_eq!(summary.emotional_volatility, 2.0);
		assert_eq!(summary.direction, TrendDirection::InsufficientData);
	}

	#[test]
	fn detects_weekly_improvement() {
		let mut scores = vec![-0.5_f32; 7];

		scores.extend([0.5_f32; 7]);

		let summary = summarize(&trend(&scores));

		assert!(summary.patterns.contains(&TrendPattern::WeeklyImprovement));
		assert_eq!(summary.direction, TrendDirection::Improving);
	}
}
