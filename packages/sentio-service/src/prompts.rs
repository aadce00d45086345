use serde_json::Value;

use sentio_domain::{
	knowledge::KnowledgeSnippet, record::SentimentRecord, statistics::UserStatistics,
};

use crate::pipeline::Classification;

const ANALYSIS_EXCERPT_CHARS: usize = 100;

pub(crate) fn classification_messages(text: &str, strict: bool) -> Vec<Value> {
	let schema = serde_json::json!({
		"sentiment": "positive|negative|neutral",
		"confidence": 0.0,
		"emotions": [
			{ "name": "string", "intensity": 0.0 }
		],
		"intensity": 0.0,
		"analysis": "string"
	});
	let system_prompt = "你是一位专业的心理学家和情感分析专家。你的分析准确、专业、富有洞察力。\
输出必须是合法的 JSON，并且严格符合给定的结构。";
	let mut user_prompt = format!(
		"请对以下文本进行深入的情感分析，并按照以下 JSON 结构输出：\n{schema}\n\
约束：\n\
- confidence、intensity 以及每个情绪的 intensity 都在 0.0 到 1.0 之间\n\
- emotions 至少包含一项；一段文本可能包含多种情绪，请列出所有明显的情绪\n\
- 情绪类型参考（不限于）：快乐、兴奋、满足、感激、希望、平静、悲伤、焦虑、愤怒、恐惧、失望、孤独、压力、疲惫、挫败\n\
- 注意识别隐含的情绪（如讽刺、委婉等），并考虑文化背景和表达习惯\n\
文本：\n{text}"
	);

	if strict {
		user_prompt.push_str(
			"\n\n上一次的回复无法解析。只返回 JSON 对象本身，不要包含代码块标记、解释或任何其他文字。",
		);
	}

	vec![
		serde_json::json!({ "role": "system", "content": system_prompt }),
		serde_json::json!({ "role": "user", "content": user_prompt }),
	]
}

pub(crate) fn causes_messages(text: &str, classification: &Classification) -> Vec<Value> {
	let system_prompt = "你是一位经验丰富的心理咨询师，擅长分析情绪背后的原因。";
	let user_prompt = format!(
		"基于以下文本和情感分析结果，分析导致这种情感的可能原因。用一段简洁的中文直接回答，不要使用 JSON。\n\
文本：{text}\n\
基础情感：{sentiment}\n\
主要情绪：{emotions}\n\
情感强度：{intensity:.2}\n\
详细分析：{analysis}",
		sentiment = classification.sentiment,
		emotions = emotion_names(classification),
		intensity = classification.intensity,
		analysis = classification.analysis,
	);

	vec![
		serde_json::json!({ "role": "system", "content": system_prompt }),
		serde_json::json!({ "role": "user", "content": user_prompt }),
	]
}

pub(crate) fn synthesis_messages(
	classification: &Classification,
	causes: &str,
	knowledge: &[KnowledgeSnippet],
	history: &[SentimentRecord],
) -> Vec<Value> {
	let system_prompt = "你是一位温暖、专业的心理咨询师，擅长提供具体、可操作的心理健康建议。";
	let mut user_prompt = format!(
		"基于以下情感分析结果，请提供专业的、个性化的建议。\n\n\
当前情感分析：\n\
- 基础情感：{sentiment}\n\
- 主要情绪：{emotions}\n\
- 情感强度：{intensity:.2}\n\
- 详细分析：{analysis}\n\
- 可能原因：{causes}\n",
		sentiment = classification.sentiment,
		emotions = emotion_names(classification),
		intensity = classification.intensity,
		analysis = classification.analysis,
	);

	if !history.is_empty() {
		let recent: Vec<&str> = history.iter().map(|record| record.sentiment.as_str()).collect();

		user_prompt.push_str(&format!("\n用户最近的情感状态：{}\n", recent.join(", ")));
	}
	if !knowledge.is_empty() {
		user_prompt.push_str("\n可参考的专业知识：\n");

		for snippet in knowledge {
			user_prompt
				.push_str(&format!("- [{}] {}：{}\n", snippet.category, snippet.technique, snippet.content));
		}
	}

	user_prompt.push_str(
		"\n请提供以下方面的建议：\n\
1. 即时应对策略：针对当前情感状态，可以立即采取的行动\n\
2. 认知调整：帮助重新认识和理解当前的情绪\n\
3. 长期改善：有助于长期心理健康的建议\n\
4. 寻求帮助：如果需要，何时应该寻求专业帮助\n\n\
请用温暖、支持性的语言，提供具体、可操作的建议。字数控制在300-500字之间。",
	);

	vec![
		serde_json::json!({ "role": "system", "content": system_prompt }),
		serde_json::json!({ "role": "user", "content": user_prompt }),
	]
}

pub(crate) fn assessment_messages(stats: &UserStatistics, excerpts: &[SentimentRecord]) -> Vec<Value> {
	let schema = serde_json::json!({
		"overall_score": 0,
		"risk_level": "low|medium|high",
		"key_concerns": ["string"],
		"recommendations": ["string"],
		"detailed_analysis": "string"
	});
	let top_emotions: Vec<String> = stats
		.top_emotions
		.iter()
		.map(|emotion| format!("{}({}次)", emotion.name, emotion.count))
		.collect();
	let excerpt_json: Vec<Value> = excerpts
		.iter()
		.map(|record| {
			serde_json::json!({
				"sentiment": record.sentiment,
				"text": truncate(&record.text, ANALYSIS_EXCERPT_CHARS),
				"causes": truncate(&record.causes, ANALYSIS_EXCERPT_CHARS),
			})
		})
		.collect();
	let excerpt_text = serde_json::to_string_pretty(&excerpt_json).unwrap_or_else(|_| "[]".to_string());
	let system_prompt = "你是一位专业的临床心理学家，擅长基于行为数据进行心理健康评估。\
输出必须是合法的 JSON，并且严格符合给定的结构。";
	let user_prompt = format!(
		"请基于用户的情感记录历史，进行心理健康评估，并按照以下 JSON 结构输出：\n{schema}\n\n\
数据统计：\n\
- 总记录数：{total}\n\
- 积极情感：{positive}次 ({positive_pct:.1}%)\n\
- 消极情感：{negative}次 ({negative_pct:.1}%)\n\
- 中性情感：{neutral}次 ({neutral_pct:.1}%)\n\
- 平均情感强度：{average:.2}\n\
- 常见情绪：{top}\n\n\
最近的记录：\n{excerpt_text}\n\n\
评分标准：\n\
- 80-100：心理状态良好\n\
- 60-79：基本健康，有改善空间\n\
- 40-59：需要关注，建议采取行动\n\
- 0-39：高风险，强烈建议寻求专业帮助\n\n\
risk_level 只能是 low、medium、high 之一。只返回 JSON 对象。",
		total = stats.total_records,
		positive = stats.positive_count,
		positive_pct = stats.ratio(stats.positive_count) * 100.0,
		negative = stats.negative_count,
		negative_pct = stats.ratio(stats.negative_count) * 100.0,
		neutral = stats.neutral_count,
		neutral_pct = stats.ratio(stats.neutral_count) * 100.0,
		average = stats.average_intensity,
		top = top_emotions.join(", "),
	);

	vec![
		serde_json::json!({ "role": "system", "content": system_prompt }),
		serde_json::json!({ "role": "user", "content": user_prompt }),
	]
}

fn emotion_names(classification: &Classification) -> String {
	let names: Vec<&str> = classification.emotions.iter().map(|emotion| emotion.name()).collect();

	names.join(", ")
}

fn truncate(text: &str, max_chars: usize) -> String {
	text.chars().take(max_chars).collect()
}

#[cfg(test)]
mod tests {
	use super::*;
	use sentio_domain::record::{EmotionScore, Sentiment};

	fn classification() -> Classification {
		Classification {
			sentiment: Sentiment::Negative,
			confidence: 0.9,
			emotions: vec![
				EmotionScore::new("焦虑", 0.8).expect("emotion"),
				EmotionScore::new("疲惫", 0.6).expect("emotion"),
			],
			intensity: 0.7,
			analysis: "工作压力导致焦虑。".to_string(),
		}
	}

	#[test]
	fn strict_classification_prompt_adds_json_only_instruction() {
		let relaxed = classification_messages("今天很累", false);
		let strict = classification_messages("今天很累", true);
		let relaxed_user = relaxed[1]["content"].as_str().expect("content");
		let strict_user = strict[1]["content"].as_str().expect("content");

		assert!(strict_user.starts_with(relaxed_user));
		assert!(strict_user.contains("只返回 JSON 对象本身"));
	}

	#[test]
	fn synthesis_prompt_lists_knowledge_and_history() {
		let snippet = KnowledgeSnippet {
			id: "k1".to_string(),
			content: "深呼吸练习".to_string(),
			category: sentio_domain::knowledge::Category::Anxiety,
			technique: "breathing".to_string(),
			distance: 0.1,
		};
		let messages = synthesis_messages(&classification(), "工作量大", &[snippet], &[]);
		let user = messages[1]["content"].as_str().expect("content");

		assert!(user.contains("焦虑, 疲惫"));
		assert!(user.contains("[anxiety] breathing：深呼吸练习"));
		assert!(!user.contains("用户最近的情感状态"));
	}
}
