use std::env;

use time::{Duration, OffsetDateTime};
use uuid::Uuid;

use sentio_domain::record::{EmotionScore, Sentiment, SentimentRecord};
use sentio_storage::{db::Db, records};

fn record(user_id: &str, created_at: OffsetDateTime, sentiment: Sentiment) -> SentimentRecord {
	SentimentRecord {
		id: Uuid::new_v4(),
		user_id: user_id.to_string(),
		text: "今天的工作压力很大".to_string(),
		sentiment,
		confidence: 0.8,
		emotions: vec![EmotionScore::new("压力", 0.7).expect("valid emotion")],
		intensity: 0.7,
		analysis: "analysis".to_string(),
		causes: "causes".to_string(),
		suggestions: "suggestions".to_string(),
		created_at,
	}
}

#[tokio::test]
async fn records_round_trip_through_postgres() {
	let Ok(dsn) = env::var("SENTIO_PG_DSN") else {
		eprintln!("Skipping records_round_trip_through_postgres; set SENTIO_PG_DSN to run.");

		return;
	};
	let db = Db::connect(&sentio_config::Postgres { dsn, pool_max_conns: 1 })
		.await
		.expect("Failed to connect to Postgres.");

	db.ensure_schema().await.expect("Failed to ensure schema.");

	let user_id = format!("smoke_{}", Uuid::new_v4().simple());
	let now = OffsetDateTime::now_utc();
	let old = record(&user_id, now - Duration::days(40), Sentiment::Positive);
	let fresh = record(&user_id, now - Duration::days(1), Sentiment::Negative);

	records::insert_record(&db.pool, &old).await.expect("insert old");
	records::insert_record(&db.pool, &fresh).await.expect("insert fresh");

	let windowed = records::records_since(&db.pool, &user_id, Some(now - Duration::days(30)))
		.await
		.expect("query window");

	assert_eq!(windowed.len(), 1);
	assert_eq!(windowed[0].id, fresh.id);
	assert_eq!(windowed[0].emotions, fresh.emotions);

	let recent = records::recent_records(&db.pool, &user_id, 10).await.expect("query recent");

	assert_eq!(recent.iter().map(|r| r.id).collect::<Vec<_>>(), vec![fresh.id, old.id]);

	sqlx::query("DELETE FROM sentiment_records WHERE user_id = $1")
		.bind(&user_id)
		.execute(&db.pool)
		.await
		.expect("cleanup");
}
