use std::collections::HashMap;

use qdrant_client::qdrant::{
	Condition, CreateCollectionBuilder, CreateFieldIndexCollectionBuilder, Distance, FieldType,
	Filter, PointStruct, Query, QueryPointsBuilder, ScoredPoint, UpsertPointsBuilder, Value,
	VectorParamsBuilder, value::Kind,
};
use uuid::Uuid;

use sentio_domain::knowledge::{Category, KnowledgeSnippet};

use crate::{Error, Result};

pub const CATEGORY_FIELD: &str = "category";

pub struct QdrantStore {
	pub client: qdrant_client::Qdrant,
	pub collection: String,
	pub vector_dim: u32,
}
impl QdrantStore {
	pub fn new(cfg: &sentio_config::Qdrant) -> Result<Self> {
		let client = qdrant_client::Qdrant::from_url(&cfg.url).build()?;

		Ok(Self { client, collection: cfg.collection.clone(), vector_dim: cfg.vector_dim })
	}

	pub async fn ensure_collection(&self) -> Result<()> {
		if self.client.collection_exists(&self.collection).await? {
			return Ok(());
		}

		self.client
			.create_collection(CreateCollectionBuilder::new(self.collection.clone()).vectors_config(
				VectorParamsBuilder::new(u64::from(self.vector_dim), Distance::Cosine),
			))
			.await?;
		self.client
			.create_field_index(CreateFieldIndexCollectionBuilder::new(
				self.collection.clone(),
				CATEGORY_FIELD,
				FieldType::Keyword,
			))
			.await?;

		Ok(())
	}

	/// Nearest snippets to `vector`, optionally restricted to `categories`.
	pub async fn query_snippets(
		&self,
		vector: Vec<f32>,
		categories: &[Category],
		top_k: u32,
	) -> Result<Vec<KnowledgeSnippet>> {
		if vector.len() != self.vector_dim as usize {
			return Err(Error::InvalidArgument(format!(
				"query vector has {} dimensions, collection expects {}",
				vector.len(),
				self.vector_dim
			)));
		}

		let mut search = QueryPointsBuilder::new(self.collection.clone())
			.query(Query::new_nearest(vector))
			.with_payload(true)
			.limit(u64::from(top_k));

		if let Some(filter) = category_filter(categories) {
			search = search.filter(filter);
		}

		let response = self.client.query(search).await?;

		Ok(response.result.into_iter().filter_map(snippet_from_point).collect())
	}

	pub async fn upsert_snippet(&self, snippet: &KnowledgeSnippet, vector: Vec<f32>) -> Result<()> {
		if vector.len() != self.vector_dim as usize {
			return Err(Error::InvalidArgument(format!(
				"snippet vector has {} dimensions, collection expects {}",
				vector.len(),
				self.vector_dim
			)));
		}

		let mut payload = qdrant_client::Payload::new();

		payload.insert("snippet_id", snippet.id.clone());
		payload.insert("content", snippet.content.clone());
		payload.insert(CATEGORY_FIELD, snippet.category.as_str().to_string());
		payload.insert("technique", snippet.technique.clone());

		let point = PointStruct::new(point_id(&snippet.id).to_string(), vector, payload);

		self.client
			.upsert_points(
				UpsertPointsBuilder::new(self.collection.clone(), vec![point]).wait(true),
			)
			.await?;

		Ok(())
	}
}

/// Snippet ids are free-form strings; Qdrant needs a UUID, so derive a stable one.
pub fn point_id(snippet_id: &str) -> Uuid {
	Uuid::new_v5(&Uuid::NAMESPACE_OID, snippet_id.as_bytes())
}

/// Payload filter matching how [`snippet_from_point`] reads categories back.
///
/// Points with a missing or non-canonical label read back as [`Category::General`], so a filter
/// that admits `general` also admits every point outside the canonical labels.
pub fn category_filter(categories: &[Category]) -> Option<Filter> {
	if categories.is_empty() {
		return None;
	}

	let labels: Vec<String> =
		categories.iter().map(|category| category.as_str().to_string()).collect();
	let mut any_of = vec![Condition::matches(CATEGORY_FIELD, labels)];

	if categories.contains(&Category::General) {
		let canonical: Vec<String> =
			Category::ALL.iter().map(|category| category.as_str().to_string()).collect();

		any_of.push(Filter::must_not([Condition::matches(CATEGORY_FIELD, canonical)]).into());
	}

	Some(Filter::should(any_of))
}

fn snippet_from_point(point: ScoredPoint) -> Option<KnowledgeSnippet> {
	let payload = &point.payload;
	let id = payload_str(payload, "snippet_id")?;
	let content = payload_str(payload, "content")?;
	let category = payload_str(payload, CATEGORY_FIELD)
		.map(|label| Category::from_label(&label))
		.unwrap_or(Category::General);
	let technique = payload_str(payload, "technique").unwrap_or_default();

	// Cosine similarity in [-1, 1] becomes a distance where lower is closer.
	Some(KnowledgeSnippet { id, content, category, technique, distance: 1.0 - point.score })
}

fn payload_str(payload: &HashMap<String, Value>, key: &str) -> Option<String> {
	let value = payload.get(key)?;

	match &value.kind {
		Some(Kind::StringValue(text)) => Some(text.clone()),
		_ => None,
	}
}
