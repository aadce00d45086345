//! Collaborator implementations backed by `sentio-storage`.

use time::OffsetDateTime;

use sentio_domain::{
	knowledge::{Category, KnowledgeSnippet},
	record::SentimentRecord,
};
use sentio_storage::{db::Db, qdrant::QdrantStore, records};

use crate::{BoxFuture, Error, KnowledgeIndex, RecordStore, Result, Stage};

impl RecordStore for Db {
	fn append<'a>(&'a self, record: &'a SentimentRecord) -> BoxFuture<'a, Result<()>> {
		Box::pin(async move {
			records::insert_record(&self.pool, record).await?;

			Ok(())
		})
	}

	fn query<'a>(
		&'a self,
		user_id: &'a str,
		since: Option<OffsetDateTime>,
	) -> BoxFuture<'a, Result<Vec<SentimentRecord>>> {
		Box::pin(async move { Ok(records::records_since(&self.pool, user_id, since).await?) })
	}

	fn recent<'a>(
		&'a self,
		user_id: &'a str,
		limit: u32,
	) -> BoxFuture<'a, Result<Vec<SentimentRecord>>> {
		Box::pin(async move { Ok(records::recent_records(&self.pool, user_id, limit).await?) })
	}
}

// The index is a remote service, so its failures count against the retrieval stage.
impl KnowledgeIndex for QdrantStore {
	fn query<'a>(
		&'a self,
		vector: Vec<f32>,
		categories: &'a [Category],
		top_k: u32,
	) -> BoxFuture<'a, Result<Vec<KnowledgeSnippet>>> {
		Box::pin(async move {
			self.query_snippets(vector, categories, top_k).await.map_err(index_error)
		})
	}

	fn upsert<'a>(
		&'a self,
		snippet: &'a KnowledgeSnippet,
		vector: Vec<f32>,
	) -> BoxFuture<'a, Result<()>> {
		Box::pin(async move { self.upsert_snippet(snippet, vector).await.map_err(index_error) })
	}
}

fn index_error(err: sentio_storage::Error) -> Error {
	Error::Upstream { stage: Stage::Retrieval, message: err.to_string() }
}
