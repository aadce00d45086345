use std::sync::Arc;

use sentio_service::{Collaborators, Providers, SentioService};
use sentio_storage::{db::Db, qdrant::QdrantStore};

#[derive(Clone)]
pub struct AppState {
	pub service: Arc<SentioService>,
}
impl AppState {
	pub async fn new(config: sentio_config::Config) -> color_eyre::Result<Self> {
		let db = Db::connect(&config.storage.postgres).await?;

		db.ensure_schema().await?;

		let qdrant = QdrantStore::new(&config.storage.qdrant)?;

		qdrant.ensure_collection().await?;

		let service = SentioService::new(
			config,
			Collaborators {
				providers: Providers::default(),
				index: Arc::new(qdrant),
				store: Arc::new(db),
			},
		);

		Ok(Self::from_service(service))
	}

	pub fn from_service(service: SentioService) -> Self {
		Self { service: Arc::new(service) }
	}
}
