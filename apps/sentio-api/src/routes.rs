use axum::{
	Json, Router,
	extract::{Path, Query, State},
	http::StatusCode,
	response::{IntoResponse, Response},
	routing::{get, post},
};
use serde::{Deserialize, Serialize};

use sentio_service::{
	AddKnowledgeRequest, AnalyzeBatchRequest, AnalyzeBatchResponse, AnalyzeRequest,
	AnalyzeResponse, Error, KnowledgeSearchRequest,
};

use crate::state::AppState;

pub fn router(state: AppState) -> Router {
	Router::new()
		.route("/api/health", get(health))
		.route("/api/sentiment/analyze", post(analyze))
		.route("/api/sentiment/analyze_batch", post(analyze_batch))
		.route("/api/sentiment/history/{user_id}", get(history))
		.route("/api/sentiment/stats/{user_id}", get(stats))
		.route("/api/sentiment/trends/{user_id}", get(trends))
		.route("/api/health/assessment/{user_id}", get(assessment))
		.route("/api/knowledge/search", get(knowledge_search))
		.route("/api/knowledge", post(add_knowledge))
		.with_state(state)
}

#[derive(Debug, Deserialize)]
struct HistoryQuery {
	limit: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct WindowQuery {
	days: Option<u32>,
}

#[derive(Debug, Serialize)]
struct HealthBody {
	status: &'static str,
	version: &'static str,
	model_configured: bool,
}

async fn health(State(state): State<AppState>) -> Json<HealthBody> {
	let llm = &state.service.cfg.providers.llm;

	Json(HealthBody {
		status: "ok",
		version: env!("CARGO_PKG_VERSION"),
		model_configured: !llm.api_key.trim().is_empty() && !llm.model.trim().is_empty(),
	})
}

async fn analyze(
	State(state): State<AppState>,
	Json(payload): Json<AnalyzeRequest>,
) -> Result<Json<AnalyzeResponse>, ApiError> {
	let response = state.service.analyze(payload).await?;

	Ok(Json(response))
}

async fn analyze_batch(
	State(state): State<AppState>,
	Json(payload): Json<AnalyzeBatchRequest>,
) -> Result<Json<AnalyzeBatchResponse>, ApiError> {
	let response = state.service.analyze_batch(payload).await?;

	Ok(Json(response))
}

async fn history(
	State(state): State<AppState>,
	Path(user_id): Path<String>,
	Query(query): Query<HistoryQuery>,
) -> Result<Response, ApiError> {
	let records = state.service.history(&user_id, query.limit).await?;

	Ok(Json(records).into_response())
}

async fn stats(
	State(state): State<AppState>,
	Path(user_id): Path<String>,
	Query(query): Query<WindowQuery>,
) -> Result<Response, ApiError> {
	let stats = state.service.statistics(&user_id, query.days).await?;

	Ok(Json(stats).into_response())
}

async fn trends(
	State(state): State<AppState>,
	Path(user_id): Path<String>,
	Query(query): Query<WindowQuery>,
) -> Result<Response, ApiError> {
	let summary = state.service.trend_summary(&user_id, query.days).await?;

	Ok(Json(summary).into_response())
}

async fn assessment(
	State(state): State<AppState>,
	Path(user_id): Path<String>,
	Query(query): Query<WindowQuery>,
) -> Result<Response, ApiError> {
	let assessment = state.service.assessment(&user_id, query.days).await?;

	Ok(Json(assessment).into_response())
}

async fn knowledge_search(
	State(state): State<AppState>,
	Query(query): Query<KnowledgeSearchRequest>,
) -> Result<Response, ApiError> {
	let snippets = state.service.knowledge_search(query).await?;

	Ok(Json(snippets).into_response())
}

async fn add_knowledge(
	State(state): State<AppState>,
	Json(payload): Json<AddKnowledgeRequest>,
) -> Result<Response, ApiError> {
	let snippet = state.service.add_knowledge(payload).await?;

	Ok((StatusCode::CREATED, Json(snippet)).into_response())
}

#[derive(Debug, Serialize)]
struct ErrorBody {
	error_code: String,
	message: String,
}

#[derive(Debug)]
pub struct ApiError {
	status: StatusCode,
	error_code: String,
	message: String,
}
impl ApiError {
	fn new(status: StatusCode, error_code: impl Into<String>, message: impl Into<String>) -> Self {
		Self { status, error_code: error_code.into(), message: message.into() }
	}
}

impl From<Error> for ApiError {
	fn from(err: Error) -> Self {
		let status = match &err {
			Error::Validation { .. } => StatusCode::BAD_REQUEST,
			Error::Timeout { .. } => StatusCode::GATEWAY_TIMEOUT,
			Error::Upstream { .. } | Error::MalformedResponse { .. } => StatusCode::BAD_GATEWAY,
			Error::Storage { .. } | Error::CacheCorruption { .. } =>
				StatusCode::INTERNAL_SERVER_ERROR,
		};

		if status.is_server_error() {
			tracing::error!(error = %err, "Request failed.");
		}

		let message = match &err {
			Error::Validation { message } => message.clone(),
			other => other.to_string(),
		};

		Self::new(status, err.code(), message)
	}
}

impl IntoResponse for ApiError {
	fn into_response(self) -> Response {
		let body = ErrorBody { error_code: self.error_code, message: self.message };

		(self.status, Json(body)).into_response()
	}
}
