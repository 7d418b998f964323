mod error;
mod rate_limit;

use std::sync::Arc;

use anyhow::{Context, Result};
use axum::body::Body;
use axum::extract::{Json, Path, State};
use axum::http::{header, HeaderValue, Method, Request, StatusCode};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::Router;
use lectern_core::{
    ChatAnswer, ChatMessage, Chunk, ConceptExplanation, Document, DocumentSummary,
    GeneratedSummary, LecternConfig, ScoredChunk,
};
use lectern_generation::GeneratorStack;
use lectern_observability::{AppMetrics, MetricsSnapshot};
use lectern_pipeline::{DocumentPipeline, DocumentSource};
use lectern_storage::Store;
use serde::{Deserialize, Serialize};
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info};

pub use error::ApiError;
pub use rate_limit::ClientRateLimiter;

use error::error_response;

const MAX_UPLOAD_BYTES: usize = 16 * 1024 * 1024;

#[derive(Clone)]
pub struct ApiState {
    pub pipeline: Arc<DocumentPipeline<Store>>,
    pub metrics: Arc<AppMetrics>,
    pub api_key: String,
    pub limiter: ClientRateLimiter,
    pub default_max_chunks: usize,
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    timestamp_utc: String,
    generator: &'static str,
    metrics: MetricsSnapshot,
}

#[derive(Debug, Deserialize)]
struct CreateDocumentRequest {
    title: String,
    file_name: Option<String>,
    text: String,
}

#[derive(Debug, Deserialize)]
struct UpdateDocumentRequest {
    title: String,
}

#[derive(Debug, Deserialize)]
struct SummaryRequest {
    document_id: String,
}

#[derive(Debug, Deserialize)]
struct SearchRequest {
    query: String,
    max_chunks: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct ChatRequest {
    document_id: String,
    question: String,
}

#[derive(Debug, Deserialize)]
struct ExplainRequest {
    document_id: String,
    concept: String,
}

pub async fn build_app() -> Result<Router> {
    let config = LecternConfig::from_env().context("invalid lectern configuration")?;
    build_app_with_config(config).await
}

pub async fn build_app_with_config(config: LecternConfig) -> Result<Router> {
    let metrics = AppMetrics::shared();
    let generator = GeneratorStack::load_default();

    let store = Store::from_database_url(config.database_url.as_deref())
        .await
        .context("failed to open document store")?;

    let pipeline = Arc::new(DocumentPipeline::new(
        Arc::new(store),
        generator,
        metrics.clone(),
        config.chunking,
        config.retrieval,
    ));

    let state = ApiState {
        pipeline,
        metrics,
        api_key: config.api_key,
        limiter: ClientRateLimiter::new(config.rate_limit_window, config.rate_limit_max),
        default_max_chunks: config.retrieval.max_chunks,
    };

    Ok(build_router(state))
}

pub fn build_router(state: ApiState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/v1/documents", get(list_documents).post(create_document))
        .route(
            "/v1/documents/{id}",
            get(get_document)
                .put(update_document)
                .delete(delete_document),
        )
        .route("/v1/documents/{id}/chunks", get(list_chunks))
        .route("/v1/documents/{id}/search", post(search_chunks))
        .route("/v1/ai/chat", post(chat))
        .route("/v1/ai/chat/{document_id}", get(chat_history))
        .route("/v1/ai/explain-concept", post(explain_concept))
        .route("/v1/ai/generate-summary", post(generate_summary))
        .layer(build_cors_layer())
        .layer(TraceLayer::new_for_http())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(RequestBodyLimitLayer::new(MAX_UPLOAD_BYTES))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            api_key_middleware,
        ))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            rate_limit_middleware,
        ))
        .with_state(state)
}

fn build_cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers(Any)
}

async fn health(State(state): State<ApiState>) -> impl IntoResponse {
    let payload = HealthResponse {
        status: "ok",
        timestamp_utc: chrono::Utc::now().to_rfc3339(),
        generator: state.pipeline.generator_name(),
        metrics: state.metrics.snapshot(),
    };
    (StatusCode::OK, Json(payload))
}

async fn list_documents(
    State(state): State<ApiState>,
) -> Result<Json<Vec<DocumentSummary>>, ApiError> {
    Ok(Json(state.pipeline.list_documents().await?))
}

async fn create_document(
    State(state): State<ApiState>,
    Json(request): Json<CreateDocumentRequest>,
) -> Result<(StatusCode, Json<Document>), ApiError> {
    let file_name = request
        .file_name
        .filter(|name| !name.trim().is_empty())
        .unwrap_or_else(|| format!("{}.txt", request.title.trim()));

    let document = state
        .pipeline
        .register(&request.title, &file_name, request.text.len() as u64)
        .await?;

    let pipeline = state.pipeline.clone();
    let document_id = document.id.clone();
    let text = request.text;
    tokio::spawn(async move {
        if let Err(err) = pipeline
            .process(&document_id, DocumentSource::Text(text))
            .await
        {
            error!(document_id = %document_id, error = %err, "background processing failed");
        }
    });

    info!(document_id = %document.id, title = %document.title, "document accepted");
    Ok((StatusCode::CREATED, Json(document)))
}

async fn get_document(
    State(state): State<ApiState>,
    Path(id): Path<String>,
) -> Result<Json<Document>, ApiError> {
    Ok(Json(state.pipeline.document(&id).await?))
}

async fn update_document(
    State(state): State<ApiState>,
    Path(id): Path<String>,
    Json(request): Json<UpdateDocumentRequest>,
) -> Result<Json<Document>, ApiError> {
    Ok(Json(state.pipeline.rename(&id, &request.title).await?))
}

async fn delete_document(
    State(state): State<ApiState>,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, ApiError> {
    state.pipeline.delete(&id).await?;
    Ok(Json(serde_json::json!({ "deleted": id })))
}

async fn list_chunks(
    State(state): State<ApiState>,
    Path(id): Path<String>,
) -> Result<Json<Vec<Chunk>>, ApiError> {
    Ok(Json(state.pipeline.document(&id).await?.chunks))
}

async fn search_chunks(
    State(state): State<ApiState>,
    Path(id): Path<String>,
    Json(request): Json<SearchRequest>,
) -> Result<Json<Vec<ScoredChunk>>, ApiError> {
    let max_chunks = request
        .max_chunks
        .map(|value| value.max(0) as usize)
        .unwrap_or(state.default_max_chunks);

    let ranked = state
        .pipeline
        .relevant_chunks(&id, &request.query, max_chunks)
        .await?;
    Ok(Json(ranked))
}

async fn chat(
    State(state): State<ApiState>,
    Json(request): Json<ChatRequest>,
) -> Result<Json<ChatAnswer>, ApiError> {
    let answer = state
        .pipeline
        .chat(&request.document_id, &request.question)
        .await?;
    Ok(Json(answer))
}

async fn chat_history(
    State(state): State<ApiState>,
    Path(document_id): Path<String>,
) -> Result<Json<Vec<ChatMessage>>, ApiError> {
    Ok(Json(state.pipeline.chat_history(&document_id).await?))
}

async fn explain_concept(
    State(state): State<ApiState>,
    Json(request): Json<ExplainRequest>,
) -> Result<Json<ConceptExplanation>, ApiError> {
    let explanation = state
        .pipeline
        .explain_concept(&request.document_id, &request.concept)
        .await?;
    Ok(Json(explanation))
}

async fn generate_summary(
    State(state): State<ApiState>,
    Json(request): Json<SummaryRequest>,
) -> Result<Json<GeneratedSummary>, ApiError> {
    Ok(Json(state.pipeline.summary(&request.document_id).await?))
}

fn is_public_endpoint(path: &str) -> bool {
    path == "/health"
}

async fn api_key_middleware(
    State(state): State<ApiState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    if request.method() == Method::OPTIONS || is_public_endpoint(request.uri().path()) {
        return next.run(request).await;
    }

    let header_key = request
        .headers()
        .get("x-api-key")
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default();

    if header_key != state.api_key {
        return error_response(
            StatusCode::UNAUTHORIZED,
            "unauthorized",
            "missing or invalid x-api-key",
        );
    }

    next.run(request).await
}

async fn rate_limit_middleware(
    State(state): State<ApiState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    if request.method() == Method::OPTIONS || is_public_endpoint(request.uri().path()) {
        return next.run(request).await;
    }

    let client = client_address(&request);
    if let Err(retry_after) = state.limiter.check(&client) {
        let mut response = error_response(
            StatusCode::TOO_MANY_REQUESTS,
            "rate_limited",
            "rate limit exceeded for this client",
        );
        let seconds = retry_after.as_secs().max(1).to_string();
        if let Ok(value) = HeaderValue::from_str(&seconds) {
            response.headers_mut().insert(header::RETRY_AFTER, value);
        }
        return response;
    }

    next.run(request).await
}

fn client_address(request: &Request<Body>) -> String {
    request
        .headers()
        .get("x-forwarded-for")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(',').next())
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .unwrap_or_else(|| "local".to_string())
}
