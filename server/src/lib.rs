use anyhow::Result;
use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use docsearch_core::persist::{load_index, IndexPaths};
use docsearch_core::{parse_top_k, Config, DocId, IndexHandle, QueryError, SearchEngine, SearchHit, SearchOptions};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

#[derive(Deserialize)]
pub struct SearchParams {
    pub q: String,
    /// Kept as text so a non-integer can be reported as a query error.
    #[serde(default)]
    pub k: Option<String>,
}

#[derive(Serialize)]
pub struct SearchResponse {
    pub query: String,
    pub took_s: f64,
    pub results: Vec<SearchResult>,
}

#[derive(Serialize)]
pub struct SearchResult {
    pub doc_id: DocId,
    pub location: String,
    pub page: String,
    pub title: String,
    pub category: String,
    pub score: f32,
    pub parent: Option<String>,
    /// Excerpt with matches wrapped in `<em>`.
    pub snippet: String,
}

impl From<SearchHit> for SearchResult {
    fn from(hit: SearchHit) -> Self {
        Self {
            doc_id: hit.doc_id,
            snippet: hit.snippet.to_string(),
            location: hit.location,
            page: hit.page,
            title: hit.title,
            category: hit.category.into(),
            score: hit.score,
            parent: hit.parent,
        }
    }
}

#[derive(Clone)]
pub struct AppState {
    pub paths: IndexPaths,
    pub handle: Arc<IndexHandle>,
    pub options: SearchOptions,
    pub admin_token: Option<String>,
}

pub enum ApiError {
    Query(QueryError),
    NotFound,
    Unauthorized(&'static str),
    Internal(String),
}

impl From<QueryError> for ApiError {
    fn from(err: QueryError) -> Self { Self::Query(err) }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            Self::Query(err) => (StatusCode::BAD_REQUEST, err.to_string()),
            Self::NotFound => (StatusCode::NOT_FOUND, "not found".to_string()),
            Self::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg.to_string()),
            Self::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };
        (status, Json(serde_json::json!({ "error": message }))).into_response()
    }
}

/// Build the router, taking the admin token from `ADMIN_TOKEN`.
pub fn build_app(index_dir: String, config: &Config) -> Result<Router> {
    build_app_with_token(index_dir, config, std::env::var("ADMIN_TOKEN").ok())
}

pub fn build_app_with_token(index_dir: String, config: &Config, admin_token: Option<String>) -> Result<Router> {
    // Load index at startup
    let paths = IndexPaths::new(&index_dir);
    let index = load_index(&paths)?;
    let app_state = AppState { paths, handle: Arc::new(IndexHandle::new(index)), options: config.search_options(), admin_token };

    // CORS: read CORS_ALLOW_ORIGIN (comma-separated) or allow Any by default
    let cors = match std::env::var("CORS_ALLOW_ORIGIN") {
        Ok(val) => {
            let origins: Vec<_> = val
                .split(',')
                .filter_map(|s| s.trim().parse().ok())
                .collect();
            if origins.is_empty() {
                CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any)
            } else {
                CorsLayer::new().allow_origin(AllowOrigin::list(origins)).allow_methods(Any).allow_headers(Any)
            }
        }
        Err(_) => CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any),
    };

    let app = Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/search", get(search_handler))
        .route("/doc/:doc_id", get(doc_handler))
        .route("/admin/reload", post(reload_handler))
        .with_state(app_state)
        .layer(cors)
        .layer(TraceLayer::new_for_http());
    Ok(app)
}

pub async fn search_handler(State(state): State<AppState>, Query(params): Query<SearchParams>) -> Result<Json<SearchResponse>, ApiError> {
    let start = std::time::Instant::now();
    // One snapshot per request; a concurrent reload does not affect it.
    let engine = SearchEngine::new(state.handle.current(), state.options.clone());
    let hits = match params.k.as_deref() {
        Some(raw) => engine.search(&params.q, parse_top_k(raw)?)?,
        None => engine.search_default(&params.q)?,
    };
    let results = hits.into_iter().map(SearchResult::from).collect();
    let elapsed = start.elapsed();
    Ok(Json(SearchResponse { query: params.q, took_s: elapsed.as_secs_f64(), results }))
}

pub async fn doc_handler(State(state): State<AppState>, Path(doc_id): Path<DocId>) -> Result<Json<serde_json::Value>, ApiError> {
    let index = state.handle.current();
    let meta = index.doc(doc_id).ok_or(ApiError::NotFound)?;
    let parent = meta.parent.and_then(|p| index.doc(p)).map(|p| p.location.clone());
    Ok(Json(serde_json::json!({
        "doc_id": doc_id,
        "location": meta.location,
        "page": meta.page,
        "title": meta.title,
        "category": meta.category,
        "parent": parent,
        "text": meta.text,
    })))
}

/// Re-read the index directory and swap it in. On any failure the index
/// already being served stays in place.
async fn reload_handler(State(state): State<AppState>, headers: HeaderMap) -> Result<Json<serde_json::Value>, ApiError> {
    authorize(&state, &headers)?;
    let handle = state.handle.clone();
    let paths = state.paths.clone();
    let outcome = tokio::task::spawn_blocking(move || handle.reload(&paths))
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?;
    match outcome {
        Ok(_) => {
            let index = state.handle.current();
            Ok(Json(serde_json::json!({ "num_docs": index.num_docs(), "num_terms": index.num_terms() })))
        }
        Err(err) => {
            tracing::warn!(%err, "reload rejected; keeping current index");
            Err(ApiError::Internal(err.to_string()))
        }
    }
}

fn authorize(state: &AppState, headers: &HeaderMap) -> Result<(), ApiError> {
    let required = match &state.admin_token {
        Some(t) => t,
        None => return Err(ApiError::Unauthorized("ADMIN_TOKEN not set")),
    };
    let provided = headers.get("X-ADMIN-TOKEN").and_then(|v| v.to_str().ok()).unwrap_or("");
    if provided == required {
        Ok(())
    } else {
        Err(ApiError::Unauthorized("invalid admin token"))
    }
}
