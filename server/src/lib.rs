use anyhow::Result;
use axum::{extract::{Path, Query, State}, http::StatusCode, routing::get, Json, Router};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use vecspace_core::config::{ScoringOptions, DEFAULT_TOP_K};
use vecspace_core::normalizer::{Normalizer, StopWords};
use vecspace_core::persist::{load_search_index, IndexPaths};
use vecspace_core::scorer::{QueryScorer, SearchIndex};
use vecspace_core::{DocId, IndexError};

#[derive(Deserialize)]
pub struct SearchParams {
    pub q: String,
    #[serde(default = "default_k")]
    pub k: usize,
}
fn default_k() -> usize { DEFAULT_TOP_K }

#[derive(Serialize)]
pub struct SearchResponse {
    pub query: String,
    pub took_s: f64,
    pub total_hits: usize,
    pub results: Vec<SearchHit>,
}

#[derive(Serialize)]
pub struct SearchHit {
    pub doc_id: DocId,
    pub score: f64,
}

#[derive(Serialize)]
pub struct DocResponse {
    pub doc_id: DocId,
    pub length: f64,
    pub weights: BTreeMap<String, f64>,
}

pub struct ServerConfig {
    pub index_dir: PathBuf,
    pub stopwords: Option<PathBuf>,
    pub query_timeout: Option<Duration>,
}

/// Shared read-only state; cloned per request, so everything heavy sits behind an `Arc`.
#[derive(Clone)]
pub struct AppState {
    pub index: Arc<SearchIndex>,
    pub normalizer: Arc<Normalizer>,
    pub query_timeout: Option<Duration>,
}

pub fn build_app(config: ServerConfig) -> Result<Router> {
    let index = load_search_index(&IndexPaths::new(&config.index_dir))?;
    let stop_words = match &config.stopwords {
        Some(path) => StopWords::load(path)?,
        None => StopWords::english(),
    };
    tracing::info!(num_docs = index.num_docs(), num_terms = index.num_terms(), "index loaded");
    let app_state = AppState {
        index: Arc::new(index),
        normalizer: Arc::new(Normalizer::english(stop_words)),
        query_timeout: config.query_timeout,
    };

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
        .with_state(app_state)
        .layer(cors)
        .layer(TraceLayer::new_for_http());
    Ok(app)
}

pub async fn search_handler(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Result<Json<SearchResponse>, (StatusCode, String)> {
    let start = Instant::now();
    let mut options = ScoringOptions::with_top_k(params.k);
    options.timeout = state.query_timeout;

    // Scoring is CPU-bound; keep it off the async workers.
    let query = params.q.clone();
    let ranking = tokio::task::spawn_blocking(move || {
        QueryScorer::new(&state.index, &state.normalizer).search(&query, &options)
    })
    .await
    .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?
    .map_err(|e| match e {
        IndexError::QueryTimeout { .. } => (StatusCode::SERVICE_UNAVAILABLE, e.to_string()),
        other => (StatusCode::INTERNAL_SERVER_ERROR, other.to_string()),
    })?;

    let results = ranking
        .hits
        .iter()
        .map(|h| SearchHit { doc_id: h.doc_id, score: h.score })
        .collect();
    let elapsed = start.elapsed();
    tracing::debug!(query = %params.q, total_hits = ranking.total_hits, took_s = elapsed.as_secs_f64(), "search");
    Ok(Json(SearchResponse { query: params.q, took_s: elapsed.as_secs_f64(), total_hits: ranking.total_hits, results }))
}

pub async fn doc_handler(
    State(state): State<AppState>,
    Path(doc_id): Path<DocId>,
) -> Result<Json<DocResponse>, (StatusCode, String)> {
    let vector = state
        .index
        .document_vector(doc_id)
        .ok_or_else(|| (StatusCode::NOT_FOUND, format!("document {doc_id} not found")))?;
    Ok(Json(DocResponse { doc_id, length: vector.length, weights: vector.weights.into_iter().collect() }))
}
